use serde::Deserialize;

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used to build share links (e.g. `https://photos.example.com`).
    ///
    /// If not set, defaults to `http://{host}:{port}`.
    pub external_url: Option<String>,
    /// Graceful shutdown timeout in seconds.
    ///
    /// Upper bound on waiting for the janitor to finish its current sweep.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
    /// Origins allowed to call the API cross-origin. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Base URL for share links, without a trailing slash.
    pub fn external_url(&self) -> String {
        match self.external_url.as_deref() {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            external_url: None,
            shutdown_timeout_seconds: default_shutdown_timeout(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    5000
}

fn default_shutdown_timeout() -> u64 {
    30
}

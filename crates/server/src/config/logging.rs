use serde::Deserialize;

/// Log output configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `"info"` or `"ephemera_lifecycle=debug,info"`.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_owned()
}

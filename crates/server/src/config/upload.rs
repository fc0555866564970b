use serde::Deserialize;

/// Upload size and file type limits.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted image, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Accepted file extensions, lowercase, without the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    /// Content type for an uploaded file name, if its extension is allowed.
    pub fn content_type_for(&self, filename: &str) -> Option<&'static str> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return None;
        }
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// Human-readable limit for error messages (`"10MB"`).
    pub fn max_size_label(&self) -> String {
        const MIB: usize = 1024 * 1024;
        match self.max_bytes {
            n if n >= MIB && n % MIB == 0 => format!("{}MB", n / MIB),
            n if n >= 1024 => format!("{}KB", n / 1024),
            n => format!("{n} bytes"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

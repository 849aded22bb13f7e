use crate::catalog::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sensor catalog rejected: {0}")]
    Catalog(#[from] ValidationError),

    #[error("System call error: {0}")]
    System(String),

    #[error("Feature not available: {0}")]
    NotAvailable(String),
}

impl Error {
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub(crate) fn system<S: Into<String>>(msg: S) -> Self {
        Error::System(msg.into())
    }

    pub(crate) fn not_available<S: Into<String>>(msg: S) -> Self {
        Error::NotAvailable(msg.into())
    }
}

/// Result type for darwin-telemetry operations
pub type Result<T> = std::result::Result<T, Error>;

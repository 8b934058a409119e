#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Database error")]
    DatabaseError(#[from] sqlx::error::Error),

    #[error("HTTP client error")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to render {url}: {reason}")]
    RenderError { url: String, reason: String },

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Invalid url")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid keyword pattern")]
    InvalidKeyword(#[from] regex::Error),

    #[error("Invalid config")]
    ConfigError(#[from] serde_json::Error),

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// Delivery failure of a notification. Never propagated past the notifier.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Request failed")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint responded with status {0}")]
    Status(u16),
}

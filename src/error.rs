use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Category '{0}' is built in and cannot be toggled")]
    ReservedCategory(String),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Transport and API failures, reported to the user as "offline"
    /// rather than as storage problems.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Failed to schedule ticker: {0}")]
    Schedule(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, WindowError>;

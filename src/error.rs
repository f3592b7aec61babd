use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Cannot connect to server: {0}")]
    CannotConnect(String),

    #[error("Authentication failed: {0}")]
    InvalidAuth(String),

    #[error("Server reported an error: {0}")]
    ApiResponse(String),

    #[error("Malformed upstream data: {0}")]
    MalformedData(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Internal(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelensError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("Cannot aggregate fan-out job '{0}' with no configurations")]
    EmptyFanOut(String),

    #[error("Snapshot API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Snapshot API error (status {status}) after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML deserialization error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelensError>;

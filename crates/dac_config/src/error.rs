#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error("config validation failed: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

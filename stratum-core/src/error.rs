use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StratumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown rule id '{0}': no catalog entry")]
    UnknownRule(String),

    #[error("Scan error in {}: {message}", path.display())]
    Scan { path: PathBuf, message: String },

    #[error("Descriptor error in {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },

    #[error("Fix error: {0}")]
    Fix(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StratumError {
    pub fn config(message: impl Into<String>) -> Self {
        StratumError::Config(message.into())
    }

    pub fn descriptor(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StratumError::Descriptor {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn scan(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StratumError::Scan {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type StratumResult<T> = std::result::Result<T, StratumError>;

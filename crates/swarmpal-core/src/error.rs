use thiserror::Error;

#[derive(Debug, Error)]
pub enum PalError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("data source '{0}' not found")]
    UnknownProvider(String),

    #[error("process '{0}' not found")]
    UnknownProcess(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("process '{name}' failed: {message}")]
    Process { name: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tree error: {0}")]
    Tree(#[from] swarmpal_tree::TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid time '{0}': expected ISO 8601")]
    InvalidTime(String),

    #[error("invalid duration '{0}': expected an ISO 8601 duration such as 'PT1H30M'")]
    InvalidDuration(String),

    #[error("unknown spacecraft '{0}'; list known ones with: swarmpal spacecraft")]
    UnknownSpacecraft(String),

    #[error("unknown grade '{0}': expected 'OPER' or 'FAST'")]
    UnknownGrade(String),
}

impl PalError {
    pub fn process(name: &str, message: impl Into<String>) -> Self {
        PalError::Process {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PalError>;

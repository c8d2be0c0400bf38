use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("manifest missing or unreadable at {0}")]
    Manifest(String),

    #[error("parser process failed for {file}: {message}")]
    ParserProcess { file: String, message: String },

    #[error("parser process timed out for {file} after {seconds}s")]
    ParserTimeout { file: String, seconds: u64 },

    #[error("configuration error: {0}")]
    Config(#[from] extgraph_ir::config::ConfigError),

    #[error(transparent)]
    Analysis(#[from] extgraph_ir::AnalysisError),
}

impl DriverError {
    pub fn parser<E: std::fmt::Display>(file: impl Into<String>, error: E) -> Self {
        Self::ParserProcess {
            file: file.into(),
            message: error.to_string(),
        }
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthorstatError>;

#[derive(Error, Debug)]
pub enum AuthorstatError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Other: {0}")]
    Other(String),
}

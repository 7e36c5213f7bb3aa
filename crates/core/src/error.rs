use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("embedder returned {actual} where {expected} was expected")]
    EmbeddingShape { expected: String, actual: String },
}

impl From<reqwest::Error> for DiffError {
    fn from(error: reqwest::Error) -> Self {
        DiffError::ModelUnavailable(format!("http error: {error}"))
    }
}

impl From<url::ParseError> for DiffError {
    fn from(error: url::ParseError) -> Self {
        DiffError::InvalidConfiguration(format!("embedding endpoint is not a url: {error}"))
    }
}

pub type Result<T, E = DiffError> = std::result::Result<T, E>;

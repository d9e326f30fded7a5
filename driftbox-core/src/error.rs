use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("identifier generation failed: {0}")]
    IdGeneration(String),

    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("storage read failed: {0}")]
    StorageRead(String),

    #[error("blob not found or expired: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriftError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DriftError>;

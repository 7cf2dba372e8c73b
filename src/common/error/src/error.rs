use thiserror::Error;

pub type DaftResult<T> = std::result::Result<T, DaftError>;
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DaftError {
    #[error("{0}")]
    ComputeError(String),
    #[error("{0}")]
    ValueError(String),
    #[error("{0:?}")]
    IoError(#[from] std::io::Error),
    #[error("DaftError::FileNotFound {path}: {source}")]
    FileNotFound { path: String, source: GenericError },
    #[error("{0}")]
    InternalError(String),
    #[error("{0}")]
    External(GenericError),
}

impl DaftError {
    /// Returns the wrapped external error if it is of type `E`.
    pub fn downcast_external<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::External(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

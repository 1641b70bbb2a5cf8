use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network dataset unavailable: {0}")]
    IndexUnavailable(String),
    #[error("Spatial index build failed: {0}")]
    CacheBuildFailure(String),
    #[error("Spatial index build cancelled")]
    Cancelled,
    #[error("Invalid basetype code: {0}")]
    InvalidBasetype(u8),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Errors after which a route can still be drawn as a straight line
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Cancelled | Error::InvalidBasetype(_))
    }
}

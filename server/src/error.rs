use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("no sighting recorded yet")]
    NotFound,
    #[error("forecast unavailable: {0}")]
    ForecastUnavailable(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub fn validation(msg: impl Into<String>) -> EngineError {
    EngineError::Validation(msg.into())
}

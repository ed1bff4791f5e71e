use std::time::Duration;
use thiserror::Error;

pub type LockResult<T> = Result<T, LockError>;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("could not connect to the lock backend: {0}")]
    Connection(String),

    #[error("lock backend operation failed: {0}")]
    Backend(String),

    #[error("timed out after {wait_budget:?} waiting to acquire lock {key}")]
    Timeout { key: String, wait_budget: Duration },
}

impl LockError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockError::Backend(_) | LockError::Connection(_))
    }
}

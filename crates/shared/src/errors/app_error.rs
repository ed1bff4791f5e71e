use super::DomainError;
use thiserror::Error;

/// Application-level errors (includes infrastructure, auth, and the Locker).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),

    #[error("lock acquisition timed out: {0}")]
    Locked(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Forbidden,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal server error: {0}")]
    Internal(String),

    #[error("request timeout")]
    Timeout,
}

impl AppError {
    /// HTTP status code per the error taxonomy.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Domain(e) => match e {
                DomainError::EventNotFound(_)
                | DomainError::BookingNotFound(_)
                | DomainError::WaitlistEntryNotFound(_) => 404,
                DomainError::Validation(_) => 422,
                _ => 400, // InsufficientCapacity, NotPending, NotCancellable, Expired,
                          // HasAvailability, DuplicateActiveWaitlist, WaitlistNotCancellable,
                          // Conflict, EventAlreadyExists: DomainConflict per spec §7.
            },
            AppError::Database(_) | AppError::Internal(_) => 500,
            AppError::Locked(_) => 503,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 422,
            AppError::Timeout => 504,
        }
    }

    /// Machine-readable error code surfaced in the JSON error envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Domain(e) => match e {
                DomainError::EventNotFound(_) => "EVENT_NOT_FOUND",
                DomainError::EventAlreadyExists(_) => "EVENT_ALREADY_EXISTS",
                DomainError::InsufficientCapacity { .. } => "INSUFFICIENT_CAPACITY",
                DomainError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
                DomainError::NotPending(_) => "NOT_PENDING",
                DomainError::NotCancellable(_) => "NOT_CANCELLABLE",
                DomainError::Expired(_) => "EXPIRED",
                DomainError::WaitlistEntryNotFound(_) => "WAITLIST_ENTRY_NOT_FOUND",
                DomainError::HasAvailability(_) => "HAS_AVAILABILITY",
                DomainError::DuplicateActiveWaitlist(_) => "DUPLICATE_ACTIVE_WAITLIST",
                DomainError::WaitlistNotCancellable(_) => "WAITLIST_NOT_CANCELLABLE",
                DomainError::Conflict(_) => "CONFLICT",
                DomainError::Validation(_) => "VALIDATION_ERROR",
            },
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Locked(_) => "RESOURCE_LOCKED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Timeout => "TIMEOUT",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("database error: {:?}", err);
        AppError::Database(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

use thiserror::Error;

/// Business-rule violations raised by the booking core's domain and
/// repository layers. These never carry HTTP concerns; `AppError` maps them
/// to status codes at the API boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("event {0} has no local availability row")]
    EventNotFound(String),

    #[error("event {0} already has an availability row")]
    EventAlreadyExists(String),

    #[error("insufficient capacity for event {event_id}: requested {requested}, available {available}")]
    InsufficientCapacity {
        event_id: String,
        requested: i32,
        available: i32,
    },

    #[error("booking {0} not found")]
    BookingNotFound(String),

    #[error("booking {0} is not in PENDING status")]
    NotPending(String),

    #[error("booking {0} cannot be cancelled from its current status")]
    NotCancellable(String),

    #[error("booking {0} has expired")]
    Expired(String),

    #[error("waitlist entry {0} not found")]
    WaitlistEntryNotFound(String),

    #[error("event {0} has available capacity; no need to join the waitlist")]
    HasAvailability(String),

    #[error("user already has an active waitlist entry for event {0}")]
    DuplicateActiveWaitlist(String),

    #[error("waitlist entry {0} cannot be cancelled from its current status")]
    WaitlistNotCancellable(String),

    #[error("optimistic version conflict on {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_capacity_renders_fields() {
        let err = DomainError::InsufficientCapacity {
            event_id: "1".into(),
            requested: 3,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 3"));
        assert!(msg.contains("available 1"));
    }
}

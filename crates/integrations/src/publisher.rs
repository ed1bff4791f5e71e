//! Redis pub/sub publisher for domain events (spec §4.5).
//!
//! Publishing is always best-effort: a failed publish is logged and
//! swallowed rather than propagated, matching the source's booking
//! service, which never lets a notification failure roll back a
//! committed booking mutation.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("could not connect to the event bus: {0}")]
    Connection(String),
    #[error("publish failed: {0}")]
    Backend(String),
}

#[derive(Clone)]
pub struct EventPublisher {
    conn_manager: ConnectionManager,
}

impl EventPublisher {
    pub async fn connect(redis_url: &str) -> Result<Self, PublishError> {
        let client = Client::open(redis_url)
            .map_err(|e| PublishError::Connection(format!("failed to create redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| PublishError::Connection(format!("failed to connect to redis: {e}")))?;
        Ok(Self { conn_manager })
    }

    /// Publish a pre-shaped payload to `channel`. Errors are returned to
    /// the caller, who is expected (per spec §4.5) to log-and-continue
    /// rather than fail the originating operation.
    pub async fn publish(&self, channel: &str, message: &Value) -> Result<(), PublishError> {
        let mut conn = self.conn_manager.clone();
        let payload = serde_json::to_string(message)
            .map_err(|e| PublishError::Backend(format!("failed to serialize message: {e}")))?;
        let _: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|e| PublishError::Backend(format!("PUBLISH failed: {e}")))?;
        Ok(())
    }

    pub async fn publish_booking_created(&self, booking_data: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("created", booking_data).await
    }

    pub async fn publish_booking_confirmed(&self, booking_data: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("confirmed", booking_data).await
    }

    pub async fn publish_booking_cancelled(&self, booking_data: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("cancelled", booking_data).await
    }

    pub async fn publish_booking_expired(&self, booking_data: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("expired", booking_data).await
    }

    async fn publish_booking_event(&self, kind: &str, booking_data: &impl Serialize) -> Result<(), PublishError> {
        let channel = format!("evently:bookings:{kind}");
        let message = serde_json::to_value(booking_data)
            .map_err(|e| PublishError::Backend(format!("failed to serialize booking data: {e}")))?;
        self.publish(&channel, &message).await
    }

    pub async fn publish_payment_completed(&self, booking_data: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("payment_completed", booking_data).await
    }

    pub async fn publish_waitlist_joined(&self, payload: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("waitlist_joined", payload).await
    }

    pub async fn publish_waitlist_cancelled(&self, payload: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("waitlist_cancelled", payload).await
    }

    pub async fn publish_waitlist_notifications_sent(&self, payload: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("waitlist_notifications_sent", payload).await
    }

    pub async fn publish_waitlist_availability_updated(&self, payload: &impl Serialize) -> Result<(), PublishError> {
        self.publish_booking_event("waitlist_availability_updated", payload).await
    }

    /// Enqueue an email job for the (separate) email worker pool to
    /// dequeue and send — the booking core only enqueues (spec §1).
    /// Delivered on its own channel, since the consumer is a distinct
    /// audience from whoever mirrors booking/waitlist lifecycle state.
    pub async fn enqueue_email(&self, job_type: &str, payload: &impl Serialize) -> Result<(), PublishError> {
        let mut message = serde_json::to_value(payload)
            .map_err(|e| PublishError::Backend(format!("failed to serialize email job: {e}")))?;
        if let Value::Object(ref mut map) = message {
            map.insert("type".to_string(), Value::String(job_type.to_string()));
        }
        self.publish("evently:notifications:outbound", &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    #[ignore]
    async fn publish_does_not_error_with_no_subscribers() {
        let publisher = EventPublisher::connect("redis://127.0.0.1:6379").await.unwrap();
        let result = publisher
            .publish("evently:bookings:created", &json!({"booking_id": "test"}))
            .await;
        assert!(result.is_ok());
    }
}

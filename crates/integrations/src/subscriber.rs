//! Redis pub/sub subscriber for inbound catalog events (spec §4.5).
//!
//! This module only decodes transport frames into typed messages; the
//! idempotent apply-to-ledger logic lives in the service layer that owns
//! the database connection.

use futures_util::StreamExt;
use redis::Client;
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("could not connect to the event bus: {0}")]
    Connection(String),
    #[error("subscription failed: {0}")]
    Backend(String),
}

/// `event_data` payload for `EventCreated` (spec §4.5/§6: `{id, name,
/// capacity, price, ...}`). `id` is carried alongside the envelope's own
/// `event_id` and not read separately; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EventCreatedData {
    pub name: String,
    pub capacity: i32,
    pub price: rust_decimal::Decimal,
}

/// `event_data` payload for `EventUpdated` — every field is a partial
/// update; a missing field leaves the corresponding ledger column alone.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUpdatedData {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub price: Option<rust_decimal::Decimal>,
}

/// Inbound catalog message: `{type, event_id, event_data:{...}}` (spec
/// §6's canonical shape; scenario S6 uses the same `capacity`/`name`
/// field names inside `event_data`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    EventCreated { event_id: i64, event_data: EventCreatedData },
    EventUpdated { event_id: i64, event_data: EventUpdatedData },
    EventDeleted { event_id: i64 },
}

pub struct EventSubscriber {
    client: Client,
}

impl EventSubscriber {
    pub fn new(redis_url: &str) -> Result<Self, SubscribeError> {
        let client = Client::open(redis_url)
            .map_err(|e| SubscribeError::Connection(format!("failed to create redis client: {e}")))?;
        Ok(Self { client })
    }

    /// Subscribes to `evently:events:created|updated|deleted` and forwards
    /// each decodable message over the returned channel. Messages that
    /// fail to parse are logged and dropped rather than closing the
    /// subscription, since the bus is at-least-once and shared with
    /// other consumers.
    pub async fn subscribe(&self) -> Result<mpsc::Receiver<CatalogEvent>, SubscribeError> {
        let (tx, rx) = mpsc::channel(256);
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| SubscribeError::Connection(format!("failed to open pubsub connection: {e}")))?;

        pubsub
            .psubscribe("evently:events:*")
            .await
            .map_err(|e| SubscribeError::Backend(format!("PSUBSCRIBE failed: {e}")))?;

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to decode pubsub payload");
                        continue;
                    }
                };
                match serde_json::from_str::<CatalogEvent>(&payload) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, payload, "failed to parse catalog event");
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_event_created_envelope() {
        let raw = r#"{"type":"EventCreated","event_id":42,"event_data":{"id":42,"name":"X","capacity":100,"price":"10.00"}}"#;
        let event: CatalogEvent = serde_json::from_str(raw).unwrap();
        match event {
            CatalogEvent::EventCreated { event_id, event_data } => {
                assert_eq!(event_id, 42);
                assert_eq!(event_data.name, "X");
                assert_eq!(event_data.capacity, 100);
            }
            other => panic!("expected EventCreated, got {other:?}"),
        }
    }

    #[test]
    fn parses_partial_event_updated_envelope() {
        let raw = r#"{"type":"EventUpdated","event_id":42,"event_data":{"capacity":50}}"#;
        let event: CatalogEvent = serde_json::from_str(raw).unwrap();
        match event {
            CatalogEvent::EventUpdated { event_id, event_data } => {
                assert_eq!(event_id, 42);
                assert_eq!(event_data.capacity, Some(50));
                assert!(event_data.name.is_none());
                assert!(event_data.price.is_none());
            }
            other => panic!("expected EventUpdated, got {other:?}"),
        }
    }

    #[test]
    fn parses_event_deleted_envelope() {
        let raw = r#"{"type":"EventDeleted","event_id":42}"#;
        let event: CatalogEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, CatalogEvent::EventDeleted { event_id: 42 }));
    }
}

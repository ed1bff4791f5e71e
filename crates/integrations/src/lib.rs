pub mod locker;
pub mod publisher;
pub mod subscriber;

pub use locker::{LockError, LockResult, LockToken, Locker};
pub use publisher::{EventPublisher, PublishError};
pub use subscriber::{CatalogEvent, EventSubscriber, SubscribeError};

//! Applies inbound catalog events to the local Capacity Ledger (spec §4.5).
//!
//! The event subscriber is the sole writer for `EventAvailability` row
//! creation/deletion; the booking/waitlist services only ever update
//! counters of a row that already exists. Every branch here must tolerate
//! redelivery since the bus is at-least-once.

use db::AvailabilityRepository;
use integrations::{CatalogEvent, EventSubscriber};
use shared::types::EventId;

use crate::state::AppState;

/// Spawns the subscriber and a task that drains it, applying each event
/// to the ledger. Runs for the lifetime of the process; connection loss
/// inside the subscriber is logged and the task simply exits (no
/// reconnect loop — matching the Locker/Publisher, which are one-shot
/// per-process connections too).
pub fn spawn_catalog_sync(state: AppState, subscriber: EventSubscriber) {
    tokio::spawn(async move {
        let mut rx = match subscriber.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(error = %e, "failed to start catalog event subscription");
                return;
            }
        };

        while let Some(event) = rx.recv().await {
            if let Err(e) = apply(&state, event).await {
                tracing::warn!(error = %e, "failed to apply catalog event to capacity ledger");
            }
        }

        tracing::warn!("catalog event subscription closed");
    });
}

async fn apply(state: &AppState, event: CatalogEvent) -> Result<(), sqlx::Error> {
    match event {
        CatalogEvent::EventCreated { event_id, event_data } => {
            let event_id = EventId::new(event_id);
            let mut tx = state.pool.begin().await?;
            if AvailabilityRepository::find_by_event_in_tx(&mut tx, event_id).await?.is_none() {
                AvailabilityRepository::create(&mut tx, event_id, &event_data.name, event_data.capacity, event_data.price)
                    .await?;
                tracing::info!(%event_id, "capacity ledger row created from catalog event");
            }
            tx.commit().await
        }
        CatalogEvent::EventUpdated { event_id, event_data } => {
            let event_id = EventId::new(event_id);
            let mut tx = state.pool.begin().await?;
            let Some(row) = AvailabilityRepository::find_by_event_in_tx(&mut tx, event_id).await? else {
                // Race: the catalog's EventCreated hasn't arrived yet. Backfill
                // with whatever fields this update carries; missing ones are
                // reconciled whenever EventCreated (or the next update) lands.
                AvailabilityRepository::create(
                    &mut tx,
                    event_id,
                    event_data.name.as_deref().unwrap_or("unknown"),
                    event_data.capacity.unwrap_or(0),
                    event_data.price.unwrap_or_default(),
                )
                .await?;
                return tx.commit().await;
            };

            if let Some(new_total) = event_data.capacity {
                if new_total != row.total_capacity {
                    AvailabilityRepository::update_total(&mut tx, event_id, row.version, new_total).await?;
                }
            }

            if event_data.name.is_some() || event_data.price.is_some() {
                let row = AvailabilityRepository::find_by_event_in_tx(&mut tx, event_id).await?;
                if let Some(row) = row {
                    let name = event_data.name.unwrap_or(row.event_name.clone());
                    let price = event_data.price.unwrap_or(row.price);
                    AvailabilityRepository::update_metadata(&mut tx, event_id, row.version, &name, price).await?;
                }
            }

            tx.commit().await
        }
        CatalogEvent::EventDeleted { event_id } => {
            let event_id = EventId::new(event_id);
            let mut tx = state.pool.begin().await?;
            AvailabilityRepository::delete(&mut tx, event_id).await?;
            tx.commit().await
        }
    }
}

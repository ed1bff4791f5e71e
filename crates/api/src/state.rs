use integrations::{EventPublisher, Locker};
use metrics_exporter_prometheus::PrometheusHandle;
use shared::Settings;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub locker: Arc<Locker>,
    pub publisher: Arc<EventPublisher>,
    pub jwt_secret: String,
    pub settings: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        locker: Locker,
        publisher: EventPublisher,
        settings: Settings,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            pool,
            locker: Arc::new(locker),
            publisher: Arc::new(publisher),
            jwt_secret: settings.jwt_secret.clone(),
            settings: Arc::new(settings),
            metrics_handle,
        }
    }
}

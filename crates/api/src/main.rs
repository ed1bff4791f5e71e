use std::net::SocketAddr;

use api::{catalog_sync::spawn_catalog_sync, create_app, init_metrics, sweepers::spawn_sweepers, AppState};
use integrations::{EventPublisher, EventSubscriber, Locker};
use shared::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let migrate_only = std::env::args().any(|arg| arg == "--migrate-only");

    let metrics_handle = init_metrics();
    tracing::info!("Prometheus metrics initialized");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();

    let pool = db::create_pool(&settings.database_url, settings.db_max_connections)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations complete");

    if migrate_only {
        tracing::info!("Migration-only mode, exiting");
        return;
    }

    let locker = Locker::connect(&settings.redis_url).await.expect("Failed to connect to Redis for the Locker");
    let publisher = EventPublisher::connect(&settings.redis_url).await.expect("Failed to connect to Redis for the Event Publisher");
    let subscriber = EventSubscriber::new(&settings.redis_url).expect("Failed to build the catalog Event Subscriber");

    let port = settings.port;
    let state = AppState::new(pool, locker, publisher, settings, metrics_handle);

    spawn_sweepers(state.clone());
    spawn_catalog_sync(state.clone(), subscriber);

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

pub mod auth;
pub mod catalog_sync;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod services;
pub mod state;
pub mod sweepers;

pub use error::ApiError;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the application router (spec §6: HTTP surface of the booking core).
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::prometheus::metrics))
        .route(
            "/v1/bookings",
            post(routes::bookings::create_booking).get(routes::bookings::list_bookings),
        )
        .route("/v1/bookings/:id", get(routes::bookings::get_booking))
        .route("/v1/bookings/:id/confirm", put(routes::bookings::confirm_booking))
        .route("/v1/bookings/:id/cancel", put(routes::bookings::cancel_booking))
        .route("/v1/bookings/:id/audit", get(routes::bookings::get_booking_audit))
        .route("/v1/availability/events/:event_id", get(routes::availability::get_availability))
        .route(
            "/v1/availability/events/:event_id/check",
            get(routes::availability::check_availability),
        )
        .route(
            "/v1/availability/events/:event_id/capacity",
            post(routes::availability::set_initial_capacity).put(routes::availability::update_capacity),
        )
        .route("/v1/waitlist/check/:event_id", get(routes::waitlist::check_eligibility))
        .route(
            "/v1/waitlist",
            post(routes::waitlist::join_waitlist).get(routes::waitlist::list_my_waitlist),
        )
        .route("/v1/waitlist/:id", get(routes::waitlist::get_waitlist_entry))
        .route("/v1/waitlist/:id/cancel", put(routes::waitlist::cancel_waitlist_entry))
        .route("/v1/waitlist/:id/position", get(routes::waitlist::get_waitlist_position))
        .route("/v1/waitlist/:id/audit", get(routes::waitlist::get_waitlist_audit))
        .route(
            "/v1/waitlist/admin/event/:event_id",
            get(routes::waitlist::admin_list_event_waitlist),
        )
        .route(
            "/v1/waitlist/admin/notify/:event_id",
            post(routes::waitlist::admin_notify_waitlist),
        )
        .route("/v1/admin/bookings", get(routes::admin::list_bookings))
        .route("/v1/admin/bookings/stats", get(routes::admin::booking_stats))
        .route("/v1/admin/bookings/expire", post(routes::admin::trigger_expire_sweep))
        .route("/v1/admin/bookings/:id", axum::routing::delete(routes::admin::delete_booking))
        .route("/v1/admin/bookings/:id/status", put(routes::admin::update_booking_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

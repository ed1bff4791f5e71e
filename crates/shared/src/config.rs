use std::time::Duration;

/// Process-wide settings, read once at startup from the environment.
///
/// There is no process-global singleton: `main` constructs one `Settings`
/// and threads it through `AppState` explicitly, the same way the
/// database pool and JWT secret are threaded today.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub db_max_connections: u32,

    /// Default hold duration for a newly created PENDING booking.
    pub booking_hold: Duration,
    /// Default window a NOTIFIED waitlist entry remains eligible to book.
    pub waitlist_notification_window: Duration,
    /// Locker `wait_budget`: how long `acquire` retries before failing.
    pub lock_wait_budget: Duration,
    /// Locker `hold_ttl`: how long an acquired lock is valid before lapsing.
    pub lock_hold_ttl: Duration,
    /// Interval between expire-pending-bookings sweeps.
    pub booking_expiry_sweep_interval: Duration,
    /// Interval between expire-notified-waitlist-entries sweeps.
    pub waitlist_expiry_sweep_interval: Duration,
}

impl Settings {
    /// Load settings from the environment. Panics with a descriptive
    /// message if a required variable is missing, matching the existing
    /// binary's fail-fast startup posture.
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable must be set");
        let jwt_secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET environment variable must be set");
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let port = env_parse("PORT", 8080);
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS", 10);
        let booking_hold_minutes = env_parse("BOOKING_HOLD_MINUTES", 15);
        let waitlist_notification_minutes = env_parse("WAITLIST_NOTIFICATION_MINUTES", 30);
        let lock_timeout_seconds = env_parse("LOCK_TIMEOUT_SECONDS", 10);
        let lock_hold_seconds = env_parse("LOCK_HOLD_SECONDS", 30);
        let booking_expiry_sweep_seconds = env_parse("BOOKING_EXPIRY_SWEEP_SECONDS", 30);
        let waitlist_expiry_sweep_seconds = env_parse("WAITLIST_EXPIRY_SWEEP_SECONDS", 30);

        Self {
            database_url,
            redis_url,
            jwt_secret,
            port,
            db_max_connections,
            booking_hold: Duration::from_secs(booking_hold_minutes * 60),
            waitlist_notification_window: Duration::from_secs(waitlist_notification_minutes * 60),
            lock_wait_budget: Duration::from_secs(lock_timeout_seconds),
            lock_hold_ttl: Duration::from_secs(lock_hold_seconds),
            booking_expiry_sweep_interval: Duration::from_secs(booking_expiry_sweep_seconds),
            waitlist_expiry_sweep_interval: Duration::from_secs(waitlist_expiry_sweep_seconds),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

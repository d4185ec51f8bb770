use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Clinicore";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Staleness bound for cached dashboard stats. Dashboards tolerate up to
/// this much lag; decisions (cascade execution) never read the cache.
pub const STATS_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinicore=debug"
}

//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Variable holding the log filter (e.g. `debug`, `qtest=trace`).
pub const LOG_ENV: &str = "QTEST_LOG";
/// Set to `json` for JSON-lines output.
pub const LOG_FORMAT_ENV: &str = "QTEST_LOG_FORMAT";

/// Installs the global subscriber, writing to stderr.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}

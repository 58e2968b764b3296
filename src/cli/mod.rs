pub mod commands;
pub mod handlers;
pub mod output;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TASKFLOW_LOG=debug`
pub const LOG_ENV: &str = "TASKFLOW_LOG";

/// Log to stderr. Commands stay quiet by default; the daemon reports what it does.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

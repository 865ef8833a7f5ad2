use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variables consulted for a log filter, in order.
const FILTER_ENV_VARS: [&str; 2] = ["SOCKSTRESS_LOG", "RUST_LOG"];

/// Installs the global subscriber, writing to stderr so the run summary on
/// stdout stays machine-readable. Later calls leave the first one in place.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = FILTER_ENV_VARS
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

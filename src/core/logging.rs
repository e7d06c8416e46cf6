use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::Config;

/// `RUST_LOG` overrides `LOG_LEVEL`. Verbose mode also prints targets and
/// thread names.
pub fn init_logging(config: &Config) {
    let log_level = &config.monitoring.log_level;
    let verbose = config.monitor.verbose;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_thread_names(verbose),
        )
        .init();

    tracing::info!("Logging initialized at level: {}", log_level);
    if verbose {
        tracing::debug!("Verbose output enabled");
    }
}

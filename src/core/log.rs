use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. `verbose` turns on debug output for this crate;
/// `RUST_LOG` replaces both when set.
pub fn init_logging(verbose: bool) {
    let (app_filter, env_filter) = build_filters(verbose, EnvFilter::try_from_default_env().ok());

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .init();
}

fn build_filters(verbose: bool, from_env: Option<EnvFilter>) -> (Option<Targets>, EnvFilter) {
    if let Some(env_filter) = from_env {
        return (None, env_filter);
    }

    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::WARN, "warn")
    };
    let app_filter = Targets::new()
        .with_target("assetdigest", level_filter)
        .with_default(LevelFilter::WARN);
    (Some(app_filter), EnvFilter::new(level))
}

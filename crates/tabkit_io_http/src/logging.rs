// Logging setup: tracing-subscriber with a log bridge
//
// Library crates log through the `log` facade; `tracing_log::LogTracer`
// forwards those records into the tracing subscriber installed here.

use std::collections::BTreeMap;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Third-party targets kept quiet regardless of the base level.
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("actix_server", "warn"),
    ("actix_web", "warn"),
    ("h2", "warn"),
    ("mio", "warn"),
];

/// Filter directives: base level, noisy-crate overrides, then config overrides.
pub fn derive_filter_directives(level: &str, target_levels: &BTreeMap<String, String>) -> String {
    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }
    for (target, lvl) in target_levels {
        directives.push(format!("{}={}", target, lvl));
    }
    directives.join(",")
}

fn build_env_filter(
    level: &str,
    target_levels: &BTreeMap<String, String>,
) -> anyhow::Result<EnvFilter> {
    let filter_str = derive_filter_directives(level, target_levels);
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Install the console subscriber and the `log` bridge.
pub fn init_logging(level: &str, target_levels: &BTreeMap<String, String>) -> anyhow::Result<()> {
    // Bridge `log` crate → tracing
    tracing_log::LogTracer::init().ok(); // ok() in case already initialized

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(build_env_filter(level, target_levels)?);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::trace!("Logging initialized: level={}", level);
    Ok(())
}

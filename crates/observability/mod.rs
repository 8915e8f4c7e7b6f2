mod config;

use anyhow::Result;
use config::ServiceContext;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. Call once per binary.
pub fn init_observability(component: &str) -> Result<()> {
    let context = ServiceContext::from_env(component);

    // RUST_LOG wins; `info` otherwise.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ=...` is reflected in log timestamps.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    info!(
        service = %context.service_name,
        environment = %context.environment,
        component = %context.component,
        "observability: tracing initialised"
    );

    Ok(())
}

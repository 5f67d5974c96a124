use anyhow::Result;
use geotrack::{core, daemon};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let base_filter = EnvFilter::new("info");
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter);
    let timer = tracing_subscriber::fmt::time::UtcTime::new(time::macros::format_description!(
        "[hour]:[minute]:[second]"
    ));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings_path = core::config::settings_path();
    let settings = core::config::Settings::load(&settings_path)?;

    if let Err(e) = filter_handle.reload(EnvFilter::new(&settings.daemon.log_level)) {
        tracing::warn!("Invalid log level {:?}: {}", settings.daemon.log_level, e);
    }

    tracing::info!(
        "geotrack v{} started (config={}, source={:?}, server={}, interval={}ms)",
        env!("CARGO_PKG_VERSION"),
        settings_path.display(),
        settings.location.source,
        settings.server.base_url,
        settings.tracking.interval_ms
    );

    daemon::run::run_with_config_and_logger(settings, filter_handle).await
}

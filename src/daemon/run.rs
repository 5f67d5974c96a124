use crate::common::LogLevel;
use crate::core::api::HttpBackend;
use crate::core::config::Settings;
use crate::core::location::create_location_provider;
use crate::core::store::{FileStore, KeyValueStore, MemoryStore};
use crate::daemon::ipc::{self, IpcHandles};
use crate::daemon::tracker::{Tracker, TrackingParams};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::{signal, time};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub type ReloadHandle =
    tracing_subscriber::reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

pub struct Daemon {
    pub(crate) settings: Settings,
    pub(crate) tracker: Arc<Tracker>,
    pub(crate) socket_path: PathBuf,
}

fn open_store(path: &std::path::Path) -> Arc<dyn KeyValueStore> {
    if path.as_os_str().is_empty() {
        warn!(target: "geotrack::daemon", "No state_file configured, tracking state will not survive restarts");
        return Arc::new(MemoryStore::new());
    }
    Arc::new(FileStore::open(path))
}

impl Daemon {
    pub fn new(settings: Settings) -> Result<Self> {
        let provider = create_location_provider(&settings.location);
        debug!(target: "geotrack::daemon", "Location source: {:?}", settings.location.source);

        let backend = Arc::new(
            HttpBackend::new(&settings.server.base_url, settings.server.request_timeout())
                .context("Failed to set up location backend")?,
        );
        let store = open_store(&settings.daemon.state_file);

        let tracker = Arc::new(Tracker::new(
            provider,
            backend,
            store,
            TrackingParams::from_config(&settings.tracking),
        ));

        Ok(Self {
            socket_path: settings.daemon.socket_path.clone(),
            settings,
            tracker,
        })
    }

    pub fn init_ipc(&self, filter_handle: ReloadHandle) {
        let initial = LogLevel::from_str_ignore_case(&self.settings.daemon.log_level)
            .unwrap_or(LogLevel::Info);
        let current_log_level = Arc::new(RwLock::new(initial));

        let set_log_level = Arc::new(move |lvl: LogLevel| -> Result<()> {
            filter_handle
                .reload(EnvFilter::new(lvl.as_filter()))
                .context("Failed to change log level")?;
            debug!(target: "geotrack::ipc", "Log level changed to {:?}", lvl);
            Ok(())
        });

        let handles = IpcHandles {
            tracker: self.tracker.clone(),
            set_log_level,
            current_log_level,
        };

        let path = self.socket_path.clone();
        tokio::spawn(async move {
            debug!(target: "geotrack::daemon", "Starting IPC socket listener...");
            match ipc::start(&path, handles).await {
                Ok(_) => info!(target: "geotrack::daemon", "IPC    | Listener stopped"),
                Err(e) => error!(target: "geotrack::daemon", "IPC    | Error: {:?}", e),
            }
        });
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "geotrack::daemon", "Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(target: "geotrack::daemon", "Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

pub async fn run_with_config_and_logger(settings: Settings, reload: ReloadHandle) -> Result<()> {
    let daemon = Daemon::new(settings)?;

    daemon.init_ipc(reload);

    time::sleep(Duration::from_millis(200)).await;
    debug!(target: "geotrack::daemon", "IPC socket ready at {}", daemon.socket_path.display());

    if daemon.tracker.launch().await {
        info!(target: "geotrack::daemon", "Daemon | Tracking resumed");
    }

    shutdown_signal().await;
    info!(target: "geotrack::daemon", "Daemon | Shutdown signal received");

    daemon.tracker.shutdown();
    let _ = std::fs::remove_file(&daemon.socket_path);
    info!(target: "geotrack::daemon", "Daemon | Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TRACKING_STATE_KEY;
    use crate::core::config::LocationSource;

    #[tokio::test]
    async fn test_corrupt_state_file_starts_untracked() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.toml");
        std::fs::write(&state, "trackingState = true").unwrap();

        let mut settings = Settings::default();
        settings.daemon.state_file = state.clone();
        settings.location.source = LocationSource::Fixed;

        let daemon = Daemon::new(settings).unwrap();
        assert!(!daemon.tracker.launch().await);
        assert!(!daemon.tracker.is_tracking());

        daemon.tracker.start().await.unwrap();
        daemon.tracker.shutdown();
        let content = std::fs::read_to_string(&state).unwrap();
        assert!(content.contains(&format!("{} = \"true\"", TRACKING_STATE_KEY)));
    }
}

use crate::common::{Coordinates, TrackerStatus};
use crate::core::api::LocationBackend;
use crate::core::config::TrackingConfig;
use crate::core::location::{LocationProvider, PositionRequest};
use crate::core::runner::{RunnerError, TaskRunner};
use crate::core::store::{self, KeyValueStore};
use crate::daemon::state::CurrentState;
use anyhow::anyhow;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("location permission denied (foreground={foreground}, background={background})")]
    PermissionDenied { foreground: bool, background: bool },
    #[error("permission request failed: {0:#}")]
    Permission(anyhow::Error),
    #[error("position error: {0:#}")]
    Position(anyhow::Error),
    #[error("upload failed: {0:#}")]
    Upload(anyhow::Error),
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("delete failed: {0:#}")]
    Delete(anyhow::Error),
    #[error("tracking service error: {0}")]
    Service(#[from] RunnerError),
    #[error("state storage error: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct TrackingParams {
    pub interval: Duration,
    pub request: PositionRequest,
}

impl TrackingParams {
    pub fn from_config(cfg: &TrackingConfig) -> Self {
        Self {
            interval: cfg.interval(),
            request: PositionRequest {
                accuracy: cfg.accuracy,
                timeout: cfg.position_timeout(),
                max_age: cfg.max_age(),
            },
        }
    }
}

fn raise_alert(state: &RwLock<CurrentState>, err: &TrackerError) {
    warn!(target: "geotrack::tracker", "Alert: {}", err);
    if let Ok(mut st) = state.write() {
        st.alert = Some(err.to_string());
    }
}

/// Everything one loop iteration needs, cloned into the background task.
#[derive(Clone)]
struct Sampler {
    provider: Arc<dyn LocationProvider>,
    backend: Arc<dyn LocationBackend>,
    state: Arc<RwLock<CurrentState>>,
    request: PositionRequest,
}

impl Sampler {
    async fn sample(&self) -> Result<Coordinates, TrackerError> {
        let pos = match time::timeout(
            self.request.timeout,
            self.provider.current_position(&self.request),
        )
        .await
        {
            Ok(Ok(pos)) => pos,
            Ok(Err(e)) => return Err(TrackerError::Position(e)),
            Err(_) => {
                return Err(TrackerError::Position(anyhow!(
                    "timed out after {:?}",
                    self.request.timeout
                )));
            }
        };

        if let Ok(mut st) = self.state.write() {
            st.latitude = Some(pos.latitude);
            st.longitude = Some(pos.longitude);
        }

        let payload = self
            .backend
            .upload(pos)
            .await
            .map_err(TrackerError::Upload)?;
        debug!(target: "geotrack::tracker", "Upload response: {}", payload);
        Ok(pos)
    }

    async fn iteration(self) {
        match self.sample().await {
            Ok(pos) => {
                info!(target: "geotrack::tracker", "Uploaded position {}", pos);
                if let Ok(mut st) = self.state.write() {
                    st.alert = None;
                }
            }
            Err(e) => raise_alert(&self.state, &e),
        }
    }
}

/// Gates the background sampling loop behind the permission check and the
/// persisted tracking flag.
pub struct Tracker {
    provider: Arc<dyn LocationProvider>,
    backend: Arc<dyn LocationBackend>,
    store: Arc<dyn KeyValueStore>,
    runner: TaskRunner,
    state: Arc<RwLock<CurrentState>>,
    params: TrackingParams,
}

impl Tracker {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        backend: Arc<dyn LocationBackend>,
        store: Arc<dyn KeyValueStore>,
        params: TrackingParams,
    ) -> Self {
        Self {
            provider,
            backend,
            store,
            runner: TaskRunner::new(),
            state: Arc::new(RwLock::new(CurrentState::default())),
            params,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.runner.is_running()
    }

    pub fn status(&self) -> TrackerStatus {
        let st = self.state.read().map(|g| g.clone()).unwrap_or_default();
        TrackerStatus {
            tracking: self.is_tracking(),
            latitude: st.latitude,
            longitude: st.longitude,
            alert: st.alert,
        }
    }

    fn report<T>(&self, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
        if let Err(e) = &result {
            raise_alert(&self.state, e);
        }
        result
    }

    fn persist(&self, tracking: bool) {
        if let Err(e) = store::save_tracking_flag(self.store.as_ref(), tracking) {
            error!(target: "geotrack::tracker", "Failed to persist tracking flag: {:?}", e);
            raise_alert(&self.state, &TrackerError::Storage(e));
        }
    }

    pub async fn request_permission(&self) -> Result<(), TrackerError> {
        let result = match self.provider.request_permissions().await {
            Ok(p) if p.is_granted() => Ok(()),
            Ok(p) => Err(TrackerError::PermissionDenied {
                foreground: p.foreground,
                background: p.background,
            }),
            Err(e) => Err(TrackerError::Permission(e)),
        };
        self.report(result)
    }

    /// Spawns the sampling loop without consulting permissions.
    fn begin(&self) -> Result<(), TrackerError> {
        let sampler = Sampler {
            provider: self.provider.clone(),
            backend: self.backend.clone(),
            state: self.state.clone(),
            request: self.params.request,
        };
        self.report(
            self.runner
                .start(self.params.interval, move || sampler.clone().iteration())
                .map_err(TrackerError::from),
        )?;

        self.persist(true);
        info!(
            target: "geotrack::tracker",
            "Tracking started (every {:?}, timeout {:?}, max age {:?})",
            self.params.interval, self.params.request.timeout, self.params.request.max_age
        );
        Ok(())
    }

    pub async fn start(&self) -> Result<(), TrackerError> {
        self.request_permission().await?;
        self.begin()
    }

    pub fn stop(&self) -> Result<(), TrackerError> {
        self.report(self.runner.stop().map_err(TrackerError::from))?;
        self.persist(false);
        info!(target: "geotrack::tracker", "Tracking stopped");
        Ok(())
    }

    /// Returns whether tracking is on afterwards.
    pub async fn toggle(&self) -> Result<bool, TrackerError> {
        if self.is_tracking() {
            self.stop()?;
            Ok(false)
        } else {
            self.start().await?;
            Ok(true)
        }
    }

    /// Startup sequence: ask for permission, then resume tracking if the
    /// persisted flag says so. Resuming does not depend on the permission result.
    pub async fn launch(&self) -> bool {
        if let Err(e) = self.request_permission().await {
            debug!(target: "geotrack::tracker", "Launch permission check failed: {}", e);
        }

        let persisted = match store::load_tracking_flag(self.store.as_ref()) {
            Ok(v) => v,
            Err(e) => {
                raise_alert(&self.state, &TrackerError::Storage(e));
                false
            }
        };

        if !persisted || self.is_tracking() {
            return false;
        }
        info!(target: "geotrack::tracker", "Resuming tracking from persisted state");
        self.begin().is_ok()
    }

    pub async fn fetch_locations(&self) -> Result<Value, TrackerError> {
        let payload = self.report(
            self.backend
                .fetch_all()
                .await
                .map_err(TrackerError::Fetch),
        )?;
        info!(target: "geotrack::tracker", "Fetched locations: {}", payload);
        Ok(payload)
    }

    pub async fn delete_locations(&self) -> Result<Value, TrackerError> {
        let payload = self.report(
            self.backend
                .delete_all()
                .await
                .map_err(TrackerError::Delete),
        )?;
        info!(target: "geotrack::tracker", "Deleted locations: {}", payload);
        Ok(payload)
    }

    /// Stops the loop on daemon exit, leaving the persisted flag as it was so
    /// tracking resumes on the next launch.
    pub fn shutdown(&self) {
        if self.runner.stop().is_ok() {
            debug!(target: "geotrack::tracker", "Sampling loop halted for shutdown");
        }
    }
}

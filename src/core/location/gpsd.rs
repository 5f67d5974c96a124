use super::{LocationProvider, PermissionStatus, PositionRequest};
use crate::common::Coordinates;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

const WATCH_CMD: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Extracts a fix from one gpsd JSON line, if it is a TPV report good enough for `min_mode`.
pub(crate) fn parse_tpv(line: &str, min_mode: u8) -> Option<Coordinates> {
    let report: Report = serde_json::from_str(line).ok()?;
    if report.class != "TPV" || report.mode < min_mode {
        return None;
    }
    match (report.lat, report.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

/// Position source backed by a gpsd daemon.
pub struct GpsdSource {
    addr: String,
    permissions: PermissionStatus,
    last_fix: Mutex<Option<(Coordinates, Instant)>>,
}

impl GpsdSource {
    pub fn new(addr: impl Into<String>, permissions: PermissionStatus) -> Self {
        Self {
            addr: addr.into(),
            permissions,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, max_age: Duration) -> Option<Coordinates> {
        if max_age.is_zero() {
            return None;
        }
        let guard = self.last_fix.lock().ok()?;
        match *guard {
            Some((pos, at)) if at.elapsed() <= max_age => Some(pos),
            _ => None,
        }
    }

    async fn read_fix(&self, min_mode: u8) -> Result<Coordinates> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .with_context(|| format!("Failed to connect to gpsd at {}", self.addr))?;
        stream.write_all(WATCH_CMD).await?;

        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(pos) = parse_tpv(&line, min_mode) {
                return Ok(pos);
            }
        }
        bail!("gpsd closed the connection before reporting a fix")
    }
}

#[async_trait]
impl LocationProvider for GpsdSource {
    async fn request_permissions(&self) -> Result<PermissionStatus> {
        let reachable = matches!(
            time::timeout(PROBE_TIMEOUT, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        );
        if !reachable {
            warn!(target: "geotrack::location", "gpsd not reachable at {}", self.addr);
        }
        Ok(PermissionStatus {
            foreground: self.permissions.foreground && reachable,
            background: self.permissions.background,
        })
    }

    async fn current_position(&self, request: &PositionRequest) -> Result<Coordinates> {
        if let Some(pos) = self.cached(request.max_age) {
            debug!(target: "geotrack::location", "Using cached fix {}", pos);
            return Ok(pos);
        }

        let pos = time::timeout(request.timeout, self.read_fix(request.accuracy.min_fix_mode()))
            .await
            .context("Timed out waiting for gpsd fix")??;

        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some((pos, Instant::now()));
        }
        Ok(pos)
    }
}

use super::handlers::handle_client;
use crate::common::LogLevel;
use crate::daemon::tracker::Tracker;
use anyhow::Result;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::net::UnixListener;

#[derive(Clone)]
pub struct IpcHandles {
    pub tracker: Arc<Tracker>,
    pub set_log_level: Arc<dyn Fn(LogLevel) -> Result<()> + Send + Sync>,
    pub current_log_level: Arc<RwLock<LogLevel>>,
}

fn is_disconnect(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>().is_some_and(|io| {
        matches!(io.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset)
    })
}

pub async fn start<P: AsRef<Path>>(path: P, h: IpcHandles) -> Result<()> {
    let path_ref = path.as_ref();
    let _ = std::fs::remove_file(path_ref);
    let listener = UnixListener::bind(path_ref)?;
    let _ = std::fs::set_permissions(path_ref, std::fs::Permissions::from_mode(0o666));
    tracing::debug!(target: "geotrack::ipc", "IPC listening at {:?}", path_ref);

    loop {
        let (stream, _) = listener.accept().await?;
        let hc = h.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, hc).await {
                if is_disconnect(&e) {
                    tracing::debug!(target: "geotrack::ipc", "client went away: {}", e);
                } else {
                    tracing::warn!(target: "geotrack::ipc", "client error: {:?}", e);
                }
            }
        });
    }
}

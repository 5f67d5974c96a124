use crate::daemon::ipc::GREETING;
use crate::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub struct IpcClient {
    socket_path: String,
}

impl IpcClient {
    pub fn with_path(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub async fn send(&self, command: &str) -> Result<String> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .context("Failed to connect to daemon. Is it running?")?;

        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.shutdown().await?;

        let mut response = String::new();
        stream.read_to_string(&mut response).await?;

        let body = response
            .strip_prefix(GREETING)
            .map(|rest| rest.trim_start_matches(['\r', '\n']))
            .unwrap_or(&response);
        Ok(body.trim().to_string())
    }

    /// Connects and waits for the daemon's greeting before hanging up.
    pub async fn is_alive(&self) -> bool {
        let Ok(stream) = UnixStream::connect(&self.socket_path).await else {
            return false;
        };
        let mut greeting = String::new();
        match BufReader::new(stream).read_line(&mut greeting).await {
            Ok(_) => greeting.trim_end() == GREETING,
            Err(_) => false,
        }
    }

    pub async fn ping(&self) -> Result<bool> {
        match self.send("PING").await {
            Ok(resp) => Ok(resp.contains("PONG")),
            Err(_) => Ok(false),
        }
    }
}

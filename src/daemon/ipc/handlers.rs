use super::commands::Command;
use super::server::IpcHandles;
use crate::common::format_component;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

pub const GREETING: &str = "OK GEOTRACK IPC";
const MAX_LINE: usize = 256;

const HELP: &str = "CMDS:
        - HELP | ?
        - STATUS
        - TOGGLE | START | STOP
        - PERMISSION
        - FETCH
        - DELETE
        - SETLOG <DEBUG|INFO|WARN|ERROR>
        - GETPID
        - PING
        - QUIT
 ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Close,
}

/// Runs one command line against the daemon and produces the reply text.
pub async fn execute(line: &str, h: &IpcHandles) -> Reply {
    let s = line.trim();
    if s.len() > MAX_LINE {
        return Reply::Text("ERR input too long\n".into());
    }

    let resp = match s.parse::<Command>() {
        Ok(Command::Help) => HELP.to_string(),
        Ok(Command::Ping) => "PONG\n".into(),
        Ok(Command::Quit) => return Reply::Close,
        Ok(Command::GetPid) => format!("PID={}\n", std::process::id()),
        Ok(Command::Status) => {
            let st = h.tracker.status();
            let log_level = match h.current_log_level.read() {
                Ok(l) => l.to_upper_str().to_string(),
                Err(_) => "Unknown".to_string(),
            };
            format!(
                "TRACKING={}\nLAT={}\nLONG={}\nALERT={}\nLOG_LEVEL={}\n",
                st.tracking,
                format_component(st.latitude),
                format_component(st.longitude),
                st.alert.as_deref().unwrap_or("None"),
                log_level
            )
        }
        Ok(Command::Toggle) => match h.tracker.toggle().await {
            Ok(true) => "OK STARTED\n".into(),
            Ok(false) => "OK STOPPED\n".into(),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::Start) => match h.tracker.start().await {
            Ok(()) => "OK STARTED\n".into(),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::Stop) => match h.tracker.stop() {
            Ok(()) => "OK STOPPED\n".into(),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::Permission) => match h.tracker.request_permission().await {
            Ok(()) => "OK GRANTED\n".into(),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::Fetch) => match h.tracker.fetch_locations().await {
            Ok(payload) => format!("{}\n", payload),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::Delete) => match h.tracker.delete_locations().await {
            Ok(payload) => format!("OK DELETED {}\n", payload),
            Err(e) => format!("ERR {}\n", e),
        },
        Ok(Command::SetLog(lvl)) => match (h.set_log_level)(lvl) {
            Ok(()) => {
                if let Ok(mut l) = h.current_log_level.write() {
                    *l = lvl;
                }
                format!("OK SET_LOG {}\n", lvl.to_upper_str())
            }
            Err(e) => format!("ERR SET_LOG {:?}\n", e),
        },
        Err(e) => format!("ERR {}\n", e),
    };
    Reply::Text(resp)
}

/// Handle a single IPC client connection.
pub async fn handle_client(stream: UnixStream, h: IpcHandles) -> Result<()> {
    let (r, mut w) = stream.into_split();
    let mut reader = BufReader::new(r);
    let mut line = String::new();
    w.write_all(format!("{}\n", GREETING).as_bytes()).await?;

    while reader.read_line(&mut line).await? > 0 {
        debug!(target: "geotrack::ipc", "Command: {}", line.trim());
        match execute(&line, &h).await {
            Reply::Close => {
                w.write_all(b"BYE\n").await?;
                break;
            }
            Reply::Text(resp) => {
                if !resp.is_empty() {
                    w.write_all(resp.as_bytes()).await?;
                }
            }
        }
        line.clear();
    }
    Ok(())
}

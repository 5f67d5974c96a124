use super::{app::*, client::IpcClient, output};
use crate::Result;
use crate::common::{self, SOCKET_PATH};
use anyhow::bail;

pub async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket.as_deref().unwrap_or(SOCKET_PATH);
    let client = IpcClient::with_path(socket);

    if !matches!(cli.command, Commands::Status) && !client.is_alive().await {
        bail!("Daemon is not running");
    }

    match cli.command {
        Commands::Status => {
            handle_status(&client).await?;
        }

        Commands::Toggle => {
            let resp = client.send("TOGGLE").await?;
            output::print_reply(&resp, "Tracking toggled")?;
        }

        Commands::Start => {
            let resp = client.send("START").await?;
            output::print_reply(&resp, "Tracking started")?;
        }

        Commands::Stop => {
            let resp = client.send("STOP").await?;
            output::print_reply(&resp, "Tracking stopped")?;
        }

        Commands::Permission => {
            let resp = client.send("PERMISSION").await?;
            output::print_reply(&resp, "Location permission granted")?;
        }

        Commands::Fetch => {
            let resp = client.send("FETCH").await?;
            if resp.starts_with("ERR") {
                bail!("Fetch failed: {}", resp);
            }
            println!("Stored locations:\n{}", resp);
        }

        Commands::Delete => {
            let resp = client.send("DELETE").await?;
            output::print_reply(&resp, "Locations deleted")?;
        }

        Commands::SetLog { level } => {
            let level = common::LogLevel::from(level);
            let cmd = format!("SET_LOG {}", level.to_upper_str());
            let resp = client.send(&cmd).await?;
            output::print_reply(&resp, "Log level set")?;
        }

        Commands::GetPid => {
            let resp = client.send("GET_PID").await?;
            println!("Daemon {}", resp);
        }

        Commands::Ping => {
            if client.ping().await? {
                output::print_success("Daemon is alive (PONG)");
            } else {
                bail!("Daemon not responding");
            }
        }
    }

    Ok(())
}

async fn handle_status(client: &IpcClient) -> Result<()> {
    if !client.is_alive().await {
        output::print_daemon_stopped();
        return Ok(());
    }

    let response = client.send("STATUS").await?;
    output::print_status(&response);
    Ok(())
}

use crate::Result;
use anyhow::bail;

/// Renders the daemon's `KEY=value` status lines.
pub fn format_status(response: &str) -> String {
    let mut out = String::from("       geotrack Status      \n");

    if response.is_empty() {
        out.push_str("No response from daemon\n");
        return out;
    }

    out.push_str("Daemon: Running\n\n");
    for line in response.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "TRACKING" => {
                    let icon = if value == "true" { "✓" } else { "✗" };
                    out.push_str(&format!("  {} Tracking:  {}\n", icon, value));
                }
                "LAT" => out.push_str(&format!("    Latitude:  {}\n", value)),
                "LONG" => out.push_str(&format!("    Longitude: {}\n", value)),
                "ALERT" if value != "None" => {
                    out.push_str(&format!("  ! Alert:     {}\n", value))
                }
                "LOG_LEVEL" => out.push_str(&format!("    Log level: {}\n", value)),
                _ => {}
            }
        }
    }
    out
}

pub fn print_status(response: &str) {
    println!("{}", format_status(response));
}

pub fn print_daemon_stopped() {
    println!("       geotrack Status      ");
    println!(" Daemon: Not running\n");
}

/// Prints an `OK ...` reply as success. Anything else is returned as an error.
pub fn print_reply(response: &str, success: &str) -> Result<()> {
    if !response.starts_with("OK") {
        bail!("Daemon rejected the command: {}", response);
    }
    print_success(&format!("{}: {}", success, response));
    Ok(())
}

pub fn print_success(message: &str) {
    println!(" {}", message);
}

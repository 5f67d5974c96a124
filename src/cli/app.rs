use clap::{Parser, Subcommand, ValueEnum};

use crate::common;

#[derive(Parser)]
#[command(name = "geotrackctl")]
#[command(version, about = "geotrack daemon control CLI")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[arg(short, long, global = true)]
    pub socket: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tracking state, last position and last alert
    Status,
    /// Start tracking if stopped, stop it if running
    Toggle,
    Start,
    Stop,
    /// Ask the location source for foreground and background access
    Permission,
    /// Fetch all stored locations from the server
    Fetch,
    /// Delete all stored locations on the server
    Delete,

    SetLog {
        #[arg(value_enum)]
        level: LogLevel,
    },

    GetPid,
    Ping,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for common::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["geotrackctl", "--socket", "/tmp/g.sock", "toggle"]).unwrap();
        assert!(matches!(cli.command, Commands::Toggle));
        assert_eq!(cli.socket.as_deref(), Some("/tmp/g.sock"));

        let cli = Cli::try_parse_from(["geotrackctl", "set-log", "warn"]).unwrap();
        match cli.command {
            Commands::SetLog { level } => {
                assert_eq!(common::LogLevel::from(level), common::LogLevel::Warn)
            }
            _ => panic!("expected set-log"),
        }

        assert!(Cli::try_parse_from(["geotrackctl", "upload"]).is_err());
    }
}

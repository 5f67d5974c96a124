use crate::common::LogLevel;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Toggle,
    Start,
    Stop,
    Permission,
    Fetch,
    Delete,
    SetLog(LogLevel),
    GetPid,
    Ping,
    Quit,
}

impl FromStr for Command {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let parts: Vec<&str> = upper.split_whitespace().collect();
        match parts.as_slice() {
            ["HELP"] | ["?"] => Ok(Command::Help),
            ["STATUS"] => Ok(Command::Status),
            ["TOGGLE"] => Ok(Command::Toggle),
            ["START"] => Ok(Command::Start),
            ["STOP"] => Ok(Command::Stop),
            ["PERMISSION"] | ["REQUEST_PERMISSION"] => Ok(Command::Permission),
            ["FETCH"] | ["GET_ALL_LOCATIONS"] => Ok(Command::Fetch),
            ["DELETE"] | ["DELETE_ALL_LOCATIONS"] => Ok(Command::Delete),
            ["GETPID"] | ["GET_PID"] => Ok(Command::GetPid),
            ["PING"] => Ok(Command::Ping),
            ["QUIT"] => Ok(Command::Quit),

            ["SETLOG", level] | ["SET_LOG", level] => LogLevel::from_str_ignore_case(level)
                .map(Command::SetLog)
                .ok_or("usage: SETLOG <DEBUG|INFO|WARN|ERROR>"),

            [] => Err("empty command"),
            _ => Err("unknown command (try HELP)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("STATUS".parse::<Command>(), Ok(Command::Status));
        assert_eq!("toggle".parse::<Command>(), Ok(Command::Toggle));
        assert_eq!(" fetch ".parse::<Command>(), Ok(Command::Fetch));
        assert_eq!("DELETE_ALL_LOCATIONS".parse::<Command>(), Ok(Command::Delete));
        assert_eq!("?".parse::<Command>(), Ok(Command::Help));
        assert_eq!(
            "set_log debug".parse::<Command>(),
            Ok(Command::SetLog(LogLevel::Debug))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err("empty command"));
        assert!("SET_LOG loud".parse::<Command>().is_err());
        assert!("START now".parse::<Command>().is_err());
        assert!("UPLOAD".parse::<Command>().is_err());
    }
}

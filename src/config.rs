//////////////////////////
// config.rs
//////////////////////////

use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_WS_PATH: &str = "ws";
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const USAGE: &str = "\
usage: live_chess [--bind ADDR] [--path SEGMENT] [--demo]

environment:
  LIVE_CHESS_BIND     listen address (default 127.0.0.1:8000)
  LIVE_CHESS_WS_PATH  websocket path segment (default ws)
  LIVE_CHESS_LOG      tracing filter when RUST_LOG is unset (default info)
  LIVE_CHESS_DEMO     seed two players and one game when set to 1/true";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}")]
    InvalidBind(String),

    #[error("websocket path must be a single non-empty segment, got {0:?}")]
    InvalidPath(String),

    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("unknown argument {0:?}")]
    UnknownArgument(String),

    #[error("help requested")]
    Help,
}

/// Runtime settings for the server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the websocket server listens on.
    pub bind: SocketAddr,
    /// Single path segment clients connect to, e.g. `ws` for `/ws`.
    pub ws_path: String,
    /// Fallback tracing filter when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Seed a demo game with two registered players on startup.
    pub demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            ws_path: DEFAULT_WS_PATH.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            demo: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    /// Environment values first, then command-line flags on top.
    pub fn from_sources<F, I>(lookup: F, args: I) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let bind_raw = lookup("LIVE_CHESS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let mut bind = parse_bind(&bind_raw)?;
        let mut ws_path =
            lookup("LIVE_CHESS_WS_PATH").unwrap_or_else(|| DEFAULT_WS_PATH.to_string());
        let log_filter =
            lookup("LIVE_CHESS_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let mut demo = lookup("LIVE_CHESS_DEMO")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--bind" => {
                    let v = it.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    bind = parse_bind(&v)?;
                }
                "--path" => {
                    ws_path = it.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                }
                "--demo" => demo = true,
                "-h" | "--help" => return Err(ConfigError::Help),
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
        }

        let config = ServerConfig {
            bind,
            ws_path: ws_path.trim_matches('/').to_string(),
            log_filter,
            demo,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ws_path.is_empty() || self.ws_path.contains('/') {
            return Err(ConfigError::InvalidPath(self.ws_path.clone()));
        }
        Ok(())
    }
}

fn parse_bind(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBind(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_apply_without_input() {
        let config = ServerConfig::from_sources(env(&[]), args(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn flags_override_environment() {
        let config = ServerConfig::from_sources(
            env(&[("LIVE_CHESS_BIND", "0.0.0.0:9000"), ("LIVE_CHESS_WS_PATH", "/play/")]),
            args(&["--bind", "127.0.0.1:7000", "--demo"]),
        )
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.ws_path, "play");
        assert!(config.demo);
    }

    #[test]
    fn bad_values_are_reported() {
        assert_eq!(
            ServerConfig::from_sources(env(&[("LIVE_CHESS_BIND", "nowhere")]), args(&[])),
            Err(ConfigError::InvalidBind("nowhere".to_string()))
        );
        assert_eq!(
            ServerConfig::from_sources(env(&[]), args(&["--path", "a/b"])),
            Err(ConfigError::InvalidPath("a/b".to_string()))
        );
        assert_eq!(
            ServerConfig::from_sources(env(&[]), args(&["--bind"])),
            Err(ConfigError::MissingValue("--bind".to_string()))
        );
        assert_eq!(
            ServerConfig::from_sources(env(&[]), args(&["--fast"])),
            Err(ConfigError::UnknownArgument("--fast".to_string()))
        );
    }
}

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::warn;

pub static CONFIG: Lazy<TrackerConfig> = Lazy::new(TrackerConfig::init);

pub const DEFAULT_LOG_FILTER: &str = "location_tracker=debug,tower_http=debug";

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    pub max_sessions: usize,
    pub assets_dir: PathBuf,
}

impl TrackerConfig {
    pub fn init() -> TrackerConfig {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TrackerConfig {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000);
        let max_sessions = parse_or(&lookup, "MAX_CONCURRENT_SESSIONS", 10_000);
        let assets_dir = lookup("ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("assets"));

        TrackerConfig {
            host,
            port,
            max_sessions,
            assets_dir,
        }
    }

    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

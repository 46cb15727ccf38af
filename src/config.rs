use log::warn;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const ADDR_VAR: &str = "COURSE_SCHEDULER_ADDR";
pub const TIME_LIMIT_VAR: &str = "COURSE_SCHEDULER_TIME_LIMIT";
pub const LOG_VAR: &str = "COURSE_SCHEDULER_LOG";

const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);
const DEFAULT_TIME_LIMIT_SECS: f64 = 240.0;
const DEFAULT_LOG_FILTER: &str = "info";

/// Default `env_logger` filter; `RUST_LOG` still wins when set.
pub fn log_filter() -> String {
    env::var(LOG_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string())
}

/// Runtime settings, read from the environment and then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub time_limit: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
            time_limit: Duration::from_secs_f64(DEFAULT_TIME_LIMIT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(ADDR_VAR) {
            match raw.parse() {
                Ok(addr) => config.addr = addr,
                Err(e) => warn!("ignoring {}={}: {}", ADDR_VAR, raw, e),
            }
        }
        if let Some(raw) = lookup(TIME_LIMIT_VAR) {
            match parse_time_limit(&raw) {
                Some(limit) => config.time_limit = limit,
                None => warn!("ignoring {}={}: not a positive number of seconds", TIME_LIMIT_VAR, raw),
            }
        }
        config
    }
}

pub fn parse_time_limit(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

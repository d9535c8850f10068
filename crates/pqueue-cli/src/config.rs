//! Runtime configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `PQUEUE_NAME` | `DefaultQueue` |
//! | `PQUEUE_DESCRIPTION` | demo description |
//! | `PQUEUE_CAPACITY` | `50000` |
//! | `PQUEUE_SEED_TASKS` | `10` |
//! | `HTTP_PORT` | `10000` |
//! | `NO_HTTP` | unset (HTTP enabled) |
//! | `NO_CONSOLE` | unset (console enabled) |
//! | `PQUEUE_LOG_FILE` | `pqueue.log`, `-` logs to stderr |

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_QUEUE_NAME: &str = "DefaultQueue";
pub const DEFAULT_QUEUE_DESCRIPTION: &str =
    "This queue is for demonstration of Priority Queue implementation";
pub const DEFAULT_CAPACITY: usize = 50_000;
pub const DEFAULT_SEED_TASKS: usize = 10;
pub const DEFAULT_HTTP_PORT: u16 = 10_000;
pub const DEFAULT_LOG_FILE: &str = "pqueue.log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub queue_name: String,
    pub queue_description: String,
    pub capacity: usize,
    pub seed_tasks: usize,
    pub http_port: u16,
    pub http_enabled: bool,
    pub console_enabled: bool,
    /// `None` logs to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            queue_description: DEFAULT_QUEUE_DESCRIPTION.to_string(),
            capacity: DEFAULT_CAPACITY,
            seed_tasks: DEFAULT_SEED_TASKS,
            http_port: DEFAULT_HTTP_PORT,
            http_enabled: true,
            console_enabled: true,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let capacity = parse_or("PQUEUE_CAPACITY", &lookup, defaults.capacity)?;
        if capacity == 0 {
            return Err(invalid("PQUEUE_CAPACITY", "0", "must be at least 1"));
        }

        let http_port = parse_or("HTTP_PORT", &lookup, defaults.http_port)?;
        if http_port == 0 {
            return Err(invalid("HTTP_PORT", "0", "must be 1-65535"));
        }

        let log_file = match lookup("PQUEUE_LOG_FILE") {
            Some(path) if path.trim() == "-" => None,
            Some(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            _ => defaults.log_file,
        };

        Ok(Self {
            queue_name: lookup("PQUEUE_NAME").unwrap_or(defaults.queue_name),
            queue_description: lookup("PQUEUE_DESCRIPTION").unwrap_or(defaults.queue_description),
            capacity,
            seed_tasks: parse_or("PQUEUE_SEED_TASKS", &lookup, defaults.seed_tasks)?,
            http_port,
            http_enabled: lookup("NO_HTTP").is_none(),
            console_enabled: lookup("NO_CONSOLE").is_none(),
            log_file,
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.http_port))
    }
}

fn parse_or<T>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

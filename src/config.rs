use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::blockchain::{DEFAULT_DIFFICULTY, DIFF_MAX};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: String,
        value: String,
    },
}

/// Node settings, read from the environment (and `.env`, see `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Address peers use to reach this node; never registered as a peer.
    pub node_url: String,
    pub difficulty: u32,
    pub peer_timeout: Duration,
    pub bootstrap_peers: Vec<String>,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", "a port number", DEFAULT_PORT)?;
        let node_url = lookup("NODE_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        let difficulty = parse_or(&lookup, "DIFFICULTY", "an integer", DEFAULT_DIFFICULTY)?;
        if difficulty > DIFF_MAX {
            return Err(ConfigError::Invalid {
                key: "DIFFICULTY",
                expected: format!("at most {DIFF_MAX}"),
                value: difficulty.to_string(),
            });
        }

        let timeout_secs = parse_or(
            &lookup,
            "PEER_TIMEOUT_SECS",
            "a positive integer",
            DEFAULT_PEER_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "PEER_TIMEOUT_SECS",
                expected: "a positive integer".into(),
                value: "0".into(),
            });
        }

        let bootstrap_peers = lookup("PEERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            node_url,
            difficulty,
            peer_timeout: Duration::from_secs(timeout_secs),
            bootstrap_peers,
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    key: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: expected.to_string(),
            value,
        }),
    }
}

use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

pub const ADDR_VAR: &str = "BLOCK_SCHEDULER_ADDR";
pub const TIME_LIMIT_VAR: &str = "BLOCK_SCHEDULER_TIME_LIMIT_SECS";

/// Which phases run, and for how long.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    pub time_limit_secs: u64,
    pub max_local_search_steps: u64,
    pub construction: bool,
    pub defragmentation: bool,
    pub local_search: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 30,
            max_local_search_steps: 10_000,
            construction: true,
            defragmentation: true,
            local_search: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub solver: SolverConfig,
}

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", var, raw);
            default
        }),
        Err(_) => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 8080));
        let solver = SolverConfig {
            time_limit_secs: env_or(TIME_LIMIT_VAR, SolverConfig::default().time_limit_secs),
            ..SolverConfig::default()
        };
        Self {
            addr: env_or(ADDR_VAR, default_addr),
            solver,
        }
    }
}

use std::path::PathBuf;

use crate::error::ForemanError;

/// Liveness TTL for worker strings and the master lock, in seconds.
pub(crate) const WAIT_SCAN: i64 = 60;

/// Master sleep between empty polls, in seconds.
pub(crate) const WAIT_IDLE: u64 = 3;

/// BRPOP timeout for units and the master probe. Half the liveness TTL so
/// a blocked consumer yields well before its worker string expires.
pub(crate) fn idle_time() -> f64 {
    (WAIT_SCAN as f64) / 2.0
}

/// Explicit configuration record passed to the scheduler constructors.
/// There is no process-wide state; cloning with a different `queue_name`
/// yields an independent namespace.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace segment in every Redis key (`{Q}:<queue_name>:`).
    pub queue_name: String,
    /// Cap on concurrent units per master.
    pub max_fork: u32,
    /// Jobs one unit handles before voluntary exit.
    pub max_exec: u32,
    /// Length bound on the success log.
    pub max_hist: u32,
    /// Redis connection string.
    pub redis_url: String,
    /// Binary the master spawns for unit passes.
    pub binary: PathBuf,
}

impl Config {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            queue_name: "main".to_string(),
            max_fork: 10,
            max_exec: 1000,
            max_hist: 2000,
            redis_url: redis_url.into(),
            binary: std::env::current_exe().unwrap_or_default(),
        }
    }

    /// Reads `REDIS_URL` plus the optional `FOREMAN_QUEUE`,
    /// `FOREMAN_MAX_FORK`, `FOREMAN_MAX_EXEC` and `FOREMAN_MAX_HIST`
    /// overrides. Non-positive numeric overrides keep the defaults.
    pub fn from_env() -> Result<Self, ForemanError> {
        let redis_url = std::env::var("REDIS_URL")
            .map_err(|_| ForemanError::Config("REDIS_URL is not set".to_string()))?;

        let mut config = Self::new(redis_url);
        if let Ok(name) = std::env::var("FOREMAN_QUEUE") {
            config = config.queue_name(name);
        }
        config = config
            .max_fork(env_i64("FOREMAN_MAX_FORK"))
            .max_exec(env_i64("FOREMAN_MAX_EXEC"))
            .max_hist(env_i64("FOREMAN_MAX_HIST"));

        Ok(config)
    }

    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.queue_name = name;
        }
        self
    }

    pub fn max_fork(mut self, value: i64) -> Self {
        if value > 0 {
            self.max_fork = value as u32;
        }
        self
    }

    pub fn max_exec(mut self, value: i64) -> Self {
        if value > 0 {
            self.max_exec = value as u32;
        }
        self
    }

    pub fn max_hist(mut self, value: i64) -> Self {
        if value > 0 {
            self.max_hist = value as u32;
        }
        self
    }

    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = path.into();
        self
    }
}

fn env_i64(name: &str) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

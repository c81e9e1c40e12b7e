// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration: defaults, overlaid by a TOML file, overlaid by `FOREMAN_*`
//! environment variables (`spec.md` §10).

use foreman_core::BreakerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projects_base: PathBuf,
    pub state_dir: PathBuf,
    pub concurrency_cap: usize,
    pub ring_buffer_bytes: usize,
    pub health_poll_interval_secs: u64,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
    pub sweep_interval_secs: u64,
    pub retention_secs: u64,
    pub shutdown_deadline_secs: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_open_timeout_secs: u64,
    pub error_flood_count: u32,
    pub error_flood_window_secs: u64,
    /// Program + args run for `spawn_from_template` workers (`spec.md` §6);
    /// the task text is appended as the final argument.
    pub template_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("foreman");
        Self {
            projects_base: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            state_dir,
            concurrency_cap: 24,
            ring_buffer_bytes: 512 * 1024,
            health_poll_interval_secs: 20,
            unhealthy_threshold: 3,
            healthy_threshold: 2,
            sweep_interval_secs: 300,
            retention_secs: 24 * 3600,
            shutdown_deadline_secs: 15,
            breaker_failure_threshold: 5,
            breaker_open_timeout_secs: 30,
            error_flood_count: 10,
            error_flood_window_secs: 10,
            template_command: vec!["true".to_string()],
        }
    }
}

impl Config {
    /// Load defaults, then overlay `path` if present, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            if let Ok(text) = std::fs::read_to_string(path) {
                config = toml::from_str(&text).map_err(|e| ConfigError::Toml { path: path.to_path_buf(), source: e })?;
            }
        }
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("FOREMAN_PROJECTS_BASE") {
            self.projects_base = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FOREMAN_STATE_DIR") {
            self.state_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parsed("FOREMAN_CONCURRENCY_CAP") {
            self.concurrency_cap = v;
        }
        if let Some(v) = env_parsed("FOREMAN_RING_BUFFER_BYTES") {
            self.ring_buffer_bytes = v;
        }
        if let Some(v) = env_parsed("FOREMAN_HEALTH_POLL_INTERVAL_SECS") {
            self.health_poll_interval_secs = v;
        }
        if let Some(v) = env_parsed("FOREMAN_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = v;
        }
        if let Some(v) = env_parsed("FOREMAN_RETENTION_SECS") {
            self.retention_secs = v;
        }
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_deadline_secs)
    }

    pub fn breaker_defaults(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            open_timeout: Duration::from_secs(self.breaker_open_timeout_secs),
            ..BreakerConfig::default()
        }
    }

    /// `(program, args)` split of [`Self::template_command`], falling back
    /// to a no-op command if it was configured empty.
    pub fn template_command_parts(&self) -> (String, Vec<String>) {
        let mut parts = self.template_command.clone();
        if parts.is_empty() {
            return ("true".to_string(), Vec::new());
        }
        let program = parts.remove(0);
        (program, parts)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.join("foremand.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.state_dir.join("foremand.pid")
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file {path}: {source}")]
    Toml { path: PathBuf, #[source] source: toml::de::Error },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

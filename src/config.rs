//! Gateway settings, persisted as `agentgate.json`.
//!
//! Missing file means defaults; missing fields fall back individually
//! (`#[serde(default)]`). CLI flags override the file after loading.

use crate::cli::Args;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest allowed cross-thread wait
pub const MIN_DISPATCH_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Start the HTTP gateway at all
    pub enabled: bool,
    pub port: u16,
    /// Local addresses to bind, one listener each
    pub hosts: Vec<String>,
    /// Bound on every cross-thread wait
    pub dispatch_timeout_ms: u64,
    /// Waypoint snapshot lifetime in simulation seconds
    pub waypoint_cache_ttl_secs: f64,
    pub tick_rate_hz: u32,
    /// Auto-release time for click controls
    pub click_duration_secs: f32,
    /// Larger request bodies are rejected
    pub max_body_bytes: usize,
    /// Raise the crate's log filter to debug
    pub debug_logging: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            hosts: vec!["127.0.0.1".to_string()],
            dispatch_timeout_ms: 100,
            waypoint_cache_ttl_secs: 1.0,
            tick_rate_hz: 60,
            click_duration_secs: crate::core::input::DEFAULT_CLICK_DURATION,
            max_body_bytes: 64 * 1024,
            debug_logging: false,
        }
    }
}

impl GatewayConfig {
    /// Load from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Apply CLI overrides
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.port = port;
        }
        if !args.hosts.is_empty() {
            self.hosts = args.hosts.clone();
        }
        if args.no_server {
            self.enabled = false;
        }
    }

    /// Replace out-of-range values with defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.hosts.is_empty() {
            warn!("Config has no hosts, using {:?}", defaults.hosts);
            self.hosts = defaults.hosts;
        }
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz must be positive, using {}", defaults.tick_rate_hz);
            self.tick_rate_hz = defaults.tick_rate_hz;
        }
        if self.dispatch_timeout_ms < MIN_DISPATCH_TIMEOUT_MS {
            warn!(
                "dispatch_timeout_ms {} is below {}, clamping",
                self.dispatch_timeout_ms, MIN_DISPATCH_TIMEOUT_MS
            );
            self.dispatch_timeout_ms = MIN_DISPATCH_TIMEOUT_MS;
        }
        if !self.waypoint_cache_ttl_secs.is_finite() || self.waypoint_cache_ttl_secs < 0.0 {
            self.waypoint_cache_ttl_secs = defaults.waypoint_cache_ttl_secs;
        }
        if !self.click_duration_secs.is_finite() || self.click_duration_secs < 0.0 {
            self.click_duration_secs = defaults.click_duration_secs;
        }
        self
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Fixed simulation step
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    /// `host:port` for every configured host
    pub fn bind_addrs(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| {
                if h.contains(':') && !h.starts_with('[') {
                    format!("[{}]:{}", h, self.port)
                } else {
                    format!("{}:{}", h, self.port)
                }
            })
            .collect()
    }
}

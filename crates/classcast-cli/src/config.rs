//! Configuration file support for classcast.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/classcast/config.toml` (lowest priority)
//! - Project-local: `.classcast.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use classcast_core::inference::DevicePreference;
use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model artifact settings.
    pub model: ModelConfig,
    /// Label list settings.
    pub labels: LabelsConfig,
    /// File-polling driver settings.
    pub poll: PollConfig,
    /// Redis relay settings.
    pub relay: RelayConfig,
    /// Result shaping settings.
    pub output: OutputConfig,
}

/// Model artifact configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the safetensors weights file.
    pub path: Option<PathBuf>,
    /// Path to the TOML model descriptor.
    pub config: Option<PathBuf>,
    /// Compute device: "auto", "cpu" or "cuda".
    pub device: Option<String>,
}

/// Label list configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Inline comma-separated labels, or a path to a label file.
    pub source: Option<String>,
}

/// File-polling driver configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between directory scans.
    pub interval: Option<f64>,
    /// Attempts per file before it is quarantined.
    pub max_failures: Option<u32>,
    /// Delete inputs after success instead of moving them.
    pub delete_input: Option<bool>,
    /// Pretty-print result JSON.
    pub pretty: Option<bool>,
}

/// Redis relay configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Redis host.
    pub host: Option<String>,
    /// Redis port.
    pub port: Option<u16>,
    /// Redis database index.
    pub db: Option<i64>,
    /// Channel image payloads arrive on.
    pub channel_in: Option<String>,
    /// Channel results are published to.
    pub channel_out: Option<String>,
}

/// Result shaping configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Keep only the N highest-scoring labels.
    pub top_k: Option<usize>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/classcast/config.toml`
    /// 2. Project-local: `.classcast.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load XDG config (lowest priority)
        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        // Load project-local config (higher priority, merged)
        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        // Validate merged config
        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// The configured device preference, when the value is valid.
    #[must_use]
    pub fn device_preference(&self) -> Option<DevicePreference> {
        self.model.device.as_deref().and_then(|d| d.parse().ok())
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(i) = self.poll.interval {
            if !(i.is_finite() && i > 0.0) {
                return Err(format!("poll.interval must be positive, got {i}"));
            }
        }
        if let Some(m) = self.poll.max_failures {
            if m < 1 {
                return Err(format!("poll.max_failures must be at least 1, got {m}"));
            }
        }
        if let Some(k) = self.output.top_k {
            if k < 1 {
                return Err(format!("output.top_k must be at least 1, got {k}"));
            }
        }
        if let Some(ref d) = self.model.device {
            if d.parse::<DevicePreference>().is_err() {
                return Err(format!("model.device must be auto, cpu or cuda, got '{d}'"));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // Model
        self.model.path = other.model.path.or_else(|| self.model.path.take());
        self.model.config = other.model.config.or_else(|| self.model.config.take());
        self.model.device = other.model.device.or_else(|| self.model.device.take());

        // Labels
        self.labels.source = other.labels.source.or_else(|| self.labels.source.take());

        // Poll
        self.poll.interval = other.poll.interval.or(self.poll.interval);
        self.poll.max_failures = other.poll.max_failures.or(self.poll.max_failures);
        self.poll.delete_input = other.poll.delete_input.or(self.poll.delete_input);
        self.poll.pretty = other.poll.pretty.or(self.poll.pretty);

        // Relay
        self.relay.host = other.relay.host.or_else(|| self.relay.host.take());
        self.relay.port = other.relay.port.or(self.relay.port);
        self.relay.db = other.relay.db.or(self.relay.db);
        self.relay.channel_in = other
            .relay
            .channel_in
            .or_else(|| self.relay.channel_in.take());
        self.relay.channel_out = other
            .relay
            .channel_out
            .or_else(|| self.relay.channel_out.take());

        // Output
        self.output.top_k = other.output.top_k.or(self.output.top_k);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("classcast").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.classcast.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".classcast.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

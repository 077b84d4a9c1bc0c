//! Configuration for sentinel.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SENTINEL_BASE_URL, SENTINEL_CLIENT_ID,
//!    SENTINEL_CLIENT_SECRET, SENTINEL_PORT)
//! 2. Config file (.sentinel/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .sentinel/config.yaml
//! - Falls back to ~/.sentinel/config.yaml
//!
//! The resolved configuration is passed explicitly to whatever needs it;
//! nothing here is cached process-wide.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{PollPolicy, ServiceSettings};
use crate::core::orchestrator::{DEFAULT_SIGNING_DELAY, DEFAULT_WATERMARK_LABEL};

pub const DEFAULT_PORT: u16 = 3001;

const CONFIG_DIR: &str = ".sentinel";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub service: Option<ServiceSettings>,
    #[serde(default)]
    pub polling: Option<PollPolicy>,
    #[serde(default)]
    pub signing: Option<SigningConfig>,
    #[serde(default)]
    pub watermark: Option<WatermarkConfig>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Cloud service endpoint and credentials
    pub service: ServiceSettings,
    /// Job polling budget
    pub polling: PollPolicy,
    /// Simulated signing latency in milliseconds
    pub signing_delay_ms: u64,
    /// Text stamped by the watermark operation
    pub watermark_label: String,
    /// HTTP server port
    pub server_port: u16,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            polling: PollPolicy::default(),
            signing_delay_ms: DEFAULT_SIGNING_DELAY.as_millis() as u64,
            watermark_label: DEFAULT_WATERMARK_LABEL.to_string(),
            server_port: DEFAULT_PORT,
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    pub fn signing_delay(&self) -> Duration {
        Duration::from_millis(self.signing_delay_ms)
    }
}

/// Find config file by searching `start` and its parents, then the home directory
fn find_config_file(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge file settings and environment overrides over the defaults
fn resolve<E>(file: Option<(PathBuf, ConfigFile)>, env: E) -> Result<ResolvedConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = ResolvedConfig::default();

    if let Some((path, file)) = file {
        if let Some(service) = file.service {
            config.service = service;
        }
        if let Some(polling) = file.polling {
            config.polling = polling;
        }
        if let Some(delay_ms) = file.signing.and_then(|s| s.delay_ms) {
            config.signing_delay_ms = delay_ms;
        }
        if let Some(label) = file.watermark.and_then(|w| w.label) {
            config.watermark_label = label;
        }
        if let Some(port) = file.server.and_then(|s| s.port) {
            config.server_port = port;
        }
        config.config_file = Some(path);
    }

    if let Some(base_url) = env("SENTINEL_BASE_URL") {
        config.service.base_url = base_url;
    }
    if let Some(client_id) = env("SENTINEL_CLIENT_ID") {
        config.service.client_id = client_id;
    }
    if let Some(client_secret) = env("SENTINEL_CLIENT_SECRET") {
        config.service.client_secret = client_secret;
    }
    if let Some(port) = env("SENTINEL_PORT") {
        config.server_port = port
            .parse()
            .with_context(|| format!("Invalid SENTINEL_PORT: {}", port))?;
    }

    if config.polling.max_attempts == 0 {
        anyhow::bail!("polling.max_attempts must be at least 1");
    }

    Ok(config)
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Load configuration, searching for a config file from `start` upwards
pub fn load_config_from(start: &Path) -> Result<ResolvedConfig> {
    let file = match find_config_file(start) {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    resolve(file, |key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

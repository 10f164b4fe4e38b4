//! Application configuration for the `attrcfg` binary
//!
//! Stored as JSON under the platform config dir. Precedence, lowest first:
//! built-in defaults, config file, `ATTRCFG_*` environment, CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

use crate::constants::{config, env};
use crate::types::Tenant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tenant every command runs under
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Record store file; defaults to the platform data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_tenant() -> String {
    config::DEFAULT_TENANT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            data_path: None,
            log_level: default_log_level(),
        }
    }
}

/// Parse a level name, falling back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

impl AppConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from the default location, writing a default file when missing
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, creating default config");
            let config = Self::default();
            if let Err(e) = config.save_to(&path) {
                // Read-only home dirs still get a working default
                warn!(path = %path.display(), error = %e, "Could not write default config");
            }
            return Ok(config);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Apply `ATTRCFG_TENANT` / `ATTRCFG_DATA` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tenant) = lookup(env::TENANT).filter(|t| !t.trim().is_empty()) {
            info!(tenant = %tenant, "Tenant overridden from environment");
            self.tenant = tenant;
        }
        if let Some(data) = lookup(env::DATA).filter(|d| !d.trim().is_empty()) {
            info!(path = %data, "Data path overridden from environment");
            self.data_path = Some(PathBuf::from(data));
        }
    }

    pub fn tenant(&self) -> Tenant {
        Tenant::new(self.tenant.clone())
    }

    /// Configured store path, or `<data dir>/attrcfg/store.json`
    pub fn data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(config::APP_DIR);
            path.push(config::STORE_FILENAME);
            path
        })
    }

    pub fn level(&self) -> Level {
        parse_level(&self.log_level)
    }
}

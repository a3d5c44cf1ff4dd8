use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::cbs::{CbsClient, DatasetSource, FileSource, DEFAULT_BASE_URL, DEFAULT_DATASET};

/// Dashboard configuration derived from environment variables (and `.env`).
///
/// Every variable is optional; the defaults reproduce the public deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub bind: String,
    pub port: u16,

    // ── Dataset ────────────────────────────────────────────────────
    pub dataset: String,
    pub cbs_base_url: String,
    /// Offline snapshot. Set ⇒ the network is never touched.
    pub dataset_file: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8050,
            dataset: DEFAULT_DATASET.to_string(),
            cbs_base_url: DEFAULT_BASE_URL.to_string(),
            dataset_file: None,
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            bind: env_str("ENERGY_BIND", &defaults.bind),
            port: env_u16("ENERGY_PORT", defaults.port),
            dataset: env_str("ENERGY_DATASET", &defaults.dataset),
            cbs_base_url: env_str("ENERGY_CBS_BASE_URL", &defaults.cbs_base_url),
            dataset_file: env_opt("ENERGY_DATASET_FILE").map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Snapshot file when configured, otherwise the live CBS feed
    pub fn dataset_source(&self) -> Result<Box<dyn DatasetSource + Send>> {
        Ok(match &self.dataset_file {
            Some(path) => Box::new(FileSource::new(path)),
            None => Box::new(CbsClient::new(self.cbs_base_url.clone())?),
        })
    }
}

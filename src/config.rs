use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fuzz::candidates::Method;

/// Run configuration. Every field has a default so a partial JSON file is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub methods: Vec<Method>,
    pub timeout_ms: u64,
    pub concurrency: usize,
    pub excluded_status: BTreeSet<u16>,
    pub insecure: bool,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            methods: Method::ALL.to_vec(),
            timeout_ms: 3000,
            concurrency: 50,
            excluded_status: BTreeSet::from([403, 404]),
            insecure: false,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&data)?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks everything that must hold before the first request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.methods.is_empty() {
            return Err(ConfigError::EmptyMethods);
        }
        if self.concurrency == 0 || self.concurrency > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let invalid = |reason: String| ConfigError::InvalidBaseUrl { url: self.base_url.clone(), reason };
        let parsed = url::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme `{}`", other))),
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(())
    }
}

use crate::error::{HuntError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "auth.json";

/// Section/key lookup used once, when building API clients.
pub trait ConfigSource {
    fn lookup(&self, section: &str, key: &str) -> Option<String>;
}

/// Credentials file: `{ "Censys": { "api_id": "...", "api_secret": "..." } }`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct JsonConfig {
    sections: HashMap<String, HashMap<String, String>>,
}

impl JsonConfig {
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| HuntError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    /// Missing or unreadable files yield an empty config; the clients that need
    /// credentials report their absence themselves.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(path=%path.display(), error=%e, "no usable credentials file");
                Self::default()
            }
        }
    }
}

impl ConfigSource for JsonConfig {
    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

impl ConfigSource for HashMap<(String, String), String> {
    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.get(&(section.to_string(), key.to_string())).cloned()
    }
}

//! Plain configuration consumed by the disk manager: disk name → driver kind and options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Result, StorageError};

pub const DEFAULT_DRIVER: &str = "local";

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

/// Configuration of one named disk.
///
/// Serialized as a flat object: `{"driver": "local", "path": "/srv/files", "public_url": "..."}`.
/// Everything besides `driver` lands in `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl DiskConfig {
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            options: Map::new(),
        }
    }

    pub fn local(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self::new(name, "local").with_option("path", root.into())
    }

    pub fn memory(name: impl Into<String>) -> Self {
        Self::new(name, "memory")
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// String option; empty strings count as absent.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Required string option.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.option_str(key).ok_or_else(|| {
            StorageError::missing_configuration(&self.name, format!("option '{key}' is required"))
        })
    }

    /// Permission bits given either as an integer or as an octal string such as `"0755"`.
    pub fn option_mode(&self, key: &str) -> Result<Option<u32>> {
        let invalid = |value: &Value| {
            StorageError::missing_configuration(
                &self.name,
                format!("option '{key}' is not a valid mode: {value}"),
            )
        };
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| invalid(value)),
            Some(value @ Value::String(s)) => {
                let digits = s.trim().trim_start_matches("0o");
                u32::from_str_radix(digits, 8)
                    .map(Some)
                    .map_err(|_| invalid(value))
            }
            Some(value) => Err(invalid(value)),
        }
    }

    pub fn public_url(&self) -> Option<&str> {
        self.option_str("public_url")
    }
}

/// The whole storage configuration: which disk is the default and how each disk is set up.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub disks: BTreeMap<String, DiskConfig>,
}

impl StorageConfig {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            disks: BTreeMap::new(),
        }
    }

    pub fn with_disk(mut self, config: DiskConfig) -> Self {
        self.disks.insert(config.name.clone(), config);
        self
    }

    /// Parses `{"default": "...", "disks": {"name": {"driver": "...", ...}}}`.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut config: StorageConfig = serde_json::from_str(text)?;
        config.fill_names();
        Ok(config)
    }

    /// Map keys are the source of truth for disk names.
    fn fill_names(&mut self) {
        for (name, disk) in self.disks.iter_mut() {
            disk.name = name.clone();
        }
    }
}

//! Registry of named disks.
//!
//! Each disk is either *unresolved* (only its [`DiskConfig`] is known) or *cached* (a backend
//! was built on first access and is handed out again on every later call). Reconfiguring a
//! disk with [`DiskManager::add_disk`] or calling [`DiskManager::purge`] drops cached backends,
//! so the next access rebuilds them from the current configuration.

mod config;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

pub use config::{DEFAULT_DRIVER, DiskConfig, StorageConfig};

use crate::core::{Disk, Result, StorageError};
use crate::vfs::{LocalFS, MemoryFS};

/// Builds a backend for a disk configuration. Registered through [`DiskManager::extend`].
pub type DriverConstructor = Box<dyn Fn(&DiskConfig) -> anyhow::Result<Disk>>;

/// Resolves disk names to lazily built, cached backends.
///
/// # Example
///
/// ```
/// use disk_kit::{DiskConfig, DiskManager, StorageConfig};
///
/// let config = StorageConfig::new("scratch").with_disk(DiskConfig::memory("scratch"));
/// let mut manager = DiskManager::new(config);
///
/// let disk = manager.disk(None).unwrap();
/// disk.put("hello.txt", b"Hello").unwrap();
/// assert_eq!(manager.disk(Some("scratch")).unwrap().get("hello.txt").unwrap(), b"Hello");
/// ```
pub struct DiskManager {
    default_disk: String,
    disks: BTreeMap<String, DiskConfig>,
    cache: HashMap<String, Disk>,
    constructors: HashMap<String, DriverConstructor>,
}

impl DiskManager {
    pub fn new(config: StorageConfig) -> Self {
        let StorageConfig { default, disks } = config;
        let disks = disks
            .into_iter()
            .map(|(name, mut disk)| {
                disk.name = name.clone();
                (name, disk)
            })
            .collect();
        Self {
            default_disk: default,
            disks,
            cache: HashMap::new(),
            constructors: HashMap::new(),
        }
    }

    /// Returns the backend of disk `name`, or of the default disk when `name` is `None`.
    /// The backend is built on first access and cached afterwards.
    pub fn disk(&mut self, name: Option<&str>) -> Result<Disk> {
        let name = name.unwrap_or(self.default_disk.as_str()).to_string();
        if let Some(disk) = self.cache.get(&name) {
            return Ok(Rc::clone(disk));
        }

        let config = self.disks.get(&name).ok_or_else(|| {
            StorageError::missing_configuration(&name, "disk is not configured")
        })?;
        let disk = self.build(config)?;
        log::debug!("built disk '{}' with driver '{}'", name, config.driver);

        self.cache.insert(name, Rc::clone(&disk));
        Ok(disk)
    }

    /// The default disk's backend.
    pub fn driver(&mut self) -> Result<Disk> {
        self.disk(None)
    }

    pub fn default_driver(&self) -> &str {
        &self.default_disk
    }

    pub fn set_default_driver(&mut self, name: impl Into<String>) {
        self.default_disk = name.into();
    }

    /// Registers a constructor for driver `kind`. Custom constructors win over the built-in
    /// `local` and `memory` drivers, so those can be replaced too.
    ///
    /// Cached backends are kept; call [`purge`](Self::purge) to rebuild them with the new
    /// constructor.
    pub fn extend<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&DiskConfig) -> anyhow::Result<Disk> + 'static,
    {
        let kind = kind.into();
        log::debug!("registered driver '{}'", kind);
        self.constructors.insert(kind, Box::new(constructor));
    }

    /// Adds or replaces the configuration of disk `name` and drops its cached backend.
    pub fn add_disk(&mut self, name: impl Into<String>, mut config: DiskConfig) {
        let name = name.into();
        config.name = name.clone();
        if self.cache.remove(&name).is_some() {
            log::info!("disk '{}' reconfigured, cached backend dropped", name);
        }
        self.disks.insert(name, config);
    }

    /// All configured disks by name.
    pub fn disks(&self) -> &BTreeMap<String, DiskConfig> {
        &self.disks
    }

    /// Drops every cached backend. Configurations are kept.
    pub fn purge(&mut self) {
        log::info!("purging {} cached disks", self.cache.len());
        self.cache.clear();
    }

    /// Drops the cached backend of one disk. Returns whether it was cached.
    pub fn forget(&mut self, name: &str) -> bool {
        self.cache.remove(name).is_some()
    }

    /// True once disk `name` has a cached backend.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Builds a fresh, uncached backend for `config`.
    pub fn build(&self, config: &DiskConfig) -> Result<Disk> {
        if let Some(constructor) = self.constructors.get(&config.driver) {
            return constructor(config).map_err(|source| StorageError::DriverFailed {
                disk: config.name.clone(),
                driver: config.driver.clone(),
                source,
            });
        }
        match config.driver.as_str() {
            "local" => Ok(Rc::new(LocalFS::from_config(config)?)),
            "memory" => Ok(Rc::new(MemoryFS::from_config(config)?)),
            other => Err(StorageError::UnknownDriver {
                disk: config.name.clone(),
                driver: other.to_string(),
            }),
        }
    }
}

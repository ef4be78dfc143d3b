//! Named storage disks over interchangeable backends.
//!
//! ### Overview
//!
//! `disk-kit` gives file and directory operations (read, write, copy, move, list, delete) one
//! contract, the [`FsBackend`] trait, and two implementations of it:
//! - [`LocalFS`] maps a disk onto a host directory;
//! - [`MemoryFS`] keeps files in process memory, for fast and isolated tests.
//!
//! A [`DiskManager`] holds the configuration of every named disk, builds each backend on first
//! access, caches it, and lets callers register their own driver kinds.
//!
//! **Key ideas**:
//! - **Safety**: a local disk never touches anything outside its root, whether through `..`,
//!   symlinks, or paths that do not exist yet.
//! - **Explicit wiring**: there is no global facade; callers hold a `DiskManager` or a [`Disk`].
//! - **Typed failures**: every error is a [`StorageError`] with the offending path attached.
//!
//! ### Example
//!
//! ```
//! use disk_kit::{DiskManager, StorageConfig};
//!
//! let config = StorageConfig::from_json(r#"{"default": "mem", "disks": {"mem": {"driver": "memory"}}}"#)
//!     .unwrap();
//! let mut disks = DiskManager::new(config);
//!
//! let disk = disks.disk(None).unwrap();
//! disk.put("reports/2024.csv", b"a,b\n1,2\n").unwrap();
//! assert_eq!(disk.files("reports", false).unwrap(), vec!["reports/2024.csv"]);
//! ```

mod core;
mod manager;
mod vfs;

pub use crate::core::{Disk, ErrorKind, FsBackend, Result, StorageError, utils};
pub use crate::manager::{DEFAULT_DRIVER, DiskConfig, DiskManager, DriverConstructor, StorageConfig};
pub use crate::vfs::{DEFAULT_DIRECTORY_MODE, DEFAULT_FILE_MODE, Entry, LocalFS, MemoryFS, PathResolver};

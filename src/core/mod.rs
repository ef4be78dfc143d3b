mod error;
pub mod utils;

use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use error::{ErrorKind, StorageError};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Shared handle to a backend, as handed out by the disk manager.
pub type Disk = Rc<dyn FsBackend>;

/// The operation contract every storage backend satisfies.
///
/// All paths are relative to the backend's root and use `/` (or `\`) as separator; leading
/// separators are ignored. Contents are raw bytes and never assumed to be valid UTF-8.
///
/// Backends are single-owner: receivers are `&self` so a handle can be shared, but no
/// operation is safe to run concurrently from several threads.
pub trait FsBackend {
    /// Reads the whole content of a file.
    fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Writes `contents` to `path`, replacing any previous content and creating
    /// missing parent directories.
    fn put(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Adds `data` to the end of a file, creating it when absent.
    fn append(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Adds `data` to the front of a file, creating it when absent.
    fn prepend(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Deletes a file. Never fails: any problem (including an unsafe path) yields `false`.
    fn delete(&self, path: &str) -> bool;

    /// Checks for a file or directory. Never fails: an unsafe path yields `false`.
    fn exists(&self, path: &str) -> bool;

    fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Moves a file; the source no longer exists afterwards.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Copies an external file into `directory` under a generated unique name and returns
    /// the stored relative path. Only the sanitized extension of `source` is kept.
    fn upload(&self, source: &Path, directory: &str) -> Result<String>;

    /// Returns an absolute host path holding the file content.
    ///
    /// Backends without host files (such as [`MemoryFS`](crate::MemoryFS)) write a fresh
    /// temporary copy on every call. That copy belongs to the caller, who must remove it.
    fn download(&self, path: &str) -> Result<PathBuf>;

    fn public_url(&self, path: &str) -> String;

    fn size(&self, path: &str) -> Result<u64>;

    /// Modification time in seconds since the Unix epoch.
    fn last_modified(&self, path: &str) -> Result<u64>;

    fn mime_type(&self, path: &str) -> Result<String>;

    /// Files under `directory`: direct children only, or every descendant when `recursive`.
    fn files(&self, directory: &str, recursive: bool) -> Result<Vec<String>>;

    /// Directories under `directory`: direct children only, or every descendant when `recursive`.
    fn directories(&self, directory: &str, recursive: bool) -> Result<Vec<String>>;

    /// Creates a directory and all its missing ancestors. Existing directories are fine.
    fn make_directory(&self, path: &str) -> Result<()>;

    /// Removes a directory. Returns `Ok(false)` when it is missing, or when it is not empty
    /// and `recursive` is off.
    fn delete_directory(&self, path: &str, recursive: bool) -> Result<bool>;

    fn all_files(&self, directory: &str) -> Result<Vec<String>> {
        self.files(directory, true)
    }

    fn all_directories(&self, directory: &str) -> Result<Vec<String>> {
        self.directories(directory, true)
    }

    fn missing(&self, path: &str) -> bool {
        !self.exists(path)
    }

    fn is_file(&self, path: &str) -> bool {
        self.size(path).is_ok()
    }

    fn is_directory(&self, path: &str) -> bool {
        self.exists(path) && !self.is_file(path)
    }
}

/// Prefixes `path` with `base` when a public URL base is configured.
pub(crate) fn public_url(base: Option<&str>, path: &str) -> String {
    let path = utils::to_key(path);
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
        None => path,
    }
}

//! Storage backend that keeps every file in process memory.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{FsBackend, Result, StorageError, utils};
use crate::manager::DiskConfig;
use crate::vfs::Entry;

/// A disk whose files live in a flat, ordered key table.
///
/// ### Internal state
///
/// * `files`: normalized relative key (`docs/a.txt`) → [`Entry`] with bytes and timestamp.
/// * `directories`: every directory that was created, explicitly or as the parent of a
///   written file. Like on a host filesystem, a directory outlives its last child.
///
/// Keys never start or end with `/` and the root is the empty key. `BTreeMap`/`BTreeSet`
/// keep listings sorted and deterministic.
///
/// ### Thread Safety
///
/// Interior mutability goes through `RefCell`, so a `MemoryFS` is `!Sync`; it is meant to be
/// owned by one thread, typically inside tests.
///
/// ### Example
///
/// ```
/// use disk_kit::{FsBackend, MemoryFS};
///
/// let fs = MemoryFS::new();
/// fs.put("docs/note.txt", b"Hello").unwrap();
/// assert!(fs.exists("docs"));
/// assert_eq!(fs.files("docs", false).unwrap(), vec!["docs/note.txt"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryFS {
    files: RefCell<BTreeMap<String, Entry>>,
    directories: RefCell<BTreeSet<String>>,
    public_url: Option<String>,
}

impl MemoryFS {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a disk from the optional `public_url` option.
    pub fn from_config(config: &DiskConfig) -> Result<Self> {
        let mut fs = Self::new();
        fs.public_url = config.public_url().map(str::to_string);
        Ok(fs)
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Normalized key for `path`. `..` has no meaning without a host filesystem and is
    /// rejected like the local backend does.
    fn key(path: &str) -> Result<String> {
        let key = utils::to_key(path);
        if key.split('/').any(|segment| segment == "..") {
            log::warn!("rejected '{}': parent directory component", path);
            return Err(StorageError::traversal(path, "contains '..'"));
        }
        Ok(key)
    }

    /// Key of a file to be written: not the root, and no file may sit where a directory is
    /// needed.
    fn writable_key(&self, path: &str) -> Result<String> {
        let key = Self::key(path)?;
        if key.is_empty() {
            return Err(StorageError::invalid_path(path, "empty file path"));
        }
        if self.is_dir_key(&key) {
            return Err(StorageError::write(path, "is a directory"));
        }
        self.check_ancestors(path, &key)?;
        Ok(key)
    }

    fn check_ancestors(&self, path: &str, key: &str) -> Result<()> {
        let files = self.files.borrow();
        if let Some(file) = utils::ancestor_keys(key).find(|a| files.contains_key(*a)) {
            return Err(StorageError::write(path, format!("'{file}' is a file")));
        }
        Ok(())
    }

    fn is_dir_key(&self, key: &str) -> bool {
        key.is_empty() || self.directories.borrow().contains(key)
    }

    fn add_ancestors(&self, key: &str) {
        let mut directories = self.directories.borrow_mut();
        for ancestor in utils::ancestor_keys(key) {
            directories.insert(ancestor.to_string());
        }
    }

    fn with_entry<T>(&self, path: &str, f: impl FnOnce(&Entry) -> T) -> Result<T> {
        let key = Self::key(path)?;
        self.files
            .borrow()
            .get(&key)
            .map(f)
            .ok_or_else(|| StorageError::file_not_found(path))
    }

    fn listing_dir(&self, directory: &str) -> Result<String> {
        let dir = Self::key(directory)?;
        if !self.is_dir_key(&dir) {
            return Err(StorageError::directory_not_found(directory));
        }
        Ok(dir)
    }

    fn matches(key: &str, dir: &str, recursive: bool) -> bool {
        if recursive {
            utils::is_descendant(key, dir)
        } else {
            utils::is_child(key, dir)
        }
    }

    /// Source entry and destination key shared by copy and move.
    fn transfer(
        &self,
        from: &str,
        to: &str,
        fail: impl Fn(&str, &str, String) -> StorageError,
    ) -> Result<(String, String)> {
        let source = Self::key(from)?;
        if !self.files.borrow().contains_key(&source) {
            return Err(StorageError::file_not_found(from));
        }
        let target = Self::key(to)?;
        if target.is_empty() || self.is_dir_key(&target) {
            return Err(fail(from, to, "target is a directory".to_string()));
        }
        self.check_ancestors(to, &target)
            .map_err(|e| fail(from, to, e.to_string()))?;
        Ok((source, target))
    }
}

impl FsBackend for MemoryFS {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.with_entry(path, |entry| entry.content().to_vec())
    }

    fn put(&self, path: &str, contents: &[u8]) -> Result<()> {
        let key = self.writable_key(path)?;
        self.add_ancestors(&key);
        self.files
            .borrow_mut()
            .entry(key)
            .and_modify(|entry| entry.set_content(contents))
            .or_insert_with(|| Entry::new(contents));
        Ok(())
    }

    fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = Self::key(path)?;
        if let Some(entry) = self.files.borrow_mut().get_mut(&key) {
            entry.append_content(data);
            return Ok(());
        }
        self.put(path, data)
    }

    fn prepend(&self, path: &str, data: &[u8]) -> Result<()> {
        let key = Self::key(path)?;
        if let Some(entry) = self.files.borrow_mut().get_mut(&key) {
            entry.prepend_content(data);
            return Ok(());
        }
        self.put(path, data)
    }

    fn delete(&self, path: &str) -> bool {
        match Self::key(path) {
            Ok(key) => self.files.borrow_mut().remove(&key).is_some(),
            Err(_) => false,
        }
    }

    fn exists(&self, path: &str) -> bool {
        match Self::key(path) {
            Ok(key) => self.files.borrow().contains_key(&key) || self.is_dir_key(&key),
            Err(_) => false,
        }
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let (source, target) = self.transfer(from, to, |from, to, reason| {
            StorageError::copy(from, to, reason)
        })?;
        let contents = self.files.borrow()[&source].content().to_vec();
        self.add_ancestors(&target);
        self.files.borrow_mut().insert(target, Entry::new(&contents));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (source, target) = self.transfer(from, to, |from, to, reason| {
            StorageError::moving(from, to, reason)
        })?;
        if source == target {
            return Ok(());
        }
        let mut files = self.files.borrow_mut();
        if let Some(mut entry) = files.remove(&source) {
            entry.touch();
            files.insert(target.clone(), entry);
        }
        drop(files);
        self.add_ancestors(&target);
        Ok(())
    }

    fn upload(&self, source: &Path, directory: &str) -> Result<String> {
        let source_name = source.display().to_string();
        let contents = fs::read(source).map_err(|e| StorageError::upload(&source_name, e))?;
        let original = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = utils::join_key(
            &Self::key(directory)?,
            &utils::generate_upload_name(&original),
        );
        self.put(&key, &contents)?;
        log::debug!("uploaded {} as '{}'", source_name, key);
        Ok(key)
    }

    /// Memory has no host path, so the content is written to a fresh file in the system
    /// temp directory. The caller owns that file.
    fn download(&self, path: &str) -> Result<PathBuf> {
        let contents = self.get(path)?;
        let target = std::env::temp_dir().join(format!(
            "disk-kit-{}",
            utils::generate_upload_name(path)
        ));
        fs::write(&target, contents).map_err(|e| StorageError::read(path, e))?;
        Ok(target)
    }

    fn public_url(&self, path: &str) -> String {
        crate::core::public_url(self.public_url.as_deref(), path)
    }

    fn size(&self, path: &str) -> Result<u64> {
        self.with_entry(path, Entry::len)
    }

    fn last_modified(&self, path: &str) -> Result<u64> {
        self.with_entry(path, Entry::modified)
    }

    fn mime_type(&self, path: &str) -> Result<String> {
        self.with_entry(path, |entry| utils::detect_mime_type(path, entry.content()))
    }

    fn files(&self, directory: &str, recursive: bool) -> Result<Vec<String>> {
        let dir = self.listing_dir(directory)?;
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|key| Self::matches(key, &dir, recursive))
            .cloned()
            .collect())
    }

    fn directories(&self, directory: &str, recursive: bool) -> Result<Vec<String>> {
        let dir = self.listing_dir(directory)?;
        Ok(self
            .directories
            .borrow()
            .iter()
            .filter(|key| Self::matches(key, &dir, recursive))
            .cloned()
            .collect())
    }

    fn make_directory(&self, path: &str) -> Result<()> {
        let key = Self::key(path)?;
        if key.is_empty() {
            return Ok(());
        }
        if self.files.borrow().contains_key(&key) {
            return Err(StorageError::write(path, "a file already exists there"));
        }
        self.check_ancestors(path, &key)?;
        self.add_ancestors(&key);
        self.directories.borrow_mut().insert(key);
        Ok(())
    }

    fn delete_directory(&self, path: &str, recursive: bool) -> Result<bool> {
        let key = Self::key(path)?;
        if key.is_empty() {
            return Err(StorageError::invalid_path(path, "the root cannot be removed"));
        }
        if !self.is_dir_key(&key) {
            return Ok(false);
        }

        let inside = |k: &String| k == &key || utils::is_descendant(k, &key);
        let mut files = self.files.borrow_mut();
        let mut directories = self.directories.borrow_mut();
        let has_children = files.keys().any(|k| utils::is_descendant(k, &key))
            || directories.iter().any(|k| utils::is_descendant(k, &key));
        if has_children && !recursive {
            return Ok(false);
        }

        files.retain(|k, _| !inside(k));
        directories.retain(|k| !inside(k));
        Ok(true)
    }
}

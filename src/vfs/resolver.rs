//! Maps caller-supplied relative paths onto a host root directory and proves that the result
//! stays inside it, including for paths that do not exist yet.
//!
//! ### Strategy
//! 1. Lexical validation: NUL bytes, drive prefixes and `..` components are rejected up front,
//!    `.` components and duplicate separators are dropped.
//! 2. The root is created if missing and canonicalized.
//! 3. The nearest ancestor of the candidate that exists on disk is canonicalized and must lie
//!    inside the canonical root. Components below that ancestor do not exist, so they cannot be
//!    symlinks, and `..` was already excluded.
//! 4. If that ancestor cannot be canonicalized, a separator-normalized string prefix check is
//!    used instead. A dangling symlink never gets this fallback.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::core::{Result, StorageError, utils};

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf, // host-related absolute normalized path, as configured
}

impl PathResolver {
    /// * `root` must be an absolute host path; it is normalized but not required to exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(StorageError::invalid_path("", "root path is empty"));
        }
        if root.is_relative() {
            return Err(StorageError::invalid_path(
                root.display().to_string(),
                "the root path must be absolute",
            ));
        }
        if root.exists() && !root.is_dir() {
            return Err(StorageError::invalid_path(
                root.display().to_string(),
                "the root path is not a directory",
            ));
        }
        Ok(Self {
            root: utils::normalize(root),
        })
    }

    /// Root as configured (not canonicalized).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Symlink-free absolute form of the root. Creates the root directory first if needed.
    pub fn canonical_root(&self) -> Result<PathBuf> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| {
                StorageError::write(self.root.display().to_string(), format!("cannot create root: {e}"))
            })?;
            log::info!("created disk root {}", self.root.display());
        }
        self.root.canonicalize().map_err(|e| {
            StorageError::invalid_path(
                self.root.display().to_string(),
                format!("cannot canonicalize root: {e}"),
            )
        })
    }

    /// Resolves `path` to a host path proven to be inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Self::validate(path)?;
        let canonical_root = self.canonical_root()?;

        let candidate = if relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&relative)
        };

        let existing = Self::nearest_existing(&candidate);
        let missing = candidate.strip_prefix(existing).map_err(|e| {
            StorageError::invalid_path(path, e.to_string())
        })?;

        match existing.canonicalize() {
            Ok(canonical) => {
                if !canonical.starts_with(&canonical_root) {
                    log::warn!("rejected '{}': resolves to {}", path, canonical.display());
                    return Err(StorageError::traversal(
                        path,
                        "resolves outside the disk root",
                    ));
                }
                if missing.as_os_str().is_empty() {
                    Ok(canonical)
                } else {
                    Ok(canonical.join(missing))
                }
            }
            Err(e) => {
                if Self::is_symlink(existing) {
                    log::warn!("rejected '{}': dangling symlink {}", path, existing.display());
                    return Err(StorageError::traversal(path, "dangling symlink"));
                }
                log::debug!(
                    "cannot canonicalize {} ({}), using prefix check",
                    existing.display(),
                    e
                );
                if !Self::has_prefix(&candidate, &self.root) {
                    log::warn!("rejected '{}': outside {}", path, self.root.display());
                    return Err(StorageError::traversal(
                        path,
                        "resolves outside the disk root",
                    ));
                }
                Ok(candidate)
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but only the parent is canonicalized: the last
    /// component is kept as named, so a symlink resolves to the link itself rather than its
    /// target. Used for removals. The empty path resolves to the canonical root.
    pub fn resolve_entry(&self, path: &str) -> Result<PathBuf> {
        let relative = Self::validate(path)?;
        let Some(name) = relative.file_name() else {
            return self.canonical_root();
        };
        let parent = relative
            .parent()
            .map(utils::path_to_key)
            .unwrap_or_default();
        Ok(self.resolve(&parent)?.join(name))
    }

    /// Lexical checks only; returns the cleaned relative path.
    fn validate(path: &str) -> Result<PathBuf> {
        if path.contains('\0') {
            return Err(StorageError::invalid_path(path, "contains a NUL byte"));
        }
        let key = utils::to_key(path);
        if key.split('/').any(|segment| segment == "..") {
            log::warn!("rejected '{}': parent directory component", path);
            return Err(StorageError::traversal(path, "contains '..'"));
        }
        let relative = PathBuf::from(&key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::invalid_path(path, "not a relative path"));
        }
        Ok(relative)
    }

    /// Walks upward until a path that is present on disk is found. Dangling symlinks count as
    /// present so they are never silently skipped.
    fn nearest_existing(candidate: &Path) -> &Path {
        let mut current = candidate;
        loop {
            if fs::symlink_metadata(current).is_ok() {
                return current;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    fn is_symlink(path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn has_prefix(candidate: &Path, root: &Path) -> bool {
        let candidate = Self::separator_normalized(candidate);
        let root = Self::separator_normalized(root);
        let root = root.trim_end_matches('/');
        if root.is_empty() || candidate.trim_end_matches('/') == root {
            return true;
        }
        candidate.starts_with(&format!("{root}/"))
    }

    fn separator_normalized(path: &Path) -> String {
        let text = path.to_string_lossy().replace('\\', "/");
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '/' && out.ends_with('/') {
                continue;
            }
            out.push(c);
        }
        out
    }
}

//! Storage backend that maps a disk onto a real directory of the host system.
//!
//! ### Key Features:
//! - **Isolated root**: every path goes through [`PathResolver`], so no operation can reach
//!   outside the configured root, even through symlinks or for paths that do not exist yet.
//! - **Auto-created parents**: writes create missing parent directories with the configured
//!   directory permissions and apply the configured file permissions afterwards.
//! - **Typed failures**: I/O errors are wrapped into the operation-specific [`StorageError`]
//!   variant with the system message kept as the reason.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::{FsBackend, Result, StorageError, utils};
use crate::manager::DiskConfig;
use crate::vfs::PathResolver;

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIRECTORY_MODE: u32 = 0o755;

/// Number of leading bytes inspected when sniffing a MIME type.
const MIME_SNIFF_LEN: u64 = 16;

/// A disk backed by a host directory.
///
/// ### Usage notes:
/// - Listing does not follow symlinks; they are neither reported nor descended into.
/// - Not thread-safe; the disk manager hands out single-threaded shared handles.
///
/// ### Example:
/// ```no_run
/// use disk_kit::{FsBackend, LocalFS};
///
/// let fs = LocalFS::new(std::env::temp_dir().join("my_disk")).unwrap();
/// fs.put("docs/note.txt", b"Hello").unwrap();
/// assert_eq!(fs.get("docs/note.txt").unwrap(), b"Hello");
/// assert!(fs.delete("docs/note.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct LocalFS {
    resolver: PathResolver,
    file_mode: u32,
    directory_mode: u32,
    public_url: Option<String>,
}

impl LocalFS {
    /// Creates a disk rooted at `root`, an absolute host path. A missing root is created on
    /// first use.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self {
            resolver: PathResolver::new(root)?,
            file_mode: DEFAULT_FILE_MODE,
            directory_mode: DEFAULT_DIRECTORY_MODE,
            public_url: None,
        })
    }

    /// Builds a disk from `path`, `public_url`, `file_permissions` and `directory_permissions`.
    pub fn from_config(config: &DiskConfig) -> Result<Self> {
        let root = config.require_str("path")?;
        let mut fs = Self::new(root)?;
        if let Some(mode) = config.option_mode("file_permissions")? {
            fs.file_mode = mode;
        }
        if let Some(mode) = config.option_mode("directory_permissions")? {
            fs.directory_mode = mode;
        }
        fs.public_url = config.public_url().map(str::to_string);
        Ok(fs)
    }

    pub fn with_permissions(mut self, file_mode: u32, directory_mode: u32) -> Self {
        self.file_mode = file_mode;
        self.directory_mode = directory_mode;
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let host = self.resolver.resolve(path)?;
        log::debug!("resolved '{}' to {}", path, host.display());
        Ok(host)
    }

    /// Resolves `path` and requires a regular file there.
    fn resolve_file(&self, path: &str) -> Result<PathBuf> {
        let host = self.resolve(path)?;
        if !host.is_file() {
            return Err(StorageError::file_not_found(path));
        }
        Ok(host)
    }

    /// Make directories recursively.
    /// * `path` is an absolute host path already proven to be inside the root.
    /// Returns vector of created directories.
    fn mkdir_all(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        // Looking for the first existing parent
        let mut existed_part = path.to_path_buf();
        while !existed_part.exists() {
            match existed_part.parent() {
                Some(parent) => existed_part = parent.to_path_buf(),
                None => break,
            }
        }
        if !existed_part.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists but is not a directory", existed_part.display()),
            ));
        }

        let need_to_create: Vec<_> = path
            .strip_prefix(&existed_part)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
            .components()
            .collect();

        let mut created = Vec::new();
        let mut built = existed_part;
        for component in need_to_create {
            built.push(component);
            if !built.exists() {
                fs::create_dir(&built)?;
                set_mode(&built, self.directory_mode)?;
                created.push(built.clone());
            }
        }

        Ok(created)
    }

    fn ensure_parent(&self, host: &Path) -> io::Result<()> {
        if let Some(parent) = host.parent() {
            self.mkdir_all(parent)?;
        }
        Ok(())
    }

    fn write_file(&self, path: &str, host: &Path, contents: &[u8]) -> Result<()> {
        if host.is_dir() {
            return Err(StorageError::write(path, "is a directory"));
        }
        self.ensure_parent(host)
            .and_then(|_| fs::write(host, contents))
            .and_then(|_| set_mode(host, self.file_mode))
            .map_err(|e| StorageError::write(path, e))
    }

    /// Shallow or recursive listing of either files or directories, sorted by key.
    fn list(&self, directory: &str, recursive: bool, directories: bool) -> Result<Vec<String>> {
        let host = self.resolve(directory)?;
        if !host.is_dir() {
            return Err(StorageError::directory_not_found(directory));
        }
        let root = self.resolver.canonical_root()?;
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut result = Vec::new();
        for entry in WalkDir::new(&host)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| StorageError::read(directory, e))?;
            let file_type = entry.file_type();
            let wanted = if directories {
                file_type.is_dir()
            } else {
                file_type.is_file()
            };
            if !wanted {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| StorageError::read(directory, e))?;
            result.push(utils::path_to_key(relative));
        }
        result.sort_unstable();
        Ok(result)
    }

    /// Deletes everything below `host` depth-first, then `host` itself.
    fn remove_tree(host: &Path) -> io::Result<()> {
        for entry in WalkDir::new(host).contents_first(true).follow_links(false) {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_dir() {
                fs::remove_dir(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

impl FsBackend for LocalFS {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let host = self.resolve_file(path)?;
        fs::read(&host).map_err(|e| StorageError::read(path, e))
    }

    fn put(&self, path: &str, contents: &[u8]) -> Result<()> {
        let host = self.resolve(path)?;
        self.write_file(path, &host, contents)
    }

    fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let host = self.resolve(path)?;
        if !host.is_file() {
            return self.write_file(path, &host, data);
        }
        OpenOptions::new()
            .append(true)
            .open(&host)
            .and_then(|mut file| file.write_all(data))
            .map_err(|e| StorageError::write(path, e))
    }

    fn prepend(&self, path: &str, data: &[u8]) -> Result<()> {
        let host = self.resolve(path)?;
        if !host.is_file() {
            return self.write_file(path, &host, data);
        }
        let existing = fs::read(&host).map_err(|e| StorageError::read(path, e))?;
        let mut contents = Vec::with_capacity(data.len() + existing.len());
        contents.extend_from_slice(data);
        contents.extend_from_slice(&existing);
        fs::write(&host, contents).map_err(|e| StorageError::write(path, e))
    }

    /// A symlink is removed as a link; its target is left alone.
    fn delete(&self, path: &str) -> bool {
        let host = match self.resolver.resolve_entry(path) {
            Ok(host) => host,
            Err(e) => {
                log::warn!("delete '{}' refused: {}", path, e);
                return false;
            }
        };
        match fs::symlink_metadata(&host) {
            Ok(meta) if !meta.is_dir() => {}
            _ => return false,
        }
        match fs::remove_file(&host) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("delete '{}' failed: {}", path, e);
                false
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(host) => host.exists(),
            Err(e) => {
                log::warn!("exists '{}' refused: {}", path, e);
                false
            }
        }
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve_file(from)?;
        let target = self.resolve(to)?;
        if target.is_dir() {
            return Err(StorageError::copy(from, to, "target is a directory"));
        }
        // `fs::copy` truncates the target before reading the source.
        if target == source {
            return Ok(());
        }
        self.ensure_parent(&target)
            .and_then(|_| fs::copy(&source, &target))
            .and_then(|_| set_mode(&target, self.file_mode))
            .map_err(|e| StorageError::copy(from, to, e))
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve_file(from)?;
        let target = self.resolve(to)?;
        if target.is_dir() {
            return Err(StorageError::moving(from, to, "target is a directory"));
        }
        self.ensure_parent(&target)
            .and_then(|_| fs::rename(&source, &target))
            .map_err(|e| StorageError::moving(from, to, e))
    }

    fn upload(&self, source: &Path, directory: &str) -> Result<String> {
        let source_name = source.display().to_string();
        if !source.is_file() {
            return Err(StorageError::upload(source_name, "source is not a file"));
        }
        let original = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = utils::join_key(
            &utils::to_key(directory),
            &utils::generate_upload_name(&original),
        );
        let target = self.resolve(&key)?;

        self.ensure_parent(&target)
            .and_then(|_| fs::copy(source, &target))
            .and_then(|_| set_mode(&target, self.file_mode))
            .map_err(|e| StorageError::upload(&source_name, e))?;

        log::debug!("uploaded {} as '{}'", source_name, key);
        Ok(key)
    }

    fn download(&self, path: &str) -> Result<PathBuf> {
        let host = self.resolve_file(path)?;
        host.canonicalize().map_err(|e| StorageError::read(path, e))
    }

    fn public_url(&self, path: &str) -> String {
        crate::core::public_url(self.public_url.as_deref(), path)
    }

    fn size(&self, path: &str) -> Result<u64> {
        let host = self.resolve_file(path)?;
        fs::metadata(&host)
            .map(|meta| meta.len())
            .map_err(|e| StorageError::read(path, e))
    }

    fn last_modified(&self, path: &str) -> Result<u64> {
        let host = self.resolve_file(path)?;
        fs::metadata(&host)
            .and_then(|meta| meta.modified())
            .map(utils::unix_timestamp)
            .map_err(|e| StorageError::read(path, e))
    }

    fn mime_type(&self, path: &str) -> Result<String> {
        let host = self.resolve_file(path)?;
        let mut head = Vec::new();
        fs::File::open(&host)
            .and_then(|file| file.take(MIME_SNIFF_LEN).read_to_end(&mut head))
            .map_err(|e| StorageError::read(path, e))?;
        Ok(utils::detect_mime_type(path, &head))
    }

    fn files(&self, directory: &str, recursive: bool) -> Result<Vec<String>> {
        self.list(directory, recursive, false)
    }

    fn directories(&self, directory: &str, recursive: bool) -> Result<Vec<String>> {
        self.list(directory, recursive, true)
    }

    fn make_directory(&self, path: &str) -> Result<()> {
        let host = self.resolve(path)?;
        if host.exists() && !host.is_dir() {
            return Err(StorageError::write(path, "a file already exists there"));
        }
        let created = self
            .mkdir_all(&host)
            .map_err(|e| StorageError::write(path, e))?;
        log::debug!("created {} directories for '{}'", created.len(), path);
        Ok(())
    }

    /// A symlink to a directory is removed as a link, whatever the link points at.
    fn delete_directory(&self, path: &str, recursive: bool) -> Result<bool> {
        let host = self.resolver.resolve_entry(path)?;
        if host == self.resolver.canonical_root()? {
            return Err(StorageError::invalid_path(path, "the root cannot be removed"));
        }
        let meta = match fs::symlink_metadata(&host) {
            Ok(meta) => meta,
            Err(_) => return Ok(false),
        };
        if meta.file_type().is_symlink() {
            if !host.is_dir() {
                return Ok(false);
            }
            return fs::remove_file(&host)
                .map(|_| true)
                .map_err(|e| StorageError::delete(path, e));
        }
        if !meta.is_dir() {
            return Ok(false);
        }

        let result = if recursive {
            Self::remove_tree(&host)
        } else {
            let is_empty = fs::read_dir(&host)
                .map_err(|e| StorageError::read(path, e))?
                .next()
                .is_none();
            if !is_empty {
                return Ok(false);
            }
            fs::remove_dir(&host)
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) => Err(StorageError::delete(path, e)),
        }
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn setup_test_env() -> TempDir {
        TempDir::new("localfs_test").unwrap()
    }

    fn setup_fs(temp_dir: &TempDir) -> LocalFS {
        LocalFS::new(temp_dir.path()).unwrap()
    }

    mod creations {
        use super::*;

        #[test]
        fn test_new_does_not_touch_disk_until_used() {
            let temp_dir = setup_test_env();
            let root = temp_dir.path().join("a/b/c");

            let fs = LocalFS::new(&root).unwrap();
            assert_eq!(fs.root(), root);
            assert!(!root.exists());

            fs.put("x.txt", b"x").unwrap();
            assert!(root.join("x.txt").is_file());
        }

        #[test]
        fn test_new_root_is_file() {
            let temp_dir = setup_test_env();
            let file_path = temp_dir.path().join("file.txt");
            std::fs::write(&file_path, "content").unwrap();

            assert!(LocalFS::new(&file_path).is_err());
        }

        #[test]
        fn test_new_empty_or_relative_path() {
            assert!(LocalFS::new("").unwrap_err().is_invalid_path());
            assert!(LocalFS::new("relative").unwrap_err().is_invalid_path());
        }

        #[test]
        fn test_from_config() {
            let temp_dir = setup_test_env();
            let config = DiskConfig::local("files", temp_dir.path().to_string_lossy())
                .with_option("public_url", "https://cdn.test/files/")
                .with_option("file_permissions", "0600")
                .with_option("directory_permissions", 0o700);

            let fs = LocalFS::from_config(&config).unwrap();
            assert_eq!(fs.file_mode, 0o600);
            assert_eq!(fs.directory_mode, 0o700);
            assert_eq!(fs.public_url("a/b.txt"), "https://cdn.test/files/a/b.txt");
        }

        #[test]
        fn test_from_config_requires_path() {
            let config = DiskConfig::new("files", "local");
            let err = LocalFS::from_config(&config).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::MissingConfiguration);
        }
    }

    mod read_write {
        use super::*;

        #[test]
        fn test_put_get_round_trip() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            let bytes: Vec<u8> = (0..=255).collect();
            fs.put("bin/all.bytes", &bytes)?;

            assert_eq!(fs.get("bin/all.bytes")?, bytes);
            assert_eq!(fs.size("bin/all.bytes")?, 256);
            assert!(temp_dir.path().join("bin").is_dir());
            Ok(())
        }

        #[test]
        fn test_put_overwrites() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"first")?;
            fs.put("a.txt", b"2")?;
            assert_eq!(fs.get("a.txt")?, b"2");
            Ok(())
        }

        #[test]
        fn test_put_onto_directory_fails() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.make_directory("docs")?;
            let err = fs.put("docs", b"x").unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::WriteFailed);
            Ok(())
        }

        #[test]
        fn test_get_missing_and_directory() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);
            fs.make_directory("docs")?;

            assert_eq!(fs.get("nope.txt").unwrap_err().kind(), crate::ErrorKind::FileNotFound);
            assert_eq!(fs.get("docs").unwrap_err().kind(), crate::ErrorKind::FileNotFound);
            Ok(())
        }

        #[test]
        fn test_append_prepend_ordering() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("log.txt", b"Middle")?;
            fs.prepend("log.txt", b"Start-")?;
            fs.append("log.txt", b"-End")?;
            assert_eq!(fs.get("log.txt")?, b"Start-Middle-End");
            Ok(())
        }

        #[test]
        fn test_append_prepend_create_missing() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.append("new/a.txt", b"tail")?;
            fs.prepend("new/b.txt", b"head")?;
            assert_eq!(fs.get("new/a.txt")?, b"tail");
            assert_eq!(fs.get("new/b.txt")?, b"head");
            Ok(())
        }

        #[cfg(unix)]
        #[test]
        fn test_permissions_applied() -> Result<()> {
            use std::os::unix::fs::PermissionsExt;

            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir).with_permissions(0o600, 0o700);

            fs.put("private/secret.txt", b"s")?;
            let file_mode = std::fs::metadata(temp_dir.path().join("private/secret.txt"))
                .unwrap()
                .permissions()
                .mode();
            let dir_mode = std::fs::metadata(temp_dir.path().join("private"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(file_mode & 0o777, 0o600);
            assert_eq!(dir_mode & 0o777, 0o700);
            Ok(())
        }
    }

    mod metadata {
        use super::*;

        #[test]
        fn test_size_last_modified_mime() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("doc.pdf", b"%PDF-1.4 body")?;
            fs.put("notes.txt", b"plain")?;

            assert_eq!(fs.size("doc.pdf")?, 13);
            assert!(fs.last_modified("doc.pdf")? > 0);
            assert_eq!(fs.mime_type("doc.pdf")?, "application/pdf");
            assert_eq!(fs.mime_type("notes.txt")?, "text/plain");
            assert!(fs.mime_type("missing.txt").unwrap_err().is_not_found());
            Ok(())
        }

        #[test]
        fn test_download_returns_canonical_path() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("d/file.txt", b"abc")?;
            let host = fs.download("d/file.txt")?;
            assert!(host.is_absolute());
            assert_eq!(host, temp_dir.path().join("d/file.txt").canonicalize().unwrap());
            assert_eq!(std::fs::read(host).unwrap(), b"abc");
            Ok(())
        }

        #[test]
        fn test_public_url_without_prefix() {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);
            assert_eq!(fs.public_url("/a/b.txt"), "a/b.txt");
        }
    }

    mod exists_delete {
        use super::*;

        #[test]
        fn test_exists_files_and_directories() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("d/a.txt", b"a")?;
            assert!(fs.exists("d/a.txt"));
            assert!(fs.exists("d"));
            assert!(fs.exists(""));
            assert!(!fs.exists("d/b.txt"));
            assert!(fs.missing("d/b.txt"));
            assert!(fs.is_file("d/a.txt"));
            assert!(fs.is_directory("d"));
            Ok(())
        }

        #[test]
        fn test_delete() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"a")?;
            fs.make_directory("dir")?;
            assert!(fs.delete("a.txt"));
            assert!(!fs.exists("a.txt"));
            assert!(!fs.delete("a.txt"));
            assert!(!fs.delete("dir"));
            assert!(fs.exists("dir"));
            Ok(())
        }

        #[cfg(unix)]
        #[test]
        fn test_delete_symlink_keeps_target() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("real.txt", b"real")?;
            std::os::unix::fs::symlink(
                temp_dir.path().join("real.txt"),
                temp_dir.path().join("alias.txt"),
            )
            .unwrap();

            assert!(fs.delete("alias.txt"));
            assert!(std::fs::symlink_metadata(temp_dir.path().join("alias.txt")).is_err());
            assert_eq!(fs.get("real.txt")?, b"real");
            Ok(())
        }
    }

    mod copy_move {
        use super::*;

        #[test]
        fn test_copy_keeps_source() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"payload")?;
            fs.copy("a.txt", "nested/dir/b.txt")?;
            assert_eq!(fs.get("a.txt")?, b"payload");
            assert_eq!(fs.get("nested/dir/b.txt")?, b"payload");
            Ok(())
        }

        #[test]
        fn test_move_removes_source() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"payload")?;
            fs.rename("a.txt", "moved/a.txt")?;
            assert!(!fs.exists("a.txt"));
            assert_eq!(fs.get("moved/a.txt")?, b"payload");
            Ok(())
        }

        #[test]
        fn test_copy_move_missing_source() {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            assert!(fs.copy("nope", "b").unwrap_err().is_not_found());
            assert!(fs.rename("nope", "b").unwrap_err().is_not_found());
        }

        #[test]
        fn test_copy_onto_directory_fails() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"a")?;
            fs.make_directory("dir")?;
            assert_eq!(fs.copy("a.txt", "dir").unwrap_err().kind(), crate::ErrorKind::CopyFailed);
            assert_eq!(fs.rename("a.txt", "dir").unwrap_err().kind(), crate::ErrorKind::MoveFailed);
            Ok(())
        }

        #[test]
        fn test_copy_and_move_onto_itself() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a.txt", b"payload")?;
            fs.copy("a.txt", "a.txt")?;
            assert_eq!(fs.get("a.txt")?, b"payload");
            fs.copy("a.txt", "./a.txt")?;
            assert_eq!(fs.get("a.txt")?, b"payload");
            fs.rename("a.txt", "a.txt")?;
            assert_eq!(fs.get("a.txt")?, b"payload");
            Ok(())
        }
    }

    mod upload {
        use super::*;

        #[test]
        fn test_upload_generates_name() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = LocalFS::new(temp_dir.path().join("disk"))?;
            let source = temp_dir.path().join("Holiday Photo.JPG");
            std::fs::write(&source, b"\xFF\xD8\xFFimage").unwrap();

            let first = fs.upload(&source, "photos")?;
            let second = fs.upload(&source, "/photos/")?;

            assert_ne!(first, second);
            assert!(first.starts_with("photos/"));
            assert!(first.ends_with(".jpg"));
            assert!(!first.contains("Holiday"));
            assert_eq!(fs.get(&first)?, b"\xFF\xD8\xFFimage");
            assert_eq!(fs.mime_type(&first)?, "image/jpeg");
            Ok(())
        }

        #[test]
        fn test_upload_into_root_and_missing_source() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = LocalFS::new(temp_dir.path().join("disk"))?;
            let source = temp_dir.path().join("noext");
            std::fs::write(&source, b"x").unwrap();

            let key = fs.upload(&source, "")?;
            assert!(!key.contains('/'));
            assert!(fs.exists(&key));

            let err = fs.upload(&temp_dir.path().join("absent.txt"), "").unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::UploadFailed);
            Ok(())
        }

        #[test]
        fn test_upload_rejects_traversal_directory() {
            let temp_dir = setup_test_env();
            let fs = LocalFS::new(temp_dir.path().join("disk")).unwrap();
            let source = temp_dir.path().join("a.txt");
            std::fs::write(&source, b"x").unwrap();

            assert!(fs.upload(&source, "../escape").unwrap_err().is_traversal());
            assert!(!temp_dir.path().join("escape").exists());
        }
    }

    mod listing {
        use super::*;

        fn setup_tree(fs: &LocalFS) -> Result<()> {
            fs.put("a.txt", b"a")?;
            fs.put("d1/b.txt", b"b")?;
            fs.put("d1/d2/c.txt", b"c")?;
            Ok(())
        }

        #[test]
        fn test_files_shallow_and_recursive() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);
            setup_tree(&fs)?;

            assert_eq!(fs.files("", false)?, vec!["a.txt"]);
            assert_eq!(fs.files("d1", false)?, vec!["d1/b.txt"]);
            assert_eq!(fs.files("/d1/", false)?, vec!["d1/b.txt"]);
            assert_eq!(
                fs.files("", true)?,
                vec!["a.txt", "d1/b.txt", "d1/d2/c.txt"]
            );
            assert_eq!(fs.all_files("d1")?, vec!["d1/b.txt", "d1/d2/c.txt"]);
            Ok(())
        }

        #[test]
        fn test_directories_shallow_and_recursive() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);
            setup_tree(&fs)?;
            fs.make_directory("empty")?;

            assert_eq!(fs.directories("", false)?, vec!["d1", "empty"]);
            assert_eq!(fs.directories("", true)?, vec!["d1", "d1/d2", "empty"]);
            assert_eq!(fs.all_directories("d1")?, vec!["d1/d2"]);
            Ok(())
        }

        #[test]
        fn test_listing_sorted_by_key() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);
            fs.put("d1/x.txt", b"x")?;
            fs.put("d1-a/x.txt", b"x")?;

            assert_eq!(fs.files("", true)?, vec!["d1-a/x.txt", "d1/x.txt"]);
            assert_eq!(fs.directories("", true)?, vec!["d1", "d1-a"]);
            Ok(())
        }

        #[test]
        fn test_listing_missing_directory() {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            let err = fs.files("nope", false).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::DirectoryNotFound);
        }

        #[cfg(unix)]
        #[test]
        fn test_listing_skips_symlinks() -> Result<()> {
            let temp_dir = setup_test_env();
            let root = temp_dir.path().join("root");
            let outside = temp_dir.path().join("outside");
            std::fs::create_dir_all(&outside).unwrap();
            std::fs::write(outside.join("secret.txt"), b"s").unwrap();

            let fs = LocalFS::new(&root)?;
            fs.put("a.txt", b"a")?;
            std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

            assert_eq!(fs.files("", true)?, vec!["a.txt"]);
            assert!(fs.directories("", true)?.is_empty());
            Ok(())
        }
    }

    mod directories {
        use super::*;

        #[test]
        fn test_make_directory_nested_and_idempotent() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.make_directory("a/b/c")?;
            fs.make_directory("a/b/c")?;
            assert!(temp_dir.path().join("a/b/c").is_dir());
            Ok(())
        }

        #[test]
        fn test_make_directory_over_file_fails() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("a", b"file")?;
            assert_eq!(fs.make_directory("a").unwrap_err().kind(), crate::ErrorKind::WriteFailed);
            assert_eq!(fs.make_directory("a/b").unwrap_err().kind(), crate::ErrorKind::WriteFailed);
            Ok(())
        }

        #[test]
        fn test_delete_directory_emptiness_rule() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("d1/b.txt", b"b")?;
            fs.put("d1/d2/c.txt", b"c")?;
            fs.make_directory("empty")?;

            assert!(!fs.delete_directory("d1", false)?);
            assert!(fs.exists("d1/d2/c.txt"));

            assert!(fs.delete_directory("empty", false)?);
            assert!(!fs.exists("empty"));

            assert!(fs.delete_directory("d1", true)?);
            assert!(!fs.exists("d1"));
            assert!(!fs.delete_directory("d1", true)?);
            Ok(())
        }

        #[test]
        fn test_delete_directory_root_and_traversal() {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            assert!(fs.delete_directory("", true).unwrap_err().is_invalid_path());
            assert!(fs.delete_directory("..", true).unwrap_err().is_traversal());
            assert!(temp_dir.path().exists());
        }

        #[cfg(unix)]
        #[test]
        fn test_delete_directory_symlink_keeps_target() -> Result<()> {
            let temp_dir = setup_test_env();
            let fs = setup_fs(&temp_dir);

            fs.put("real/keep.txt", b"keep")?;
            std::os::unix::fs::symlink(
                temp_dir.path().join("real"),
                temp_dir.path().join("alias"),
            )
            .unwrap();

            assert!(fs.delete_directory("alias", true)?);
            assert!(std::fs::symlink_metadata(temp_dir.path().join("alias")).is_err());
            assert_eq!(fs.get("real/keep.txt")?, b"keep");
            Ok(())
        }
    }

    mod traversal {
        use super::*;

        const ATTACKS: [&str; 4] = ["../outside.txt", "a/../../outside.txt", "..", "/../outside.txt"];

        #[test]
        fn test_traversal_rejected_everywhere() {
            let temp_dir = setup_test_env();
            let root = temp_dir.path().join("root");
            let fs = LocalFS::new(&root).unwrap();
            fs.put("inside.txt", b"in").unwrap();
            std::fs::write(temp_dir.path().join("outside.txt"), b"out").unwrap();

            for attack in ATTACKS {
                assert!(fs.get(attack).unwrap_err().is_traversal(), "get {attack}");
                assert!(fs.put(attack, b"x").unwrap_err().is_traversal(), "put {attack}");
                assert!(fs.append(attack, b"x").unwrap_err().is_traversal());
                assert!(fs.prepend(attack, b"x").unwrap_err().is_traversal());
                assert!(fs.copy("inside.txt", attack).unwrap_err().is_traversal());
                assert!(fs.copy(attack, "copy.txt").unwrap_err().is_traversal());
                assert!(fs.rename(attack, "moved.txt").unwrap_err().is_traversal());
                assert!(fs.size(attack).unwrap_err().is_traversal());
                assert!(fs.last_modified(attack).unwrap_err().is_traversal());
                assert!(fs.mime_type(attack).unwrap_err().is_traversal());
                assert!(fs.download(attack).unwrap_err().is_traversal());
                assert!(fs.files(attack, true).unwrap_err().is_traversal());
                assert!(fs.directories(attack, true).unwrap_err().is_traversal());
                assert!(fs.make_directory(attack).unwrap_err().is_traversal());
                assert!(!fs.exists(attack));
                assert!(!fs.delete(attack));
            }

            assert_eq!(std::fs::read(temp_dir.path().join("outside.txt")).unwrap(), b"out");
            assert!(fs.exists("inside.txt"));
        }

        #[cfg(unix)]
        #[test]
        fn test_symlink_escape_rejected() {
            let temp_dir = setup_test_env();
            let root = temp_dir.path().join("root");
            let outside = temp_dir.path().join("outside");
            std::fs::create_dir_all(&root).unwrap();
            std::fs::create_dir_all(&outside).unwrap();
            std::fs::write(outside.join("secret.txt"), b"secret").unwrap();
            std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

            let fs = LocalFS::new(&root).unwrap();
            assert!(fs.get("link/secret.txt").unwrap_err().is_traversal());
            assert!(fs.put("link/new.txt", b"x").unwrap_err().is_traversal());
            assert!(!fs.exists("link/secret.txt"));
            assert!(!fs.delete("link/secret.txt"));
            assert!(outside.join("secret.txt").exists());
            assert!(!outside.join("new.txt").exists());
        }
    }
}

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Separators accepted in caller-supplied paths. Both are folded into `/`.
pub const SEPARATORS: [char; 2] = ['/', '\\'];

/// Lexically normalizes a path: drops `.` components and resolves `..` against what is already
/// collected (never climbing above the first component).
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(parent) = result.parent() {
                    result = parent.to_path_buf();
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Canonical storage key: separators folded to `/`, empty and `.` segments removed,
/// surrounding separators trimmed. `..` segments are preserved for the caller to reject.
pub fn to_key(path: &str) -> String {
    path.split(SEPARATORS)
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins a directory key and a child name.
pub fn join_key(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent key of `key`, `""` for top-level entries.
pub fn parent_key(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => "",
    }
}

/// Every strict ancestor of `key`, nearest first, excluding the root.
pub fn ancestor_keys(key: &str) -> impl Iterator<Item = &str> {
    let mut current = key;
    std::iter::from_fn(move || {
        let parent = parent_key(current);
        if parent.is_empty() {
            return None;
        }
        current = parent;
        Some(parent)
    })
}

/// True if `key` lies strictly inside `dir` (`dir == ""` is the root).
pub fn is_descendant(key: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return !key.is_empty();
    }
    key.len() > dir.len() && key.starts_with(dir) && key.as_bytes()[dir.len()] == b'/'
}

/// True if `key` is a direct child of `dir`.
pub fn is_child(key: &str, dir: &str) -> bool {
    is_descendant(key, dir) && parent_key(key) == dir
}

/// Renders a relative filesystem path as a `/`-separated key.
pub fn path_to_key(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lowercase, ASCII-alphanumeric-only extension of `file_name`; `None` when nothing survives.
pub fn sanitize_extension(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(SEPARATORS).next().unwrap_or(file_name);
    let (_, ext) = name.rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ext.is_empty() { None } else { Some(ext) }
}

/// Collision-free file name for uploaded content, keeping only a sanitized extension.
pub fn generate_upload_name(original: &str) -> String {
    let stem = uuid::Uuid::new_v4().simple().to_string();
    match sanitize_extension(original) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Seconds since the Unix epoch; times before the epoch clamp to zero.
pub fn unix_timestamp(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Detects a MIME type from magic bytes first, then from the file extension.
pub fn detect_mime_type(file_name: &str, data: &[u8]) -> String {
    if let Some(mime) = sniff_magic(data) {
        return mime.to_string();
    }
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

fn sniff_magic(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if data.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    if data.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Some("application/zip");
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    None
}

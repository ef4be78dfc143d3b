//! Error taxonomy shared by every backend and by the disk manager.

use std::fmt;

/// Coarse classification of a [`StorageError`], handy for matching without destructuring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    MissingConfiguration,
    InvalidPath,
    PathTraversal,
    FileNotFound,
    DirectoryNotFound,
    UploadFailed,
    WriteFailed,
    ReadFailed,
    DeleteFailed,
    CopyFailed,
    MoveFailed,
    UnknownDriver,
    DriverFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Every failure a disk operation or the manager can report.
///
/// Variants carry the offending path (or disk name) and an optional reason. For I/O failures the
/// reason is the system error message.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("missing configuration for disk '{disk}'{}", suffix(.reason))]
    MissingConfiguration {
        disk: String,
        reason: Option<String>,
    },

    #[error("invalid path '{path}'{}", suffix(.reason))]
    InvalidPath {
        path: String,
        reason: Option<String>,
    },

    #[error("path traversal detected for '{path}'{}", suffix(.reason))]
    PathTraversal {
        path: String,
        reason: Option<String>,
    },

    #[error("file not found: '{path}'{}", suffix(.reason))]
    FileNotFound {
        path: String,
        reason: Option<String>,
    },

    #[error("directory not found: '{path}'{}", suffix(.reason))]
    DirectoryNotFound {
        path: String,
        reason: Option<String>,
    },

    #[error("unable to upload '{path}'{}", suffix(.reason))]
    UploadFailed {
        path: String,
        reason: Option<String>,
    },

    #[error("unable to write '{path}'{}", suffix(.reason))]
    WriteFailed {
        path: String,
        reason: Option<String>,
    },

    #[error("unable to read '{path}'{}", suffix(.reason))]
    ReadFailed {
        path: String,
        reason: Option<String>,
    },

    #[error("unable to delete '{path}'{}", suffix(.reason))]
    DeleteFailed {
        path: String,
        reason: Option<String>,
    },

    #[error("unable to copy '{from}' to '{to}'{}", suffix(.reason))]
    CopyFailed {
        from: String,
        to: String,
        reason: Option<String>,
    },

    #[error("unable to move '{from}' to '{to}'{}", suffix(.reason))]
    MoveFailed {
        from: String,
        to: String,
        reason: Option<String>,
    },

    #[error("disk '{disk}' uses unknown driver '{driver}'")]
    UnknownDriver { disk: String, driver: String },

    #[error("driver '{driver}' failed to build disk '{disk}'")]
    DriverFailed {
        disk: String,
        driver: String,
        #[source]
        source: anyhow::Error,
    },
}

fn suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingConfiguration { .. } => ErrorKind::MissingConfiguration,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::DirectoryNotFound { .. } => ErrorKind::DirectoryNotFound,
            Self::UploadFailed { .. } => ErrorKind::UploadFailed,
            Self::WriteFailed { .. } => ErrorKind::WriteFailed,
            Self::ReadFailed { .. } => ErrorKind::ReadFailed,
            Self::DeleteFailed { .. } => ErrorKind::DeleteFailed,
            Self::CopyFailed { .. } => ErrorKind::CopyFailed,
            Self::MoveFailed { .. } => ErrorKind::MoveFailed,
            Self::UnknownDriver { .. } => ErrorKind::UnknownDriver,
            Self::DriverFailed { .. } => ErrorKind::DriverFailed,
        }
    }

    /// True for generic invalid paths and for traversal attempts, which are a special case of them.
    pub fn is_invalid_path(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidPath | ErrorKind::PathTraversal)
    }

    pub fn is_traversal(&self) -> bool {
        self.kind() == ErrorKind::PathTraversal
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::FileNotFound | ErrorKind::DirectoryNotFound
        )
    }

    pub(crate) fn missing_configuration(disk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            disk: disk.into(),
            reason: Some(reason.into()),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: Some(reason.into()),
        }
    }

    pub(crate) fn traversal(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathTraversal {
            path: path.into(),
            reason: Some(reason.into()),
        }
    }

    pub(crate) fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound {
            path: path.into(),
            reason: None,
        }
    }

    pub(crate) fn directory_not_found(path: impl Into<String>) -> Self {
        Self::DirectoryNotFound {
            path: path.into(),
            reason: None,
        }
    }

    pub(crate) fn upload(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::UploadFailed {
            path: path.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn write(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn read(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ReadFailed {
            path: path.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn delete(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::DeleteFailed {
            path: path.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn copy(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::CopyFailed {
            from: from.into(),
            to: to.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn moving(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::MoveFailed {
            from: from.into(),
            to: to.into(),
            reason: Some(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_reason() {
        let err = StorageError::file_not_found("docs/a.txt");
        assert_eq!(err.to_string(), "file not found: 'docs/a.txt'");

        let err = StorageError::write("docs/a.txt", "disk full");
        assert_eq!(err.to_string(), "unable to write 'docs/a.txt': disk full");

        let err = StorageError::copy("a", "b", "permission denied");
        assert_eq!(
            err.to_string(),
            "unable to copy 'a' to 'b': permission denied"
        );
    }

    #[test]
    fn test_traversal_is_invalid_path() {
        let err = StorageError::traversal("../etc/passwd", "parent component");
        assert!(err.is_invalid_path());
        assert!(err.is_traversal());
        assert_eq!(err.kind(), ErrorKind::PathTraversal);

        let err = StorageError::invalid_path("a\0b", "nul byte");
        assert!(err.is_invalid_path());
        assert!(!err.is_traversal());
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(StorageError::file_not_found("x").is_not_found());
        assert!(StorageError::directory_not_found("x").is_not_found());
        assert!(!StorageError::read("x", "boom").is_not_found());
    }

    #[test]
    fn test_driver_failed_keeps_source() {
        use std::error::Error;

        let err = StorageError::DriverFailed {
            disk: "s3".into(),
            driver: "custom".into(),
            source: anyhow::anyhow!("no credentials"),
        };
        assert_eq!(err.kind(), ErrorKind::DriverFailed);
        assert_eq!(err.source().unwrap().to_string(), "no credentials");
    }
}

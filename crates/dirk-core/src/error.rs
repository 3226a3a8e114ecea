//! Error types for directory enumeration and listing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading, walking or listing directories.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walk or listing root is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A raw directory record could not be parsed.
    #[error("Malformed directory record in {path} at offset {offset}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        offset: usize,
        reason: &'static str,
    },

    /// Error raised by a walk visitor.
    #[error("Visitor failed at {path}: {message}")]
    Visitor { path: PathBuf, message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl WalkError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a visitor error with path context.
    pub fn visitor(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Visitor {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Configuration errors fail fast and are never handed to an error callback.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotADirectory { .. } | Self::MalformedRecord { .. }
        )
    }

    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::NotADirectory { path }
            | Self::MalformedRecord { path, .. }
            | Self::Visitor { path, .. } => Some(path),
            Self::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_error_io() {
        let err = WalkError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, WalkError::PermissionDenied { .. }));

        let err = WalkError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, WalkError::NotFound { .. }));
    }

    #[test]
    fn test_fatal_classification() {
        let err = WalkError::NotADirectory {
            path: "/etc/hosts".into(),
        };
        assert!(err.is_fatal());

        let err = WalkError::visitor("/tmp/x", "boom");
        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(std::path::Path::new("/tmp/x")));
        assert!(err.to_string().contains("boom"));
    }
}

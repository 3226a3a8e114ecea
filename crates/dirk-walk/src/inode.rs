//! Directory identity tracking for symlink loop detection.

use std::path::Path;

use dirk_core::WalkError;

/// Device and inode pair identifying a directory independent of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId {
    pub dev: u64,
    pub ino: u64,
}

impl DirId {
    /// Identity of the directory `path` refers to, following symlinks.
    #[cfg(unix)]
    pub fn of(path: &Path) -> Result<Self, WalkError> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path).map_err(|e| WalkError::io(path, e))?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(path: &Path) -> Result<Self, WalkError> {
        std::fs::metadata(path).map_err(|e| WalkError::io(path, e))?;
        Ok(Self { dev: 0, ino: 0 })
    }
}

/// The directories currently open between the walk root and the node being
/// visited.
///
/// Only the active chain is remembered: a directory reached twice through
/// different symlinks is walked twice, but one that is its own ancestor is
/// not entered again.
#[derive(Debug, Default)]
pub struct AncestorChain {
    stack: Vec<DirId>,
}

impl AncestorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Enter a directory. Returns `false` if it is already on the chain.
    pub fn enter(&mut self, id: DirId) -> bool {
        if self.stack.contains(&id) {
            return false;
        }
        self.stack.push(id);
        true
    }

    /// Leave the most recently entered directory.
    pub fn leave(&mut self) {
        self.stack.pop();
    }

    /// Current depth of the chain.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Check if no directory has been entered.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

//! Directory enumeration for dirk.
//!
//! Two layers:
//!
//! - [`read_dir_entries`] / [`read_dir_names`] read one directory level with
//!   a single bulk kernel read per buffer fill, returning names and type tags
//!   without a `stat` per entry.
//! - [`Walker`] recurses over those reads, with hidden-directory and ignore
//!   pruning, an optional symlink-follow policy, per-directory lexical
//!   ordering, and an error callback deciding between halting and skipping.
//!
//! # Example
//!
//! ```rust,no_run
//! use dirk_walk::{ErrorAction, Visitor, WalkControl, Walker, DirEntry};
//! use dirk_core::WalkError;
//! use std::path::Path;
//!
//! struct Printer;
//!
//! impl Visitor for Printer {
//!     fn visit(&mut self, path: &Path, _entry: &DirEntry) -> Result<WalkControl, WalkError> {
//!         println!("{}", path.display());
//!         Ok(WalkControl::Continue)
//!     }
//!
//!     fn on_error(&mut self, _path: &Path, _error: &WalkError) -> ErrorAction {
//!         ErrorAction::SkipNode
//!     }
//! }
//!
//! Walker::new(".").no_hidden(true).walk(&mut Printer).unwrap();
//! ```

mod dirent;
mod inode;
mod walker;

pub use dirent::{
    DEFAULT_SCRATCH_SIZE, DirEntry, RECORD_HEADER_SIZE, RawRecord, RecordCursor, RecordError,
    minimum_scratch_size, prepare_scratch, read_dir_entries, read_dir_names,
};
pub use inode::{AncestorChain, DirId};
pub use walker::{ErrorAction, Visitor, WalkControl, Walker};

// Re-export core types for convenience
pub use dirk_core::{EntryKind, WalkError};

//! Core types for dirk.
//!
//! This crate provides the data model shared by the directory reader, the
//! walker, the content classifier and the listing assembler: entry kinds,
//! the per-node [`File`] record, the ordered [`Files`] collection, listing
//! configuration and the error taxonomy.

mod config;
mod entry;
mod error;
mod file;
mod files;
pub mod icons;

pub use config::{ListingConfig, ListingConfigBuilder};
pub use entry::EntryKind;
pub use error::WalkError;
pub use file::{
    DirListing, File, Hierarchy, Timestamps, extension_of, format_size_iec, is_hidden_name,
    parent_dir,
};
pub use files::{Files, SortOrder};

/// Mime type assigned to every directory.
pub const FOLDER_MIME: &str = "folder/folder";

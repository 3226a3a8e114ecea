//! Directory listing assembly for dirk.
//!
//! This crate turns directory paths into numbered, sorted [`Files`]
//! listings, building one [`File`] record per node concurrently.
//!
//! # Overview
//!
//! `dirk-scan` sits on top of the enumeration in `dirk-walk` and the
//! content sniffing in `dirk-mime`. Key features:
//!
//! - **Concurrent record building** on the rayon pool, joined before return
//! - **Flat or recursive** listings with hidden and ignore filtering
//! - **Symlink aware**: targets are resolved, broken links are kept
//! - **Optional disk usage** for directories
//!
//! # Example
//!
//! ```rust,no_run
//! use dirk_scan::{ListingConfig, Lister};
//! use std::path::Path;
//!
//! let lister = Lister::new();
//! let files = lister.list(Path::new("."), &ListingConfig::default()).unwrap();
//!
//! for file in &files {
//!     println!("{:>4} {} {}", file.number, file.mime, file.name);
//! }
//! ```
//!
//! # Async
//!
//! Listing is blocking work; from async code use [`Lister::list_async`],
//! which runs it on tokio's blocking pool:
//!
//! ```rust,no_run
//! use dirk_scan::{ListingConfig, Lister};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let lister = Lister::new();
//! let listing = tokio::time::timeout(
//!     Duration::from_secs(5),
//!     lister.list_async("/var/log", ListingConfig::recursive()),
//! )
//! .await;
//! # }
//! ```

mod assembler;
mod metadata;

pub use assembler::Lister;
pub use metadata::{BROKEN_LINK_MIME, FileFactory, directory_size, make_file, make_files};

// Re-export core types for convenience
pub use dirk_core::{File, Files, ListingConfig, SortOrder, WalkError};

//! The per-node file record and its hierarchy links.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use compact_str::CompactString;
use humansize::{BINARY, FormatSizeOptions, format_size};
use serde::{Deserialize, Serialize};

use crate::entry::EntryKind;

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Last status change time (if available).
    pub changed: Option<SystemTime>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<SystemTime>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self {
            modified,
            accessed: None,
            changed: None,
            created: None,
        }
    }

    /// Read all available timestamps from metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
            accessed: metadata.accessed().ok(),
            changed: changed_time(metadata),
            created: metadata.created().ok(),
        }
    }

    /// Birth time, or modification time where the platform has none.
    pub fn created_or_modified(&self) -> SystemTime {
        self.created.unwrap_or(self.modified)
    }
}

#[cfg(unix)]
fn changed_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    Some(std::time::UNIX_EPOCH + Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn changed_time(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

/// Ordered paths of one directory level together with their base names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    /// Absolute paths.
    pub paths: Vec<PathBuf>,
    /// Base names, index-aligned with `paths`.
    pub names: Vec<CompactString>,
}

impl DirListing {
    /// Build a listing from paths, deriving base names.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        let names = paths.iter().map(|p| base_name(p)).collect();
        Self { paths, names }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the listing has no entries.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Back-references from a node to its surroundings.
///
/// Computed once when the [`File`] is built; never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    /// Base name of the parent directory (`/` at the root).
    pub parent: CompactString,
    /// Path of the parent directory.
    pub parent_path: PathBuf,
    /// Ancestors from the file system root down to the parent.
    pub ancestors: DirListing,
    /// Entries of the parent directory, the node itself included.
    pub siblings: Arc<DirListing>,
    /// Entries of this directory (directories only).
    pub children: Option<DirListing>,
}

impl Hierarchy {
    /// Build the hierarchy of `path` from already-read sibling and child listings.
    pub fn new(path: &Path, siblings: Arc<DirListing>, children: Option<DirListing>) -> Self {
        let parent_path = parent_dir(path);
        Self {
            parent: base_name(&parent_path),
            ancestors: ancestors_of(&parent_path),
            parent_path,
            siblings,
            children,
        }
    }

    /// Check if any ancestor directory is hidden.
    pub fn has_hidden_ancestor(&self) -> bool {
        self.ancestors.names.iter().any(|name| is_hidden_name(name))
    }
}

/// Parent directory of `path`; the root is its own parent.
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/"))
        .to_path_buf()
}

/// Ancestors of `dir` ordered from the root, `dir` included.
fn ancestors_of(dir: &Path) -> DirListing {
    let mut paths: Vec<PathBuf> = dir
        .ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    paths.reverse();
    DirListing::from_paths(paths)
}

fn base_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// A fully assembled file system node.
///
/// Identity, hierarchy, classification and file system facts are a snapshot
/// taken at construction. The transient fields (`number`, `total`,
/// `selected`, `active`) and the search scratch fields may be changed by
/// whoever holds the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Absolute path.
    pub path: PathBuf,
    /// Base name.
    pub name: CompactString,
    /// Key used by name ordering (base name, or full path in recursive listings).
    pub sort_key: CompactString,

    /// Entry type as seen by `lstat`.
    pub kind: EntryKind,
    /// Whether the node is a directory, following symlinks.
    pub is_dir: bool,
    /// Target of a symbolic link.
    pub link_target: Option<PathBuf>,

    /// Parent, sibling, ancestor and child links.
    pub hierarchy: Hierarchy,

    /// Detected mime type.
    pub mime: CompactString,
    /// Extension without the leading dot.
    pub extension: CompactString,
    /// Icon glyph.
    pub icon: CompactString,

    /// Size in bytes (recursive for directories when disk usage is enabled).
    pub size: u64,
    /// Human-readable size.
    pub size_iec: String,
    /// File mode and permission bits.
    pub mode: u32,
    /// File metadata timestamps.
    pub timestamps: Timestamps,

    /// Ordinal within the current listing.
    pub number: usize,
    /// Number of entries in the current listing.
    pub total: usize,
    /// Selection flag.
    pub selected: bool,
    /// Cursor flag.
    pub active: bool,
    /// Some ancestor directory is hidden.
    pub ignore: bool,
    /// The base name starts with a dot.
    pub hidden: bool,

    /// Number of lines scanned by a content search.
    pub num_lines: usize,
    /// Matched lines keyed by line number.
    pub matched_lines: BTreeMap<usize, String>,
}

impl File {
    /// Check if this node is a directory (following symlinks).
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Check if this node is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }

    /// Number of children (0 for non-directories).
    pub fn child_count(&self) -> usize {
        self.hierarchy.children.as_ref().map_or(0, DirListing::len)
    }

    /// Render mode bits the way `ls -l` does, e.g. `drwxr-xr-x`.
    pub fn permissions(&self) -> String {
        const BITS: [(u32, char); 9] = [
            (0o400, 'r'),
            (0o200, 'w'),
            (0o100, 'x'),
            (0o040, 'r'),
            (0o020, 'w'),
            (0o010, 'x'),
            (0o004, 'r'),
            (0o002, 'w'),
            (0o001, 'x'),
        ];
        let mut out = String::with_capacity(10);
        out.push(self.kind.mode_char());
        for (bit, c) in BITS {
            out.push(if self.mode & bit != 0 { c } else { '-' });
        }
        out
    }

    /// Drop any results left by a content search.
    pub fn clear_matches(&mut self) {
        self.matched_lines.clear();
        self.num_lines = 0;
    }
}

/// Hidden entries are those whose base name starts with a dot.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Text after the last dot of a base name, or `""` when there is none.
///
/// A leading dot counts, so `.vimrc` yields `vimrc`.
pub fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Format a byte count with binary units, e.g. `1.5 KiB`.
pub fn format_size_iec(bytes: u64) -> String {
    let options = FormatSizeOptions::from(BINARY).decimal_places(1);
    format_size(bytes, options)
}

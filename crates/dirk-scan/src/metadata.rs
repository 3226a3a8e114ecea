//! Construction of a single [`File`] record.

use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use dashmap::DashMap;
use tracing::{debug, trace};

use dirk_core::{
    DirListing, EntryKind, FOLDER_MIME, File, Files, Hierarchy, Timestamps, WalkError,
    extension_of, format_size_iec, icons, is_hidden_name, parent_dir,
};
use dirk_mime::{Classifier, Detection};
use dirk_walk::{DirEntry, ErrorAction, Visitor, WalkControl, Walker, read_dir_names};

/// Mime type of a symlink whose target does not exist.
pub const BROKEN_LINK_MIME: &str = "inode/symlink";

/// Builds [`File`] records, sharing sibling listings between files of the
/// same directory.
///
/// The sibling cache lives as long as the factory; a factory is meant to
/// serve one listing and then be dropped.
#[derive(Debug)]
pub struct FileFactory {
    classifier: Classifier,
    disk_usage: bool,
    siblings: DashMap<PathBuf, Arc<DirListing>>,
}

impl FileFactory {
    /// Create a factory. With `disk_usage`, directory sizes are computed
    /// recursively.
    pub fn new(classifier: Classifier, disk_usage: bool) -> Self {
        Self {
            classifier,
            disk_usage,
            siblings: DashMap::new(),
        }
    }

    /// Build the record for `path`.
    ///
    /// Fails only when the node itself cannot be `lstat`ed. Unreadable
    /// content or child listings degrade to fallbacks.
    pub fn make_file(&self, path: &Path) -> Result<File, WalkError> {
        let link_metadata = fs::symlink_metadata(path).map_err(|e| WalkError::io(path, e))?;
        let kind = EntryKind::from(link_metadata.file_type());

        let (target_metadata, link_target) = if kind.is_symlink() {
            (fs::metadata(path).ok(), fs::read_link(path).ok())
        } else {
            (None, None)
        };
        let broken_link = kind.is_symlink() && target_metadata.is_none();
        let metadata = target_metadata.as_ref().unwrap_or(&link_metadata);
        let target_kind = EntryKind::from(metadata.file_type());
        let is_dir = metadata.is_dir();

        let name = base_name(path);
        let (size, children) = if is_dir {
            let size = if self.disk_usage { directory_size(path) } else { 0 };
            (size, Some(list_paths(path)))
        } else {
            (metadata.len(), None)
        };

        let detection = if is_dir {
            Detection {
                mime: FOLDER_MIME.to_string(),
                extension: String::new(),
            }
        } else if broken_link {
            debug!(path = %path.display(), "broken symlink");
            Detection {
                mime: BROKEN_LINK_MIME.to_string(),
                extension: String::new(),
            }
        } else {
            self.classify(path, target_kind)
        };

        let extension = match extension_of(&name) {
            "" => CompactString::new(&detection.extension),
            ext => CompactString::new(ext),
        };
        let icon = icons::icon_for(is_dir, &extension.to_ascii_lowercase());

        let siblings = self.siblings_of(&parent_dir(path));
        let hierarchy = Hierarchy::new(path, siblings, children);
        let ignore = hierarchy.has_hidden_ancestor();

        Ok(File {
            path: path.to_path_buf(),
            sort_key: name.clone(),
            hidden: is_hidden_name(&name),
            name,
            kind,
            is_dir,
            link_target,
            hierarchy,
            mime: detection.mime.into(),
            extension,
            icon: icon.into(),
            size,
            size_iec: format_size_iec(size),
            mode: mode_bits(&link_metadata),
            timestamps: Timestamps::from_metadata(metadata),
            number: 0,
            total: 0,
            selected: false,
            active: false,
            ignore,
            num_lines: 0,
            matched_lines: BTreeMap::new(),
        })
    }

    /// Special files are typed from their mode; only regular files are read.
    fn classify(&self, path: &Path, kind: EntryKind) -> Detection {
        let special = match kind {
            EntryKind::Fifo => Some("inode/fifo"),
            EntryKind::Socket => Some("inode/socket"),
            EntryKind::CharDevice => Some("inode/chardevice"),
            EntryKind::BlockDevice => Some("inode/blockdevice"),
            _ => None,
        };
        if let Some(mime) = special {
            return Detection {
                mime: mime.to_string(),
                extension: String::new(),
            };
        }

        match self.classifier.detect_file(path) {
            Ok(detection) => detection,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "content unreadable, using fallback type");
                err.fallback
            }
        }
    }

    /// Sorted entries of `dir`, read once per factory.
    fn siblings_of(&self, dir: &Path) -> Arc<DirListing> {
        if let Some(cached) = self.siblings.get(dir) {
            return Arc::clone(cached.value());
        }
        let listing = Arc::new(list_paths(dir));
        Arc::clone(
            self.siblings
                .entry(dir.to_path_buf())
                .or_insert(listing)
                .value(),
        )
    }
}

/// Build the record for one path.
pub fn make_file(path: &Path, classifier: &Classifier, disk_usage: bool) -> Result<File, WalkError> {
    FileFactory::new(classifier.clone(), disk_usage).make_file(path)
}

/// Build records for several paths, in the given order.
///
/// Unlike a listing, this fails on the first path that cannot be read.
pub fn make_files<I, P>(paths: I, classifier: &Classifier, disk_usage: bool) -> Result<Files, WalkError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let factory = FileFactory::new(classifier.clone(), disk_usage);
    paths
        .into_iter()
        .map(|path| factory.make_file(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map(Files::new)
}

/// Recursive sum of regular file sizes below `dir`.
///
/// Symlinks are neither counted nor followed, and unreadable subtrees are
/// skipped.
pub fn directory_size(dir: &Path) -> u64 {
    let mut counter = SizeCounter::default();
    if let Err(err) = Walker::new(dir).unsorted(true).walk(&mut counter) {
        debug!(path = %dir.display(), error = %err, "directory size incomplete");
    }
    counter.total
}

#[derive(Default)]
struct SizeCounter {
    total: u64,
}

impl Visitor for SizeCounter {
    fn visit(&mut self, path: &Path, entry: &DirEntry) -> Result<WalkControl, WalkError> {
        if entry.kind().is_regular() {
            let metadata = fs::symlink_metadata(path).map_err(|e| WalkError::io(path, e))?;
            self.total += metadata.len();
        }
        Ok(WalkControl::Continue)
    }

    fn on_error(&mut self, path: &Path, error: &WalkError) -> ErrorAction {
        trace!(path = %path.display(), error = %error, "not counted");
        ErrorAction::SkipNode
    }
}

/// Entries of `dir` as full paths, sorted by name. Empty if unreadable.
fn list_paths(dir: &Path) -> DirListing {
    let mut scratch = Vec::new();
    match read_dir_names(dir, &mut scratch) {
        Ok(mut names) => {
            names.sort();
            DirListing::from_paths(names.into_iter().map(|name| dir.join(name)).collect())
        }
        Err(err) => {
            debug!(path = %dir.display(), error = %err, "cannot list directory");
            DirListing::default()
        }
    }
}

fn base_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        None => CompactString::new(path.to_string_lossy()),
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o444 } else { 0o644 }
}

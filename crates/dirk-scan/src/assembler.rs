//! Concurrent listing assembly.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use rayon::Scope;
use tracing::{debug, info, warn};

use dirk_core::{File, Files, ListingConfig, WalkError};
use dirk_mime::Classifier;
use dirk_walk::{DirEntry, ErrorAction, Visitor, WalkControl, Walker, read_dir_names};

use crate::metadata::FileFactory;

/// Assembles directory listings.
///
/// Each node's record is built on its own rayon task; the listing is
/// returned only after every task has finished. Nodes that vanish or cannot
/// be read in the meantime are left out.
#[derive(Debug, Clone, Default)]
pub struct Lister {
    classifier: Classifier,
}

impl Lister {
    /// Create a lister with the standard classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lister with a custom classifier.
    pub fn with_classifier(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Classifier used for file content.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// List `dir` according to `config`.
    ///
    /// The result holds folders then files, each group sorted by sort key,
    /// with hidden and ignored names removed as configured, and numbered.
    /// `dir` itself is never part of the result.
    pub fn list(&self, dir: &Path, config: &ListingConfig) -> Result<Files, WalkError> {
        let start = Instant::now();
        let root = dir.canonicalize().map_err(|e| WalkError::io(dir, e))?;
        if !root.is_dir() {
            return Err(WalkError::NotADirectory { path: root });
        }

        let task = ListingTask {
            factory: FileFactory::new(self.classifier.clone(), config.disk_usage),
            accumulator: Accumulator::default(),
        };
        rayon::scope(|scope| {
            if config.recursive {
                task.dispatch_recursive(scope, &root, config)
            } else {
                task.dispatch_flat(scope, &root)
            }
        })?;

        let built = task.accumulator.into_inner();
        let dispatched = built.len();
        let files = assemble(built, config);
        info!(
            dir = %root.display(),
            built = dispatched,
            entries = files.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "listing assembled"
        );
        Ok(files)
    }

    /// Run [`Lister::list`] on the blocking thread pool.
    ///
    /// Callers needing bounded latency wrap this in `tokio::time::timeout`.
    pub async fn list_async(
        &self,
        dir: impl Into<PathBuf>,
        config: ListingConfig,
    ) -> Result<Files, WalkError> {
        let lister = self.clone();
        let dir = dir.into();
        tokio::task::spawn_blocking(move || lister.list(&dir, &config))
            .await
            .map_err(|e| WalkError::Other {
                message: format!("Listing task failed: {e}"),
            })?
    }
}

/// Shared state of one listing: the record factory and the result sink.
struct ListingTask {
    factory: FileFactory,
    accumulator: Accumulator,
}

impl ListingTask {
    fn dispatch_flat<'scope>(&'scope self, scope: &Scope<'scope>, root: &Path) -> Result<(), WalkError> {
        let mut scratch = Vec::new();
        for name in read_dir_names(root, &mut scratch)? {
            self.spawn(scope, root.join(name));
        }
        Ok(())
    }

    fn dispatch_recursive<'scope>(
        &'scope self,
        scope: &Scope<'scope>,
        root: &Path,
        config: &ListingConfig,
    ) -> Result<(), WalkError> {
        let mut dispatcher = Dispatcher {
            scope,
            task: self,
            root,
        };
        Walker::new(root)
            .follow_symlinks(config.follow_symlinks)
            .no_hidden(!config.include_hidden)
            .ignore(&config.ignore_recursive)
            .unsorted(true)
            .walk(&mut dispatcher)
    }

    fn spawn<'scope>(&'scope self, scope: &Scope<'scope>, path: PathBuf) {
        scope.spawn(move |_| self.build(&path));
    }

    fn build(&self, path: &Path) {
        match self.factory.make_file(path) {
            Ok(file) => self.accumulator.push(file),
            Err(err) => debug!(path = %path.display(), error = %err, "dropped from listing"),
        }
    }
}

/// Walk visitor that hands every node below the root to a task.
struct Dispatcher<'a, 'scope> {
    scope: &'a Scope<'scope>,
    task: &'scope ListingTask,
    root: &'a Path,
}

impl Visitor for Dispatcher<'_, '_> {
    fn visit(&mut self, path: &Path, _entry: &DirEntry) -> Result<WalkControl, WalkError> {
        if path != self.root {
            self.task.spawn(self.scope, path.to_path_buf());
        }
        Ok(WalkControl::Continue)
    }

    fn on_error(&mut self, path: &Path, error: &WalkError) -> ErrorAction {
        if path == self.root {
            return ErrorAction::Halt;
        }
        warn!(path = %path.display(), error = %error, "skipping unreadable subtree");
        ErrorAction::SkipNode
    }
}

/// Mutex-guarded result sink; the lock is held only for the push.
#[derive(Debug, Default)]
struct Accumulator {
    files: Mutex<Vec<File>>,
}

impl Accumulator {
    fn push(&self, file: File) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file);
    }

    fn into_inner(self) -> Vec<File> {
        self.files
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Order, filter and number the built records.
fn assemble(built: Vec<File>, config: &ListingConfig) -> Files {
    let (mut folders, mut files): (Vec<File>, Vec<File>) = built
        .into_iter()
        .map(|mut file| {
            if config.recursive {
                file.sort_key = file.path.to_string_lossy().into();
            }
            file
        })
        .partition(|file| file.is_dir);

    folders.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    files.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

    let mut listing = Vec::with_capacity(folders.len() + files.len());
    if config.include_folders {
        listing.extend(folders);
    }
    if config.include_files {
        listing.extend(files);
    }
    listing.retain(|file| !config.should_skip_hidden(&file.name));
    listing.retain(|file| !config.should_ignore(&file.name));

    Files::new(listing)
}

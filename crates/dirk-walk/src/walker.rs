//! Recursive directory walker built on bulk directory reads.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dirk_core::{EntryKind, WalkError};
use tracing::debug;

use crate::dirent::{DEFAULT_SCRATCH_SIZE, DirEntry, prepare_scratch, read_dir_entries};
use crate::inode::{AncestorChain, DirId};

/// What the walk should do after a node has been visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkControl {
    /// Keep going.
    #[default]
    Continue,
    /// On a directory: do not descend into it. On any other node: skip its
    /// remaining siblings and the parent's post-children callback.
    SkipDir,
}

/// Decision for a recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Abort the walk and return the error.
    #[default]
    Halt,
    /// Ignore the node the error occurred on and continue.
    SkipNode,
}

/// Callbacks invoked by [`Walker::walk`].
pub trait Visitor {
    /// Called for every node, the root included, parents before children.
    fn visit(&mut self, path: &Path, entry: &DirEntry) -> Result<WalkControl, WalkError>;

    /// Called for a directory after all of its children have been visited.
    fn post_children(&mut self, _path: &Path, _entry: &DirEntry) -> Result<WalkControl, WalkError> {
        Ok(WalkControl::Continue)
    }

    /// Decide how to handle a recoverable error at `path`.
    ///
    /// Fatal errors ([`WalkError::is_fatal`]) never reach this callback.
    fn on_error(&mut self, _path: &Path, _error: &WalkError) -> ErrorAction {
        ErrorAction::Halt
    }
}

impl<F> Visitor for F
where
    F: FnMut(&Path, &DirEntry) -> Result<WalkControl, WalkError>,
{
    fn visit(&mut self, path: &Path, entry: &DirEntry) -> Result<WalkControl, WalkError> {
        self(path, entry)
    }
}

/// Depth-first directory walker.
///
/// ```rust,no_run
/// use dirk_walk::{WalkControl, Walker};
///
/// Walker::new("/srv/app")
///     .ignore(["node_modules", ".git"])
///     .for_each(|path, entry| {
///         println!("{} {}", entry.kind(), path.display());
///         Ok(WalkControl::Continue)
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    follow_symlinks: bool,
    no_hidden: bool,
    ignore: HashSet<OsString>,
    unsorted: bool,
    scratch_size: usize,
}

struct WalkState {
    scratch: Vec<u8>,
    chain: AncestorChain,
}

impl Walker {
    /// Create a walker rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            no_hidden: false,
            ignore: HashSet::new(),
            unsorted: false,
            scratch_size: DEFAULT_SCRATCH_SIZE,
        }
    }

    /// Recurse into symlinks that refer to directories.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Do not descend into directories whose name starts with a dot.
    pub fn no_hidden(mut self, no_hidden: bool) -> Self {
        self.no_hidden = no_hidden;
        self
    }

    /// Directory names that are visited but never descended into.
    pub fn ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    /// Visit children in read order instead of sorting them by name.
    pub fn unsorted(mut self, unsorted: bool) -> Self {
        self.unsorted = unsorted;
        self
    }

    /// Size of the scratch buffer used for directory reads.
    pub fn scratch_size(mut self, size: usize) -> Self {
        self.scratch_size = size;
        self
    }

    /// Walk the tree with a closure as the visitor.
    pub fn for_each<F>(&self, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Path, &DirEntry) -> Result<WalkControl, WalkError>,
    {
        self.walk(&mut visit)
    }

    /// Walk the tree, invoking `visitor` for every node.
    ///
    /// The root must resolve to a directory. Paths are reported under the
    /// root as given; the resolved form is only used for the directory and
    /// loop checks. A [`WalkControl::SkipDir`] returned for the root ends
    /// the walk successfully.
    ///
    /// Descent keeps its pending directories on the heap, so tree depth is
    /// not limited by the thread's stack.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), WalkError> {
        let resolved = self
            .root
            .canonicalize()
            .map_err(|e| WalkError::io(&self.root, e))?;
        let metadata = std::fs::metadata(&resolved).map_err(|e| WalkError::io(&resolved, e))?;
        if !metadata.is_dir() {
            return Err(WalkError::NotADirectory { path: resolved });
        }

        let name = self
            .root
            .file_name()
            .or_else(|| resolved.file_name())
            .unwrap_or(resolved.as_os_str())
            .to_os_string();
        let entry = DirEntry::new(name, EntryKind::Directory);

        let mut scratch = vec![0; self.scratch_size];
        prepare_scratch(&mut scratch);
        let mut state = WalkState {
            scratch,
            chain: AncestorChain::new(),
        };

        debug!(root = %self.root.display(), "walk started");
        let mut stack = Vec::new();
        if let Step::Descend(frame) = self.enter(self.root.clone(), entry, true, visitor, &mut state)? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.children.next() {
                let child_path = frame.path.join(child.name());
                match self.enter(child_path, child, false, visitor, &mut state)? {
                    Step::Done => {}
                    Step::Descend(child_frame) => stack.push(child_frame),
                    Step::SkipParent => {
                        if let Some(parent) = stack.pop() {
                            self.leave(&parent, &mut state);
                        }
                    }
                }
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            self.leave(&frame, &mut state);
            if let Err(err) = visitor.post_children(&frame.path, &frame.entry) {
                recover(visitor, &frame.path, err)?;
            }
        }
        Ok(())
    }

    /// Visit one node and, for a directory to descend into, read its children.
    fn enter<V: Visitor + ?Sized>(
        &self,
        path: PathBuf,
        entry: DirEntry,
        is_root: bool,
        visitor: &mut V,
        state: &mut WalkState,
    ) -> Result<Step, WalkError> {
        match visitor.visit(&path, &entry) {
            Ok(WalkControl::Continue) => {}
            Ok(WalkControl::SkipDir) if is_root => return Ok(Step::Done),
            Ok(WalkControl::SkipDir) => return self.skip_dir(&path, &entry, visitor),
            Err(err) => return recover(visitor, &path, err),
        }

        let kind = match self.target_kind(&path, &entry, self.follow_symlinks) {
            Ok(kind) => kind,
            Err(err) => return recover(visitor, &path, err),
        };
        if !kind.is_dir() {
            return Ok(Step::Done);
        }

        if !is_root {
            if self.no_hidden && entry.is_hidden() {
                debug!(path = %path.display(), "hidden directory not descended");
                return Ok(Step::Done);
            }
            if self.ignore.contains(entry.name()) {
                debug!(path = %path.display(), "ignored directory pruned");
                return Ok(Step::Done);
            }
        }

        // Without following symlinks the tree cannot contain cycles.
        let guarded = self.follow_symlinks;
        if guarded {
            let id = match DirId::of(&path) {
                Ok(id) => id,
                Err(err) => return recover(visitor, &path, err),
            };
            if !state.chain.enter(id) {
                debug!(path = %path.display(), "symlink loop, not descending");
                return Ok(Step::Done);
            }
        }

        let mut children = match read_dir_entries(&path, &mut state.scratch) {
            Ok(children) => children,
            Err(err) => {
                if guarded {
                    state.chain.leave();
                }
                return recover(visitor, &path, err);
            }
        };
        if !self.unsorted {
            children.sort_by(|a, b| a.name().cmp(b.name()));
        }

        Ok(Step::Descend(Frame {
            path,
            entry,
            children: children.into_iter(),
            guarded,
        }))
    }

    /// SkipDir prunes a directory; on anything else it abandons the parent.
    fn skip_dir<V: Visitor + ?Sized>(
        &self,
        path: &Path,
        entry: &DirEntry,
        visitor: &mut V,
    ) -> Result<Step, WalkError> {
        match self.target_kind(path, entry, true) {
            Ok(kind) if kind.is_dir() => Ok(Step::Done),
            Ok(_) => Ok(Step::SkipParent),
            Err(err) => recover(visitor, path, err),
        }
    }

    fn leave(&self, frame: &Frame, state: &mut WalkState) {
        if frame.guarded {
            state.chain.leave();
        }
    }

    /// Kind of the node, resolved through a symlink when `follow` is set.
    fn target_kind(&self, path: &Path, entry: &DirEntry, follow: bool) -> Result<EntryKind, WalkError> {
        if !entry.is_symlink() || !follow {
            return Ok(entry.kind());
        }
        let metadata = std::fs::metadata(path).map_err(|e| WalkError::io(path, e))?;
        Ok(metadata.file_type().into())
    }
}

/// A directory whose children are being visited.
struct Frame {
    path: PathBuf,
    entry: DirEntry,
    children: std::vec::IntoIter<DirEntry>,
    /// Pushed onto the ancestor chain.
    guarded: bool,
}

/// Outcome of visiting one node.
enum Step {
    /// Nothing to descend into.
    Done,
    Descend(Frame),
    /// SkipDir on a non-directory: drop the parent's remaining children
    /// and its post-children callback.
    SkipParent,
}

/// Route a recoverable error through the visitor's error callback.
fn recover<V: Visitor + ?Sized>(visitor: &mut V, path: &Path, err: WalkError) -> Result<Step, WalkError> {
    if err.is_fatal() {
        return Err(err);
    }
    match visitor.on_error(path, &err) {
        ErrorAction::Halt => Err(err),
        ErrorAction::SkipNode => {
            debug!(path = %path.display(), error = %err, "skipping node");
            Ok(Step::Done)
        }
    }
}

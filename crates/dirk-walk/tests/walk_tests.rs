use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use dirk_walk::{
    DirEntry, EntryKind, ErrorAction, Visitor, WalkControl, WalkError, Walker, read_dir_entries,
    read_dir_names,
};
use tempfile::TempDir;

/// Records every callback so ordering can be asserted.
#[derive(Default)]
struct Recorder {
    root: PathBuf,
    events: Vec<String>,
    errors: Vec<PathBuf>,
    skip_dirs: Vec<&'static str>,
    fail_on: Vec<&'static str>,
    on_error: ErrorAction,
}

impl Recorder {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }

    fn rel(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap();
        if rel.as_os_str().is_empty() {
            ".".to_string()
        } else {
            rel.display().to_string()
        }
    }
}

impl Visitor for Recorder {
    fn visit(&mut self, path: &Path, entry: &DirEntry) -> Result<WalkControl, WalkError> {
        let rel = self.rel(path);
        self.events.push(rel.clone());
        if self.fail_on.contains(&rel.as_str()) {
            return Err(WalkError::visitor(path, "refused"));
        }
        if self.skip_dirs.contains(&entry.name().to_str().unwrap()) {
            return Ok(WalkControl::SkipDir);
        }
        Ok(WalkControl::Continue)
    }

    fn post_children(&mut self, path: &Path, _entry: &DirEntry) -> Result<WalkControl, WalkError> {
        let rel = self.rel(path);
        self.events.push(format!("post:{rel}"));
        Ok(WalkControl::Continue)
    }

    fn on_error(&mut self, path: &Path, _error: &WalkError) -> ErrorAction {
        self.errors.push(path.to_path_buf());
        self.on_error
    }
}

fn create_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::create_dir_all(root.join(".git/objects")).unwrap();
    fs::write(root.join("README.md"), "readme").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
    fs::write(root.join("src/nested/deep.rs"), "").unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
    fs::write(root.join(".git/HEAD"), "ref").unwrap();

    temp
}

#[test]
fn test_read_dir_entries_types() {
    let temp = create_tree();
    symlink(temp.path().join("README.md"), temp.path().join("link")).unwrap();

    let mut scratch = Vec::new();
    let mut entries = read_dir_entries(temp.path(), &mut scratch).unwrap();
    entries.sort_by(|a, b| a.name().cmp(b.name()));

    let summary: Vec<(String, EntryKind)> = entries
        .iter()
        .map(|e| (e.name().to_string_lossy().into_owned(), e.kind()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (".git".to_string(), EntryKind::Directory),
            ("README.md".to_string(), EntryKind::Regular),
            ("link".to_string(), EntryKind::Symlink),
            ("node_modules".to_string(), EntryKind::Directory),
            ("src".to_string(), EntryKind::Directory),
        ]
    );
}

#[test]
fn test_read_dir_names_many_entries_small_scratch() {
    let temp = TempDir::new().unwrap();
    for i in 0..2500 {
        fs::write(temp.path().join(format!("file-{i:05}-with-a-longer-name")), "").unwrap();
    }

    let mut scratch = vec![0u8; 16];
    let names = read_dir_names(temp.path(), &mut scratch).unwrap();
    assert_eq!(names.len(), 2500);
    assert!(scratch.len() >= dirk_walk::minimum_scratch_size());
    assert!(names.iter().all(|n| n != "." && n != ".."));
}

#[test]
fn test_read_missing_dir_fails() {
    let temp = TempDir::new().unwrap();
    let err = read_dir_entries(&temp.path().join("gone"), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, WalkError::NotFound { .. }));
}

#[test]
fn test_read_file_fails() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain");
    fs::write(&file, "x").unwrap();
    assert!(read_dir_entries(&file, &mut Vec::new()).is_err());
}

#[test]
fn test_walk_order_and_post_children() {
    let temp = create_tree();
    let mut recorder = Recorder::new(temp.path());

    Walker::new(temp.path()).walk(&mut recorder).unwrap();

    assert_eq!(
        recorder.events,
        vec![
            ".",
            ".git",
            ".git/HEAD",
            ".git/objects",
            "post:.git/objects",
            "post:.git",
            "README.md",
            "node_modules",
            "node_modules/pkg",
            "node_modules/pkg/index.js",
            "post:node_modules/pkg",
            "post:node_modules",
            "src",
            "src/main.rs",
            "src/nested",
            "src/nested/deep.rs",
            "post:src/nested",
            "post:src",
            "post:.",
        ]
    );
}

#[test]
fn test_ignore_and_no_hidden_visit_but_do_not_descend() {
    let temp = create_tree();
    let mut recorder = Recorder::new(temp.path());

    Walker::new(temp.path())
        .ignore(["node_modules"])
        .no_hidden(true)
        .walk(&mut recorder)
        .unwrap();

    assert!(recorder.events.contains(&"node_modules".to_string()));
    assert!(recorder.events.contains(&".git".to_string()));
    assert!(!recorder.events.iter().any(|e| e.starts_with("node_modules/")));
    assert!(!recorder.events.iter().any(|e| e.starts_with(".git/")));
    assert!(!recorder.events.contains(&"post:node_modules".to_string()));
}

#[test]
fn test_skip_dir_on_directory_prunes_it() {
    let temp = create_tree();
    let mut recorder = Recorder::new(temp.path());
    recorder.skip_dirs = vec!["src"];

    Walker::new(temp.path()).walk(&mut recorder).unwrap();

    assert!(recorder.events.contains(&"src".to_string()));
    assert!(!recorder.events.iter().any(|e| e.starts_with("src/")));
    assert!(!recorder.events.contains(&"post:src".to_string()));
    assert_eq!(recorder.events.last().unwrap(), "post:.");
}

#[test]
fn test_skip_dir_on_file_skips_siblings() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("d");
    fs::create_dir(&dir).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.join(name), "").unwrap();
    }
    fs::write(temp.path().join("z"), "").unwrap();

    let mut recorder = Recorder::new(temp.path());
    recorder.skip_dirs = vec!["b"];
    Walker::new(temp.path()).walk(&mut recorder).unwrap();

    assert_eq!(
        recorder.events,
        vec![".", "d", "d/a", "d/b", "z", "post:."]
    );
}

#[test]
fn test_visitor_error_skip_node() {
    let temp = create_tree();
    let mut recorder = Recorder::new(temp.path());
    recorder.fail_on = vec!["src"];
    recorder.on_error = ErrorAction::SkipNode;

    Walker::new(temp.path()).walk(&mut recorder).unwrap();

    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.errors[0].ends_with("src"));
    assert!(!recorder.events.iter().any(|e| e.starts_with("src/")));
    assert!(recorder.events.contains(&"README.md".to_string()));
}

#[test]
fn test_visitor_error_halts_by_default() {
    let temp = create_tree();
    let mut recorder = Recorder::new(temp.path());
    recorder.fail_on = vec!["README.md"];

    let err = Walker::new(temp.path()).walk(&mut recorder).unwrap_err();
    assert!(matches!(err, WalkError::Visitor { .. }));
    assert!(!recorder.events.contains(&"src".to_string()));
}

#[test]
fn test_symlinked_dir_followed_only_when_asked() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("target");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("inner.txt"), "").unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    symlink(&target, root.join("link")).unwrap();

    let mut recorder = Recorder::new(&root);
    Walker::new(&root).walk(&mut recorder).unwrap();
    assert_eq!(recorder.events, vec![".", "link", "post:."]);

    let mut recorder = Recorder::new(&root);
    Walker::new(&root)
        .follow_symlinks(true)
        .walk(&mut recorder)
        .unwrap();
    assert_eq!(
        recorder.events,
        vec![".", "link", "link/inner.txt", "post:link", "post:."]
    );
}

#[test]
fn test_symlink_loop_is_not_reentered() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    symlink(&root, root.join("sub/back")).unwrap();

    let mut recorder = Recorder::new(&root);
    Walker::new(&root)
        .follow_symlinks(true)
        .walk(&mut recorder)
        .unwrap();

    assert_eq!(
        recorder.events,
        vec![".", "sub", "sub/back", "post:sub", "post:."]
    );
}

#[test]
fn test_dangling_symlink_reaches_error_callback() {
    let temp = TempDir::new().unwrap();
    symlink(temp.path().join("nowhere"), temp.path().join("dangling")).unwrap();
    fs::write(temp.path().join("zzz"), "").unwrap();

    let mut recorder = Recorder::new(temp.path());
    recorder.on_error = ErrorAction::SkipNode;
    Walker::new(temp.path())
        .follow_symlinks(true)
        .walk(&mut recorder)
        .unwrap();

    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.events.contains(&"zzz".to_string()));

    // Not following: the link is just a leaf
    let mut recorder = Recorder::new(temp.path());
    Walker::new(temp.path()).walk(&mut recorder).unwrap();
    assert!(recorder.errors.is_empty());
}

#[test]
fn test_unsorted_visits_everything() {
    let temp = create_tree();
    let mut count = 0;
    Walker::new(temp.path())
        .unsorted(true)
        .for_each(|_, _| {
            count += 1;
            Ok(WalkControl::Continue)
        })
        .unwrap();
    assert_eq!(count, 12);
}

#[test]
fn test_paths_reported_under_given_root() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("file"), "").unwrap();
    let alias = temp.path().join("alias");
    symlink(&real, &alias).unwrap();

    let mut seen = Vec::new();
    Walker::new(&alias)
        .for_each(|path, entry| {
            seen.push((path.to_path_buf(), entry.name().to_os_string()));
            Ok(WalkControl::Continue)
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (alias.clone(), OsString::from("alias")),
            (alias.join("file"), OsString::from("file")),
        ]
    );
}

#[test]
fn test_deep_tree_on_small_stack() {
    const DEPTH: usize = 1500;

    let temp = TempDir::new().unwrap();
    let mut deepest = temp.path().to_path_buf();
    for _ in 0..DEPTH {
        deepest.push("a");
    }
    fs::create_dir_all(&deepest).unwrap();
    fs::write(deepest.join("leaf"), "").unwrap();

    let root = temp.path().to_path_buf();
    let recorder = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(move || {
            let mut recorder = Recorder::new(&root);
            Walker::new(&root).walk(&mut recorder).unwrap();
            recorder
        })
        .unwrap()
        .join()
        .unwrap();

    let (posts, visits): (Vec<_>, Vec<_>) =
        recorder.events.iter().partition(|e| e.starts_with("post:"));
    // Root, every level, and the leaf
    assert_eq!(visits.len(), DEPTH + 2);
    assert_eq!(posts.len(), DEPTH + 1);
    assert!(visits.last().unwrap().ends_with("a/leaf"));
    // Innermost directory finishes first, the root last
    assert_eq!(posts.first().unwrap().len(), "post:".len() + DEPTH * 2 - 1);
    assert_eq!(recorder.events.last().unwrap(), "post:.");
}

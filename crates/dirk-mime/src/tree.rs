//! The matcher tree and the classifier that walks it.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;

use crate::READ_LIMIT;
use crate::matchers::default_tree;

/// Predicate over a content prefix of at most [`READ_LIMIT`] bytes.
pub type MatchFn = fn(&[u8]) -> bool;

/// One content type in the matcher tree.
///
/// Children refine their parent: they are only tested once the parent has
/// matched, in declaration order.
#[derive(Debug, Clone)]
pub struct MatcherNode {
    mime: Cow<'static, str>,
    extension: Cow<'static, str>,
    matcher: MatchFn,
    children: Vec<MatcherNode>,
}

impl MatcherNode {
    /// Create a leaf node.
    pub fn new(
        mime: impl Into<Cow<'static, str>>,
        extension: impl Into<Cow<'static, str>>,
        matcher: MatchFn,
    ) -> Self {
        Self {
            mime: mime.into(),
            extension: extension.into(),
            matcher,
            children: Vec::new(),
        }
    }

    /// Append children, keeping declaration order.
    pub fn with_children(mut self, children: impl IntoIterator<Item = MatcherNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append a single child.
    pub fn push(&mut self, child: MatcherNode) {
        self.children.push(child);
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn children(&self) -> &[MatcherNode] {
        &self.children
    }

    /// Run this node's own predicate.
    pub fn matches(&self, input: &[u8]) -> bool {
        (self.matcher)(input)
    }

    /// Deepest node reachable from `self` by repeatedly taking the first
    /// child whose predicate accepts `input`.
    pub fn deepest_match(&self, input: &[u8]) -> &MatcherNode {
        let mut node = self;
        while let Some(child) = node.children.iter().find(|c| c.matches(input)) {
            node = child;
        }
        node
    }

    /// Total number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MatcherNode::node_count).sum::<usize>()
    }

    fn render(&self, level: usize, out: &mut String) {
        for _ in 0..level {
            out.push_str("|   ");
        }
        if !self.children.is_empty() {
            out.push('+');
        }
        let _ = writeln!(out, "{}", self.mime);
        for child in &self.children {
            child.render(level + 1, out);
        }
    }
}

/// A detected content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// MIME type, possibly with parameters (`text/html; charset=utf-8`).
    pub mime: String,
    /// Canonical extension without the dot; empty for the root type.
    pub extension: String,
}

impl Detection {
    /// MIME type without parameters.
    pub fn essence(&self) -> &str {
        self.mime.split(';').next().unwrap_or(&self.mime).trim()
    }
}

impl From<&MatcherNode> for Detection {
    fn from(node: &MatcherNode) -> Self {
        Self {
            mime: node.mime().to_string(),
            extension: node.extension().to_string(),
        }
    }
}

/// Content could not be read; carries the root classification as fallback.
#[derive(Debug, Error)]
#[error("Cannot read content for detection: {source}")]
pub struct DetectError {
    /// Classification to use in place of a real detection.
    pub fallback: Detection,
    #[source]
    pub source: io::Error,
}

/// Content type sniffer over an immutable matcher tree.
///
/// Cloning is cheap: the tree is shared.
#[derive(Debug, Clone)]
pub struct Classifier {
    root: Arc<MatcherNode>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Classifier over the standard tree, built once per process.
    pub fn new() -> Self {
        static STANDARD: OnceLock<Arc<MatcherNode>> = OnceLock::new();
        Self {
            root: Arc::clone(STANDARD.get_or_init(|| Arc::new(default_tree()))),
        }
    }

    /// Classifier over a custom tree. The root's own predicate is not consulted.
    pub fn with_root(root: MatcherNode) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Root of the matcher tree.
    pub fn root(&self) -> &MatcherNode {
        &self.root
    }

    /// Detect the type of an in-memory prefix. Bytes past [`READ_LIMIT`]
    /// are ignored.
    pub fn detect(&self, input: &[u8]) -> Detection {
        let input = &input[..input.len().min(READ_LIMIT)];
        Detection::from(self.root.deepest_match(input))
    }

    /// Detect the type of the first [`READ_LIMIT`] bytes of `reader`.
    pub fn detect_reader<R: Read>(&self, reader: R) -> Result<Detection, DetectError> {
        let mut prefix = Vec::with_capacity(READ_LIMIT);
        match reader.take(READ_LIMIT as u64).read_to_end(&mut prefix) {
            Ok(_) => Ok(self.detect(&prefix)),
            Err(source) => Err(self.fail(source)),
        }
    }

    /// Detect the type of the file at `path`.
    pub fn detect_file(&self, path: &Path) -> Result<Detection, DetectError> {
        let file = File::open(path).map_err(|source| self.fail(source))?;
        self.detect_reader(file)
    }

    /// Indented rendering of the matcher tree, one MIME type per line.
    /// Nodes with children are marked with `+`.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.root.render(0, &mut out);
        out
    }

    fn fail(&self, source: io::Error) -> DetectError {
        DetectError {
            fallback: Detection::from(self.root()),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{always, never};

    fn starts_with_a(input: &[u8]) -> bool {
        input.first() == Some(&b'a')
    }

    fn starts_with_ab(input: &[u8]) -> bool {
        input.starts_with(b"ab")
    }

    fn custom() -> MatcherNode {
        MatcherNode::new("root/any", "", always).with_children([
            MatcherNode::new("x/a", "a", starts_with_a)
                .with_children([MatcherNode::new("x/ab", "ab", starts_with_ab)]),
            // Shadowed by the sibling declared first
            MatcherNode::new("x/ab-late", "abl", starts_with_ab),
            MatcherNode::new("x/never", "n", never),
        ])
    }

    #[test]
    fn test_deepest_match_wins() {
        let classifier = Classifier::with_root(custom());
        assert_eq!(classifier.detect(b"abc").mime, "x/ab");
        assert_eq!(classifier.detect(b"axe").mime, "x/a");
        assert_eq!(classifier.detect(b"zzz").mime, "root/any");
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let root = custom();
        let node = root.deepest_match(b"ab");
        assert_eq!(node.extension(), "ab");
    }

    #[test]
    fn test_tree_rendering() {
        let classifier = Classifier::with_root(custom());
        let tree = classifier.tree();
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "+root/any");
        assert_eq!(lines[1], "|   +x/a");
        assert_eq!(lines[2], "|   |   x/ab");
        assert_eq!(lines.len(), 5);
        assert_eq!(classifier.root().node_count(), 5);
    }

    #[test]
    fn test_reader_error_falls_back_to_root() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let err = Classifier::new().detect_reader(Broken).unwrap_err();
        assert_eq!(err.fallback.mime, "application/octet-stream");
        assert_eq!(err.fallback.extension, "");
    }

    #[test]
    fn test_essence_strips_parameters() {
        let detection = Classifier::new().detect(b"<html><body></body></html>");
        assert_eq!(detection.mime, "text/html; charset=utf-8");
        assert_eq!(detection.essence(), "text/html");
    }

    #[test]
    fn test_standard_tree_is_shared() {
        let a = Classifier::new();
        let b = Classifier::new();
        assert!(Arc::ptr_eq(&a.root, &b.root));
    }
}

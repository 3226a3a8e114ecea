//! Content type sniffing for dirk.
//!
//! Detection walks a tree of byte predicates. The root matches anything
//! (`application/octet-stream`); each child refines its parent, and at every
//! level the first child whose predicate accepts the input is descended
//! into. The node where descent stops is the result, so a ZIP archive
//! containing `word/` is reported as a docx rather than a plain zip.
//!
//! ```rust
//! use dirk_mime::Classifier;
//!
//! let classifier = Classifier::new();
//! let detection = classifier.detect(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
//! assert_eq!(detection.mime, "image/png");
//! assert_eq!(detection.extension, "png");
//! ```

mod matchers;
mod signatures;
mod tree;

pub use matchers::{always, default_tree, never};
pub use signatures::{Signature, detect_any};
pub use tree::{Classifier, DetectError, Detection, MatchFn, MatcherNode};

/// Number of leading content bytes the classifier inspects.
pub const READ_LIMIT: usize = 520;

//! Textual signatures for markup and script detection.

/// A textual marker matched against the start of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// An opening tag such as `<HTML`, matched case-insensitively after
    /// leading whitespace and followed by a space or `>`.
    Markup(&'static [u8]),
    /// A case-insensitive prefix such as `<?PHP`.
    CaseInsensitive(&'static [u8]),
    /// A `#!` first line naming this interpreter. Trailing arguments and a
    /// version suffix (`python3`) are accepted.
    Shebang(&'static [u8]),
}

impl Signature {
    /// Check if the signature is present in `input`.
    pub fn detect(&self, input: &[u8]) -> bool {
        match *self {
            Signature::Markup(tag) => {
                let input = trim_leading_ws(input);
                ci_prefix(input, tag) && matches!(input.get(tag.len()), Some(b' ' | b'>'))
            }
            Signature::CaseInsensitive(marker) => {
                input.len() > marker.len() && ci_prefix(input, marker)
            }
            Signature::Shebang(interpreter) => shebang(input, interpreter),
        }
    }
}

/// Check if any of `signatures` is present in `input`.
pub fn detect_any(signatures: &[Signature], input: &[u8]) -> bool {
    signatures.iter().any(|sig| sig.detect(input))
}

/// Compare a prefix, folding the input to upper case wherever the
/// signature has an upper-case letter.
fn ci_prefix(input: &[u8], sig: &[u8]) -> bool {
    if input.len() < sig.len() {
        return false;
    }
    sig.iter().zip(input).all(|(&s, &b)| {
        if s.is_ascii_uppercase() {
            s == b.to_ascii_uppercase()
        } else {
            s == b
        }
    })
}

fn shebang(input: &[u8], interpreter: &[u8]) -> bool {
    let line = first_line(input);
    let Some(rest) = line.strip_prefix(b"#!") else {
        return false;
    };
    let command = trim_trailing_ws(trim_leading_ws(rest));
    let Some(tail) = command.strip_prefix(interpreter) else {
        return false;
    };
    match tail.first() {
        None => true,
        Some(b) => *b == b' ' || *b == b'\t' || b.is_ascii_digit() || *b == b'.',
    }
}

pub(crate) fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

pub(crate) fn trim_leading_ws(input: &[u8]) -> &[u8] {
    let start = input.iter().position(|&b| !is_ws(b)).unwrap_or(input.len());
    &input[start..]
}

fn trim_trailing_ws(input: &[u8]) -> &[u8] {
    let end = input.iter().rposition(|&b| !is_ws(b)).map_or(0, |i| i + 1);
    &input[..end]
}

fn first_line(input: &[u8]) -> &[u8] {
    let end = input.iter().position(|&b| b == b'\n').unwrap_or(input.len());
    &input[..end]
}

use Signature::{CaseInsensitive, Markup, Shebang};

pub const HTML: &[Signature] = &[
    Markup(b"<!DOCTYPE HTML"),
    Markup(b"<HTML"),
    Markup(b"<HEAD"),
    Markup(b"<SCRIPT"),
    Markup(b"<IFRAME"),
    Markup(b"<H1"),
    Markup(b"<DIV"),
    Markup(b"<FONT"),
    Markup(b"<TABLE"),
    Markup(b"<A"),
    Markup(b"<STYLE"),
    Markup(b"<TITLE"),
    Markup(b"<B"),
    Markup(b"<BODY"),
    Markup(b"<BR"),
    Markup(b"<P"),
    Markup(b"<!--"),
];

pub const XML: &[Signature] = &[Markup(b"<?XML")];

pub const PHP: &[Signature] = &[
    CaseInsensitive(b"<?PHP"),
    CaseInsensitive(b"<?\n"),
    CaseInsensitive(b"<?\r"),
    CaseInsensitive(b"<? "),
    Shebang(b"/usr/local/bin/php"),
    Shebang(b"/usr/bin/php"),
    Shebang(b"/usr/bin/env php"),
];

pub const JAVASCRIPT: &[Signature] = &[
    Shebang(b"/bin/node"),
    Shebang(b"/usr/bin/node"),
    Shebang(b"/bin/nodejs"),
    Shebang(b"/usr/bin/nodejs"),
    Shebang(b"/usr/bin/env node"),
    Shebang(b"/usr/bin/env nodejs"),
];

pub const LUA: &[Signature] = &[
    Shebang(b"/usr/bin/lua"),
    Shebang(b"/usr/local/bin/lua"),
    Shebang(b"/usr/bin/env lua"),
];

pub const PERL: &[Signature] = &[Shebang(b"/usr/bin/perl"), Shebang(b"/usr/bin/env perl")];

pub const PYTHON: &[Signature] = &[
    Shebang(b"/usr/bin/python"),
    Shebang(b"/usr/local/bin/python"),
    Shebang(b"/usr/bin/env python"),
];

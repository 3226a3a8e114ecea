//! Byte predicates and the default matcher tree.
//!
//! Every predicate is total: inputs shorter than the bytes it inspects are a
//! non-match, never a panic.

use serde::de::IgnoredAny;

use crate::READ_LIMIT;
use crate::signatures::{self, detect_any, trim_leading_ws};
use crate::tree::MatcherNode;

/// Build the standard matcher tree.
///
/// Children are tried in the order listed here; the first that matches is
/// descended into, so more specific or more common formats come first.
pub fn default_tree() -> MatcherNode {
    use MatcherNode as N;

    let zip_family = N::new("application/zip", "zip", zip).with_children([
        N::new(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xlsx",
            xlsx,
        ),
        N::new(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
            docx,
        ),
        N::new(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "pptx",
            pptx,
        ),
        N::new("application/epub+zip", "epub", epub),
        N::new("application/jar", "jar", jar).with_children([N::new(
            "application/vnd.android.package-archive",
            "apk",
            apk,
        )]),
    ]);

    let xml_family = N::new("text/xml; charset=utf-8", "xml", xml).with_children([
        N::new("image/svg+xml", "svg", svg),
        N::new("model/x3d+xml", "x3d", x3d),
        N::new("application/vnd.google-earth.kml+xml", "kml", kml),
        N::new("model/vnd.collada+xml", "dae", collada),
        N::new("application/gml+xml", "gml", gml),
        N::new("application/gpx+xml", "gpx", gpx),
    ]);

    let text_family = N::new("text/plain", "txt", text).with_children([
        N::new("text/html; charset=utf-8", "html", html),
        xml_family,
        N::new("text/x-php; charset=utf-8", "php", php),
        N::new("application/javascript", "js", javascript),
        N::new("text/x-lua", "lua", lua),
        N::new("text/x-perl", "pl", perl),
        N::new("application/x-python", "py", python),
        N::new("application/json", "json", json),
        N::new("text/rtf", "rtf", rtf),
    ]);

    N::new("application/octet-stream", "", always).with_children([
        N::new("application/x-7z-compressed", "7z", seven_z),
        zip_family,
        N::new("application/pdf", "pdf", pdf),
        N::new("application/postscript", "ps", postscript),
        N::new("application/x-photoshop", "psd", psd),
        N::new("application/ogg", "ogg", ogg),
        N::new("image/png", "png", png),
        N::new("image/jpeg", "jpg", jpeg),
        N::new("image/gif", "gif", gif),
        N::new("image/webp", "webp", webp),
        N::new("image/tiff", "tiff", tiff),
        N::new("image/bmp", "bmp", bmp),
        N::new("image/x-icon", "ico", ico),
        N::new("audio/mpeg", "mp3", mp3),
        N::new("audio/flac", "flac", flac),
        N::new("audio/midi", "midi", midi),
        N::new("audio/ape", "ape", ape),
        N::new("audio/musepack", "mpc", musepack),
        N::new("audio/amr", "amr", amr),
        N::new("audio/wav", "wav", wav),
        N::new("audio/aiff", "aiff", aiff),
        N::new("audio/basic", "au", au),
        N::new("video/mpeg", "mpeg", mpeg),
        N::new("video/quicktime", "mov", quicktime),
        N::new("video/mp4", "mp4", mp4),
        N::new("video/webm", "webm", webm),
        N::new("video/3gp", "3gp", three_gp),
        N::new("video/x-msvideo", "avi", avi),
        N::new("video/x-flv", "flv", flv),
        N::new("video/x-matroska", "mkv", mkv),
        text_family,
        N::new("application/gzip", "gz", gzip),
    ])
}

/// Matches any input.
pub fn always(_: &[u8]) -> bool {
    true
}

/// Matches nothing; useful for placeholder nodes in custom trees.
pub fn never(_: &[u8]) -> bool {
    false
}

fn at(input: &[u8], offset: usize, expected: &[u8]) -> bool {
    input.get(offset..offset + expected.len()) == Some(expected)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// Archives and documents

fn seven_z(input: &[u8]) -> bool {
    input.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C])
}

fn zip(input: &[u8]) -> bool {
    matches!(
        input,
        [0x50, 0x4B, 0x03 | 0x05 | 0x07, 0x04 | 0x06 | 0x08, ..]
    )
}

fn xlsx(input: &[u8]) -> bool {
    contains(input, b"xl/")
}

fn docx(input: &[u8]) -> bool {
    contains(input, b"word/")
}

fn pptx(input: &[u8]) -> bool {
    contains(input, b"ppt/")
}

fn epub(input: &[u8]) -> bool {
    at(input, 30, b"mimetypeapplication/epub+zip")
}

fn jar(input: &[u8]) -> bool {
    contains(input, b"META-INF/MANIFEST.MF")
}

fn apk(input: &[u8]) -> bool {
    contains(input, b"AndroidManifest.xml")
}

fn gzip(input: &[u8]) -> bool {
    input.starts_with(&[0x1F, 0x8B])
}

fn pdf(input: &[u8]) -> bool {
    input.starts_with(b"%PDF")
}

fn postscript(input: &[u8]) -> bool {
    input.starts_with(b"%!PS-Adobe-")
}

fn psd(input: &[u8]) -> bool {
    input.starts_with(b"8BPS")
}

fn ogg(input: &[u8]) -> bool {
    input.starts_with(b"OggS\x00")
}

// Images

fn png(input: &[u8]) -> bool {
    input.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
}

fn jpeg(input: &[u8]) -> bool {
    input.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn gif(input: &[u8]) -> bool {
    input.starts_with(b"GIF87a") || input.starts_with(b"GIF89a")
}

fn webp(input: &[u8]) -> bool {
    input.starts_with(b"RIFF") && at(input, 8, b"WEBP")
}

fn tiff(input: &[u8]) -> bool {
    input.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || input.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
}

fn bmp(input: &[u8]) -> bool {
    input.starts_with(b"BM")
}

fn ico(input: &[u8]) -> bool {
    input.starts_with(&[0x00, 0x00, 0x01, 0x00])
}

// Audio

fn mp3(input: &[u8]) -> bool {
    input.starts_with(b"ID3")
}

fn flac(input: &[u8]) -> bool {
    input.starts_with(b"fLaC\x00\x00\x00\x22")
}

fn midi(input: &[u8]) -> bool {
    input.starts_with(b"MThd")
}

fn ape(input: &[u8]) -> bool {
    input.starts_with(b"MAC \x96\x0F\x00\x00\x34\x00\x00\x00\x18\x00\x00\x00\x90\xE3")
}

fn musepack(input: &[u8]) -> bool {
    input.starts_with(b"MPCK")
}

fn amr(input: &[u8]) -> bool {
    input.starts_with(b"#!AMR")
}

fn wav(input: &[u8]) -> bool {
    input.starts_with(b"RIFF") && at(input, 8, b"WAVE")
}

fn aiff(input: &[u8]) -> bool {
    input.starts_with(b"FORM") && at(input, 8, b"AIFF")
}

fn au(input: &[u8]) -> bool {
    input.starts_with(b".snd")
}

// Video

fn mpeg(input: &[u8]) -> bool {
    matches!(input, [0x00, 0x00, 0x01, 0xB0..=0xBF, ..])
}

fn quicktime(input: &[u8]) -> bool {
    input.len() > 12 && (at(input, 4, b"ftypqt  ") || at(input, 4, b"moov"))
}

/// An `ftyp` box whose size is a multiple of four and which lists an `mp4`
/// brand, the minor version slot excepted.
fn mp4(input: &[u8]) -> bool {
    let Some(size) = input.get(..4) else {
        return false;
    };
    let box_size = u32::from_be_bytes([size[0], size[1], size[2], size[3]]) as usize;
    if box_size % 4 != 0 || input.len() < box_size || !at(input, 4, b"ftyp") {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| at(input, offset, b"mp4"))
}

fn three_gp(input: &[u8]) -> bool {
    input.len() > 11 && at(input, 4, b"ftyp3gp")
}

fn avi(input: &[u8]) -> bool {
    input.len() > 16 && input.starts_with(b"RIFF") && at(input, 8, b"AVI LIST")
}

fn flv(input: &[u8]) -> bool {
    input.starts_with(b"FLV\x01")
}

fn webm(input: &[u8]) -> bool {
    matroska_doc_type(input, b"webm")
}

fn mkv(input: &[u8]) -> bool {
    matroska_doc_type(input, b"matroska")
}

/// EBML header followed by a DocType element (`42 82`, one size byte) naming `doc_type`.
fn matroska_doc_type(input: &[u8], doc_type: &[u8]) -> bool {
    if !input.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return false;
    }
    let window = &input[..input.len().min(4096)];
    match window.windows(2).position(|w| w == [0x42, 0x82]) {
        Some(index) if index > 0 => input
            .get(index + 3..)
            .is_some_and(|rest| rest.starts_with(doc_type)),
        _ => false,
    }
}

// Text

/// Rejects control bytes other than tab, newline, form feed, carriage
/// return and escape.
fn text(input: &[u8]) -> bool {
    !trim_leading_ws(input)
        .iter()
        .any(|&b| b <= 0x08 || b == 0x0B || (0x0E..=0x1A).contains(&b) || (0x1C..=0x1F).contains(&b))
}

fn html(input: &[u8]) -> bool {
    detect_any(signatures::HTML, input)
}

fn xml(input: &[u8]) -> bool {
    detect_any(signatures::XML, input)
}

fn svg(input: &[u8]) -> bool {
    contains(input, b"<svg")
}

fn x3d(input: &[u8]) -> bool {
    contains(input, b"<X3D")
}

fn kml(input: &[u8]) -> bool {
    contains(input, b"<kml")
}

fn collada(input: &[u8]) -> bool {
    contains(input, b"<COLLADA")
}

fn gml(input: &[u8]) -> bool {
    contains(input, b"xmlns:gml")
}

fn gpx(input: &[u8]) -> bool {
    contains(input, b"<gpx")
}

fn php(input: &[u8]) -> bool {
    detect_any(signatures::PHP, input)
}

fn javascript(input: &[u8]) -> bool {
    detect_any(signatures::JAVASCRIPT, input)
}

fn lua(input: &[u8]) -> bool {
    detect_any(signatures::LUA, input)
}

fn perl(input: &[u8]) -> bool {
    detect_any(signatures::PERL, input)
}

fn python(input: &[u8]) -> bool {
    detect_any(signatures::PYTHON, input)
}

/// A JSON object or array. A prefix cut at the read limit only has to be
/// valid up to where it was cut.
fn json(input: &[u8]) -> bool {
    let trimmed = trim_leading_ws(input);
    if !matches!(trimmed.first(), Some(b'{' | b'[')) {
        return false;
    }
    match serde_json::from_slice::<IgnoredAny>(trimmed) {
        Ok(_) => true,
        Err(err) => input.len() >= READ_LIMIT && err.is_eof(),
    }
}

fn rtf(input: &[u8]) -> bool {
    input.starts_with(b"{\\rtf1")
}

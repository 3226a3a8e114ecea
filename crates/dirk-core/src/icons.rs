//! Nerd Font glyphs keyed by extension or category.

/// Icon for directories.
pub const FOLDER_ICON: &str = "\u{E5FF}";

/// Icon for files without a specific glyph.
pub const DEFAULT_ICON: &str = "\u{F15C}";

/// Glyph for an extension (without the leading dot), if one is known.
pub fn icon_for_extension(extension: &str) -> Option<&'static str> {
    let icon = match extension {
        "7z" | "apk" | "bz2" | "cab" | "cpio" | "deb" | "gem" | "gz" | "gzip" | "lha" | "lzh"
        | "lzma" | "rar" | "rpm" | "tar" | "tgz" | "xz" | "zip" => "\u{F187}",
        "ai" => "\u{E7B4}",
        "avi" | "flv" | "mkv" | "mov" | "mp4" | "mpeg" | "mpg" => "\u{F008}",
        "bat" | "conf" | "ini" | "rc" | "yml" => "\u{E615}",
        "bmp" | "gif" | "ico" | "jpeg" | "jpg" | "png" => "\u{E60D}",
        "c" => "\u{E61E}",
        "c++" | "cc" | "cp" | "cpp" | "cxx" => "\u{E61D}",
        "clj" | "cljc" => "\u{E768}",
        "cljs" | "edn" => "\u{E76A}",
        "coffee" => "\u{E61B}",
        "css" | "less" => "\u{E614}",
        "d" => "\u{E7AF}",
        "dart" => "\u{E798}",
        "db" | "dump" | "sql" => "\u{E706}",
        "diff" => "\u{E728}",
        "ejs" | "htm" | "html" | "slim" | "xml" => "\u{E60E}",
        "epub" => "\u{F02D}",
        "erl" | "hrl" => "\u{E7B1}",
        "f#" | "fs" | "fsi" | "fsscript" | "fsx" => "\u{E7A7}",
        "fish" | "sh" => "\u{E795}",
        "flac" | "mp3" | "ogg" | "wav" => "\u{F001}",
        "go" => "\u{E627}",
        "hbs" | "mustache" => "\u{E60F}",
        "hs" | "lhs" => "\u{E61F}",
        "java" => "\u{E738}",
        "jl" => "\u{E624}",
        "js" => "\u{E60C}",
        "json" => "\u{E60B}",
        "jsx" => "\u{E7BA}",
        "log" => "\u{F1EA}",
        "lua" => "\u{E620}",
        "markdown" | "md" => "\u{E609}",
        "ml" | "mli" => "\u{3BB}",
        "pdf" => "\u{F1C1}",
        "php" => "\u{E608}",
        "pl" | "pm" | "t" => "\u{E769}",
        "psb" | "psd" => "\u{E7B8}",
        "py" | "pyc" | "pyd" | "pyo" => "\u{E606}",
        "rb" => "\u{E791}",
        "rlib" | "rs" => "\u{E7A8}",
        "rss" => "\u{E619}",
        "scala" => "\u{E737}",
        "scss" => "\u{E603}",
        "sln" | "suo" => "\u{E70C}",
        "styl" => "\u{E600}",
        "ts" => "\u{E628}",
        "twig" => "\u{E61C}",
        "vim" | "vimrc" => "\u{E7C5}",
        "xul" => "\u{E745}",
        _ => return None,
    };
    Some(icon)
}

/// Glyph for a file: directories get the folder icon, everything else is
/// looked up by extension with the default icon as fallback.
pub fn icon_for(is_dir: bool, extension: &str) -> &'static str {
    if is_dir {
        return FOLDER_ICON;
    }
    icon_for_extension(extension).unwrap_or(DEFAULT_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(icon_for_extension("rs"), Some("\u{E7A8}"));
        assert_eq!(icon_for_extension("zip"), icon_for_extension("tar"));
        assert_eq!(icon_for_extension("ml"), Some("\u{3BB}"));
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(icon_for_extension("unknown-ext"), None);
        assert_eq!(icon_for(false, "unknown-ext"), DEFAULT_ICON);
        assert_eq!(icon_for(true, "rs"), FOLDER_ICON);
    }
}

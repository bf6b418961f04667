//! Filename sanitizing and content-type lookup.

use std::path::Path;

/// Reduce a media title to a filename safe for any filesystem and header.
///
/// Letters and digits of any script survive, along with `_ - . ( )` and
/// spaces. Everything else becomes `_`. Returns `fallback` when nothing
/// usable remains.
pub fn safe_filename(name: &str, fallback: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut cleaned = replaced;
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }
    while cleaned.contains("__") {
        cleaned = cleaned.replace("__", "_");
    }

    let trimmed = cleaned.trim_matches(|c| matches!(c, ' ' | '.' | '_'));
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize only the stem of `path`, keeping its extension.
pub fn safe_file_name_for(path: &Path, fallback: &str) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = safe_filename(stem, fallback);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext.to_lowercase()),
        _ => stem,
    }
}

/// Content type for a file, derived from its extension.
pub fn guess_mimetype(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_safe_filename_keeps_unicode_letters() {
        assert_eq!(safe_filename("Видео тест (2024)", "video"), "Видео тест (2024)");
        assert_eq!(safe_filename("  My Clip - part 1 ", "video"), "My Clip - part 1");
    }

    #[test]
    fn test_safe_filename_strips_path_tricks() {
        let name = safe_filename("../../etc/passwd", "video");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(!name.starts_with('.'));

        let name = safe_filename("a:b*c?d\"e<f>g|h", "video");
        assert_eq!(name, "a_b_c_d_e_f_g_h");
    }

    #[test]
    fn test_safe_filename_fallback() {
        assert_eq!(safe_filename("", "video"), "video");
        assert_eq!(safe_filename("///", "video"), "video");
        assert_eq!(safe_filename("...", "audio"), "audio");
    }

    #[test]
    fn test_safe_file_name_for_keeps_extension() {
        let path = PathBuf::from("/tmp/x/Some: title.MP4");
        assert_eq!(safe_file_name_for(&path, "video"), "Some_ title.mp4");
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype(Path::new("a.mp4")), "video/mp4");
        assert_eq!(guess_mimetype(Path::new("a.MKV")), "video/x-matroska");
        assert_eq!(guess_mimetype(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(guess_mimetype(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(guess_mimetype(Path::new("a.ogg")), "audio/ogg");
        assert_eq!(guess_mimetype(Path::new("noext")), "application/octet-stream");
    }
}

//! Filesystem-safe path segments.

/// Characters Windows refuses in file and directory names.
const INVALID_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a string for use as a single file or directory name.
///
/// - trims surrounding whitespace
/// - replaces each of `\ / : * ? " < > |` with `_`
/// - strips trailing dots and spaces (and leading dots)
/// - truncates to `max_length` characters, then strips trailing `_`, `.`
///   and spaces left by the cut
/// - returns `"_"` if nothing is left
///
/// Length is counted in characters, not bytes. `max_length` should be at
/// least 1; the placeholder is returned even when it is 0.
///
/// # Examples
/// - `"My File: Test.txt"` → `"My File_ Test.txt"`
/// - `"  spaces  "` → `"spaces"`
pub fn sanitize(value: &str, max_length: usize) -> String {
    let replaced: String = value
        .trim()
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut result = replaced
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();

    if result.chars().count() > max_length {
        let truncated: String = result.chars().take(max_length).collect();
        result = truncated
            .trim_end_matches(|c: char| c == '_' || c == '.' || c.is_whitespace())
            .to_string();
    }

    if result.is_empty() {
        "_".to_string()
    } else {
        result
    }
}

/// Extensions longer than this are treated as part of the stem.
const MAX_EXTENSION_BYTES: usize = 16;

/// Shorten `name` to at most `max_bytes` of UTF-8, cutting the stem and
/// keeping the extension.
///
/// The cut falls on a character boundary and the same debris as in
/// [`sanitize`] is stripped from the end of the stem. Names that already
/// fit are returned unchanged.
pub fn fit_file_name(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };

    let stem = truncate_bytes(stem, max_bytes.saturating_sub(ext.len()))
        .trim_end_matches(|c: char| c == '_' || c == '.' || c.is_whitespace());
    let stem = if stem.is_empty() { "_" } else { stem };
    format!("{stem}{ext}")
}

fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_string_unchanged() {
        assert_eq!(sanitize("Normal File Name", 255), "Normal File Name");
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            sanitize("File:With*Invalid?Chars<>|\"", 255),
            "File_With_Invalid_Chars____"
        );
        assert_eq!(sanitize("path/to/file", 255), "path_to_file");
        assert_eq!(sanitize("path\\to\\file", 255), "path_to_file");
    }

    #[test]
    fn test_trailing_spaces_and_dots() {
        assert_eq!(sanitize("file  ", 255), "file");
        assert_eq!(sanitize("file...", 255), "file");
        assert_eq!(sanitize("file. . .", 255), "file");
        assert_eq!(sanitize("  file", 255), "file");
    }

    #[test]
    fn test_never_starts_with_dot() {
        assert_eq!(sanitize(".hidden", 255), "hidden");
        assert_eq!(sanitize("...", 255), "_");
    }

    #[test]
    fn test_max_length() {
        let long = "a".repeat(300);
        assert_eq!(sanitize(&long, 100).len(), 100);
    }

    #[test]
    fn test_truncation_strips_cut_debris() {
        // Cut lands right after "_ ." → debris is removed
        assert_eq!(sanitize("abc: .def", 6), "abc");
        assert_eq!(sanitize("Re: Invoice", 3), "Re");
    }

    #[test]
    fn test_length_counts_characters() {
        let s = sanitize("ééééé", 3);
        assert_eq!(s, "ééé");
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(sanitize("", 255), "_");
        assert_eq!(sanitize("   ", 255), "_");
        assert_eq!(sanitize("___", 2), "_");
    }

    #[test]
    fn test_properties_over_samples() {
        let samples = [
            "",
            " ",
            "\t.\t",
            "a/b\\c:d*e?f\"g<h>i|j",
            " . Report Q1 .. ",
            "ñandú: ¿qué?",
            "x".repeat(500).as_str(),
            "ends with tab\t.",
        ]
        .map(String::from);

        for s in &samples {
            for n in [1usize, 5, 50, 255] {
                let out = sanitize(s, n);
                assert!(out.chars().count() <= n, "{out:?} longer than {n}");
                assert!(
                    !out.chars().any(|c| INVALID_CHARS.contains(&c)),
                    "{out:?} contains an invalid char"
                );
                assert!(!out.starts_with(|c: char| c == '.' || c.is_whitespace()));
                assert!(!out.ends_with(|c: char| c == '.' || c.is_whitespace()));
            }
        }
    }

    #[test]
    fn test_fit_file_name_short_name_unchanged() {
        assert_eq!(fit_file_name("invoice.pdf", 247), "invoice.pdf");
    }

    #[test]
    fn test_fit_file_name_counts_bytes() {
        let name = format!("{}.pdf", "я".repeat(200));
        let fitted = fit_file_name(&name, 247);
        assert!(fitted.len() <= 247, "{} bytes", fitted.len());
        assert!(fitted.ends_with(".pdf"));
        assert!(fitted.starts_with("яя"));
        // 243 bytes for the stem is 121 two-byte characters
        assert_eq!(fitted.trim_end_matches(".pdf").chars().count(), 121);
    }

    #[test]
    fn test_fit_file_name_keeps_extension() {
        let name = format!("{}.pdf", "a".repeat(252));
        let fitted = fit_file_name(&name, 247);
        assert_eq!(fitted, format!("{}.pdf", "a".repeat(243)));
    }

    #[test]
    fn test_fit_file_name_long_extension_is_stem() {
        let name = format!("report.{}", "x".repeat(300));
        let fitted = fit_file_name(&name, 100);
        assert_eq!(fitted.len(), 100);
        assert!(fitted.starts_with("report.xxx"));
    }

    #[test]
    fn test_fit_file_name_strips_cut_debris() {
        assert_eq!(fit_file_name("abc_ def.txt", 8), "abc.txt");
        assert_eq!(fit_file_name("____.txt", 6), "_.txt");
    }
}

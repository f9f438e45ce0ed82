//! Output tree layout: `base/<sender>/<subject>/<date>/`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::sanitize::sanitize;
use crate::error::{ExportError, Result};

/// Longest directory path we build, leaving room under the 260-character
/// Windows ceiling for a filename.
pub const MAX_FOLDER_PATH_LEN: usize = 200;

/// Sender segment length.
const SENDER_MAX_LEN: usize = 120;

/// Subject length tried when the configured one makes the path too long.
const SHORT_SUBJECT_LEN: usize = 50;

/// Length of the flat `<sender>_<date>` fallback segment.
const FLAT_FALLBACK_LEN: usize = 100;

/// Build the folder for one message: `base/<sender>/<subject>/<date>`.
///
/// When the resulting path is longer than [`MAX_FOLDER_PATH_LEN`] characters
/// the subject is shortened step by step, stopping at the first step that
/// fits:
/// 1. subject cut to 50 characters
/// 2. subject replaced by `subj_<8 hex>` derived from the raw subject
/// 3. a single flat `base/<sender>_<date>` folder
///
/// Nothing is created on disk; see [`create_folder`].
pub fn build_folder(
    base_dir: &Path,
    sender_email: &str,
    subject: &str,
    date: &str,
    subject_max_length: usize,
) -> PathBuf {
    let sender = sanitize(sender_email, SENDER_MAX_LEN);

    let target = base_dir
        .join(&sender)
        .join(sanitize(subject, subject_max_length))
        .join(date);
    if fits(&target) {
        return target;
    }

    let target = base_dir
        .join(&sender)
        .join(sanitize(subject, SHORT_SUBJECT_LEN))
        .join(date);
    if fits(&target) {
        debug!(path = %target.display(), "Shortened subject to fit path limit");
        return target;
    }

    let target = base_dir
        .join(&sender)
        .join(format!("subj_{}", subject_digest(subject)))
        .join(date);
    if fits(&target) {
        debug!(path = %target.display(), "Replaced subject with digest to fit path limit");
        return target;
    }

    let flat = base_dir.join(sanitize(&format!("{sender}_{date}"), FLAT_FALLBACK_LEN));
    debug!(path = %flat.display(), "Using flat folder to fit path limit");
    flat
}

/// Create `dir` and its parents. Succeeds if it already exists.
pub fn create_folder(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))
}

/// First 8 hex characters of SHA-256 over the unsanitized subject.
fn subject_digest(subject: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..8].to_string()
}

fn fits(path: &Path) -> bool {
    path.to_string_lossy().chars().count() <= MAX_FOLDER_PATH_LEN
}

/// If `path` already exists, append `_1`, `_2`, … to the stem until it doesn't.
///
/// `report.pdf` → `report_1.pdf`; `README` → `README_1`.
pub fn ensure_unique_path(path: &Path) -> PathBuf {
    unique_path_with(path, Path::exists)
}

/// Like [`ensure_unique_path`], with `taken` deciding which names are in use.
pub fn unique_path_with(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut counter: u64 = 1;
    loop {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{counter}"))
        } else {
            parent.join(format!("{stem}_{counter}.{ext}"))
        };
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Link from a file in `from_dir` to `target`, with forward slashes.
///
/// Falls back to the absolute target when it is not below `from_dir`.
pub fn relative_link(from_dir: &Path, target: &Path) -> String {
    let rel = target.strip_prefix(from_dir).unwrap_or(target);
    rel.to_string_lossy().replace('\\', "/")
}

/// Human-readable size, base 1024, one decimal: `1536` → `"1.5 KB"`.
pub fn format_file_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_folder() {
        let base = Path::new("/tmp/exports");
        let result = build_folder(base, "sender@example.com", "Test Email", "2024-01-15", 80);
        assert_eq!(
            result,
            base.join("sender@example.com")
                .join("Test Email")
                .join("2024-01-15")
        );
    }

    #[test]
    fn test_folder_segments_are_sanitized() {
        let base = Path::new("/tmp/exports");
        let result = build_folder(base, "weird:name", "Re: a/b", "2024-01-15", 80);
        assert_eq!(
            result,
            base.join("weird_name").join("Re_ a_b").join("2024-01-15")
        );
    }

    #[test]
    fn test_long_subject_is_capped() {
        let base = Path::new("/tmp/exports");
        let subject = "A".repeat(300);
        let result = build_folder(base, "weird:name", &subject, "2024-01-15", 80);
        let segments: Vec<_> = result
            .strip_prefix(base)
            .unwrap()
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        assert_eq!(segments[0], "weird_name");
        assert_eq!(segments[1], "A".repeat(80));
        assert_eq!(segments[2], "2024-01-15");
        assert!(result.to_string_lossy().len() <= MAX_FOLDER_PATH_LEN);
    }

    #[test]
    fn test_falls_back_to_short_subject() {
        // 100 + sender + date pushes an 80-char subject over the limit
        let base = PathBuf::from(format!("/{}", "b".repeat(100)));
        let result = build_folder(&base, "s@x.com", &"S".repeat(90), "2024-01-15", 80);
        let subject = result.parent().unwrap().file_name().unwrap();
        assert_eq!(subject.to_string_lossy(), "S".repeat(50));
    }

    #[test]
    fn test_falls_back_to_subject_digest() {
        // Too long even with a 50-char subject, short enough for the digest
        let base = PathBuf::from(format!("/{}", "b".repeat(150)));
        let result = build_folder(&base, "s@x.com", &"S".repeat(90), "2024-01-15", 80);
        let subject = result
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(subject.starts_with("subj_"));
        assert_eq!(subject.len(), "subj_".len() + 8);
        assert!(result.to_string_lossy().len() <= MAX_FOLDER_PATH_LEN);
    }

    #[test]
    fn test_digest_is_of_raw_subject() {
        assert_eq!(subject_digest("Re: hello"), subject_digest("Re: hello"));
        assert_ne!(subject_digest("Re: hello"), subject_digest("Re_ hello"));
    }

    #[test]
    fn test_falls_back_to_flat_folder() {
        let base = PathBuf::from(format!("/{}", "b".repeat(150)));
        let sender = format!("{}@example.com", "s".repeat(60));
        let result = build_folder(&base, &sender, "Subject", "2024-01-15", 80);
        assert_eq!(result.parent().unwrap(), base.as_path());
        let name = result.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.chars().count() <= 100);
        assert!(name.starts_with("sss"));
    }

    #[test]
    fn test_create_folder_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b").join("c");
        create_folder(&dir).unwrap();
        create_folder(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_unique_path_nonexistent_is_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.pdf");
        assert_eq!(ensure_unique_path(&path), path);
        assert_eq!(ensure_unique_path(&path), path);
    }

    #[test]
    fn test_unique_path_skips_numbered_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("f.txt"), "0").unwrap();
        for i in 1..=3 {
            std::fs::write(tmp.path().join(format!("f_{i}.txt")), "x").unwrap();
        }
        assert_eq!(ensure_unique_path(&tmp.path().join("f.txt")), tmp.path().join("f_4.txt"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("README"), "x").unwrap();
        assert_eq!(ensure_unique_path(&tmp.path().join("README")), tmp.path().join("README_1"));
    }

    #[test]
    fn test_unique_path_with_planned_names() {
        let planned = [PathBuf::from("/out/scan.png"), PathBuf::from("/out/scan_1.png")];
        let path = unique_path_with(Path::new("/out/scan.png"), |p| planned.iter().any(|q| q == p));
        assert_eq!(path, Path::new("/out/scan_2.png"));
    }

    #[test]
    fn test_relative_link() {
        let dir = Path::new("/out/a/b");
        assert_eq!(relative_link(dir, Path::new("/out/a/b/file.pdf")), "file.pdf");
        assert_eq!(
            relative_link(dir, Path::new("/out/a/b/duplicates/file.pdf")),
            "duplicates/file.pdf"
        );
        assert_eq!(relative_link(dir, Path::new("/elsewhere/x.pdf")), "/elsewhere/x.pdf");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_file_size(1536 * 1000), "1.5 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5.0 GB");
        assert_eq!(format_file_size(2 * 1024u64.pow(4)), "2.0 TB");
    }
}

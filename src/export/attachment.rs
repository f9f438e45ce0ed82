//! Save a message's attachments with duplicate detection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{message_folder, output_file_name};
use crate::client::{AttachmentHandle, MessageHandle};
use crate::dedup::{DuplicateStats, DuplicateTracker};
use crate::error::{ExportError, Result};
use crate::model::attachment::{AttachmentInfo, SavedAttachment};
use crate::model::email::EmailMetadata;
use crate::model::result::ExportResult;
use crate::model::settings::ExportSettings;
use crate::storage::{create_folder, ensure_unique_path, unique_path_with};

/// Writes attachments into the message folder, moving repeated content
/// into the duplicates subfolder.
#[derive(Debug)]
pub struct AttachmentExporter {
    settings: ExportSettings,
    tracker: DuplicateTracker,
    /// Paths handed out during a dry run, where nothing lands on disk.
    planned: HashSet<PathBuf>,
}

impl AttachmentExporter {
    /// Fails if the configured hash algorithm is not supported.
    pub fn new(settings: &ExportSettings) -> Result<Self> {
        Ok(Self {
            tracker: DuplicateTracker::new(&settings.hash_algorithm)?,
            settings: settings.clone(),
            planned: HashSet::new(),
        })
    }

    /// Export every attachment of one message. Returns the folder, or
    /// `None` when nothing was saved.
    pub fn export<M: MessageHandle + ?Sized>(
        &mut self,
        email: &EmailMetadata,
        message: &M,
        result: &mut ExportResult,
    ) -> Option<PathBuf> {
        if !email.has_attachments() {
            return None;
        }
        let folder = match message_folder(&self.settings, email) {
            Ok(folder) => folder,
            Err(e) => {
                warn!(subject = %email.subject, error = %e, "Failed to create message folder");
                result.add_error(format!("Failed to create folder for '{}': {e}", email.subject));
                return None;
            }
        };
        let saved = self.save_all(email, message, &folder, result);
        if saved.is_empty() {
            None
        } else {
            Some(folder)
        }
    }

    /// Save each attachment into `folder`. Failures are recorded per
    /// attachment and do not stop the rest.
    pub fn save_all<M: MessageHandle + ?Sized>(
        &mut self,
        email: &EmailMetadata,
        message: &M,
        folder: &Path,
        result: &mut ExportResult,
    ) -> Vec<SavedAttachment> {
        let mut saved = Vec::new();
        for index in 0..email.attachment_count {
            let attachment = match message.attachment(index) {
                Ok(a) => a,
                Err(e) => {
                    debug!(index, error = %e, "Cannot access attachment");
                    result.add_error(format!(
                        "Failed to access attachment {} of '{}': {e}",
                        index + 1,
                        email.subject
                    ));
                    continue;
                }
            };
            match self.save_one(&attachment, folder, result) {
                Ok(Some(s)) => saved.push(s),
                Ok(None) => {}
                Err(e) => {
                    warn!(subject = %email.subject, error = %e, "Failed to save attachment");
                    result.add_error(format!(
                        "Failed to save attachment of '{}': {e}",
                        email.subject
                    ));
                }
            }
        }
        saved
    }

    fn save_one<A: AttachmentHandle + ?Sized>(
        &mut self,
        attachment: &A,
        folder: &Path,
        result: &mut ExportResult,
    ) -> Result<Option<SavedAttachment>> {
        let mut info = AttachmentInfo::from_handle(attachment);
        if info.is_inline && !self.settings.include_inline {
            debug!(filename = %info.filename, "Skipping inline attachment");
            return Ok(None);
        }

        let filename = output_file_name(&info.filename, None);
        let dest = folder.join(&filename);

        if self.settings.dry_run {
            let planned = &self.planned;
            let path = unique_path_with(&dest, |p| p.exists() || planned.contains(p));
            self.planned.insert(path.clone());
            info!(path = %path.display(), "[DRY-RUN] Would save attachment");
            result.attachments_saved += 1;
            result.bytes_saved += info.size;
            return Ok(Some(SavedAttachment {
                info,
                path,
                duplicate: false,
            }));
        }

        // Removed on drop if anything below fails.
        let temp = tempfile::Builder::new()
            .prefix(".part-")
            .tempfile_in(folder)
            .map_err(|e| ExportError::io(folder, e))?;
        attachment.save_as_file(temp.path())?;

        let (hash, path, duplicate) = self.place(temp, folder, &filename)?;

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(info.size);
        result.attachments_saved += 1;
        result.bytes_saved += size;
        if duplicate {
            result.duplicates_found += 1;
        }

        info.content_hash = Some(hash);
        Ok(Some(SavedAttachment {
            info,
            path,
            duplicate,
        }))
    }

    /// Hash the temp file and move it to its final location.
    fn place(
        &mut self,
        temp: NamedTempFile,
        folder: &Path,
        filename: &str,
    ) -> Result<(String, PathBuf, bool)> {
        let hash = self.tracker.compute_hash(temp.path())?;
        let duplicate = self.tracker.is_duplicate(&hash);

        let path = if duplicate {
            let dup_dir = folder.join(&self.settings.duplicates_subfolder);
            create_folder(&dup_dir)?;
            ensure_unique_path(&dup_dir.join(filename))
        } else {
            ensure_unique_path(&folder.join(filename))
        };
        temp.persist_noclobber(&path)
            .map_err(|e| ExportError::io(&path, e.error))?;

        if duplicate {
            info!(
                path = %path.display(),
                original = ?self.tracker.original(&hash),
                "Duplicate detected"
            );
        } else {
            debug!(path = %path.display(), "Saved attachment");
        }
        self.tracker.register(&hash, &path);
        Ok((hash, path, duplicate))
    }

    /// Tracker counts for the run so far.
    pub fn duplicate_stats(&self) -> DuplicateStats {
        self.tracker.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::{MemoryAttachment, MemoryMessage};
    use chrono::NaiveDate;

    fn message(subject: &str) -> MemoryMessage {
        let when = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        MemoryMessage::new(subject, "alice@example.com", when)
    }

    fn run(
        exporter: &mut AttachmentExporter,
        msg: &MemoryMessage,
        result: &mut ExportResult,
    ) -> Option<PathBuf> {
        let email = EmailMetadata::from_handle(msg);
        exporter.export(&email, msg, result)
    }

    #[test]
    fn test_saves_into_message_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new(tmp.path());
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let msg = message("Report").with_attachment(MemoryAttachment::new("q1.pdf", b"pdf-bytes"));
        let folder = run(&mut exporter, &msg, &mut result).unwrap();

        assert_eq!(
            folder,
            tmp.path().join("alice@example.com").join("Report").join("2024-01-15")
        );
        assert_eq!(std::fs::read(folder.join("q1.pdf")).unwrap(), b"pdf-bytes");
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 1);
        assert_eq!(result.attachments_saved, 1);
        assert_eq!(result.bytes_saved, 9);
    }

    #[test]
    fn test_duplicate_content_goes_to_subfolder() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new(tmp.path());
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let first = message("First").with_attachment(MemoryAttachment::new("a.txt", b"same"));
        let second = message("Second").with_attachment(MemoryAttachment::new("b.txt", b"same"));
        run(&mut exporter, &first, &mut result);
        let folder = run(&mut exporter, &second, &mut result).unwrap();

        assert!(folder.join("duplicates").join("b.txt").exists());
        assert!(!folder.join("b.txt").exists());
        assert_eq!(result.attachments_saved, 2);
        assert_eq!(result.duplicates_found, 1);

        let stats = exporter.duplicate_stats();
        assert_eq!((stats.unique_files, stats.duplicate_files), (1, 1));
    }

    #[test]
    fn test_inline_skipped_unless_included() {
        let tmp = tempfile::tempdir().unwrap();
        let msg = message("Sig")
            .with_attachment(MemoryAttachment::new("logo.png", b"img").with_position(0));

        let mut settings = ExportSettings::new(tmp.path());
        let mut result = ExportResult::default();
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        assert!(run(&mut exporter, &msg, &mut result).is_none());
        assert_eq!(result.attachments_saved, 0);

        settings.include_inline = true;
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        assert!(run(&mut exporter, &msg, &mut result).is_some());
        assert_eq!(result.attachments_saved, 1);
    }

    #[test]
    fn test_failed_save_is_recorded_and_rest_continue() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new(tmp.path());
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let msg = message("Mixed")
            .with_attachment(MemoryAttachment::new("bad.bin", b"x").failing_save())
            .with_attachment(MemoryAttachment::new("good.bin", b"y"));
        let folder = run(&mut exporter, &msg, &mut result).unwrap();

        assert!(folder.join("good.bin").exists());
        assert_eq!(result.attachments_saved, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Mixed"));
    }

    #[test]
    fn test_partial_write_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new(tmp.path());
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let msg = message("Interrupted")
            .with_attachment(MemoryAttachment::new("big.bin", &[7u8; 4096]).failing_save())
            .with_attachment(MemoryAttachment::new("small.bin", b"ok"));
        let folder = run(&mut exporter, &msg, &mut result).unwrap();

        let names: Vec<_> = std::fs::read_dir(&folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["small.bin".to_string()]);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_long_names_fit_the_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings::new(tmp.path());
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let ascii = format!("{}.pdf", "a".repeat(248));
        let cyrillic = format!("{}.pdf", "я".repeat(200));
        let msg = message("Long names")
            .with_attachment(MemoryAttachment::new(&ascii, b"one"))
            .with_attachment(MemoryAttachment::new(&ascii, b"two"))
            .with_attachment(MemoryAttachment::new(&cyrillic, b"three"));
        let folder = run(&mut exporter, &msg, &mut result).unwrap();

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.attachments_saved, 3);
        let names: Vec<_> = std::fs::read_dir(&folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        for name in &names {
            assert!(name.len() <= 255, "{} bytes", name.len());
            assert!(name.ends_with(".pdf"));
        }
        let short_ascii: Vec<_> = names.iter().filter(|n| n.starts_with("aaa")).collect();
        assert_eq!(short_ascii.len(), 2);
        assert!(short_ascii.iter().any(|n| n.ends_with("_1.pdf")));
        assert!(names.iter().any(|n| n.starts_with("яя") && n.len() < cyrillic.len()));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = ExportSettings::new(tmp.path().join("out"));
        settings.dry_run = true;
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let msg = message("Dry").with_attachment(MemoryAttachment::new("a.txt", b"abc"));
        run(&mut exporter, &msg, &mut result);

        assert!(!tmp.path().join("out").exists());
        assert_eq!(result.attachments_saved, 1);
    }

    #[test]
    fn test_dry_run_plans_distinct_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = ExportSettings::new(tmp.path().join("out"));
        settings.dry_run = true;
        let mut exporter = AttachmentExporter::new(&settings).unwrap();
        let mut result = ExportResult::default();

        let msg = message("Scans")
            .with_attachment(MemoryAttachment::new("scan.png", b"one"))
            .with_attachment(MemoryAttachment::new("scan.png", b"two"));
        let email = EmailMetadata::from_handle(&msg);
        let folder = message_folder(&settings, &email).unwrap();
        let saved = exporter.save_all(&email, &msg, &folder, &mut result);

        let paths: Vec<_> = saved.iter().map(|s| s.path.clone()).collect();
        assert_eq!(paths, vec![folder.join("scan.png"), folder.join("scan_1.png")]);
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_unsupported_algorithm() {
        let mut settings = ExportSettings::new("/tmp/unused");
        settings.hash_algorithm = "md4".to_string();
        assert!(matches!(
            AttachmentExporter::new(&settings),
            Err(ExportError::UnsupportedHashAlgorithm { .. })
        ));
    }
}

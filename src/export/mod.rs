//! Export strategies: attachments only, native message files, or markdown.
//!
//! Every strategy places its output in the message folder built by
//! [`crate::storage::build_folder`] and reports through an
//! [`ExportResult`]. Per-item failures are recorded there and never
//! returned as errors.

pub mod attachment;
pub mod body;
pub mod markdown;
pub mod message;

use std::path::PathBuf;

use tracing::debug;

use crate::client::MessageHandle;
use crate::dedup::{DuplicateStats, HashAlgorithm};
use crate::error::Result;
use crate::model::email::EmailMetadata;
use crate::model::result::ExportResult;
use crate::model::settings::{ExportMode, ExportSettings};
use crate::storage::{build_folder, create_folder, fit_file_name, sanitize};

pub use attachment::AttachmentExporter;
pub use markdown::MarkdownExporter;
pub use message::MessageExporter;

/// Longest file name the filesystem accepts, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Bytes kept free for the `_N` counter of `ensure_unique_path`.
const UNIQUE_SUFFIX_BYTES: usize = 8;

/// The strategy selected for a run.
#[derive(Debug)]
pub enum Exporter {
    Attachments(AttachmentExporter),
    Message(MessageExporter),
    Markdown(MarkdownExporter),
}

impl Exporter {
    /// Build the strategy for `settings.mode`.
    ///
    /// Fails if the hash algorithm is unsupported, even for modes that
    /// never hash, so a bad configuration is caught before any message.
    pub fn new(settings: &ExportSettings) -> Result<Self> {
        let exporter = match settings.mode {
            ExportMode::Attachments => Self::Attachments(AttachmentExporter::new(settings)?),
            ExportMode::Message => {
                settings.hash_algorithm.parse::<HashAlgorithm>()?;
                Self::Message(MessageExporter::new(settings))
            }
            ExportMode::Markdown => Self::Markdown(MarkdownExporter::new(settings)?),
        };
        debug!(mode = ?settings.mode, "Exporter ready");
        Ok(exporter)
    }

    /// Export one matched message. Returns the attachment folder or the
    /// written file, if anything was produced.
    pub fn export<M: MessageHandle + ?Sized>(
        &mut self,
        email: &EmailMetadata,
        message: &M,
        result: &mut ExportResult,
    ) -> Option<PathBuf> {
        match self {
            Self::Attachments(e) => e.export(email, message, result),
            Self::Message(e) => e.export(email, message, result),
            Self::Markdown(e) => e.export(email, message, result),
        }
    }

    /// Duplicate tracker counts, for strategies that save attachments.
    pub fn duplicate_stats(&self) -> Option<DuplicateStats> {
        match self {
            Self::Attachments(e) => Some(e.duplicate_stats()),
            Self::Message(_) => None,
            Self::Markdown(e) => Some(e.attachments().duplicate_stats()),
        }
    }
}

/// Build the message folder and, outside dry runs, create it.
pub(crate) fn message_folder(settings: &ExportSettings, email: &EmailMetadata) -> Result<PathBuf> {
    let folder = build_folder(
        &settings.output_dir,
        &email.sender_email,
        &email.subject,
        &email.date_folder(),
        settings.subject_sanitize_length,
    );
    if !settings.dry_run {
        create_folder(&folder)?;
    }
    Ok(folder)
}

/// Sanitized file name for `name`, plus `.ext` when given, short enough in
/// bytes to still take a `_N` counter.
pub(crate) fn output_file_name(name: &str, ext: Option<&str>) -> String {
    let name = match ext {
        Some(ext) => format!("{}.{ext}", sanitize(name, MAX_FILENAME_BYTES)),
        None => sanitize(name, MAX_FILENAME_BYTES),
    };
    fit_file_name(&name, MAX_FILENAME_BYTES - UNIQUE_SUFFIX_BYTES)
}

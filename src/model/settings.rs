//! Runtime export settings.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{ExportError, Result};

/// Which strategy turns a matched message into files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Save attachments only.
    #[default]
    Attachments,
    /// Save the whole message in the store's native format.
    Message,
    /// Save attachments plus a markdown rendition of the message.
    Markdown,
}

impl ExportMode {
    /// Resolve the two mutually exclusive whole-message switches.
    pub fn from_flags(export_message: bool, export_markdown: bool) -> Result<Self> {
        match (export_message, export_markdown) {
            (true, true) => Err(ExportError::ConflictingExportModes),
            (true, false) => Ok(Self::Message),
            (false, true) => Ok(Self::Markdown),
            (false, false) => Ok(Self::Attachments),
        }
    }
}

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    /// Root of the output tree.
    pub output_dir: PathBuf,
    /// Output strategy.
    pub mode: ExportMode,
    /// Keep attachments the inline heuristic flags.
    pub include_inline: bool,
    /// Subfolder (inside the message folder) for duplicate attachments.
    pub duplicates_subfolder: String,
    /// Digest name for duplicate detection.
    pub hash_algorithm: String,
    /// Log what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Maximum length of the subject folder segment.
    pub subject_sanitize_length: usize,
    /// Messages requested from the store per batch.
    pub batch_size: usize,
    /// Stop after this many messages.
    pub limit: Option<usize>,
}

impl ExportSettings {
    /// Settings with the built-in defaults for everything but the output root.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(output_dir, &Config::default())
    }

    /// Settings seeded from the configuration file.
    pub fn from_config(output_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            output_dir: output_dir.into(),
            mode: ExportMode::Attachments,
            include_inline: config.export.include_inline,
            duplicates_subfolder: config.export.duplicates_subfolder.clone(),
            hash_algorithm: config.export.hash_algorithm.clone(),
            dry_run: false,
            subject_sanitize_length: config.export.subject_sanitize_length,
            batch_size: config.performance.batch_size,
            limit: None,
        }
    }
}

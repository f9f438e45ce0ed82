//! Running totals for one export run.

use serde::Serialize;

/// Counters and accumulated problems for a run.
///
/// Every component that finishes a unit of work bumps a counter here; the
/// values are only read once the run is over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Messages taken from the store, matched or not.
    pub messages_processed: u64,
    /// Messages that passed the filter.
    pub messages_matched: u64,
    /// Attachments written (duplicates included).
    pub attachments_saved: u64,
    /// Attachments whose content had already been saved in this run.
    pub duplicates_found: u64,
    /// Whole-message and markdown files written.
    pub files_exported: u64,
    /// Bytes written for attachments.
    pub bytes_saved: u64,
    /// Per-item failures, in the order they happened.
    pub errors: Vec<String>,
    /// Non-fatal oddities worth reviewing (e.g. an empty body).
    pub warnings: Vec<String>,
}

impl ExportResult {
    /// Record a per-item failure.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record a warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

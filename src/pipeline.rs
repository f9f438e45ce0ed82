//! One export run: enumerate, filter, export.
//!
//! Messages are pulled from the [`MailSource`] in batches of
//! `settings.batch_size`. Every message is normalized to
//! [`EmailMetadata`], tested against the [`CompositeFilter`] and, if it
//! matches, handed to the [`Exporter`]. Failures of one message are
//! recorded and skipped; only configuration errors and failures of the
//! enumeration itself end the run.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::MailSource;
use crate::error::{ExportError, Result};
use crate::export::Exporter;
use crate::filter::{CompositeFilter, EmailFilter};
use crate::model::criteria::FilterCriteria;
use crate::model::email::EmailMetadata;
use crate::model::result::ExportResult;
use crate::model::settings::ExportSettings;
use crate::storage::create_folder;

/// A run that stopped early. `partial` holds everything counted before
/// the failure.
#[derive(Error, Debug)]
#[error("export aborted: {error}")]
pub struct Aborted {
    pub partial: ExportResult,
    #[source]
    pub error: ExportError,
}

impl Aborted {
    fn new(partial: ExportResult, error: ExportError) -> Self {
        Self { partial, error }
    }
}

/// Run an export over `source`.
pub fn run<S: MailSource>(
    source: &S,
    criteria: &FilterCriteria,
    settings: &ExportSettings,
) -> std::result::Result<ExportResult, Aborted> {
    let mut result = ExportResult::default();

    let (filter, mut exporter) = match prepare(criteria, settings) {
        Ok(ready) => ready,
        Err(e) => return Err(Aborted::new(result, e)),
    };

    let folder = match source.folder(criteria.folder_path.as_deref()) {
        Ok(f) => f,
        Err(e) => return Err(Aborted::new(result, e)),
    };
    let total = match source.message_count(&folder) {
        Ok(n) => n,
        Err(e) => return Err(Aborted::new(result, e)),
    };

    let limit = settings.limit.unwrap_or(usize::MAX);
    let batch_size = settings.batch_size.max(1);
    info!(
        total,
        batch_size,
        limit = ?settings.limit,
        dry_run = settings.dry_run,
        "Starting export"
    );

    let mut start = 0;
    'batches: while start < total && (result.messages_processed as usize) < limit {
        let len = batch_size.min(total - start);
        let batch = match source.fetch_batch(&folder, start, len) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(start, error = %e, "Message enumeration failed");
                return Err(Aborted::new(result, e));
            }
        };
        debug!(start, len = batch.len(), "Fetched batch");
        if batch.is_empty() {
            break;
        }
        let batch_start = start;
        start += batch.len();

        for (offset, item) in batch.into_iter().enumerate() {
            if (result.messages_processed as usize) >= limit {
                break 'batches;
            }
            result.messages_processed += 1;

            let message = match item {
                Ok(m) => m,
                Err(e) => {
                    let index = batch_start + offset;
                    warn!(index, error = %e, "Failed to open message");
                    result.add_error(format!("Failed to open message {}: {e}", index + 1));
                    continue;
                }
            };

            let email = EmailMetadata::from_handle(&message);
            if !filter.matches(&email) {
                continue;
            }
            result.messages_matched += 1;
            debug!(subject = %email.subject, sender = %email.sender_email, "Message matched");

            exporter.export(&email, &message, &mut result);
        }
    }

    info!(
        processed = result.messages_processed,
        matched = result.messages_matched,
        attachments = result.attachments_saved,
        files = result.files_exported,
        errors = result.errors.len(),
        "Export finished"
    );
    if let Some(stats) = exporter.duplicate_stats() {
        info!(
            unique = stats.unique_files,
            total = stats.total_files,
            duplicates = stats.duplicate_files,
            "Duplicate statistics"
        );
    }
    Ok(result)
}

/// Validate the configuration and build the filter and exporter.
fn prepare(
    criteria: &FilterCriteria,
    settings: &ExportSettings,
) -> Result<(CompositeFilter, Exporter)> {
    let filter = CompositeFilter::from_criteria(criteria)?;
    let exporter = Exporter::new(settings)?;
    if !settings.dry_run {
        create_folder(&settings.output_dir)?;
    }
    debug!(filters = filter.len(), "Filter ready");
    Ok((filter, exporter))
}

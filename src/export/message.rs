//! Save whole messages in the store's native format.

use std::path::PathBuf;

use tracing::{info, warn};

use super::{message_folder, output_file_name};
use crate::client::MessageHandle;
use crate::model::email::EmailMetadata;
use crate::model::result::ExportResult;
use crate::model::settings::ExportSettings;
use crate::storage::ensure_unique_path;

/// Writes `<folder>/<subject>.<ext>` through the store's save-as.
#[derive(Debug, Clone)]
pub struct MessageExporter {
    settings: ExportSettings,
}

impl MessageExporter {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Returns the written (or, in a dry run, planned) file.
    pub fn export<M: MessageHandle + ?Sized>(
        &self,
        email: &EmailMetadata,
        message: &M,
        result: &mut ExportResult,
    ) -> Option<PathBuf> {
        let folder = match message_folder(&self.settings, email) {
            Ok(folder) => folder,
            Err(e) => {
                result.add_error(format!("Failed to create folder for '{}': {e}", email.subject));
                return None;
            }
        };

        let name = output_file_name(&email.subject, Some(message.native_extension()));
        let path = ensure_unique_path(&folder.join(name));

        if self.settings.dry_run {
            info!(path = %path.display(), "[DRY-RUN] Would save message");
            result.files_exported += 1;
            return Some(path);
        }

        match message.save_as(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Saved message");
                result.files_exported += 1;
                Some(path)
            }
            Err(e) => {
                warn!(subject = %email.subject, error = %e, "Failed to save message");
                result.add_error(format!("Failed to save message '{}': {e}", email.subject));
                None
            }
        }
    }
}

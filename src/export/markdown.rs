//! Markdown rendition of a message plus its attachments.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::attachment::AttachmentExporter;
use super::body::render_body;
use super::{message_folder, output_file_name};
use crate::client::MessageHandle;
use crate::error::Result;
use crate::model::attachment::SavedAttachment;
use crate::model::email::EmailMetadata;
use crate::model::result::ExportResult;
use crate::model::settings::ExportSettings;
use crate::storage::{ensure_unique_path, format_file_size, relative_link};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%B %d, %Y %I:%M %p";

/// Saves attachments, then a `.md` file next to them that links to each.
#[derive(Debug)]
pub struct MarkdownExporter {
    settings: ExportSettings,
    attachments: AttachmentExporter,
}

impl MarkdownExporter {
    pub fn new(settings: &ExportSettings) -> Result<Self> {
        Ok(Self {
            attachments: AttachmentExporter::new(settings)?,
            settings: settings.clone(),
        })
    }

    /// The attachment exporter used for the files the document links to.
    pub fn attachments(&self) -> &AttachmentExporter {
        &self.attachments
    }

    /// Returns the written (or, in a dry run, planned) markdown file.
    pub fn export<M: MessageHandle + ?Sized>(
        &mut self,
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

        let saved = self.attachments.save_all(email, message, &folder, result);

        let body = render_body(email, message);
        if body.is_empty() {
            warn!(subject = %email.subject, "Message body is empty");
            result.add_warning(format!("Empty body for '{}'", display_subject(email)));
        }

        let name = output_file_name(display_subject(email), Some("md"));
        let path = ensure_unique_path(&folder.join(name));

        if self.settings.dry_run {
            info!(path = %path.display(), "[DRY-RUN] Would save markdown");
            result.files_exported += 1;
            return Some(path);
        }

        let document = render_document(email, &body, &saved, &folder);
        match std::fs::write(&path, document) {
            Ok(()) => {
                info!(path = %path.display(), "Saved markdown");
                result.files_exported += 1;
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save markdown");
                result.add_error(format!(
                    "Failed to save markdown '{}': {e}",
                    display_subject(email)
                ));
                None
            }
        }
    }
}

fn display_subject(email: &EmailMetadata) -> &str {
    if email.subject.is_empty() {
        "No Subject"
    } else {
        &email.subject
    }
}

/// Build the document: frontmatter, header block, body, attachment list.
///
/// Attachment links are relative to `doc_dir`, the directory the document
/// is written to.
pub fn render_document(
    email: &EmailMetadata,
    body: &str,
    attachments: &[SavedAttachment],
    doc_dir: &Path,
) -> String {
    let subject = display_subject(email);
    let date = email.sent_or_received();
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str(&format!("from: {}\n", email.sender_email));
    if !email.to_recipients.is_empty() {
        out.push_str(&format!("to: {}\n", email.to_recipients));
    }
    if !email.cc_recipients.is_empty() {
        out.push_str(&format!("cc: {}\n", email.cc_recipients));
    }
    out.push_str(&format!("subject: {subject}\n"));
    out.push_str(&format!("date: {}\n", date.format(ISO_FORMAT)));
    out.push_str(&format!("received: {}\n", email.received_time.format(ISO_FORMAT)));
    out.push_str("---\n");
    out.push('\n');

    out.push_str(&format!("# {subject}\n"));
    out.push('\n');
    out.push_str(&format!("**From:** {} ({})  \n", email.sender_name, email.sender_email));
    if !email.to_recipients.is_empty() {
        out.push_str(&format!("**To:** {}  \n", email.to_recipients));
    }
    if !email.cc_recipients.is_empty() {
        out.push_str(&format!("**CC:** {}  \n", email.cc_recipients));
    }
    out.push_str(&format!("**Date:** {}\n", date.format(DISPLAY_FORMAT)));
    out.push('\n');
    out.push_str("---\n");
    out.push('\n');

    out.push_str(&format!("{body}\n"));
    out.push('\n');

    if !attachments.is_empty() {
        out.push_str("---\n");
        out.push('\n');
        out.push_str("## Attachments\n");
        out.push('\n');
        for saved in attachments {
            out.push_str(&format!("{}\n", attachment_line(saved, doc_dir)));
        }
    }

    out
}

fn attachment_line(saved: &SavedAttachment, doc_dir: &Path) -> String {
    let name = saved
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| saved.info.filename.clone());
    match std::fs::metadata(&saved.path) {
        Ok(meta) => format!(
            "- [{name}]({}) ({})",
            relative_link(doc_dir, &saved.path),
            format_file_size(meta.len())
        ),
        Err(e) => {
            debug!(path = %saved.path.display(), error = %e, "Cannot stat attachment");
            format!("- {name}")
        }
    }
}

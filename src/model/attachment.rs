//! Attachment metadata.
//!
//! The content itself is never held in memory: the store writes it straight
//! to a temporary file, which is then hashed and moved into place.

use std::path::PathBuf;

use crate::client::{field_or, AttachmentHandle, BY_VALUE};

/// Metadata about one attachment, captured at save time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttachmentInfo {
    /// Filename as reported by the store (`"attachment.bin"` if missing).
    pub filename: String,

    /// Size in bytes as reported by the store.
    pub size: u64,

    /// Hex digest of the saved bytes. `None` until the file has been written.
    pub content_hash: Option<String>,

    /// Result of the inline heuristic (see [`AttachmentInfo::from_handle`]).
    pub is_inline: bool,

    /// Rendering position inside the body; 0 for many inline images.
    pub position: i64,
}

impl AttachmentInfo {
    /// Read the attachment's properties, substituting defaults on failure.
    ///
    /// `is_inline` is a heuristic, not a classifier: an attachment is flagged
    /// when its position is 0 **and** its type is the by-value code. Signature
    /// images usually match, but so can ordinary files, and some inline images
    /// do not.
    pub fn from_handle<A: AttachmentHandle + ?Sized>(attachment: &A) -> Self {
        let filename = field_or("FileName", attachment.filename(), String::new());
        let filename = if filename.is_empty() {
            "attachment.bin".to_string()
        } else {
            filename
        };
        let position = field_or("Position", attachment.position(), 0);
        let kind = attachment.kind().ok();

        Self {
            filename,
            size: field_or("Size", attachment.size(), 0),
            content_hash: None,
            is_inline: position == 0 && kind == Some(BY_VALUE),
            position,
        }
    }
}

/// An attachment that made it to disk (or would have, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAttachment {
    /// Properties read from the store, with `content_hash` filled in.
    pub info: AttachmentInfo,
    /// Final location.
    pub path: PathBuf,
    /// `true` if the content had already been saved earlier in the run.
    pub duplicate: bool,
}

//! Adapter interface to the mail store.
//!
//! The exporter never talks to a mail client directly. It sees a
//! [`MailSource`] that resolves folders and hands out messages in batches,
//! and [`MessageHandle`] / [`AttachmentHandle`] values with typed accessors.
//! Any accessor may fail; callers normalize failures to defaults with
//! [`field_or`] rather than propagating them.

pub mod eml;
pub mod memory;

use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::error::Result;

/// Attachment type code for content embedded by value (Outlook's
/// `olByValue`). Part of the inline heuristic.
pub const BY_VALUE: i32 = 5;

/// A property of a message or attachment could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot read {field}: {reason}")]
pub struct AccessError {
    pub field: &'static str,
    pub reason: String,
}

impl AccessError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Result of a single property read.
pub type Access<T> = std::result::Result<T, AccessError>;

/// Unwrap a property read, logging and substituting `default` on failure.
pub fn field_or<T>(field: &str, value: Access<T>, default: T) -> T {
    match value {
        Ok(v) => v,
        Err(e) => {
            debug!(field, error = %e, "Property access failed, using default");
            default
        }
    }
}

/// One message in the store.
pub trait MessageHandle {
    type Attachment: AttachmentHandle;

    fn subject(&self) -> Access<String>;
    fn sender_email(&self) -> Access<String>;
    fn sender_name(&self) -> Access<String>;
    fn received_time(&self) -> Access<NaiveDateTime>;
    fn sent_time(&self) -> Access<Option<NaiveDateTime>>;
    fn to_recipients(&self) -> Access<String>;
    fn cc_recipients(&self) -> Access<String>;
    fn body(&self) -> Access<String>;
    fn html_body(&self) -> Access<String>;

    /// Raw rich-text body, for stores that keep one.
    fn rtf_body(&self) -> Access<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Size of the attachment collection.
    fn attachment_count(&self) -> Access<usize>;

    /// Attachment at zero-based `index`.
    fn attachment(&self, index: usize) -> Access<Self::Attachment>;

    /// Write the whole message, attachments and formatting included.
    fn save_as(&self, path: &Path) -> Result<()>;

    /// Extension of the file [`MessageHandle::save_as`] writes, without the dot.
    fn native_extension(&self) -> &'static str;
}

/// One attachment of a message.
pub trait AttachmentHandle {
    fn filename(&self) -> Access<String>;
    fn size(&self) -> Access<u64>;
    /// Rendering position in the body; 0 for many inline images.
    fn position(&self) -> Access<i64>;
    /// Store-specific type code (see [`BY_VALUE`]).
    fn kind(&self) -> Access<i32>;
    /// Write the attachment's bytes to `path`.
    fn save_as_file(&self, path: &Path) -> Result<()>;
}

/// A mail store that can resolve folders and enumerate their messages.
pub trait MailSource {
    type Folder;
    type Message: MessageHandle;

    /// Resolve a `/`- or `\`-separated path below the inbox. `None` is
    /// the inbox itself. Empty segments and a segment named `inbox`
    /// (any case) are skipped.
    fn folder(&self, path: Option<&str>) -> Result<Self::Folder>;

    /// Number of messages in the folder.
    fn message_count(&self, folder: &Self::Folder) -> Result<usize>;

    /// Up to `len` messages starting at zero-based `start`. An `Err` item
    /// is one message that could not be opened; an outer `Err` means the
    /// store itself is unreachable.
    fn fetch_batch(
        &self,
        folder: &Self::Folder,
        start: usize,
        len: usize,
    ) -> Result<Vec<Access<Self::Message>>>;
}

/// Split a folder path into the segments to walk below the inbox.
pub fn folder_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("inbox"))
        .collect()
}

//! Normalized per-message metadata.

use chrono::NaiveDateTime;

use crate::client::{field_or, MessageHandle};

/// Metadata for a single message, normalized from the mail store's raw fields.
///
/// Built once per message by [`EmailMetadata::from_handle`] and never mutated
/// afterwards. Every field has a value: accessors that fail on the underlying
/// store are replaced by defaults during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMetadata {
    /// Subject line (empty when missing).
    pub subject: String,

    /// Sender address, `"unknown"` when the store cannot supply one.
    pub sender_email: String,

    /// Sender display name, falling back to the address.
    pub sender_name: String,

    /// When the message was received, in the store's local time.
    pub received_time: NaiveDateTime,

    /// When the message was sent, if known.
    pub sent_time: Option<NaiveDateTime>,

    /// Primary recipients as the store formats them (usually `;`-separated).
    pub to_recipients: String,

    /// Carbon-copy recipients.
    pub cc_recipients: String,

    /// Plain-text body.
    pub body: String,

    /// HTML body.
    pub html_body: String,

    /// Number of entries in the attachment collection, inline ones included.
    pub attachment_count: usize,
}

impl EmailMetadata {
    /// Read and normalize every field of `message`.
    pub fn from_handle<M: MessageHandle + ?Sized>(message: &M) -> Self {
        let subject = field_or("Subject", message.subject(), String::new());
        let sender_email = non_empty_or(
            field_or("SenderEmailAddress", message.sender_email(), String::new()),
            "unknown",
        );
        let sender_name = non_empty_or(
            field_or("SenderName", message.sender_name(), String::new()),
            &sender_email,
        );
        let received_time = match message.received_time() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read received time, using current time");
                chrono::Local::now().naive_local()
            }
        };
        let sent_time = field_or("SentOn", message.sent_time(), None);

        Self {
            subject,
            sender_email,
            sender_name,
            received_time,
            sent_time,
            to_recipients: field_or("To", message.to_recipients(), String::new()),
            cc_recipients: field_or("CC", message.cc_recipients(), String::new()),
            body: field_or("Body", message.body(), String::new()),
            html_body: field_or("HTMLBody", message.html_body(), String::new()),
            attachment_count: field_or("Attachments.Count", message.attachment_count(), 0),
        }
    }

    /// `true` if the attachment collection is non-empty.
    pub fn has_attachments(&self) -> bool {
        self.attachment_count > 0
    }

    /// Sent time when known, otherwise the received time.
    pub fn sent_or_received(&self) -> NaiveDateTime {
        self.sent_time.unwrap_or(self.received_time)
    }

    /// Date folder name: `YYYY-MM-DD` of the received time.
    pub fn date_folder(&self) -> String {
        self.received_time.format("%Y-%m-%d").to_string()
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

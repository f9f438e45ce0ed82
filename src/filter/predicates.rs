//! Concrete filters: date range, sender, keywords and attachment presence.

use chrono::NaiveDateTime;

use super::EmailFilter;
use crate::model::email::EmailMetadata;

/// Received time within `[start, end]`. Missing bounds are open.
#[derive(Debug, Clone, Default)]
pub struct DateRangeFilter {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl DateRangeFilter {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }
}

impl EmailFilter for DateRangeFilter {
    fn name(&self) -> &'static str {
        "date-range"
    }

    fn matches(&self, email: &EmailMetadata) -> bool {
        if let Some(start) = self.start {
            if email.received_time < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if email.received_time > end {
                return false;
            }
        }
        true
    }
}

/// Sender address equal (case-insensitively) to one of an allow-list.
///
/// An empty list lets every sender through.
#[derive(Debug, Clone, Default)]
pub struct SenderFilter {
    senders: Vec<String>,
}

impl SenderFilter {
    pub fn new<S: AsRef<str>>(senders: &[S]) -> Self {
        Self {
            senders: senders
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        }
    }
}

impl EmailFilter for SenderFilter {
    fn name(&self) -> &'static str {
        "sender"
    }

    fn matches(&self, email: &EmailMetadata) -> bool {
        if self.senders.is_empty() {
            return true;
        }
        let sender = email.sender_email.to_lowercase();
        self.senders.iter().any(|s| *s == sender)
    }
}

/// Which text a [`KeywordFilter`] searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordField {
    Subject,
    Body,
}

/// Every keyword must occur in the field (AND), case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    field: KeywordField,
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn subject<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::new(KeywordField::Subject, keywords)
    }

    pub fn body<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::new(KeywordField::Body, keywords)
    }

    fn new<S: AsRef<str>>(field: KeywordField, keywords: &[S]) -> Self {
        Self {
            field,
            keywords: keywords.iter().map(|k| k.as_ref().to_lowercase()).collect(),
        }
    }
}

impl EmailFilter for KeywordFilter {
    fn name(&self) -> &'static str {
        match self.field {
            KeywordField::Subject => "subject-keywords",
            KeywordField::Body => "body-keywords",
        }
    }

    fn matches(&self, email: &EmailMetadata) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = match self.field {
            KeywordField::Subject => email.subject.to_lowercase(),
            KeywordField::Body => email.body.to_lowercase(),
        };
        self.keywords.iter().all(|kw| haystack.contains(kw.as_str()))
    }
}

/// Require attachments to be present, or to be absent.
///
/// Counts the whole attachment collection, so a message whose only
/// attachment is a signature image still "has attachments".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPresenceFilter {
    requires_attachments: bool,
}

impl AttachmentPresenceFilter {
    /// Match only messages with at least one attachment.
    pub fn with_attachments() -> Self {
        Self {
            requires_attachments: true,
        }
    }

    /// Match only messages without attachments.
    pub fn without_attachments() -> Self {
        Self {
            requires_attachments: false,
        }
    }
}

impl EmailFilter for AttachmentPresenceFilter {
    fn name(&self) -> &'static str {
        if self.requires_attachments {
            "with-attachments"
        } else {
            "without-attachments"
        }
    }

    fn matches(&self, email: &EmailMetadata) -> bool {
        email.has_attachments() == self.requires_attachments
    }
}

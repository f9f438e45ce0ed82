//! In-memory mail store.
//!
//! Messages are plain structs registered per folder. Individual properties,
//! saves and whole-store enumeration can be told to fail, which makes this
//! store the workhorse of the test suite.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDateTime;

use super::{
    folder_segments, Access, AccessError, AttachmentHandle, MailSource, MessageHandle, BY_VALUE,
};
use crate::error::{ExportError, Result};

/// An attachment held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAttachment {
    pub filename: String,
    pub data: Vec<u8>,
    pub position: i64,
    pub kind: i32,
    pub fail_save: bool,
}

impl MemoryAttachment {
    /// A by-value attachment at position 1 (not inline).
    pub fn new(filename: &str, data: &[u8]) -> Self {
        Self {
            filename: filename.to_string(),
            data: data.to_vec(),
            position: 1,
            kind: BY_VALUE,
            fail_save: false,
        }
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_kind(mut self, kind: i32) -> Self {
        self.kind = kind;
        self
    }

    /// Make `save_as_file` fail after writing half of the data.
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }
}

impl AttachmentHandle for MemoryAttachment {
    fn filename(&self) -> Access<String> {
        Ok(self.filename.clone())
    }

    fn size(&self) -> Access<u64> {
        Ok(self.data.len() as u64)
    }

    fn position(&self) -> Access<i64> {
        Ok(self.position)
    }

    fn kind(&self) -> Access<i32> {
        Ok(self.kind)
    }

    fn save_as_file(&self, path: &Path) -> Result<()> {
        if self.fail_save {
            let partial = &self.data[..self.data.len() / 2];
            std::fs::write(path, partial).map_err(|e| ExportError::io(path, e))?;
            return Err(ExportError::SaveFailed {
                item: format!("attachment '{}'", self.filename),
                reason: "the store refused the operation".to_string(),
            });
        }
        std::fs::write(path, &self.data).map_err(|e| ExportError::io(path, e))
    }
}

/// A message held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMessage {
    pub subject: String,
    pub sender_email: String,
    pub sender_name: String,
    pub received_time: NaiveDateTime,
    pub sent_time: Option<NaiveDateTime>,
    pub to_recipients: String,
    pub cc_recipients: String,
    pub body: String,
    pub html_body: String,
    pub rtf_body: Option<Vec<u8>>,
    pub attachments: Vec<MemoryAttachment>,
    failing: HashSet<&'static str>,
    fail_save: bool,
}

impl MemoryMessage {
    pub fn new(subject: &str, sender_email: &str, received_time: NaiveDateTime) -> Self {
        Self {
            subject: subject.to_string(),
            sender_email: sender_email.to_string(),
            sender_name: String::new(),
            received_time,
            sent_time: None,
            to_recipients: String::new(),
            cc_recipients: String::new(),
            body: String::new(),
            html_body: String::new(),
            rtf_body: None,
            attachments: Vec::new(),
            failing: HashSet::new(),
            fail_save: false,
        }
    }

    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = name.to_string();
        self
    }

    pub fn with_sent(mut self, sent: NaiveDateTime) -> Self {
        self.sent_time = Some(sent);
        self
    }

    pub fn with_recipients(mut self, to: &str, cc: &str) -> Self {
        self.to_recipients = to.to_string();
        self.cc_recipients = cc.to_string();
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html_body = html.to_string();
        self
    }

    pub fn with_rtf(mut self, rtf: &[u8]) -> Self {
        self.rtf_body = Some(rtf.to_vec());
        self
    }

    pub fn with_attachment(mut self, attachment: MemoryAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Make one property accessor fail. Names follow the store's property
    /// names: `Subject`, `SenderEmailAddress`, `SenderName`, `ReceivedTime`,
    /// `SentOn`, `To`, `CC`, `Body`, `HTMLBody`, `RTFBody`, `Attachments`.
    pub fn failing_field(mut self, field: &'static str) -> Self {
        self.failing.insert(field);
        self
    }

    /// Make `save_as` fail.
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    fn read<T>(&self, field: &'static str, value: impl FnOnce() -> T) -> Access<T> {
        if self.failing.contains(field) {
            Err(AccessError::new(field, "operation aborted"))
        } else {
            Ok(value())
        }
    }
}

impl MessageHandle for MemoryMessage {
    type Attachment = MemoryAttachment;

    fn subject(&self) -> Access<String> {
        self.read("Subject", || self.subject.clone())
    }

    fn sender_email(&self) -> Access<String> {
        self.read("SenderEmailAddress", || self.sender_email.clone())
    }

    fn sender_name(&self) -> Access<String> {
        self.read("SenderName", || self.sender_name.clone())
    }

    fn received_time(&self) -> Access<NaiveDateTime> {
        self.read("ReceivedTime", || self.received_time)
    }

    fn sent_time(&self) -> Access<Option<NaiveDateTime>> {
        self.read("SentOn", || self.sent_time)
    }

    fn to_recipients(&self) -> Access<String> {
        self.read("To", || self.to_recipients.clone())
    }

    fn cc_recipients(&self) -> Access<String> {
        self.read("CC", || self.cc_recipients.clone())
    }

    fn body(&self) -> Access<String> {
        self.read("Body", || self.body.clone())
    }

    fn html_body(&self) -> Access<String> {
        self.read("HTMLBody", || self.html_body.clone())
    }

    fn rtf_body(&self) -> Access<Option<Vec<u8>>> {
        self.read("RTFBody", || self.rtf_body.clone())
    }

    fn attachment_count(&self) -> Access<usize> {
        self.read("Attachments", || self.attachments.len())
    }

    fn attachment(&self, index: usize) -> Access<MemoryAttachment> {
        self.read("Attachments", || self.attachments.get(index).cloned())?
            .ok_or_else(|| AccessError::new("Attachments", format!("no attachment at {index}")))
    }

    fn save_as(&self, path: &Path) -> Result<()> {
        if self.fail_save {
            return Err(ExportError::SaveFailed {
                item: format!("message '{}'", self.subject),
                reason: "the store refused the operation".to_string(),
            });
        }
        let rendered = format!(
            "Subject: {}\nFrom: {}\nTo: {}\n\n{}\n",
            self.subject, self.sender_email, self.to_recipients, self.body
        );
        std::fs::write(path, rendered).map_err(|e| ExportError::io(path, e))
    }

    fn native_extension(&self) -> &'static str {
        "msg"
    }
}

/// Folders of in-memory messages. The empty key is the inbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailbox {
    folders: BTreeMap<String, Vec<MemoryMessage>>,
    unreachable: bool,
    fail_from: Option<usize>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the inbox.
    pub fn push(&mut self, message: MemoryMessage) {
        self.folders.entry(String::new()).or_default().push(message);
    }

    /// Add a message to a subfolder such as `Projects/2024`.
    pub fn push_to(&mut self, folder: &str, message: MemoryMessage) {
        let key = folder_segments(folder).join("/");
        self.folders.entry(key).or_default().push(message);
    }

    /// Fail every enumeration call, as if the store could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Fail batch requests that start at or after message `index`.
    pub fn failing_from(mut self, index: usize) -> Self {
        self.fail_from = Some(index);
        self
    }

    fn folder_exists(&self, key: &str) -> bool {
        key.is_empty()
            || self
                .folders
                .keys()
                .any(|k| k == key || k.starts_with(&format!("{key}/")))
    }
}

impl MailSource for MemoryMailbox {
    type Folder = String;
    type Message = MemoryMessage;

    fn folder(&self, path: Option<&str>) -> Result<String> {
        let Some(path) = path else {
            return Ok(String::new());
        };
        let mut key = String::new();
        for segment in folder_segments(path) {
            let candidate = if key.is_empty() {
                segment.to_string()
            } else {
                format!("{key}/{segment}")
            };
            if !self.folder_exists(&candidate) {
                return Err(ExportError::FolderNotFound {
                    segment: segment.to_string(),
                    path: path.to_string(),
                });
            }
            key = candidate;
        }
        Ok(key)
    }

    fn message_count(&self, folder: &String) -> Result<usize> {
        if self.unreachable {
            return Err(ExportError::Connection("mailbox is unreachable".to_string()));
        }
        Ok(self.folders.get(folder).map(Vec::len).unwrap_or(0))
    }

    fn fetch_batch(
        &self,
        folder: &String,
        start: usize,
        len: usize,
    ) -> Result<Vec<Access<MemoryMessage>>> {
        if self.unreachable || self.fail_from.is_some_and(|i| start >= i) {
            return Err(ExportError::Connection(format!(
                "failed to read messages from {start}"
            )));
        }
        let messages = self.folders.get(folder).map(Vec::as_slice).unwrap_or(&[]);
        Ok(messages
            .iter()
            .skip(start)
            .take(len)
            .cloned()
            .map(Ok)
            .collect())
    }
}

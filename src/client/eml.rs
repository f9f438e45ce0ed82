//! Mail store backed by a directory tree of `.eml` files.
//!
//! The root directory is the inbox and each subdirectory is a folder.
//! Messages are the `*.eml` files of a directory, enumerated in file-name
//! order and parsed with `mail-parser` when their batch is fetched.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use mail_parser::{MessageParser, MimeHeaders};
use tracing::debug;

use super::{
    folder_segments, Access, AccessError, AttachmentHandle, MailSource, MessageHandle, BY_VALUE,
};
use crate::error::{ExportError, Result};

/// A directory of `.eml` files.
#[derive(Debug, Clone)]
pub struct EmlStore {
    root: PathBuf,
}

impl EmlStore {
    /// Open a store rooted at `root`, which must be a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ExportError::Connection(format!(
                "mail store '{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// `.eml` files directly inside `dir`, sorted by name.
    fn message_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|e| ExportError::io(dir, e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Find a child directory by exact name, then case-insensitively.
fn child_dir(parent: &Path, name: &str) -> Option<PathBuf> {
    let exact = parent.join(name);
    if exact.is_dir() {
        return Some(exact);
    }
    std::fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|p| {
            p.is_dir()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(name))
        })
}

impl MailSource for EmlStore {
    type Folder = PathBuf;
    type Message = EmlMessage;

    fn folder(&self, path: Option<&str>) -> Result<PathBuf> {
        let mut current = self.root.clone();
        let Some(path) = path else {
            return Ok(current);
        };
        for segment in folder_segments(path) {
            current = child_dir(&current, segment).ok_or_else(|| ExportError::FolderNotFound {
                segment: segment.to_string(),
                path: path.to_string(),
            })?;
        }
        debug!(folder = %current.display(), "Opened folder");
        Ok(current)
    }

    fn message_count(&self, folder: &PathBuf) -> Result<usize> {
        Ok(self.message_files(folder)?.len())
    }

    fn fetch_batch(
        &self,
        folder: &PathBuf,
        start: usize,
        len: usize,
    ) -> Result<Vec<Access<EmlMessage>>> {
        let files = self.message_files(folder)?;
        Ok(files
            .iter()
            .skip(start)
            .take(len)
            .map(|p| EmlMessage::load(p))
            .collect())
    }
}

/// A parsed `.eml` file.
#[derive(Debug, Clone)]
pub struct EmlMessage {
    path: PathBuf,
    raw: Vec<u8>,
    subject: String,
    sender_email: String,
    sender_name: String,
    date: Option<NaiveDateTime>,
    to: String,
    cc: String,
    text: String,
    html: String,
    attachments: Vec<EmlAttachment>,
}

impl EmlMessage {
    /// Read and parse one file.
    pub fn load(path: &Path) -> Access<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| AccessError::new("message", format!("{}: {e}", path.display())))?;
        Self::parse(path, raw)
    }

    /// Parse an RFC 5322 message; `path` is only used in diagnostics.
    pub fn parse(path: &Path, raw: Vec<u8>) -> Access<Self> {
        let mut parsed = Self::extract(path, &raw)?;
        parsed.raw = raw;
        Ok(parsed)
    }

    /// Every field but the raw bytes, which the parsed message borrows.
    fn extract(path: &Path, raw: &[u8]) -> Access<Self> {
        let msg = MessageParser::default().parse(raw).ok_or_else(|| {
            AccessError::new("message", format!("{}: not an RFC 5322 message", path.display()))
        })?;

        let (sender_email, sender_name) = msg
            .from()
            .and_then(|a| a.first())
            .map(|addr| {
                (
                    addr.address().unwrap_or_default().to_string(),
                    addr.name().unwrap_or_default().to_string(),
                )
            })
            .unwrap_or_default();

        let date = msg.date().and_then(|d| {
            DateTime::parse_from_rfc3339(&d.to_rfc3339())
                .ok()
                .map(|dt| dt.naive_local())
        });

        let attachments = msg
            .attachments()
            .enumerate()
            .map(|(idx, part)| {
                let inline = part
                    .content_disposition()
                    .is_some_and(|d| d.ctype().eq_ignore_ascii_case("inline"));
                EmlAttachment {
                    filename: part.attachment_name().map(String::from),
                    data: part.contents().to_vec(),
                    position: if inline { 0 } else { idx as i64 + 1 },
                }
            })
            .collect();

        Ok(Self {
            subject: msg.subject().unwrap_or_default().to_string(),
            sender_email,
            sender_name,
            date,
            to: join_addresses(msg.to()),
            cc: join_addresses(msg.cc()),
            text: msg.body_text(0).map(|s| s.into_owned()).unwrap_or_default(),
            html: msg.body_html(0).map(|s| s.into_owned()).unwrap_or_default(),
            attachments,
            path: path.to_path_buf(),
            raw: Vec::new(),
        })
    }

    /// File the message was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `Name <addr>; other@addr` in header order.
fn join_addresses(address: Option<&mail_parser::Address<'_>>) -> String {
    let Some(address) = address else {
        return String::new();
    };
    address
        .iter()
        .filter_map(|a| match (a.name(), a.address()) {
            (Some(name), Some(addr)) => Some(format!("{name} <{addr}>")),
            (None, Some(addr)) => Some(addr.to_string()),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl MessageHandle for EmlMessage {
    type Attachment = EmlAttachment;

    fn subject(&self) -> Access<String> {
        Ok(self.subject.clone())
    }

    fn sender_email(&self) -> Access<String> {
        Ok(self.sender_email.clone())
    }

    fn sender_name(&self) -> Access<String> {
        Ok(self.sender_name.clone())
    }

    fn received_time(&self) -> Access<NaiveDateTime> {
        self.date
            .ok_or_else(|| AccessError::new("ReceivedTime", "missing or unparseable Date header"))
    }

    fn sent_time(&self) -> Access<Option<NaiveDateTime>> {
        Ok(self.date)
    }

    fn to_recipients(&self) -> Access<String> {
        Ok(self.to.clone())
    }

    fn cc_recipients(&self) -> Access<String> {
        Ok(self.cc.clone())
    }

    fn body(&self) -> Access<String> {
        Ok(self.text.clone())
    }

    fn html_body(&self) -> Access<String> {
        Ok(self.html.clone())
    }

    fn attachment_count(&self) -> Access<usize> {
        Ok(self.attachments.len())
    }

    fn attachment(&self, index: usize) -> Access<EmlAttachment> {
        self.attachments
            .get(index)
            .cloned()
            .ok_or_else(|| AccessError::new("Attachments", format!("no attachment at {index}")))
    }

    fn save_as(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.raw).map_err(|e| ExportError::io(path, e))
    }

    fn native_extension(&self) -> &'static str {
        "eml"
    }
}

/// A decoded MIME attachment.
#[derive(Debug, Clone)]
pub struct EmlAttachment {
    filename: Option<String>,
    data: Vec<u8>,
    position: i64,
}

impl AttachmentHandle for EmlAttachment {
    fn filename(&self) -> Access<String> {
        self.filename
            .clone()
            .ok_or_else(|| AccessError::new("FileName", "attachment has no name"))
    }

    fn size(&self) -> Access<u64> {
        Ok(self.data.len() as u64)
    }

    /// 0 for parts with an inline disposition, otherwise the 1-based index.
    fn position(&self) -> Access<i64> {
        Ok(self.position)
    }

    /// MIME parts always carry their content.
    fn kind(&self) -> Access<i32> {
        Ok(BY_VALUE)
    }

    fn save_as_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.data).map_err(|e| ExportError::io(path, e))
    }
}

//! Message body to markdown text.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::client::{field_or, MessageHandle};
use crate::model::email::EmailMetadata;

static RTF_GROUPS: OnceLock<Regex> = OnceLock::new();
static RTF_WORDS: OnceLock<Regex> = OnceLock::new();

/// Pick and convert the best available body.
///
/// HTML is converted to markdown; if there is none, or conversion fails,
/// the plain body is used, then the rich-text body through [`rtf_to_text`].
/// Returns an empty string when nothing yields content.
pub fn render_body<M: MessageHandle + ?Sized>(email: &EmailMetadata, message: &M) -> String {
    if !email.html_body.is_empty() {
        match htmd::convert(&email.html_body) {
            Ok(markdown) => return markdown,
            Err(e) => {
                warn!(subject = %email.subject, error = %e, "Failed to convert HTML body, using plain text");
            }
        }
    }
    if !email.body.is_empty() {
        return email.body.clone();
    }
    field_or("RTFBody", message.rtf_body(), None)
        .map(|raw| rtf_to_text(&raw))
        .unwrap_or_default()
}

/// Best-effort text from a raw RTF document.
///
/// Not an RTF parser: non-ASCII bytes are dropped, simple `{\...}` groups,
/// `\sN`, `\pard`, `\par` and line breaks are removed, then any remaining
/// backslash control word. Braces of nested groups and parts of some
/// control words survive.
pub fn rtf_to_text(raw: &[u8]) -> String {
    let ascii: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();

    let groups = RTF_GROUPS.get_or_init(|| {
        Regex::new(r"\{\\[^{}]+\}|\\s\d+|\\pard|\\par|\n|\r").expect("valid RTF group pattern")
    });
    let words = RTF_WORDS
        .get_or_init(|| Regex::new(r"\\.[a-z0-9]+").expect("valid RTF control word pattern"));

    let stripped = groups.replace_all(&ascii, "");
    let text = words.replace_all(&stripped, "").trim().to_string();
    debug!(input = raw.len(), output = text.len(), "Extracted text from RTF body");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::MemoryMessage;
    use chrono::NaiveDate;

    fn message() -> MemoryMessage {
        let when = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        MemoryMessage::new("Status", "a@x.com", when)
    }

    #[test]
    fn test_rtf_strip_leaves_outer_braces() {
        let rtf = br"{\rtf1\ansi{\fonttbl\f0 Arial;}\pard Hello world\par}";
        assert_eq!(rtf_to_text(rtf), "{ Hello world}");
    }

    #[test]
    fn test_rtf_flat_document_is_swallowed() {
        // A document without nested groups matches the group pattern whole.
        assert_eq!(rtf_to_text(br"{\rtf1\ansi Hello\par}"), "");
    }

    #[test]
    fn test_rtf_drops_non_ascii() {
        assert_eq!(rtf_to_text("caf\u{e9}".as_bytes()), "caf");
    }

    #[test]
    fn test_html_preferred() {
        let msg = message()
            .with_html("<p>Hello <strong>there</strong></p>")
            .with_body("plain");
        let email = EmailMetadata::from_handle(&msg);
        let body = render_body(&email, &msg);
        assert!(body.contains("**there**"), "got {body:?}");
        assert!(!body.contains("plain"));
    }

    #[test]
    fn test_plain_then_rtf_then_empty() {
        let msg = message().with_body("just text").with_rtf(br"{\rtf1 ignored}");
        let email = EmailMetadata::from_handle(&msg);
        assert_eq!(render_body(&email, &msg), "just text");

        let msg = message().with_rtf(br"{\rtf1{\fonttbl x}\pard Fallback\par}");
        let email = EmailMetadata::from_handle(&msg);
        assert_eq!(render_body(&email, &msg), "{ Fallback}");

        let msg = message();
        let email = EmailMetadata::from_handle(&msg);
        assert!(render_body(&email, &msg).is_empty());
    }
}

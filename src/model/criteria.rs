//! User-supplied filter criteria.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{ExportError, Result};

/// Criteria a message must satisfy to be exported.
///
/// Constructed once from user input. All textual comparisons are
/// case-insensitive; see [`crate::filter`] for the predicates built from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Lower bound on the received time, inclusive.
    pub start_date: Option<NaiveDateTime>,
    /// Upper bound on the received time, inclusive.
    pub end_date: Option<NaiveDateTime>,
    /// Allowed sender addresses. Empty means any sender.
    pub senders: Vec<String>,
    /// Every keyword must appear in the subject.
    pub subject_keywords: Vec<String>,
    /// Every keyword must appear in the plain-text body.
    pub body_keywords: Vec<String>,
    /// Only messages with at least one attachment.
    pub with_attachments: bool,
    /// Only messages without attachments.
    pub without_attachments: bool,
    /// Folder to read, e.g. `Inbox/Projects`. `None` means the inbox.
    pub folder_path: Option<String>,
}

impl FilterCriteria {
    /// Set the date range from calendar days.
    ///
    /// The start day begins at midnight; the end day runs through its last
    /// millisecond, so both days are fully included.
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start.map(|d| d.and_time(NaiveTime::MIN));
        self.end_date = end.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999));
        self
    }

    /// Reject switch combinations that can never match.
    pub fn validate(&self) -> Result<()> {
        if self.with_attachments && self.without_attachments {
            return Err(ExportError::FilterConfig(
                "cannot require both presence and absence of attachments".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_attachment_switches() {
        let criteria = FilterCriteria {
            with_attachments: true,
            without_attachments: true,
            ..Default::default()
        };
        let err = criteria.validate().unwrap_err();
        assert!(matches!(err, ExportError::FilterConfig(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_single_switch_is_valid() {
        let criteria = FilterCriteria {
            with_attachments: true,
            ..Default::default()
        };
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_date_range_covers_whole_days() {
        let criteria = FilterCriteria::default().with_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        );
        let start = criteria.start_date.unwrap();
        let end = criteria.end_date.unwrap();
        assert_eq!(start.to_string(), "2024-01-01 00:00:00");
        assert_eq!(end.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-31 23:59:59");
    }
}

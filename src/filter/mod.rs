//! Filter engine: composable predicates over [`EmailMetadata`].
//!
//! Each filter answers a single yes/no question about a message. A
//! [`CompositeFilter`] ANDs any number of them; with no components it
//! matches everything. Evaluation short-circuits on the first rejection,
//! which never changes the result.

pub mod predicates;

use tracing::trace;

use crate::error::Result;
use crate::model::criteria::FilterCriteria;
use crate::model::email::EmailMetadata;

pub use predicates::{
    AttachmentPresenceFilter, DateRangeFilter, KeywordField, KeywordFilter, SenderFilter,
};

/// A predicate over message metadata.
pub trait EmailFilter {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// `true` if the message passes.
    fn matches(&self, email: &EmailMetadata) -> bool;
}

/// Logical AND over a list of filters.
#[derive(Default)]
pub struct CompositeFilter {
    filters: Vec<Box<dyn EmailFilter>>,
}

impl CompositeFilter {
    pub fn new(filters: Vec<Box<dyn EmailFilter>>) -> Self {
        Self { filters }
    }

    /// Build the filter for a set of criteria, adding only the predicates
    /// the criteria actually constrain.
    ///
    /// Fails if the criteria are contradictory (both attachment switches).
    pub fn from_criteria(criteria: &FilterCriteria) -> Result<Self> {
        criteria.validate()?;

        let mut filters: Vec<Box<dyn EmailFilter>> = Vec::new();

        if criteria.start_date.is_some() || criteria.end_date.is_some() {
            filters.push(Box::new(DateRangeFilter::new(
                criteria.start_date,
                criteria.end_date,
            )));
        }
        if !criteria.senders.is_empty() {
            filters.push(Box::new(SenderFilter::new(&criteria.senders)));
        }
        if !criteria.subject_keywords.is_empty() {
            filters.push(Box::new(KeywordFilter::subject(&criteria.subject_keywords)));
        }
        if !criteria.body_keywords.is_empty() {
            filters.push(Box::new(KeywordFilter::body(&criteria.body_keywords)));
        }
        if criteria.with_attachments {
            filters.push(Box::new(AttachmentPresenceFilter::with_attachments()));
        }
        if criteria.without_attachments {
            filters.push(Box::new(AttachmentPresenceFilter::without_attachments()));
        }

        Ok(Self { filters })
    }

    /// Append another component.
    pub fn push(&mut self, filter: impl EmailFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl EmailFilter for CompositeFilter {
    fn name(&self) -> &'static str {
        "all-of"
    }

    fn matches(&self, email: &EmailMetadata) -> bool {
        self.filters.iter().all(|f| {
            let ok = f.matches(email);
            if !ok {
                trace!(filter = f.name(), subject = %email.subject, "Rejected");
            }
            ok
        })
    }
}

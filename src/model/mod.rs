//! Core data model: message metadata, attachments, criteria, settings and results.

pub mod attachment;
pub mod criteria;
pub mod email;
pub mod result;
pub mod settings;

//! `mailexport`: export attachments and messages from a mail store.
//!
//! Messages are filtered by date, sender, keywords and attachment presence,
//! then written under `<output>/<sender>/<subject>/<date>/` as attachments,
//! native message files or markdown documents. Repeated attachment content
//! is detected by hash and moved to a duplicates subfolder.

pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod storage;

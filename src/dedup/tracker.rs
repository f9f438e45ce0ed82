//! Content-hash registry for one export run.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::algorithm::HashAlgorithm;
use crate::error::{ExportError, Result};

/// Summary of what the tracker has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateStats {
    /// Distinct contents.
    pub unique_files: usize,
    /// Files registered, duplicates included.
    pub total_files: usize,
    /// `total_files - unique_files`.
    pub duplicate_files: usize,
}

/// Maps content hashes to every path saved with that content.
///
/// Detection is by content only: two attachments with the same bytes are
/// duplicates whatever their names. The first path registered for a hash
/// is the original. Nothing is persisted between runs.
#[derive(Debug, Clone)]
pub struct DuplicateTracker {
    algorithm: HashAlgorithm,
    seen: HashMap<String, Vec<PathBuf>>,
}

impl DuplicateTracker {
    /// Create a tracker for the named digest.
    ///
    /// Fails with [`ExportError::UnsupportedHashAlgorithm`] for unknown names.
    pub fn new(algorithm: &str) -> Result<Self> {
        Ok(Self::with_algorithm(algorithm.parse()?))
    }

    /// Create a tracker for an already-validated digest.
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            seen: HashMap::new(),
        }
    }

    /// Hex digest of a file, read in fixed-size chunks.
    pub fn compute_hash(&self, file_path: &Path) -> Result<String> {
        let file = File::open(file_path).map_err(|e| ExportError::HashFailed {
            path: file_path.to_path_buf(),
            source: e,
        })?;
        self.algorithm
            .digest_reader(file)
            .map_err(|e| ExportError::HashFailed {
                path: file_path.to_path_buf(),
                source: e,
            })
    }

    /// `true` if `hash` was registered earlier in this run.
    pub fn is_duplicate(&self, hash: &str) -> bool {
        self.seen.contains_key(hash)
    }

    /// Record that `path` holds content with `hash`.
    pub fn register(&mut self, hash: &str, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(
            file = %path.display(),
            hash = hash.get(..8).unwrap_or(hash),
            "Registered file"
        );
        self.seen.entry(hash.to_string()).or_default().push(path);
    }

    /// Every path saved with this hash, original first.
    pub fn locations(&self, hash: &str) -> &[PathBuf] {
        self.seen.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Where the content was first saved.
    pub fn original(&self, hash: &str) -> Option<&Path> {
        self.locations(hash).first().map(PathBuf::as_path)
    }

    /// Counts of unique, total and duplicate files.
    pub fn statistics(&self) -> DuplicateStats {
        let unique_files = self.seen.len();
        let total_files = self.seen.values().map(Vec::len).sum();
        DuplicateStats {
            unique_files,
            total_files,
            duplicate_files: total_files - unique_files,
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.seen.clear();
        debug!("Cleared duplicate tracker");
    }
}

impl Default for DuplicateTracker {
    fn default() -> Self {
        Self::with_algorithm(HashAlgorithm::default())
    }
}

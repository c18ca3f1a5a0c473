//! Deterministic, partition-qualified blank node labels.
//!
//! A blank node label is only unique inside the partition it was read from.
//! The label is therefore qualified with the partition identity: the input
//! file path relative to the input root. The same `(local id, partition)`
//! pair always produces the same label, so a retried or re-ordered task
//! writes byte-identical output.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlankNodeLabel {
    local_id: String,
    partition_id: String,
}

impl BlankNodeLabel {
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    /// Identifier usable as an N-Triples blank node label (without `_:`).
    /// An empty partition id leaves an already qualified label unchanged.
    pub fn identifier(&self) -> String {
        if self.partition_id.is_empty() {
            return self.local_id.clone();
        }
        format!("{}_{}", self.local_id, partition_token(&self.partition_id))
    }
}

impl fmt::Display for BlankNodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.identifier())
    }
}

/// Names the blank nodes of one input partition.
#[derive(Debug, Clone)]
pub struct BlankNodeNamer {
    partition_id: String,
}

impl BlankNodeNamer {
    pub fn new(partition_id: impl Into<String>) -> Self {
        Self { partition_id: partition_id.into() }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn name(&self, local_id: &str) -> BlankNodeLabel {
        Self::label(local_id, &self.partition_id)
    }

    pub fn label(local_id: &str, partition_id: &str) -> BlankNodeLabel {
        BlankNodeLabel { local_id: local_id.to_string(), partition_id: partition_id.to_string() }
    }
}

/// Readable part of the partition id followed by its digest. The digest keeps
/// ids that sanitize to the same text (`a/b` and `a_b`) apart.
fn partition_token(partition_id: &str) -> String {
    let readable: String = partition_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let mut hasher = FxHasher::default();
    partition_id.hash(&mut hasher);
    format!("{}_{:016x}", readable, hasher.finish())
}

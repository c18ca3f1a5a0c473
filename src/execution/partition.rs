//! Input partitions and the key partitioner shared by shuffle and index lookup.

use crate::error::{Error, Result};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker written into a corpus whose blank node labels are already
/// qualified. Partitions of such a corpus keep their labels as they are.
pub const QUALIFIED_LABELS_MARKER: &str = "_QUALIFIED_LABELS";

/// One input file. `id` is the path relative to the input root, with `/`
/// separators, so it does not depend on where the corpus is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPartition {
    pub id: String,
    pub path: PathBuf,
    /// Partition identity used to qualify blank nodes; empty when the
    /// labels are already qualified.
    pub blank_scope: String,
}

impl InputPartition {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let id = id.into();
        Self { blank_scope: id.clone(), id, path: path.into() }
    }
}

/// List the partitions under `input`, sorted by id.
///
/// A plain file is a single partition. Hidden files and files starting with
/// `_` (job markers such as `_SUCCESS`) are skipped.
pub fn list_partitions(input: &Path) -> Result<Vec<InputPartition>> {
    let metadata = std::fs::metadata(input).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("input '{}': {}", input.display(), e)))
    })?;

    if metadata.is_file() {
        let id = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string_lossy().into_owned());
        return Ok(vec![InputPartition::new(id, input)]);
    }

    let qualified = input.join(QUALIFIED_LABELS_MARKER).exists();
    let mut partitions = Vec::new();
    let walker = WalkDir::new(input).follow_links(true).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !is_ignored(&entry.file_name().to_string_lossy())
    });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let mut partition = InputPartition::new(id, entry.path());
        if qualified {
            partition.blank_scope.clear();
        }
        partitions.push(partition);
    }

    partitions.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(partitions)
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Reduce partition (and index shard) responsible for `key`.
pub fn partition_for(key: &str, partitions: usize) -> usize {
    if partitions <= 1 {
        return 0;
    }
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

//! The satellite index artifact: a directory of sorted shards.
//!
//! ```text
//! <artifact>/
//!   MANIFEST          bincode: format version, shard count, entry count
//!   part-00000.dat    records of shard 0, ascending key order
//!   part-00000.idx    sparse index of shard 0
//!   ...
//! ```
//!
//! A key lives in shard `partition_for(key, shards)`, the same partitioner the
//! executor shuffles with, so every Stage 1 reduce task writes exactly one
//! shard in ascending key order.

use crate::error::{Error, Result};
use crate::execution::partition_for;
use crate::indexing::shared::{split_requestors, SatelliteIndexEntry};
use crate::indexing::sparse::{SparseIndexReader, SparseIndexWriter};
use crate::storage::staging::{write_error, StagingDir};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "MANIFEST";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub shards: usize,
    pub entries: u64,
}

fn shard_paths(dir: &Path, shard: usize) -> (PathBuf, PathBuf) {
    (dir.join(format!("part-{:05}.dat", shard)), dir.join(format!("part-{:05}.idx", shard)))
}

/// Read-only point lookups against a satellite index.
///
/// Implementations are opened once per task and dropped at task end.
pub trait SatelliteLookup {
    /// Requestors of `key`, `None` when the key is absent.
    fn lookup(&mut self, key: &str) -> Result<Option<BTreeSet<String>>>;
}

/// In-memory index for small runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySatelliteIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl MemorySatelliteIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SatelliteIndexEntry> for MemorySatelliteIndex {
    fn from_iter<I: IntoIterator<Item = SatelliteIndexEntry>>(iter: I) -> Self {
        let mut entries: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in iter {
            entries.entry(entry.key).or_default().extend(entry.requestors);
        }
        Self { entries }
    }
}

impl SatelliteLookup for MemorySatelliteIndex {
    fn lookup(&mut self, key: &str) -> Result<Option<BTreeSet<String>>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// Writes the shards of one artifact into a staging directory.
///
/// Shards may be written concurrently, one reduce task per shard. Nothing is
/// visible under the artifact name until `publish`.
pub struct SatelliteIndexWriter {
    staging: StagingDir,
    shards: usize,
    sparse_interval: usize,
}

impl SatelliteIndexWriter {
    pub fn create(artifact: &Path, shards: usize, sparse_interval: usize) -> Result<Self> {
        Ok(Self { staging: StagingDir::create(artifact)?, shards: shards.max(1), sparse_interval })
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    /// Write shard `shard`. Entries must be in ascending key order and belong
    /// to this shard. Rewriting a shard replaces it.
    pub fn write_shard<'a>(
        &self,
        shard: usize,
        entries: impl IntoIterator<Item = &'a SatelliteIndexEntry>,
    ) -> Result<u64> {
        if shard >= self.shards {
            return Err(Error::ArtifactWrite(format!("shard {} out of range", shard)));
        }
        let (data_path, index_path) = shard_paths(self.staging.path(), shard);
        let mut writer = SparseIndexWriter::create(&data_path, &index_path, self.sparse_interval)?;

        for entry in entries {
            if partition_for(&entry.key, self.shards) != shard {
                return Err(Error::ArtifactWrite(format!(
                    "key '{}' does not belong to shard {}",
                    entry.key, shard
                )));
            }
            writer.append(&entry.key, &entry.value())?;
        }
        writer.finish()
    }

    /// Write the manifest and move the artifact into place.
    pub fn publish(self, entries: u64) -> Result<PathBuf> {
        for shard in 0..self.shards {
            let (data_path, index_path) = shard_paths(self.staging.path(), shard);
            if !data_path.exists() || !index_path.exists() {
                let empty: [&SatelliteIndexEntry; 0] = [];
                self.write_shard(shard, empty)?;
            }
        }

        let manifest = Manifest { version: FORMAT_VERSION, shards: self.shards, entries };
        let manifest_path = self.staging.file(MANIFEST_FILE);
        std::fs::write(&manifest_path, bincode::serialize(&manifest)?)
            .map_err(|e| write_error(&manifest_path, e))?;

        self.staging.publish()
    }
}

/// File-backed index reader, one open handle per shard.
pub struct SatelliteIndexReader {
    manifest: Manifest,
    shards: Vec<SparseIndexReader>,
}

impl SatelliteIndexReader {
    /// `Error::MissingIndex` when there is no artifact at `artifact`.
    pub fn open(artifact: &Path) -> Result<Self> {
        let manifest_path = artifact.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Error::MissingIndex(artifact.display().to_string()));
        }

        let manifest: Manifest = bincode::deserialize(&std::fs::read(&manifest_path)?).map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: {}", manifest_path.display(), e),
            ))
        })?;
        if manifest.version != FORMAT_VERSION {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: unsupported index version {}", artifact.display(), manifest.version),
            )));
        }

        let shards = (0..manifest.shards)
            .map(|shard| {
                let (data_path, index_path) = shard_paths(artifact, shard);
                SparseIndexReader::open(&data_path, &index_path)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(artifact = %artifact.display(), shards = shards.len(), entries = manifest.entries, "opened satellite index");
        Ok(Self { manifest, shards })
    }

    pub fn len(&self) -> u64 {
        self.manifest.entries
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.entries == 0
    }
}

impl SatelliteLookup for SatelliteIndexReader {
    fn lookup(&mut self, key: &str) -> Result<Option<BTreeSet<String>>> {
        if self.shards.is_empty() {
            return Ok(None);
        }
        let shard = partition_for(key, self.shards.len());
        Ok(self.shards[shard].get(key)?.map(|value| split_requestors(&value)))
    }
}

//! One sorted shard of the satellite index.
//!
//! The data file holds length-prefixed records in ascending key order. The
//! index file holds every `interval`-th key with its data offset. A lookup
//! binary searches the sparse entries, seeks to the block start and scans at
//! most one block.

use crate::error::{Error, Result};
use crate::indexing::shared::{decode_record, encode_record};
use crate::storage::staging::write_error;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct SparseIndex {
    record_count: u64,
    data_len: u64,
    entries: Vec<(String, u64)>,
}

pub struct SparseIndexWriter {
    data_file: BufWriter<File>,
    data_path: PathBuf,
    index_path: PathBuf,
    interval: usize,
    offset: u64,
    record_count: u64,
    last_key: Option<String>,
    entries: Vec<(String, u64)>,
}

impl SparseIndexWriter {
    pub fn create(data_path: &Path, index_path: &Path, interval: usize) -> Result<Self> {
        let data_file = File::create(data_path).map_err(|e| write_error(data_path, e))?;
        Ok(Self {
            data_file: BufWriter::new(data_file),
            data_path: data_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            interval: interval.max(1),
            offset: 0,
            record_count: 0,
            last_key: None,
            entries: Vec::new(),
        })
    }

    /// Keys must arrive strictly ascending.
    pub fn append(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_str() {
                return Err(Error::ArtifactWrite(format!(
                    "{}: key '{}' written after '{}'",
                    self.data_path.display(),
                    key,
                    last
                )));
            }
        }

        if self.record_count % self.interval as u64 == 0 {
            self.entries.push((key.to_string(), self.offset));
        }

        self.offset +=
            encode_record(&mut self.data_file, key, value).map_err(|e| write_error(&self.data_path, e))?;
        self.record_count += 1;
        self.last_key = Some(key.to_string());
        Ok(())
    }

    /// Flush the data file and write the sparse index. Returns the record count.
    pub fn finish(mut self) -> Result<u64> {
        self.data_file.flush().map_err(|e| write_error(&self.data_path, e))?;
        self.data_file.get_ref().sync_all().map_err(|e| write_error(&self.data_path, e))?;

        let index = SparseIndex {
            record_count: self.record_count,
            data_len: self.offset,
            entries: std::mem::take(&mut self.entries),
        };
        let encoded = bincode::serialize(&index)?;
        let mut index_file = File::create(&self.index_path).map_err(|e| write_error(&self.index_path, e))?;
        index_file.write_all(&encoded).map_err(|e| write_error(&self.index_path, e))?;
        index_file.sync_all().map_err(|e| write_error(&self.index_path, e))?;

        Ok(self.record_count)
    }
}

pub struct SparseIndexReader {
    data_file: BufReader<File>,
    index: SparseIndex,
}

impl SparseIndexReader {
    pub fn open(data_path: &Path, index_path: &Path) -> Result<Self> {
        let encoded = std::fs::read(index_path)?;
        let index: SparseIndex = bincode::deserialize(&encoded).map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: {}", index_path.display(), e),
            ))
        })?;
        let data_file = BufReader::new(File::open(data_path)?);
        Ok(Self { data_file, index })
    }

    pub fn len(&self) -> u64 {
        self.index.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.index.record_count == 0
    }

    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        let block = self.index.entries.partition_point(|(k, _)| k.as_str() <= key);
        if block == 0 {
            return Ok(None);
        }

        let start = self.index.entries[block - 1].1;
        let end = self.index.entries.get(block).map_or(self.index.data_len, |(_, offset)| *offset);

        self.data_file.seek(SeekFrom::Start(start))?;
        let mut position = start;
        while position < end {
            let Some((record_key, value)) = decode_record(&mut self.data_file)? else {
                break;
            };
            position += 8 + record_key.len() as u64 + value.len() as u64;

            match record_key.as_str().cmp(key) {
                std::cmp::Ordering::Equal => return Ok(Some(value)),
                std::cmp::Ordering::Greater => return Ok(None),
                std::cmp::Ordering::Less => {}
            }
        }
        Ok(None)
    }
}

//! Local batch executor.
//!
//! Runs a stage as map tasks over input partitions, shuffles the emitted
//! `(key, value)` pairs into reduce partitions with a deterministic
//! partitioner, and runs one reduce task per partition. Tasks are retried
//! (at-least-once), so every task must be idempotent.
//!
//! ```text
//! partition 0 ─┐              ┌─ reduce 0 (keys ascending)
//! partition 1 ─┼─ map tasks ──┼─ reduce 1
//! partition N ─┘  (rayon)     └─ reduce R-1
//! ```

pub mod partition;

pub use partition::{list_partitions, partition_for, InputPartition, QUALIFIED_LABELS_MARKER};

use crate::core::{BlankNodeNamer, Triple};
use crate::error::Result;
use crate::parsing::ntriples::TripleReader;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Number of reduce partitions (and satellite index shards).
    pub reducers: usize,
    /// One sparse index entry every `sparse_interval` index records.
    pub sparse_interval: usize,
    /// Attempts per task before the stage fails.
    pub max_attempts: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { reducers: 4, sparse_interval: 128, max_attempts: 2 }
    }
}

/// Per-task counters, merged into a stage total.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    pub triples_read: u64,
    pub malformed: u64,
    pub emitted: u64,
    pub path_failures: u64,
    pub groups: u64,
    pub written: u64,
}

impl Counters {
    pub fn merge(&mut self, other: &Counters) {
        self.triples_read += other.triples_read;
        self.malformed += other.malformed;
        self.emitted += other.emitted;
        self.path_failures += other.path_failures;
        self.groups += other.groups;
        self.written += other.written;
    }

    pub fn warnings(&self) -> u64 {
        self.malformed + self.path_failures
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read={} malformed={} emitted={} path_failures={} groups={} written={}",
            self.triples_read,
            self.malformed,
            self.emitted,
            self.path_failures,
            self.groups,
            self.written
        )
    }
}

/// Buffer a map task emits into, already split by reduce partition.
pub struct MapOutput<V> {
    buckets: Vec<Vec<(String, V)>>,
    pub counters: Counters,
}

impl<V> MapOutput<V> {
    pub fn new(reducers: usize) -> Self {
        Self { buckets: (0..reducers).map(|_| Vec::new()).collect(), counters: Counters::default() }
    }

    pub fn emit(&mut self, key: String, value: V) {
        let partition = partition_for(&key, self.buckets.len());
        self.buckets[partition].push((key, value));
        self.counters.emitted += 1;
    }
}

pub trait MapTask: Sync {
    type Value: Send;

    fn map(&self, partition: &InputPartition, out: &mut MapOutput<Self::Value>) -> Result<()>;
}

/// Values grouped by key for one reduce partition, keys ascending.
pub type Groups<V> = BTreeMap<String, Vec<V>>;

pub trait ReduceTask: Sync {
    type Value: Send + Sync;
    type Output: Send;

    fn reduce(
        &self,
        partition: usize,
        groups: &Groups<Self::Value>,
        counters: &mut Counters,
    ) -> Result<Self::Output>;
}

pub struct JobOutput<O> {
    /// One output per reduce partition, in partition order.
    pub outputs: Vec<O>,
    pub counters: Counters,
}

pub struct LocalExecutor {
    config: ExecutorConfig,
}

impl LocalExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn run<M, R>(
        &self,
        partitions: &[InputPartition],
        mapper: &M,
        reducer: &R,
    ) -> Result<JobOutput<R::Output>>
    where
        M: MapTask,
        R: ReduceTask<Value = M::Value>,
        M::Value: Sync,
    {
        let reducers = self.config.reducers.max(1);

        let map_outputs = partitions
            .par_iter()
            .map(|partition| {
                self.attempt("map", &partition.id, || {
                    let mut out = MapOutput::new(reducers);
                    mapper.map(partition, &mut out)?;
                    Ok(out)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut counters = Counters::default();
        let mut groups: Vec<Groups<M::Value>> = (0..reducers).map(|_| BTreeMap::new()).collect();
        for output in map_outputs {
            counters.merge(&output.counters);
            for (partition, bucket) in output.buckets.into_iter().enumerate() {
                for (key, value) in bucket {
                    groups[partition].entry(key).or_default().push(value);
                }
            }
        }

        let reduced = groups
            .par_iter()
            .enumerate()
            .map(|(partition, group)| {
                self.attempt("reduce", &partition.to_string(), || {
                    let mut task_counters = Counters::default();
                    task_counters.groups = group.len() as u64;
                    let output = reducer.reduce(partition, group, &mut task_counters)?;
                    Ok((output, task_counters))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(reduced.len());
        for (output, task_counters) in reduced {
            counters.merge(&task_counters);
            outputs.push(output);
        }

        Ok(JobOutput { outputs, counters })
    }

    fn attempt<T>(&self, phase: &str, task: &str, mut run: impl FnMut() -> Result<T>) -> Result<T> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match run() {
                Ok(value) => {
                    debug!(phase, task, attempt, "task finished");
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(phase, task, attempt, error = %e, "task failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Feed every well-formed triple of `partition` to `visit`.
///
/// Malformed lines are logged, counted and skipped; IO errors and errors
/// returned by `visit` fail the task.
pub fn read_triples(
    partition: &InputPartition,
    counters: &mut Counters,
    mut visit: impl FnMut(Triple) -> Result<()>,
) -> Result<()> {
    let file = File::open(&partition.path)?;
    let reader = TripleReader::new(BufReader::new(file), BlankNodeNamer::new(partition.blank_scope.as_str()));

    for item in reader {
        match item {
            Ok(triple) => {
                counters.triples_read += 1;
                visit(triple)?;
            }
            Err(e) if e.is_recoverable() => {
                counters.malformed += 1;
                warn!(error = %e, "skipping malformed triple");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

//! Stage 1: build the satellite index.

use crate::config::ResolutionRules;
use crate::error::Result;
use crate::execution::{
    list_partitions, read_triples, Counters, Groups, InputPartition, LocalExecutor, MapOutput,
    MapTask, ReduceTask,
};
use crate::indexing::{SatelliteIndexBuilder, SatelliteIndexEntry, SatelliteIndexWriter};
use crate::pipeline::StageReport;
use std::path::Path;
use tracing::info;

struct CollectMapper<'a> {
    builder: SatelliteIndexBuilder<'a>,
}

impl MapTask for CollectMapper<'_> {
    type Value = String;

    fn map(&self, partition: &InputPartition, out: &mut MapOutput<String>) -> Result<()> {
        let mut counters = Counters::default();
        read_triples(partition, &mut counters, |triple| {
            if let Some((key, requestor)) = self.builder.key_for(&triple) {
                out.emit(key, requestor);
            }
            Ok(())
        })?;
        out.counters.merge(&counters);
        Ok(())
    }
}

struct CollectReducer<'a> {
    writer: &'a SatelliteIndexWriter,
}

impl ReduceTask for CollectReducer<'_> {
    type Value = String;
    type Output = u64;

    fn reduce(&self, partition: usize, groups: &Groups<String>, counters: &mut Counters) -> Result<u64> {
        let entries: Vec<SatelliteIndexEntry> = groups
            .iter()
            .filter_map(|(key, requestors)| SatelliteIndexBuilder::merge(key, requestors.iter().cloned()))
            .collect();
        let written = self.writer.write_shard(partition, &entries)?;
        counters.written += written;
        Ok(written)
    }
}

/// Scan `input` and publish the satellite index at `artifact`.
pub fn build_index(rules: &ResolutionRules, input: &Path, artifact: &Path) -> Result<StageReport> {
    let partitions = list_partitions(input)?;
    info!(input = %input.display(), partitions = partitions.len(), "building satellite index");

    let executor = LocalExecutor::new(rules.executor.clone());
    let writer = SatelliteIndexWriter::create(
        artifact,
        executor.config().reducers.max(1),
        executor.config().sparse_interval,
    )?;

    let mapper = CollectMapper { builder: SatelliteIndexBuilder::new(rules) };
    let job = executor.run(&partitions, &mapper, &CollectReducer { writer: &writer })?;

    let entries: u64 = job.outputs.iter().sum();
    let output = writer.publish(entries)?;

    let report = StageReport { stage: "index", output, counters: job.counters };
    report.log();
    Ok(report)
}

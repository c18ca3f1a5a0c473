//! Path resolution pass: rewrite the corpus with one-hop derived triples.

use crate::config::ResolutionRules;
use crate::core::Triple;
use crate::error::Result;
use crate::execution::{
    list_partitions, read_triples, Counters, Groups, InputPartition, LocalExecutor, MapOutput,
    MapTask, ReduceTask, QUALIFIED_LABELS_MARKER,
};
use crate::parsing::ntriples::write_triple;
use crate::pipeline::{write_part, StageReport};
use crate::resolution::PathResolver;
use crate::storage::staging::{write_error, StagingDir};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

struct ResolveMapper<'a> {
    resolver: PathResolver<'a>,
}

impl MapTask for ResolveMapper<'_> {
    type Value = Triple;

    fn map(&self, partition: &InputPartition, out: &mut MapOutput<Triple>) -> Result<()> {
        let mut counters = Counters::default();
        read_triples(partition, &mut counters, |triple| {
            if let Some(key) = self.resolver.resolution_key(&triple) {
                out.emit(key, triple);
            }
            Ok(())
        })?;
        out.counters.merge(&counters);
        Ok(())
    }
}

struct ResolveReducer<'a> {
    resolver: PathResolver<'a>,
    staging: &'a StagingDir,
}

impl ReduceTask for ResolveReducer<'_> {
    type Value = Triple;
    type Output = ();

    fn reduce(&self, partition: usize, groups: &Groups<Triple>, counters: &mut Counters) -> Result<()> {
        let mut failures = 0;
        let written = write_part(self.staging, partition, "nt", |writer| {
            let mut written = 0;
            for triples in groups.values() {
                let group: BTreeSet<Triple> = triples.iter().cloned().collect();
                let derivation = self.resolver.derive(&group);
                failures += derivation.failures;

                for triple in group.iter().chain(derivation.triples.difference(&group)) {
                    write_triple(writer, triple).map_err(|e| write_error(self.staging.path(), e))?;
                    written += 1;
                }
            }
            Ok(written)
        })?;
        counters.path_failures += failures;
        counters.written += written;
        Ok(())
    }
}

/// Copy `input` to `output` with every one-hop path materialized.
///
/// Blank node labels are written qualified and the output is marked so that
/// later stages read them back unchanged.
pub fn resolve_paths(rules: &ResolutionRules, input: &Path, output: &Path) -> Result<StageReport> {
    let partitions = list_partitions(input)?;
    info!(input = %input.display(), partitions = partitions.len(), rules = rules.paths.len(), "resolving paths");

    let executor = LocalExecutor::new(rules.executor.clone());
    let staging = StagingDir::create(output)?;

    let mapper = ResolveMapper { resolver: PathResolver::new(&rules.paths) };
    let reducer = ResolveReducer { resolver: PathResolver::new(&rules.paths), staging: &staging };
    let job = executor.run(&partitions, &mapper, &reducer)?;

    let marker = staging.file(QUALIFIED_LABELS_MARKER);
    std::fs::write(&marker, b"").map_err(|e| write_error(&marker, e))?;
    let output = staging.publish()?;

    let report = StageReport { stage: "resolve", output, counters: job.counters };
    report.log();
    Ok(report)
}

//! Stage 3: route triples to their documents and write bulk output.

use crate::assembly::{write_bulk, BulkTarget, DocumentAssembler};
use crate::config::ResolutionRules;
use crate::core::Triple;
use crate::error::{Error, Result};
use crate::execution::{
    list_partitions, read_triples, Counters, Groups, InputPartition, LocalExecutor, MapOutput,
    MapTask, ReduceTask,
};
use crate::indexing::{SatelliteIndexReader, SatelliteLookup};
use crate::pipeline::{write_part, StageReport};
use crate::routing::TripleRouter;
use crate::storage::staging::StagingDir;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub document_type: String,
    /// Published satellite index directory.
    pub artifact: PathBuf,
    /// Defaults to `<input>-bulk`.
    pub output: Option<PathBuf>,
    /// Defaults to the document type.
    pub index_name: Option<String>,
}

impl ConvertOptions {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.input.components().as_path().as_os_str().to_owned();
            path.push("-bulk");
            PathBuf::from(path)
        })
    }

    pub fn index_name(&self) -> &str {
        self.index_name.as_deref().unwrap_or(&self.document_type)
    }
}

struct RouteMapper<'a> {
    router: TripleRouter<'a>,
    /// `None` when no index was published; only primary subjects route then.
    artifact: Option<&'a Path>,
}

impl MapTask for RouteMapper<'_> {
    type Value = Triple;

    fn map(&self, partition: &InputPartition, out: &mut MapOutput<Triple>) -> Result<()> {
        let mut index = self.artifact.map(SatelliteIndexReader::open).transpose()?;

        let mut counters = Counters::default();
        read_triples(partition, &mut counters, |triple| {
            let lookup = index.as_mut().map(|reader| reader as &mut dyn SatelliteLookup);
            for (key, routed) in self.router.route(&triple, lookup)? {
                out.emit(key, routed);
            }
            Ok(())
        })?;
        out.counters.merge(&counters);
        Ok(())
    }
}

struct AssembleReducer<'a> {
    assembler: DocumentAssembler<'a>,
    target: BulkTarget,
    staging: &'a StagingDir,
}

impl ReduceTask for AssembleReducer<'_> {
    type Value = Triple;
    type Output = ();

    fn reduce(&self, partition: usize, groups: &Groups<Triple>, counters: &mut Counters) -> Result<()> {
        let written = write_part(self.staging, partition, "ndjson", |writer| {
            let mut written = 0;
            for (key, triples) in groups {
                for document in self.assembler.assemble(key, triples.iter().cloned()) {
                    write_bulk(writer, &self.target, &document)?;
                    written += 1;
                }
            }
            Ok(written)
        })?;
        counters.written += written;
        Ok(())
    }
}

/// Open the index once up front so that a missing artifact is reported once
/// per stage instead of once per task.
fn probe_index(artifact: &Path) -> Result<Option<&Path>> {
    match SatelliteIndexReader::open(artifact) {
        Ok(reader) => {
            info!(artifact = %artifact.display(), entries = reader.len(), "using satellite index");
            Ok(Some(artifact))
        }
        Err(e @ Error::MissingIndex(_)) => {
            warn!(error = %e, "no satellite index, satellites will not be fanned out");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn convert(rules: &ResolutionRules, options: &ConvertOptions) -> Result<StageReport> {
    let partitions = list_partitions(&options.input)?;
    let output = options.output_path();
    info!(
        input = %options.input.display(),
        output = %output.display(),
        partitions = partitions.len(),
        "converting to bulk documents"
    );

    let artifact = probe_index(&options.artifact)?;
    let executor = LocalExecutor::new(rules.executor.clone());
    let staging = StagingDir::create(&output)?;

    let mapper = RouteMapper { router: TripleRouter::new(rules), artifact };
    let reducer = AssembleReducer {
        assembler: DocumentAssembler::new(rules),
        target: BulkTarget {
            index_name: options.index_name().to_string(),
            primary_type: options.document_type.clone(),
            child_type: rules.child_type.clone(),
        },
        staging: &staging,
    };
    let job = executor.run(&partitions, &mapper, &reducer)?;
    let output = staging.publish()?;

    let report = StageReport { stage: "convert", output, counters: job.counters };
    report.log();
    Ok(report)
}

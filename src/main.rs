//! rdfdoc - resolve and denormalize an RDF corpus into bulk-index documents.
//!
//! Usage:
//!   rdfdoc resolve data/raw data/resolved http://example.org/org/
//!   rdfdoc index data/resolved data/index http://example.org/org/ satellites
//!   rdfdoc convert data/resolved org http://example.org/org/ data/index/satellites

use clap::{Parser, Subcommand};
use rdfdoc::config::ResolutionRules;
use rdfdoc::pipeline::{build_index, convert, resolve_paths, ConvertOptions, StageReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rdfdoc")]
#[command(about = "Resolve and denormalize an RDF corpus into bulk-index documents")]
struct Args {
    /// Resolution rules file
    #[arg(long, global = true, env = "RDFDOC_CONFIG", default_value = "resolution.properties")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the satellite index (stage 1)
    Index {
        input: PathBuf,
        output: PathBuf,
        primary_prefix: String,
        artifact_name: String,
    },
    /// Materialize one-hop property paths into a rewritten corpus
    Resolve {
        input: PathBuf,
        output: PathBuf,
        primary_prefix: String,
    },
    /// Route, assemble and write bulk-index documents (stage 3)
    Convert {
        input: PathBuf,
        document_type: String,
        primary_prefix: String,
        /// Path of the published satellite index
        artifact: PathBuf,
        /// Defaults to `<input>-bulk`
        output: Option<PathBuf>,
        /// Defaults to the document type
        index_name: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rdfdoc=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(args: Args) -> rdfdoc::Result<StageReport> {
    match args.command {
        Command::Index { input, output, primary_prefix, artifact_name } => {
            let rules = ResolutionRules::load(&args.config, &primary_prefix)?;
            build_index(&rules, &input, &output.join(artifact_name))
        }
        Command::Resolve { input, output, primary_prefix } => {
            let rules = ResolutionRules::load(&args.config, &primary_prefix)?;
            resolve_paths(&rules, &input, &output)
        }
        Command::Convert { input, document_type, primary_prefix, artifact, output, index_name } => {
            let rules = ResolutionRules::load(&args.config, &primary_prefix)?;
            convert(&rules, &ConvertOptions { input, document_type, artifact, output, index_name })
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(report) => {
            println!("{}: {} ({})", report.stage, report.output.display(), report.counters);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "stage failed");
            ExitCode::FAILURE
        }
    }
}

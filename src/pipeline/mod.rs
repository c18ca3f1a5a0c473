//! Stage drivers: wire the components to the executor and the filesystem.
//!
//! ```text
//! input ──resolve──▶ resolved corpus ──index──▶ satellite index
//!                          │                          │
//!                          └───────────convert────────┴──▶ bulk output
//! ```

pub mod collect;
pub mod convert;
pub mod resolve;

pub use collect::build_index;
pub use convert::{convert, ConvertOptions};
pub use resolve::resolve_paths;

use crate::error::Result;
use crate::execution::Counters;
use crate::storage::staging::{write_error, StagingDir};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome of one stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub output: PathBuf,
    pub counters: Counters,
}

impl StageReport {
    fn log(&self) {
        info!(stage = self.stage, output = %self.output.display(), counters = %self.counters, "stage finished");
        if self.counters.warnings() > 0 {
            warn!(
                stage = self.stage,
                malformed = self.counters.malformed,
                path_failures = self.counters.path_failures,
                "stage finished with skipped input"
            );
        }
    }
}

/// Create `part-r-NNNNN.<extension>` in `staging`, hand it to `write` and flush.
fn write_part<F>(staging: &StagingDir, partition: usize, extension: &str, write: F) -> Result<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<u64>,
{
    let path = staging.file(&format!("part-r-{:05}.{}", partition, extension));
    let mut writer = BufWriter::new(File::create(&path).map_err(|e| write_error(&path, e))?);
    let written = write(&mut writer)?;
    writer.flush().map_err(|e| write_error(&path, e))?;
    Ok(written)
}

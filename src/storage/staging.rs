//! Staging directories for stage outputs.
//!
//! Output is written under a sibling directory and renamed onto the final
//! name only once complete, so a failed stage never leaves a partial
//! artifact under the published name.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub struct StagingDir {
    staging: PathBuf,
    target: PathBuf,
    published: bool,
}

impl StagingDir {
    pub fn create(target: &Path) -> Result<Self> {
        let name = target
            .file_name()
            .ok_or_else(|| {
                Error::ArtifactWrite(format!("output path '{}' has no file name", target.display()))
            })?
            .to_string_lossy()
            .into_owned();
        let parent = target.parent().map(Path::to_path_buf).unwrap_or_default();
        let staging = parent.join(format!(".{}.staging-{}", name, std::process::id()));

        if staging.exists() {
            std::fs::remove_dir_all(&staging).map_err(|e| write_error(&staging, e))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| write_error(&staging, e))?;

        Ok(Self { staging, target: target.to_path_buf(), published: false })
    }

    pub fn path(&self) -> &Path {
        &self.staging
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.staging.join(name)
    }

    /// Replace whatever is at the target with the staged contents.
    pub fn publish(mut self) -> Result<PathBuf> {
        if self.target.exists() {
            std::fs::remove_dir_all(&self.target).map_err(|e| write_error(&self.target, e))?;
        }
        std::fs::rename(&self.staging, &self.target).map_err(|e| write_error(&self.target, e))?;
        self.published = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.published {
            let _ = std::fs::remove_dir_all(&self.staging);
        }
    }
}

pub(crate) fn write_error(path: &Path, err: std::io::Error) -> Error {
    Error::ArtifactWrite(format!("{}: {}", path.display(), err))
}

use std::path::{Path, PathBuf};

use tokio::fs::{create_dir_all, remove_dir_all, rename};

use super::error::MinecraftError;

/// A version directory under construction.
///
/// Installers write the whole child version into a hidden staging
/// directory and rename it into place only once every step has succeeded,
/// so the catalog never observes a half-installed version. Dropping an
/// uncommitted staging removes the partial directory.
pub struct Staging {
    work_dir: PathBuf,
    final_dir: PathBuf,
    committed: bool,
}

impl Staging {
    /// Opens a fresh staging directory for `name` under the versions root,
    /// discarding any leftover from an interrupted earlier run.
    pub async fn begin(versions_dir: &Path, name: &str) -> Result<Self, MinecraftError> {
        let work_dir = versions_dir.join(format!(".staging-{name}"));
        let final_dir = versions_dir.join(name);

        if work_dir.is_dir() {
            remove_dir_all(&work_dir).await?;
        }
        create_dir_all(&work_dir).await?;

        Ok(Self {
            work_dir,
            final_dir,
            committed: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.work_dir
    }

    /// Atomically replaces the final version directory with the staged one.
    /// Re-installation is a full directory replace.
    pub async fn commit(mut self) -> Result<PathBuf, MinecraftError> {
        if self.final_dir.is_dir() {
            remove_dir_all(&self.final_dir).await?;
        }
        rename(&self.work_dir, &self.final_dir).await?;
        self.committed = true;
        Ok(self.final_dir.clone())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.committed && self.work_dir.is_dir() {
            if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
                log::warn!(
                    "Failed to clean staging directory {}: {e}",
                    self.work_dir.display()
                );
            }
        }
    }
}

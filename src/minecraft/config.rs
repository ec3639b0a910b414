use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::{endpoint::Endpoints, error::MinecraftError};

/// How many library/asset downloads a bulk run issues concurrently.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Everything an install operation needs besides its own arguments: the
/// target root directory, the source endpoint chain, a cooperative
/// cancellation signal and the `java` binary used for installer-embedded
/// post-processing programs.
///
/// Contexts share no mutable state; two contexts over the same root may
/// run concurrently as long as they do not install the same version id.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub root: PathBuf,
    pub endpoints: Endpoints,
    pub cancel: CancellationToken,
    pub java: PathBuf,
    pub concurrency: usize,
}

impl InstallContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            endpoints: Endpoints::official(),
            cancel: CancellationToken::new(),
            java: PathBuf::from("java"),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, name: &str) -> PathBuf {
        self.versions_dir().join(name)
    }

    pub fn version_json_path(&self, name: &str) -> PathBuf {
        self.version_dir(name).join(format!("{name}.json"))
    }

    pub fn version_jar_path(&self, name: &str) -> PathBuf {
        self.version_dir(name).join(format!("{name}.jar"))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn library_path(&self, repo_relative: &str) -> PathBuf {
        self.libraries_dir()
            .join(repo_relative.replace('/', std::path::MAIN_SEPARATOR_STR))
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    /// Checked between file operations so a cancel lands promptly.
    pub fn check_cancelled(&self) -> Result<(), MinecraftError> {
        if self.cancel.is_cancelled() {
            return Err(MinecraftError::Cancelled);
        }
        Ok(())
    }
}

impl AsRef<Path> for InstallContext {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}

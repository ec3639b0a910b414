use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use serde::{Deserialize, Serialize};

use crate::{json::version::meta::VersionMeta, util::json::{read_json, write_json}};

use super::error::MinecraftError;

pub const VERSION_CONFIG_FILE: &str = "version_config.json";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoaderFamily {
    #[default]
    None,
    Forge,
    Fabric,
    Quilt,
    OptiFine,
}

/// Per-version sidecar config. `use_version_isolation` is tri-state: an
/// absent value means "inherit the global setting". The loader tag is
/// written once by the installer that created the version, so catalog
/// scans do not have to re-derive it from descriptor text.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_version_isolation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderFamily>,
}

/// One installed version directory as seen by a catalog scan.
#[derive(Debug, Clone)]
pub struct InstalledVersion {
    /// Folder name; user-chosen or loader-generated.
    pub name: String,
    /// The descriptor's own id, which may differ from the folder name.
    pub id: String,
    pub loader: LoaderFamily,
    pub isolation: Option<bool>,
    pub last_accessed: Option<SystemTime>,
}

pub async fn read_version_config(
    root: &Path,
    name: &str,
) -> Result<VersionConfig, MinecraftError> {
    let path = root.join("versions").join(name).join(VERSION_CONFIG_FILE);
    if !path.is_file() {
        return Ok(VersionConfig::default());
    }
    Ok(read_json(&path).await?)
}

pub async fn write_version_config(
    root: &Path,
    name: &str,
    config: &VersionConfig,
) -> Result<(), MinecraftError> {
    let path = root.join("versions").join(name).join(VERSION_CONFIG_FILE);
    write_json(&path, config).await?;
    Ok(())
}

/// Merges a loader tag into the sidecar without disturbing the isolation
/// flag a user may have toggled.
pub async fn tag_loader(
    root: &Path,
    name: &str,
    family: LoaderFamily,
) -> Result<(), MinecraftError> {
    let mut config = read_version_config(root, name).await?;
    config.loader = Some(family);
    write_version_config(root, name, &config).await
}

pub async fn set_isolation(
    root: &Path,
    name: &str,
    isolation: Option<bool>,
) -> Result<(), MinecraftError> {
    let mut config = read_version_config(root, name).await?;
    config.use_version_isolation = isolation;
    write_version_config(root, name, &config).await
}

/// The mods directory a version actively uses: its own folder under
/// isolation, the shared root folder otherwise.
pub fn mods_dir(root: &Path, name: &str, isolated: bool) -> PathBuf {
    if isolated {
        root.join("versions").join(name).join("mods")
    } else {
        root.join("mods")
    }
}

/// Fallback loader classification by substring inspection of raw
/// descriptor text, for versions installed by other tooling that carries
/// no sidecar tag. Fixed precedence, first match wins; a descriptor
/// mentioning several loaders is knowingly classified by the first.
pub fn detect_family_text(raw_descriptor: &str) -> LoaderFamily {
    let lower = raw_descriptor.to_lowercase();
    if lower.contains("forge") {
        LoaderFamily::Forge
    } else if lower.contains("fabric") {
        LoaderFamily::Fabric
    } else if lower.contains("optifine") {
        LoaderFamily::OptiFine
    } else if lower.contains("quilt") {
        LoaderFamily::Quilt
    } else {
        LoaderFamily::None
    }
}

/// Enumerates installed versions. A folder qualifies when it holds a
/// parseable descriptor named after it and, unless it is a loader child
/// version (whose jar lives in the shared library tree), a matching jar.
pub async fn scan(root: &Path) -> Result<Vec<InstalledVersion>, MinecraftError> {
    let versions_dir = root.join("versions");
    if !versions_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(&versions_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let json_path = entry.path().join(format!("{name}.json"));
        if !json_path.is_file() {
            continue;
        }
        let raw = match tokio::fs::read_to_string(&json_path).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Unreadable descriptor in {name}: {e}");
                continue;
            }
        };
        let meta: VersionMeta = match serde_json::from_str(&raw) {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Unparseable descriptor in {name}: {e}");
                continue;
            }
        };

        let config = read_version_config(root, &name).await?;
        let loader = match config.loader {
            Some(family) => family,
            None => detect_family_text(&raw),
        };

        let is_loader_child = loader != LoaderFamily::None || meta.inherits_from.is_some();
        if !is_loader_child && !entry.path().join(format!("{name}.jar")).is_file() {
            continue;
        }

        let last_accessed = tokio::fs::metadata(&json_path)
            .await
            .ok()
            .and_then(|m| m.accessed().ok());

        found.push(InstalledVersion {
            name,
            id: meta.id,
            loader,
            isolation: config.use_version_isolation,
            last_accessed,
        });
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Removes an installed version entirely.
pub async fn remove_version(root: &Path, name: &str) -> Result<(), MinecraftError> {
    let dir = root.join("versions").join(name);
    if dir.is_dir() {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_detection_precedence() {
        assert_eq!(detect_family_text("net.minecraftforge:forge"), LoaderFamily::Forge);
        assert_eq!(detect_family_text("net.fabricmc.loader"), LoaderFamily::Fabric);
        assert_eq!(detect_family_text("OptiFine tweaker"), LoaderFamily::OptiFine);
        assert_eq!(detect_family_text("org.quiltmc"), LoaderFamily::Quilt);
        assert_eq!(detect_family_text("vanilla"), LoaderFamily::None);
        // First match wins even when several loaders are mentioned.
        assert_eq!(
            detect_family_text("quilted-fabric-api"),
            LoaderFamily::Fabric
        );
    }

    #[tokio::test]
    async fn scan_requires_jar_only_for_plain_versions() {
        let root = tempfile::tempdir().unwrap();

        // Plain version with descriptor but no jar: skipped.
        let plain = root.path().join("versions/1.20.1");
        tokio::fs::create_dir_all(&plain).await.unwrap();
        tokio::fs::write(plain.join("1.20.1.json"), br#"{"id":"1.20.1"}"#)
            .await
            .unwrap();

        // Loader child without jar: qualifies.
        let child = root.path().join("versions/1.20.1-fabric");
        tokio::fs::create_dir_all(&child).await.unwrap();
        tokio::fs::write(
            child.join("1.20.1-fabric.json"),
            br#"{"id":"1.20.1-fabric","inheritsFrom":"1.20.1","mainClass":"net.fabricmc.loader.impl.launch.knot.KnotClient"}"#,
        )
        .await
        .unwrap();

        let found = scan(root.path()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "1.20.1-fabric");
        assert_eq!(found[0].loader, LoaderFamily::Fabric);

        // Add the jar and the plain version appears too.
        tokio::fs::write(plain.join("1.20.1.jar"), b"jar").await.unwrap();
        let found = scan(root.path()).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn sidecar_tag_beats_text_heuristic() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("versions/custom");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        // Text mentions fabric, but the installer tagged it as Quilt.
        tokio::fs::write(
            dir.join("custom.json"),
            br#"{"id":"custom","inheritsFrom":"1.20.1","libraries":[{"name":"net.fabricmc:intermediary:1.20.1"}]}"#,
        )
        .await
        .unwrap();
        tag_loader(root.path(), "custom", LoaderFamily::Quilt)
            .await
            .unwrap();

        let found = scan(root.path()).await.unwrap();
        assert_eq!(found[0].loader, LoaderFamily::Quilt);
    }

    #[tokio::test]
    async fn isolation_toggle_survives_loader_tagging() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("versions/v");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        set_isolation(root.path(), "v", Some(true)).await.unwrap();
        tag_loader(root.path(), "v", LoaderFamily::Forge).await.unwrap();

        let config = read_version_config(root.path(), "v").await.unwrap();
        assert_eq!(config.use_version_isolation, Some(true));
        assert_eq!(config.loader, Some(LoaderFamily::Forge));
    }

    #[test]
    fn mods_dir_follows_isolation() {
        let root = Path::new("/root/game");
        assert_eq!(
            mods_dir(root, "v", true),
            root.join("versions").join("v").join("mods")
        );
        assert_eq!(mods_dir(root, "v", false), root.join("mods"));
    }
}

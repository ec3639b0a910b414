use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use tokio::{fs, task::block_in_place};

use crate::{
    minecraft::{
        catalog,
        config::InstallContext,
        error::MinecraftError,
        install::install_version_as,
    },
    reporter::{Report, Reporter},
    util::extract::{entry_names, open_archive, read_entry_to_string},
};

/// The recognized modpack archive shapes, in detection order. An archive
/// carrying several markers is classified by the first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackKind {
    CurseForge,
    Modrinth,
    Manual,
}

/// What an archive inspection learned: enough to name the install and
/// drive it without re-opening the manifest.
#[derive(Debug, Clone)]
pub struct PackInfo {
    pub kind: PackKind,
    /// Display name from the manifest, when one declares it.
    pub name: Option<String>,
    /// The vanilla version the pack runs on.
    pub base_version: String,
    /// Archive prefix whose contents overlay the version directory.
    pub overlay_prefix: String,
}

#[derive(Deserialize)]
struct CurseForgeManifest {
    minecraft: CurseForgeMinecraft,
    name: Option<String>,
    #[serde(default = "default_overrides")]
    overrides: String,
}

#[derive(Deserialize)]
struct CurseForgeMinecraft {
    version: String,
}

fn default_overrides() -> String {
    "overrides".to_string()
}

#[derive(Deserialize)]
struct ModrinthIndex {
    name: Option<String>,
    dependencies: HashMap<String, String>,
}

/// Classifies a modpack archive and extracts its base-version pin.
pub async fn inspect_pack(pack_path: &Path) -> Result<PackInfo, MinecraftError> {
    let names = entry_names(pack_path).await?;

    if names.iter().any(|name| name == "manifest.json") {
        let manifest: CurseForgeManifest =
            serde_json::from_str(&read_entry_to_string(pack_path, "manifest.json").await?)?;
        return Ok(PackInfo {
            kind: PackKind::CurseForge,
            name: manifest.name,
            base_version: manifest.minecraft.version,
            overlay_prefix: format!("{}/", manifest.overrides.trim_end_matches('/')),
        });
    }

    if names.iter().any(|name| name == "modrinth.index.json") {
        let index: ModrinthIndex = serde_json::from_str(
            &read_entry_to_string(pack_path, "modrinth.index.json").await?,
        )?;
        let base_version = index
            .dependencies
            .get("minecraft")
            .cloned()
            .ok_or_else(|| {
                MinecraftError::Parse("modrinth.index.json pins no minecraft version".into())
            })?;
        return Ok(PackInfo {
            kind: PackKind::Modrinth,
            name: index.name,
            base_version,
            overlay_prefix: "overrides/".to_string(),
        });
    }

    // Manual packs are a raw game-directory export: everything lives
    // under `versions/<id>/`, and the id doubles as the base pin.
    if let Some(id) = names.iter().find_map(|name| {
        name.strip_prefix("versions/")
            .and_then(|rest| rest.split('/').next())
            .filter(|id| !id.is_empty())
    }) {
        return Ok(PackInfo {
            kind: PackKind::Manual,
            name: None,
            base_version: id.to_string(),
            overlay_prefix: format!("versions/{id}/"),
        });
    }

    Err(MinecraftError::Parse(
        "archive matches no known modpack shape".into(),
    ))
}

/// Installs a modpack archive as a version named `pack_name`.
///
/// The pack's pinned vanilla version is installed under the pack's own
/// directory name, the archive overlay is unpacked on top, and the
/// version is forced into isolation so its mods and configs never leak
/// into the shared game directory. Progress runs 0-100 across the
/// detect, install, overlay and finalize phases.
pub async fn install_modpack(
    ctx: &InstallContext,
    pack_path: &Path,
    pack_name: &str,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    ctx.check_cancelled()?;
    reporter.status(format!("Inspecting modpack {}", pack_path.display()));

    let info = inspect_pack(pack_path).await?;
    reporter.progress(10, 100);

    let version_dir = ctx.version_dir(pack_name);
    fs::create_dir_all(&version_dir).await?;

    if info.kind == PackKind::Manual {
        // The archive carries the descriptor itself; unpack first so the
        // base install finds it and only fills in jar and libraries.
        reporter.status(format!("Unpacking files for {pack_name}"));
        extract_overlay(ctx, pack_path, &info.overlay_prefix, &version_dir, reporter, (10, 40))
            .await?;
        adopt_pack_name(&version_dir, &info.base_version, pack_name).await?;
        reporter.progress(40, 100);

        install_version_as(ctx, &info.base_version, pack_name, reporter).await?;
        reporter.progress(70, 100);
    } else {
        reporter.status(format!(
            "Installing base version {} for {pack_name}",
            info.base_version
        ));
        install_version_as(ctx, &info.base_version, pack_name, reporter).await?;
        reporter.progress(40, 100);

        reporter.status(format!("Unpacking overrides for {pack_name}"));
        extract_overlay(ctx, pack_path, &info.overlay_prefix, &version_dir, reporter, (40, 70))
            .await?;
        reporter.progress(70, 100);
    }

    ctx.check_cancelled()?;
    catalog::set_isolation(&ctx.root, pack_name, Some(true)).await?;
    reporter.progress(100, 100);
    Ok(())
}

/// Unpacks every archive entry under `prefix` into `dest`, stripping the
/// prefix and refusing path traversal. Per-entry progress is mapped into
/// the given band of the overall 0-100 scale.
async fn extract_overlay(
    ctx: &InstallContext,
    pack_path: &Path,
    prefix: &str,
    dest: &Path,
    reporter: Option<&dyn Reporter>,
    band: (u64, u64),
) -> Result<usize, MinecraftError> {
    let mut archive = open_archive(pack_path).await?;
    let cancel = ctx.cancel.clone();

    let extracted = block_in_place(|| -> Result<usize, MinecraftError> {
        let matching: Vec<usize> = (0..archive.len())
            .filter(|&i| {
                archive
                    .by_index(i)
                    .map(|entry| entry.name().replace('\\', "/").starts_with(prefix))
                    .unwrap_or(false)
            })
            .collect();
        let total = matching.len();

        let mut extracted = 0;
        for (done, index) in matching.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(MinecraftError::Cancelled);
            }

            let mut entry = archive
                .by_index(index)
                .map_err(crate::util::error::UtilError::from)?;
            let name = entry.name().replace('\\', "/");
            let relative = Path::new(name.trim_start_matches(prefix));
            if relative.as_os_str().is_empty()
                || relative
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                continue;
            }

            let target = dest.join(relative);
            if entry.is_dir() {
                std::fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = std::fs::File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
            extracted += 1;

            let scaled = band.0 + (done as u64 + 1) * (band.1 - band.0) / total.max(1) as u64;
            reporter.progress(scaled, 100);
        }
        Ok(extracted)
    })?;

    Ok(extracted)
}

/// A manual pack's descriptor and jar are named after the archive's own
/// version id; renames them so they match the chosen directory name.
async fn adopt_pack_name(
    version_dir: &Path,
    original_id: &str,
    pack_name: &str,
) -> Result<(), MinecraftError> {
    if original_id == pack_name {
        return Ok(());
    }
    for ext in ["json", "jar"] {
        let from = version_dir.join(format!("{original_id}.{ext}"));
        let to = version_dir.join(format!("{pack_name}.{ext}"));
        if from.is_file() && !to.is_file() {
            fs::rename(&from, &to).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::{write::FileOptions, ZipWriter};

    fn write_pack(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, FileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        let data = writer.finish().unwrap().into_inner();
        std::fs::write(path, data).unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detects_curseforge_shape() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.zip");
        write_pack(
            &pack,
            &[
                (
                    "manifest.json",
                    r#"{"minecraft":{"version":"1.20.1"},"name":"All the Mods","overrides":"overrides"}"#,
                ),
                ("overrides/mods/a.jar", "jar"),
            ],
        );

        let info = inspect_pack(&pack).await.unwrap();
        assert_eq!(info.kind, PackKind::CurseForge);
        assert_eq!(info.base_version, "1.20.1");
        assert_eq!(info.overlay_prefix, "overrides/");
        assert_eq!(info.name.as_deref(), Some("All the Mods"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detects_modrinth_shape() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.mrpack");
        write_pack(
            &pack,
            &[(
                "modrinth.index.json",
                r#"{"name":"Fabulous","dependencies":{"minecraft":"1.19.2","fabric-loader":"0.14.21"}}"#,
            )],
        );

        let info = inspect_pack(&pack).await.unwrap();
        assert_eq!(info.kind, PackKind::Modrinth);
        assert_eq!(info.base_version, "1.19.2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn detects_manual_shape_from_versions_path() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.zip");
        write_pack(
            &pack,
            &[
                ("versions/1.8.9/1.8.9.json", r#"{"id":"1.8.9"}"#),
                ("versions/1.8.9/mods/old.jar", "jar"),
            ],
        );

        let info = inspect_pack(&pack).await.unwrap();
        assert_eq!(info.kind, PackKind::Manual);
        assert_eq!(info.base_version, "1.8.9");
        assert_eq!(info.overlay_prefix, "versions/1.8.9/");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn curseforge_marker_wins_over_modrinth() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.zip");
        write_pack(
            &pack,
            &[
                ("manifest.json", r#"{"minecraft":{"version":"1.20.1"}}"#),
                (
                    "modrinth.index.json",
                    r#"{"dependencies":{"minecraft":"1.19.2"}}"#,
                ),
            ],
        );

        let info = inspect_pack(&pack).await.unwrap();
        assert_eq!(info.kind, PackKind::CurseForge);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_shape_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.zip");
        write_pack(&pack, &[("readme.txt", "hello")]);

        assert!(matches!(
            inspect_pack(&pack).await,
            Err(MinecraftError::Parse(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overlay_extraction_strips_prefix_and_traversal() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack.zip");
        write_pack(
            &pack,
            &[
                ("overrides/config/settings.toml", "key = 1"),
                ("overrides/../escape.txt", "nope"),
                ("unrelated/file.txt", "skipped"),
            ],
        );

        let ctx = InstallContext::new(dir.path());
        let dest = dir.path().join("out");
        let count = extract_overlay(&ctx, &pack, "overrides/", &dest, None, (40, 70))
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert!(dest.join("config/settings.toml").is_file());
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!dest.join("file.txt").exists());
    }
}

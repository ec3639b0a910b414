use std::{collections::HashMap, env::temp_dir, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::{
    http::{downloader::download_any, fetch::fetch_any},
    json::version::{meta::VersionMeta, profile::LoaderProfile},
    minecraft::{
        catalog::{LoaderFamily, VersionConfig, VERSION_CONFIG_FILE},
        config::InstallContext,
        error::MinecraftError,
        install::install_version,
        maven::parse_lib_path,
        staging::Staging,
        CLASSPATH_SEPARATOR,
    },
    reporter::{Report, Reporter},
    util::{
        extract::{extract_entry, extract_prefixed, read_entry_to_string},
        json::write_json,
    },
};

use super::{
    download_loader_libraries, profile_library_job, to_meta_libraries, Loader, LoaderVersion,
};

const CRITICAL_LIBRARIES: [&str; 1] = ["net.minecraftforge:forge"];

/// The modern (1.13+) installer's `install_profile.json`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallProfile {
    #[serde(default)]
    data: HashMap<String, DataEntry>,
    #[serde(default)]
    processors: Vec<Processor>,
    #[serde(default)]
    libraries: Vec<crate::json::version::profile::ProfileLibrary>,
    /// Archive path of the embedded version descriptor, e.g. `/version.json`.
    json: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct DataEntry {
    client: String,
    #[allow(dead_code)]
    server: String,
}

#[derive(Serialize, Deserialize)]
struct Processor {
    jar: String,
    #[serde(default)]
    classpath: Vec<String>,
    #[serde(default)]
    args: Vec<String>,
    sides: Option<Vec<String>>,
    outputs: Option<HashMap<String, String>>,
}

pub struct Forge;

#[async_trait]
impl Loader for Forge {
    fn family(&self) -> LoaderFamily {
        LoaderFamily::Forge
    }

    async fn list_supported_game_versions(
        &self,
        ctx: &InstallContext,
    ) -> Result<Vec<String>, MinecraftError> {
        let metadata: HashMap<String, Vec<String>> =
            fetch_any(&ctx.endpoints.forge_metadata()).await?;
        let mut versions: Vec<String> = metadata.into_keys().collect();
        versions.sort();
        Ok(versions)
    }

    async fn list_loader_versions(
        &self,
        ctx: &InstallContext,
        base_version: &str,
    ) -> Result<Vec<LoaderVersion>, MinecraftError> {
        let metadata: HashMap<String, Vec<String>> =
            fetch_any(&ctx.endpoints.forge_metadata()).await?;
        let builds = metadata
            .get(base_version)
            .ok_or_else(|| MinecraftError::UnknownVersion(format!("Forge for {base_version}")))?;

        // Entries read `<base>-<build>`; newest last upstream.
        Ok(builds
            .iter()
            .rev()
            .filter_map(|entry| entry.strip_prefix(&format!("{base_version}-")))
            .map(|build| LoaderVersion {
                version: build.to_string(),
                stable: true,
            })
            .collect())
    }

    async fn install(
        &self,
        ctx: &InstallContext,
        base_version: &str,
        loader_version: &str,
        custom_name: &str,
        reporter: Option<&dyn Reporter>,
    ) -> Result<(), MinecraftError> {
        ctx.check_cancelled()?;

        if !ctx.version_json_path(base_version).is_file() {
            install_version(ctx, base_version, reporter).await?;
        }

        let full = format!("{base_version}-{loader_version}");
        let installer_path = temp_dir().join(format!("forge-{full}-installer.jar"));
        if !installer_path.is_file() {
            reporter.status(format!("Downloading Forge installer {full}"));
            let path = format!("net/minecraftforge/forge/{full}/forge-{full}-installer.jar");
            download_any(
                &ctx.endpoints.forge_maven(&path),
                &installer_path,
                reporter,
                &ctx.cancel,
            )
            .await?;
        }

        let profile_raw = read_entry_to_string(&installer_path, "install_profile.json").await?;
        let profile_value: serde_json::Value = serde_json::from_str(&profile_raw)?;

        let (mut version, install_profile) = if profile_value.get("install").is_some() {
            (legacy_version_profile(ctx, &installer_path, &full, &profile_value).await?, None)
        } else {
            let install_profile: InstallProfile = serde_json::from_str(&profile_raw)?;
            let entry = install_profile
                .json
                .as_deref()
                .map(|name| name.trim_start_matches('/').to_string())
                .unwrap_or_else(|| "version.json".to_string());
            let version: LoaderProfile =
                serde_json::from_str(&read_entry_to_string(&installer_path, &entry).await?)?;

            // Artifacts the installer carries under maven/ land directly in
            // the shared library tree.
            extract_prefixed(&installer_path, "maven/", &ctx.libraries_dir(), true).await?;

            (version, Some(install_profile))
        };

        ctx.check_cancelled()?;

        version.id = custom_name.to_string();
        version.inherits_from = Some(base_version.to_string());
        super::backfill_from_base(ctx, base_version, &mut version).await?;

        let mut resolved = Vec::with_capacity(version.libraries.len());
        for lib in &version.libraries {
            let job = profile_library_job(ctx, lib, |path| ctx.endpoints.forge_maven(path))?;
            resolved.push((lib.clone(), job));
        }

        let mut jobs: Vec<(String, crate::http::downloader::DownloadJob)> = resolved
            .iter()
            .filter_map(|(lib, job)| job.clone().map(|job| (lib.name.clone(), job)))
            .collect();
        if let Some(install_profile) = &install_profile {
            for lib in &install_profile.libraries {
                if let Some(job) =
                    profile_library_job(ctx, lib, |path| ctx.endpoints.forge_maven(path))?
                {
                    jobs.push((lib.name.clone(), job));
                }
            }
        }

        reporter.status(format!("Downloading Forge libraries for {custom_name}"));
        download_loader_libraries(ctx, &jobs, &CRITICAL_LIBRARIES, reporter).await?;

        if let Some(install_profile) = install_profile {
            let data =
                build_data(ctx, base_version, &installer_path, install_profile.data).await?;
            run_processors(ctx, &install_profile.processors, &data, reporter).await?;
        }

        let meta = VersionMeta {
            id: version.id.clone(),
            inherits_from: version.inherits_from.clone(),
            main_class: version.main_class.clone(),
            asset_index: version.asset_index.clone(),
            assets: None,
            downloads: None,
            libraries: to_meta_libraries(&resolved),
            arguments: version.arguments.clone(),
            minecraft_arguments: version.minecraft_arguments.clone(),
            java_version: None,
            release_time: version.release_time.clone(),
            time: version.time.clone(),
            r#type: version.r#type.clone(),
        };

        let staging = Staging::begin(&ctx.versions_dir(), custom_name).await?;
        write_json(staging.dir().join(format!("{custom_name}.json")), &meta).await?;
        write_json(
            staging.dir().join(VERSION_CONFIG_FILE),
            &VersionConfig {
                use_version_isolation: None,
                loader: Some(LoaderFamily::Forge),
            },
        )
        .await?;
        staging.commit().await?;

        Ok(())
    }
}

/// Pre-1.13 installers inline the version descriptor as `versionInfo` and
/// ship the universal loader jar at the archive root.
async fn legacy_version_profile(
    ctx: &InstallContext,
    installer_path: &Path,
    full: &str,
    profile_value: &serde_json::Value,
) -> Result<LoaderProfile, MinecraftError> {
    let version: LoaderProfile = serde_json::from_value(
        profile_value
            .get("versionInfo")
            .cloned()
            .ok_or_else(|| MinecraftError::NotFound("versionInfo in install profile".into()))?,
    )?;

    let entry = profile_value
        .get("install")
        .and_then(|install| install.get("filePath"))
        .and_then(|path| path.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("forge-{full}-universal.jar"));

    let universal = ctx.library_path(&parse_lib_path(&format!(
        "net.minecraftforge:forge:{full}"
    ))?);
    if !universal.is_file() {
        extract_entry(installer_path, &entry, &universal).await?;
    }

    Ok(version)
}

/// Merges the installer's data table with the built-in substitution
/// tokens, extracting any archive-embedded files it points at into the
/// library tree under a synthetic coordinate.
async fn build_data(
    ctx: &InstallContext,
    base_version: &str,
    installer_path: &Path,
    declared: HashMap<String, DataEntry>,
) -> Result<HashMap<String, String>, MinecraftError> {
    let mut data: HashMap<String, String> = [
        ("SIDE", "client".to_string()),
        ("MINECRAFT_VERSION", base_version.to_string()),
        ("ROOT", ctx.root.to_string_lossy().into_owned()),
        (
            "LIBRARY_DIR",
            ctx.libraries_dir().to_string_lossy().into_owned(),
        ),
        (
            "MINECRAFT_JAR",
            ctx.version_jar_path(base_version)
                .to_string_lossy()
                .into_owned(),
        ),
        (
            "INSTALLER",
            installer_path.to_string_lossy().into_owned(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    for (key, entry) in declared {
        let mut value = entry.client;
        if let Some(embedded) = value.strip_prefix('/') {
            let file = embedded
                .rsplit('/')
                .next()
                .ok_or_else(|| MinecraftError::NotFound("embedded data file".into()))?;
            let (stem, ext) = file
                .rsplit_once('.')
                .ok_or_else(|| MinecraftError::NotFound("embedded data extension".into()))?;
            let coordinate = format!(
                "net.minecraftforge:forge-installer-extracts:{base_version}:{stem}@{ext}"
            );
            let target = ctx.library_path(&parse_lib_path(&coordinate)?);
            extract_entry(installer_path, embedded, &target).await?;
            value = format!("[{coordinate}]");
        }
        data.insert(key, value);
    }

    Ok(data)
}

/// Resolves one processor argument or data value: `{TOKEN}` looks up the
/// data table, `[coordinate]` becomes an absolute library path, quoted
/// literals lose their quotes, anything else passes through.
fn resolve_token(
    ctx: &InstallContext,
    data: &HashMap<String, String>,
    value: &str,
) -> Result<String, MinecraftError> {
    if let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
        let replacement = data
            .get(inner)
            .ok_or_else(|| MinecraftError::NotFound(format!("data token {inner}")))?;
        return resolve_token(ctx, data, replacement);
    }
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return Ok(ctx
            .library_path(&parse_lib_path(inner)?)
            .to_string_lossy()
            .into_owned());
    }
    if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        return Ok(inner.to_string());
    }
    Ok(value.to_string())
}

/// Executes the declared client-side post-processing steps as `java`
/// subprocesses. Each processor names a jar whose manifest supplies the
/// entry point, a classpath of Maven coordinates and an argument list of
/// substitution tokens. Steps whose declared outputs are already present
/// are skipped, which keeps re-installation cheap.
async fn run_processors(
    ctx: &InstallContext,
    processors: &[Processor],
    data: &HashMap<String, String>,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    let client_processors: Vec<&Processor> = processors
        .iter()
        .filter(|p| {
            p.sides
                .as_ref()
                .map_or(true, |sides| sides.iter().any(|side| side == "client"))
        })
        .collect();
    let total = client_processors.len() as u64;

    for (index, processor) in client_processors.into_iter().enumerate() {
        ctx.check_cancelled()?;

        if let Some(outputs) = &processor.outputs {
            let all_present = !outputs.is_empty()
                && outputs.keys().all(|key| {
                    resolve_token(ctx, data, key)
                        .map(|path| Path::new(&path).is_file())
                        .unwrap_or(false)
                });
            if all_present {
                log::debug!("Processor {} outputs already present", processor.jar);
                continue;
            }
        }

        reporter.status(format!("Running Forge processor {}", processor.jar));
        reporter.progress(index as u64, total);

        let jar_path = ctx.library_path(&parse_lib_path(&processor.jar)?);
        let main_class = read_main_class(&jar_path).await?;

        let mut classpath = vec![jar_path.to_string_lossy().into_owned()];
        for coordinate in &processor.classpath {
            classpath.push(
                ctx.library_path(&parse_lib_path(coordinate)?)
                    .to_string_lossy()
                    .into_owned(),
            );
        }

        let mut args = Vec::with_capacity(processor.args.len());
        for arg in &processor.args {
            args.push(resolve_token(ctx, data, arg)?);
        }

        let status = Command::new(&ctx.java)
            .arg("-cp")
            .arg(classpath.join(CLASSPATH_SEPARATOR))
            .arg(&main_class)
            .args(&args)
            .status()
            .await?;

        if !status.success() {
            return Err(MinecraftError::Processor(processor.jar.clone()));
        }
    }

    reporter.progress(total, total);
    Ok(())
}

/// Reads `Main-Class` from a jar's manifest.
async fn read_main_class(jar_path: &Path) -> Result<String, MinecraftError> {
    let manifest = read_entry_to_string(jar_path, "META-INF/MANIFEST.MF").await?;
    manifest
        .lines()
        .find_map(|line| line.strip_prefix("Main-Class:"))
        .map(|main| main.trim().to_string())
        .ok_or_else(|| {
            MinecraftError::NotFound(format!("Main-Class in {}", jar_path.display()))
        })
}

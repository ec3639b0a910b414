use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    http::fetch::fetch_any,
    json::version::{meta::VersionMeta, profile::LoaderProfile},
    minecraft::{
        catalog::{LoaderFamily, VersionConfig, VERSION_CONFIG_FILE},
        config::InstallContext,
        error::MinecraftError,
        install::install_version,
        staging::Staging,
    },
    reporter::{Report, Reporter},
    util::json::write_json,
};

use super::{
    backfill_from_base, download_loader_libraries, profile_library_job, sort_loader_versions,
    to_meta_libraries, Loader, LoaderVersion,
};

/// Library prefixes Fabric cannot start without.
const CRITICAL_LIBRARIES: [&str; 1] = ["net.fabricmc:fabric-loader"];

#[derive(Serialize, Deserialize)]
struct MetaGameVersion {
    version: String,
    stable: bool,
}

#[derive(Serialize, Deserialize)]
struct MetaLoaderVersion {
    version: String,
    #[serde(default)]
    stable: bool,
}

pub struct Fabric;

#[async_trait]
impl Loader for Fabric {
    fn family(&self) -> LoaderFamily {
        LoaderFamily::Fabric
    }

    async fn list_supported_game_versions(
        &self,
        ctx: &InstallContext,
    ) -> Result<Vec<String>, MinecraftError> {
        let versions: Vec<MetaGameVersion> =
            fetch_any(&ctx.endpoints.fabric_meta("versions/game")).await?;
        Ok(versions.into_iter().map(|v| v.version).collect())
    }

    async fn list_loader_versions(
        &self,
        ctx: &InstallContext,
        _base_version: &str,
    ) -> Result<Vec<LoaderVersion>, MinecraftError> {
        let loaders: Vec<MetaLoaderVersion> =
            fetch_any(&ctx.endpoints.fabric_meta("versions/loader")).await?;
        Ok(sort_loader_versions(
            loaders
                .into_iter()
                .map(|v| LoaderVersion {
                    version: v.version,
                    stable: v.stable,
                })
                .collect(),
        ))
    }

    async fn install(
        &self,
        ctx: &InstallContext,
        base_version: &str,
        loader_version: &str,
        custom_name: &str,
        reporter: Option<&dyn Reporter>,
    ) -> Result<(), MinecraftError> {
        install_merged_profile(
            ctx,
            base_version,
            custom_name,
            reporter,
            LoaderFamily::Fabric,
            &CRITICAL_LIBRARIES,
            ctx.endpoints
                .fabric_meta(&format!(
                    "versions/loader/{base_version}/{loader_version}/profile/json"
                )),
            |path| ctx.endpoints.fabric_maven(path),
        )
        .await
    }
}

/// Shared Fabric/Quilt flow: both services expose the same merged-profile
/// protocol, differing only in endpoints and Maven repository.
///
/// The base version is installed first when absent, then the whole child
/// version is assembled in a staging directory and renamed into place
/// after every library resolved, so a metadata or descriptor failure
/// leaves nothing behind.
#[allow(clippy::too_many_arguments)]
pub(super) async fn install_merged_profile(
    ctx: &InstallContext,
    base_version: &str,
    custom_name: &str,
    reporter: Option<&dyn Reporter>,
    family: LoaderFamily,
    critical: &[&str],
    profile_urls: Vec<String>,
    maven_urls: impl Fn(&str) -> Vec<String> + Sync,
) -> Result<(), MinecraftError> {
    ctx.check_cancelled()?;

    if !ctx.version_json_path(base_version).is_file() {
        install_version(ctx, base_version, reporter).await?;
    }

    // No partial install is meaningful without the profile; a metadata
    // failure here aborts the whole operation.
    reporter.status(format!("Fetching loader profile for {custom_name}"));
    let mut profile: LoaderProfile = fetch_any(&profile_urls).await?;

    profile.id = custom_name.to_string();
    profile.inherits_from = Some(base_version.to_string());
    backfill_from_base(ctx, base_version, &mut profile).await?;

    let mut resolved = Vec::with_capacity(profile.libraries.len());
    for lib in &profile.libraries {
        let job = profile_library_job(ctx, lib, &maven_urls)?;
        resolved.push((lib.clone(), job));
    }

    let meta = VersionMeta {
        id: profile.id.clone(),
        inherits_from: profile.inherits_from.clone(),
        main_class: profile.main_class.clone(),
        asset_index: profile.asset_index.clone(),
        assets: None,
        downloads: None,
        libraries: to_meta_libraries(&resolved),
        arguments: profile.arguments.clone(),
        minecraft_arguments: profile.minecraft_arguments.clone(),
        java_version: None,
        release_time: profile.release_time.clone(),
        time: profile.time.clone(),
        r#type: profile.r#type.clone(),
    };

    let staging = Staging::begin(&ctx.versions_dir(), custom_name).await?;
    write_json(staging.dir().join(format!("{custom_name}.json")), &meta).await?;
    write_json(
        staging.dir().join(VERSION_CONFIG_FILE),
        &VersionConfig {
            use_version_isolation: None,
            loader: Some(family),
        },
    )
    .await?;

    reporter.status(format!("Downloading loader libraries for {custom_name}"));
    let jobs: Vec<(String, crate::http::downloader::DownloadJob)> = resolved
        .iter()
        .filter_map(|(lib, job)| job.clone().map(|job| (lib.name.clone(), job)))
        .collect();
    download_loader_libraries(ctx, &jobs, critical, reporter).await?;

    staging.commit().await?;
    Ok(())
}

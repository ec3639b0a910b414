use async_trait::async_trait;

use crate::{
    http::downloader::{download_any, is_file_valid, DownloadJob},
    json::version::{
        meta::{Library, LibraryDownloads, VersionMeta},
        profile::{LoaderProfile, ProfileLibrary},
    },
    reporter::Reporter,
    util::json::read_json,
};

use super::{
    catalog::LoaderFamily, config::InstallContext, error::MinecraftError, maven::parse_lib_path,
};

pub mod fabric;
pub mod forge;
pub mod quilt;

/// One published loader build.
#[derive(Debug, Clone)]
pub struct LoaderVersion {
    pub version: String,
    pub stable: bool,
}

/// A mod-loader installer. Implementations query their own metadata
/// service, derive a child descriptor inheriting from the base version and
/// resolve the loader's library set. Installs are staged and renamed into
/// place atomically, so a failure never leaves a half-installed version
/// visible to the catalog.
#[async_trait]
pub trait Loader: Send + Sync {
    fn family(&self) -> LoaderFamily;

    async fn list_supported_game_versions(
        &self,
        ctx: &InstallContext,
    ) -> Result<Vec<String>, MinecraftError>;

    async fn list_loader_versions(
        &self,
        ctx: &InstallContext,
        base_version: &str,
    ) -> Result<Vec<LoaderVersion>, MinecraftError>;

    async fn install(
        &self,
        ctx: &InstallContext,
        base_version: &str,
        loader_version: &str,
        custom_name: &str,
        reporter: Option<&dyn Reporter>,
    ) -> Result<(), MinecraftError>;
}

/// Sorts loader builds stable-first, then by parsed numeric version
/// descending within each group.
pub fn sort_loader_versions(mut versions: Vec<LoaderVersion>) -> Vec<LoaderVersion> {
    fn numeric(version: &str) -> Vec<u32> {
        version
            .split(['.', '+', '-'])
            .map(|part| part.parse::<u32>().unwrap_or(0))
            .collect()
    }

    versions.sort_by(|a, b| {
        b.stable
            .cmp(&a.stable)
            .then_with(|| numeric(&b.version).cmp(&numeric(&a.version)))
    });
    versions
}

/// Reads the base version's descriptor and backfills fields the fetched
/// profile omits, so the child descriptor stands on its own for tooling
/// that expects them.
pub(crate) async fn backfill_from_base(
    ctx: &InstallContext,
    base_version: &str,
    profile: &mut LoaderProfile,
) -> Result<(), MinecraftError> {
    let base_path = ctx.version_json_path(base_version);
    if !base_path.is_file() {
        return Err(MinecraftError::NotFound(format!(
            "base version descriptor {base_version}"
        )));
    }
    let base: VersionMeta = read_json(&base_path).await?;

    if profile.release_time.is_none() {
        profile.release_time = base.release_time;
    }
    if profile.time.is_none() {
        profile.time = base.time;
    }
    if profile.asset_index.is_none() {
        profile.asset_index = base.asset_index;
    }
    Ok(())
}

/// Resolves a profile library to a download job: an explicit artifact
/// record wins, then an explicit repository base, then Maven translation
/// against the loader's own repository chain.
pub(crate) fn profile_library_job(
    ctx: &InstallContext,
    lib: &ProfileLibrary,
    maven_urls: impl Fn(&str) -> Vec<String>,
) -> Result<Option<DownloadJob>, MinecraftError> {
    if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
        let Some(path) = artifact.path.as_ref() else {
            return Ok(None);
        };
        if artifact.url.is_empty() {
            // The Forge installer ships some artifacts inside its own
            // archive; nothing to fetch for those.
            return Ok(None);
        }
        return Ok(Some(DownloadJob {
            urls: vec![artifact.url.clone()],
            path: ctx.library_path(path),
            size: artifact.size,
            sha1: artifact.sha1.clone(),
        }));
    }

    let path = parse_lib_path(&lib.name)?;
    let urls = match &lib.url {
        Some(base) => vec![format!("{}/{path}", base.trim_end_matches('/'))],
        None => maven_urls(&path),
    };
    Ok(Some(DownloadJob {
        urls,
        path: ctx.library_path(&path),
        size: lib.size,
        sha1: lib.sha1.clone(),
    }))
}

/// Downloads the loader's libraries one at a time, tolerating individual
/// failures, then verifies that every critical name prefix ended up with
/// at least one file on disk. A loader cannot start without those, so
/// their absence escalates to a fatal error listing the missing names.
pub(crate) async fn download_loader_libraries(
    ctx: &InstallContext,
    jobs: &[(String, DownloadJob)],
    critical_prefixes: &[&str],
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    let mut failed: Vec<String> = Vec::new();

    for (name, job) in jobs {
        ctx.check_cancelled()?;
        if is_file_valid(&job.path, job.size, job.sha1.as_deref()) {
            continue;
        }
        match download_any(&job.urls, &job.path, reporter, &ctx.cancel).await {
            Ok(_) => {}
            Err(crate::http::error::HttpError::Cancelled) => {
                return Err(MinecraftError::Cancelled)
            }
            Err(e) => {
                log::warn!("Loader library {name} failed to download: {e}");
                failed.push(name.clone());
            }
        }
    }

    let missing: Vec<String> = critical_prefixes
        .iter()
        .filter(|prefix| {
            let declared: Vec<&(String, DownloadJob)> = jobs
                .iter()
                .filter(|(name, _)| name.starts_with(*prefix))
                .collect();
            !declared.is_empty() && declared.iter().all(|(_, job)| !job.path.is_file())
        })
        .map(|prefix| prefix.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(MinecraftError::CriticalLibrariesMissing(missing));
    }
    Ok(())
}

/// Converts resolved profile libraries into plain descriptor entries with
/// explicit artifact records, so the written child descriptor is
/// loadable by the inheritance walk without loader-specific knowledge.
pub(crate) fn to_meta_libraries(
    libraries: &[(ProfileLibrary, Option<DownloadJob>)],
) -> Vec<Library> {
    libraries
        .iter()
        .map(|(lib, job)| Library {
            name: lib.name.clone(),
            downloads: job.as_ref().map(|job| LibraryDownloads {
                artifact: Some(crate::json::version::meta::FileRef {
                    url: job.urls.first().cloned().unwrap_or_default(),
                    path: parse_lib_path(&lib.name).ok(),
                    sha1: job.sha1.clone(),
                    size: job.size,
                }),
            }),
            rules: None,
            url: lib.url.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::version::meta::AssetIndexRef;
    use crate::util::json::write_json;

    fn base_meta() -> VersionMeta {
        VersionMeta {
            id: "1.20.1".to_string(),
            inherits_from: None,
            main_class: Some("net.minecraft.client.main.Main".to_string()),
            asset_index: Some(AssetIndexRef {
                id: "5".to_string(),
                url: "https://example.invalid/5.json".to_string(),
                sha1: None,
                size: None,
                total_size: None,
            }),
            assets: None,
            downloads: None,
            libraries: Vec::new(),
            arguments: None,
            minecraft_arguments: None,
            java_version: None,
            release_time: Some("2023-06-07T11:49:27+00:00".to_string()),
            time: Some("2023-06-07T12:04:31+00:00".to_string()),
            r#type: Some("release".to_string()),
        }
    }

    fn bare_profile(id: &str) -> LoaderProfile {
        LoaderProfile {
            id: id.to_string(),
            inherits_from: Some("1.20.1".to_string()),
            main_class: None,
            asset_index: None,
            libraries: Vec::new(),
            arguments: None,
            minecraft_arguments: None,
            release_time: None,
            time: None,
            r#type: None,
        }
    }

    #[tokio::test]
    async fn backfill_fills_only_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = InstallContext::new(dir.path());
        write_json(ctx.version_json_path("1.20.1"), &base_meta())
            .await
            .unwrap();

        let mut profile = bare_profile("1.20.1-loader");
        profile.time = Some("2024-01-01T00:00:00+00:00".to_string());

        backfill_from_base(&ctx, "1.20.1", &mut profile).await.unwrap();

        assert_eq!(
            profile.release_time.as_deref(),
            Some("2023-06-07T11:49:27+00:00")
        );
        // A field the profile already declares is left alone.
        assert_eq!(profile.time.as_deref(), Some("2024-01-01T00:00:00+00:00"));
        assert_eq!(profile.asset_index.unwrap().id, "5");
    }

    #[tokio::test]
    async fn backfill_requires_the_base_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = InstallContext::new(dir.path());
        let mut profile = bare_profile("1.20.1-loader");

        let err = backfill_from_base(&ctx, "1.20.1", &mut profile)
            .await
            .unwrap_err();
        assert!(matches!(err, MinecraftError::NotFound(_)));
    }

    #[test]
    fn stable_first_then_descending() {
        let sorted = sort_loader_versions(vec![
            LoaderVersion { version: "0.15.0".into(), stable: true },
            LoaderVersion { version: "0.16.0-beta.2".into(), stable: false },
            LoaderVersion { version: "0.15.11".into(), stable: true },
            LoaderVersion { version: "0.14.24".into(), stable: true },
        ]);
        let order: Vec<(&str, bool)> = sorted
            .iter()
            .map(|v| (v.version.as_str(), v.stable))
            .collect();
        assert_eq!(
            order,
            vec![
                ("0.15.11", true),
                ("0.15.0", true),
                ("0.14.24", true),
                ("0.16.0-beta.2", false),
            ]
        );
    }

    #[test]
    fn profile_library_prefers_explicit_base() {
        let ctx = InstallContext::new("/tmp/game");
        let lib = ProfileLibrary {
            name: "net.fabricmc:fabric-loader:0.15.11".into(),
            url: Some("https://maven.fabricmc.net/".into()),
            downloads: None,
            sha1: None,
            size: None,
        };
        let job = profile_library_job(&ctx, &lib, |path| vec![format!("https://fallback/{path}")])
            .unwrap()
            .unwrap();
        assert_eq!(
            job.urls,
            vec![
                "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.11/fabric-loader-0.15.11.jar"
                    .to_string()
            ]
        );
    }

    #[test]
    fn embedded_forge_artifacts_yield_no_job() {
        let ctx = InstallContext::new("/tmp/game");
        let lib = ProfileLibrary {
            name: "net.minecraftforge:forge:1.20.1-47.2.0".into(),
            url: None,
            downloads: Some(LibraryDownloads {
                artifact: Some(crate::json::version::meta::FileRef {
                    url: String::new(),
                    path: Some(
                        "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0.jar".into(),
                    ),
                    sha1: None,
                    size: None,
                }),
            }),
            sha1: None,
            size: None,
        };
        assert!(profile_library_job(&ctx, &lib, |_| Vec::new())
            .unwrap()
            .is_none());
    }
}

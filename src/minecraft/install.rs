use crate::{
    http::{
        downloader::{download_any, download_multiple, is_file_valid, DownloadJob},
        fetch::{fetch_any, fetch_text_any},
    },
    json::version::{asset_index::AssetIndex, manifest::VersionManifest, meta::VersionMeta},
    reporter::{Report, Reporter},
    util::json::write_text,
};

use super::{
    config::InstallContext,
    endpoint::LIBRARIES_ENDPOINT,
    error::MinecraftError,
    maven::parse_lib_path,
    rule::ParseRule,
};

/// Installs a base (vanilla) version into `<root>/versions/<id>/`.
pub async fn install_version(
    ctx: &InstallContext,
    version_id: &str,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    install_version_as(ctx, version_id, version_id, reporter).await
}

/// Installs a base version under a custom directory name. The descriptor
/// is persisted verbatim, so its inner `id` keeps the upstream value while
/// the file is named after the directory (modpacks rely on this).
///
/// Idempotent: a second run over unchanged remote content finds the
/// descriptor, jar, libraries and asset index already valid and performs
/// no network I/O. Individual library failures are logged and skipped; a
/// failure to write the descriptor or the client jar aborts.
pub async fn install_version_as(
    ctx: &InstallContext,
    version_id: &str,
    dir_name: &str,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    ctx.check_cancelled()?;

    let json_path = ctx.version_json_path(dir_name);

    let meta: VersionMeta = if json_path.is_file() {
        let raw = tokio::fs::read_to_string(&json_path).await?;
        serde_json::from_str(&raw)?
    } else {
        reporter.status(format!("Resolving version {version_id}"));
        let manifest: VersionManifest =
            fetch_any(&ctx.endpoints.version_manifest()).await?;
        let entry = manifest
            .versions
            .iter()
            .find(|version| version.id == version_id)
            .ok_or_else(|| MinecraftError::UnknownVersion(version_id.to_string()))?;

        let raw = fetch_text_any(&ctx.endpoints.version_json(&entry.url)).await?;
        let meta: VersionMeta = serde_json::from_str(&raw)?;
        write_text(&json_path, &raw).await?;
        meta
    };

    ctx.check_cancelled()?;

    match meta.downloads.as_ref().and_then(|d| d.client.as_ref()) {
        Some(client) => {
            let jar_path = ctx.version_jar_path(dir_name);
            if !is_file_valid(&jar_path, client.size, client.sha1.as_deref()) {
                reporter.status(format!("Downloading client jar for {version_id}"));
                download_any(
                    &[client.url.clone()],
                    &jar_path,
                    reporter,
                    &ctx.cancel,
                )
                .await?;
            }
        }
        // Loader-only bases supply their own jar through the library tree.
        None => log::warn!("Version {version_id} declares no client jar URL"),
    }

    reporter.status(format!("Downloading libraries for {version_id}"));
    let jobs = library_jobs(ctx, &meta)?;
    let outcome = download_multiple(jobs, ctx.concurrency, reporter, &ctx.cancel).await?;
    if !outcome.failed.is_empty() {
        log::warn!(
            "{} of {} libraries failed to download for {version_id}",
            outcome.failed.len(),
            outcome.completed + outcome.failed.len()
        );
    }

    ctx.check_cancelled()?;

    // The bulk per-asset objects are deferred to first launch; only the
    // index is persisted here so install time stays bounded.
    if let Some(asset_index) = &meta.asset_index {
        let index_path = ctx.asset_index_path(&asset_index.id);
        if !index_path.is_file() {
            reporter.status(format!("Downloading asset index {}", asset_index.id));
            let raw = fetch_text_any(&[asset_index.url.clone()]).await?;
            // Persisted verbatim, but an index that does not parse would
            // poison first launch, so it is validated here.
            let index: AssetIndex = serde_json::from_str(&raw)?;
            log::debug!(
                "Asset index {} lists {} objects",
                asset_index.id,
                index.objects.len()
            );
            write_text(&index_path, &raw).await?;
        }
    }

    Ok(())
}

/// Builds download jobs for every library allowed on the host platform.
/// Explicit artifact records are used as-is; entries without one fall back
/// to Maven-coordinate translation against the library endpoints.
pub(crate) fn library_jobs(
    ctx: &InstallContext,
    meta: &VersionMeta,
) -> Result<Vec<DownloadJob>, MinecraftError> {
    let mut jobs = Vec::new();

    for lib in &meta.libraries {
        if !lib.rules.parse_rule() {
            continue;
        }

        if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            let Some(path) = artifact.path.as_ref() else {
                continue;
            };
            jobs.push(DownloadJob {
                urls: artifact_urls(ctx, &artifact.url, path),
                path: ctx.library_path(path),
                size: artifact.size,
                sha1: artifact.sha1.clone(),
            });
        } else {
            let path = match parse_lib_path(&lib.name) {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("Skipping library {}: {e}", lib.name);
                    continue;
                }
            };
            let urls = match &lib.url {
                Some(base) => vec![format!("{}/{path}", base.trim_end_matches('/'))],
                None => ctx.endpoints.library(&path),
            };
            jobs.push(DownloadJob {
                urls,
                path: ctx.library_path(&path),
                size: None,
                sha1: None,
            });
        }
    }

    Ok(jobs)
}

/// An explicit artifact URL on the official library host may also be
/// served by a configured mirror; other hosts are used verbatim.
fn artifact_urls(ctx: &InstallContext, url: &str, path: &str) -> Vec<String> {
    if url.starts_with(LIBRARIES_ENDPOINT) {
        ctx.endpoints.library(path)
    } else {
        vec![url.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::version::meta::{
        Action, FileRef, Library, LibraryDownloads, Os, Rule,
    };

    fn plain_meta(libraries: Vec<Library>) -> VersionMeta {
        VersionMeta {
            id: "1.20.1".to_string(),
            inherits_from: None,
            main_class: None,
            asset_index: None,
            assets: None,
            downloads: None,
            libraries,
            arguments: None,
            minecraft_arguments: None,
            java_version: None,
            release_time: None,
            time: None,
            r#type: None,
        }
    }

    #[test]
    fn jobs_skip_disallowed_libraries() {
        let ctx = InstallContext::new("/tmp/game");
        let meta = plain_meta(vec![Library {
            name: "x:win-only:1".to_string(),
            downloads: Some(LibraryDownloads {
                artifact: Some(FileRef {
                    url: "https://libraries.minecraft.net/x/win-only/1/win-only-1.jar".into(),
                    path: Some("x/win-only/1/win-only-1.jar".into()),
                    sha1: None,
                    size: None,
                }),
            }),
            rules: Some(vec![Rule {
                action: Action::Allow,
                os: Some(Os {
                    name: Some("nonexistent-os".to_string()),
                    arch: None,
                }),
            }]),
            url: None,
        }]);

        assert!(library_jobs(&ctx, &meta).unwrap().is_empty());
    }

    #[test]
    fn jobs_derive_path_when_artifact_absent() {
        let ctx = InstallContext::new("/tmp/game");
        let meta = plain_meta(vec![Library {
            name: "net.fabricmc:fabric-loader:0.15.0".to_string(),
            downloads: None,
            rules: None,
            url: Some("https://maven.fabricmc.net".to_string()),
        }]);

        let jobs = library_jobs(&ctx, &meta).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].urls,
            vec![
                "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar"
                    .to_string()
            ]
        );
        assert!(jobs[0]
            .path
            .ends_with("libraries/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar"));
    }
}

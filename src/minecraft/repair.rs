use std::collections::HashMap;

use crate::{
    http::downloader::{download_any, is_file_valid, DownloadJob},
    json::version::meta::{Library, VersionMeta},
    reporter::{Report, Reporter},
    util::json::read_json,
};

use super::{config::InstallContext, error::MinecraftError, maven::parse_lib_path};

/// What a repair run managed to restore, by library name. Individual
/// failures are reported here rather than raised; the caller decides
/// whether a partial repair is enough to launch.
#[derive(Debug, Default)]
pub struct RepairReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Re-fetches the named libraries for an installed version.
///
/// Declared download records from the version's descriptor (and its
/// direct parent, child entries winning) are preferred; names the
/// descriptors do
/// not declare fall back to Maven-coordinate translation against a fixed
/// repository order. Only cancellation and an unreadable descriptor
/// abort the run.
pub async fn repair_libraries(
    ctx: &InstallContext,
    version_name: &str,
    missing: &[String],
    reporter: Option<&dyn Reporter>,
) -> Result<RepairReport, MinecraftError> {
    let declared = declared_libraries(ctx, version_name).await?;
    let mut report = RepairReport::default();
    let total = missing.len() as u64;

    for (index, name) in missing.iter().enumerate() {
        ctx.check_cancelled()?;
        reporter.status(format!("Repairing library {name}"));
        reporter.progress(index as u64, total);

        let job = match repair_job(ctx, &declared, name) {
            Ok(job) => job,
            Err(e) => {
                log::warn!("Cannot derive a source for {name}: {e}");
                report.failed.push(name.clone());
                continue;
            }
        };

        if is_file_valid(&job.path, job.size, job.sha1.as_deref()) {
            report.succeeded.push(name.clone());
            continue;
        }

        match download_any(&job.urls, &job.path, reporter, &ctx.cancel).await {
            Ok(_) => report.succeeded.push(name.clone()),
            Err(crate::http::error::HttpError::Cancelled) => {
                return Err(MinecraftError::Cancelled)
            }
            Err(e) => {
                log::warn!("Failed to repair {name}: {e}");
                report.failed.push(name.clone());
            }
        }
    }

    reporter.progress(total, total);
    Ok(report)
}

/// Library records visible to a version: its own descriptor merged over
/// its direct parent's. A deeper walk is not needed here; the parent of
/// a loader child is always a base version.
async fn declared_libraries(
    ctx: &InstallContext,
    version_name: &str,
) -> Result<HashMap<String, Library>, MinecraftError> {
    let own: VersionMeta = read_json(&ctx.version_json_path(version_name)).await?;

    let mut declared: HashMap<String, Library> = HashMap::new();
    for lib in &own.libraries {
        declared.insert(lib.name.clone(), lib.clone());
    }

    if let Some(parent) = &own.inherits_from {
        let parent_path = ctx.version_json_path(parent);
        if parent_path.is_file() {
            let parent_meta: VersionMeta = read_json(&parent_path).await?;
            for lib in &parent_meta.libraries {
                declared.entry(lib.name.clone()).or_insert_with(|| lib.clone());
            }
        } else {
            log::warn!("Parent descriptor {parent} missing; repairing from coordinates only");
        }
    }

    Ok(declared)
}

fn repair_job(
    ctx: &InstallContext,
    declared: &HashMap<String, Library>,
    name: &str,
) -> Result<DownloadJob, MinecraftError> {
    if let Some(lib) = declared.get(name) {
        if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            if let Some(path) = artifact.path.as_ref() {
                return Ok(DownloadJob {
                    urls: vec![artifact.url.clone()],
                    path: ctx.library_path(path),
                    size: artifact.size,
                    sha1: artifact.sha1.clone(),
                });
            }
        }
        let path = parse_lib_path(&lib.name)?;
        if let Some(base) = &lib.url {
            return Ok(DownloadJob {
                urls: vec![format!("{}/{path}", base.trim_end_matches('/'))],
                path: ctx.library_path(&path),
                size: None,
                sha1: None,
            });
        }
    }

    // Undeclared or record-less: try the known repositories in order.
    let path = parse_lib_path(name)?;
    let mut urls = ctx.endpoints.library(&path);
    urls.extend(ctx.endpoints.fabric_maven(&path));
    urls.extend(ctx.endpoints.forge_maven(&path));
    Ok(DownloadJob {
        urls,
        path: ctx.library_path(&path),
        size: None,
        sha1: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::version::meta::{FileRef, LibraryDownloads};
    use crate::util::json::write_json;
    use tempfile::tempdir;

    fn lib(name: &str, artifact: Option<FileRef>) -> Library {
        Library {
            name: name.to_string(),
            downloads: artifact.map(|artifact| LibraryDownloads {
                artifact: Some(artifact),
            }),
            rules: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn child_record_wins_over_parent() {
        let dir = tempdir().unwrap();
        let ctx = InstallContext::new(dir.path());

        let parent = VersionMeta {
            id: "1.20.1".into(),
            inherits_from: None,
            main_class: None,
            asset_index: None,
            assets: None,
            downloads: None,
            libraries: vec![lib(
                "a:shared:1",
                Some(FileRef {
                    url: "https://example.com/parent.jar".into(),
                    path: Some("a/shared/1/shared-1.jar".into()),
                    sha1: None,
                    size: None,
                }),
            )],
            arguments: None,
            minecraft_arguments: None,
            java_version: None,
            release_time: None,
            time: None,
            r#type: None,
        };
        let mut child = parent.clone();
        child.id = "child".into();
        child.inherits_from = Some("1.20.1".into());
        child.libraries = vec![lib(
            "a:shared:1",
            Some(FileRef {
                url: "https://example.com/child.jar".into(),
                path: Some("a/shared/1/shared-1.jar".into()),
                sha1: None,
                size: None,
            }),
        )];

        write_json(&ctx.version_json_path("1.20.1"), &parent)
            .await
            .unwrap();
        write_json(&ctx.version_json_path("child"), &child)
            .await
            .unwrap();

        let declared = declared_libraries(&ctx, "child").await.unwrap();
        let job = repair_job(&ctx, &declared, "a:shared:1").unwrap();
        assert_eq!(job.urls, vec!["https://example.com/child.jar".to_string()]);
    }

    #[test]
    fn undeclared_name_falls_back_to_repository_order() {
        let ctx = InstallContext::new("/tmp/game");
        let job = repair_job(&ctx, &HashMap::new(), "org.ow2.asm:asm:9.6").unwrap();
        assert!(job.urls.len() >= 2);
        assert!(job.urls[0].ends_with("org/ow2/asm/asm/9.6/asm-9.6.jar"));
        assert!(job.sha1.is_none());
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    http::fetch::fetch_any,
    minecraft::{catalog::LoaderFamily, config::InstallContext, error::MinecraftError},
    reporter::Reporter,
};

use super::{fabric::install_merged_profile, sort_loader_versions, Loader, LoaderVersion};

const CRITICAL_LIBRARIES: [&str; 1] = ["org.quiltmc:quilt-loader"];

#[derive(Serialize, Deserialize)]
struct MetaGameVersion {
    version: String,
    stable: bool,
}

/// Quilt's loader list carries no stability flag; pre-release builds are
/// recognizable from the version string instead.
#[derive(Serialize, Deserialize)]
struct MetaLoaderVersion {
    version: String,
}

pub struct Quilt;

#[async_trait]
impl Loader for Quilt {
    fn family(&self) -> LoaderFamily {
        LoaderFamily::Quilt
    }

    async fn list_supported_game_versions(
        &self,
        ctx: &InstallContext,
    ) -> Result<Vec<String>, MinecraftError> {
        let versions: Vec<MetaGameVersion> =
            fetch_any(&ctx.endpoints.quilt_meta("versions/game")).await?;
        Ok(versions.into_iter().map(|v| v.version).collect())
    }

    async fn list_loader_versions(
        &self,
        ctx: &InstallContext,
        _base_version: &str,
    ) -> Result<Vec<LoaderVersion>, MinecraftError> {
        let loaders: Vec<MetaLoaderVersion> =
            fetch_any(&ctx.endpoints.quilt_meta("versions/loader")).await?;
        Ok(sort_loader_versions(
            loaders
                .into_iter()
                .map(|v| LoaderVersion {
                    stable: !v.version.contains("beta") && !v.version.contains("pre"),
                    version: v.version,
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
            LoaderFamily::Quilt,
            &CRITICAL_LIBRARIES,
            ctx.endpoints.quilt_meta(&format!(
                "versions/loader/{base_version}/{loader_version}/profile/json"
            )),
            |path| ctx.endpoints.quilt_maven(path),
        )
        .await
    }
}

use std::env::temp_dir;

use serde::Deserialize;
use tokio::{fs, process::Command};

use crate::{
    http::{downloader::download_any, fetch::fetch_any},
    json::version::meta::{Arguments, Element, Library, VersionMeta},
    minecraft::{
        catalog::{
            self, LoaderFamily, VersionConfig, VERSION_CONFIG_FILE,
        },
        compat::{self, Advice, InstallMode},
        config::InstallContext,
        error::MinecraftError,
        install::install_version,
        maven::parse_lib_path,
        staging::Staging,
    },
    reporter::{Report, Reporter},
    util::{
        extract::{extract_entry, has_entry, open_archive, read_entry_to_string},
        json::{read_json, write_json},
    },
};

/// One published OptiFine build for a game version, as served by the
/// mirror's version list.
#[derive(Deserialize, Debug, Clone)]
pub struct OptiFineBuild {
    pub mcversion: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub patch: String,
    pub filename: String,
}

impl OptiFineBuild {
    /// The `<mc>_<kind>_<patch>` tail OptiFine uses in file and library
    /// names, e.g. `1.12.2_HD_U_G5`.
    fn designator(&self) -> String {
        format!("{}_{}_{}", self.mcversion, self.kind, self.patch)
    }
}

pub async fn list_versions(
    ctx: &InstallContext,
    base_version: &str,
) -> Result<Vec<OptiFineBuild>, MinecraftError> {
    let mut builds: Vec<OptiFineBuild> =
        fetch_any(&ctx.endpoints.optifine_list(base_version)).await?;
    // Newest patch first; unparseable designators sink to the end.
    builds.sort_by(|a, b| {
        compat::PatchVersion::parse(&b.patch).cmp(&compat::PatchVersion::parse(&a.patch))
    });
    Ok(builds)
}

/// Installs one OptiFine build on top of an installed base version.
///
/// The compatibility check runs first and a refusal surfaces as
/// [`MinecraftError::Incompatible`] before anything touches the disk. On
/// modern bases the build lands as a plain mod file in the active mods
/// directory; on pre-1.13 bases it is merged against the base jar and a
/// launchwrapper child version is synthesized.
pub async fn install_optifine(
    ctx: &InstallContext,
    base_version: &str,
    kind: &str,
    patch: &str,
    forge_version: Option<&str>,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    ctx.check_cancelled()?;

    let mode = match compat::advise(base_version, forge_version, patch) {
        Advice::Refuse { reason } => return Err(MinecraftError::Incompatible(reason)),
        Advice::Install { mode, .. } => mode,
    };

    if !ctx.version_json_path(base_version).is_file() {
        install_version(ctx, base_version, reporter).await?;
    }

    let build = OptiFineBuild {
        mcversion: base_version.to_string(),
        kind: kind.to_string(),
        patch: patch.to_string(),
        filename: format!("OptiFine_{base_version}_{kind}_{patch}.jar"),
    };

    match mode {
        InstallMode::DropAsMod => drop_as_mod(ctx, base_version, &build, reporter).await,
        InstallMode::Integrate => integrate(ctx, base_version, &build, reporter).await,
    }
}

async fn drop_as_mod(
    ctx: &InstallContext,
    base_version: &str,
    build: &OptiFineBuild,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    let config = catalog::read_version_config(&ctx.root, base_version).await?;
    let isolated = config.use_version_isolation.unwrap_or(false);
    let target = catalog::mods_dir(&ctx.root, base_version, isolated).join(&build.filename);

    reporter.status(format!("Downloading OptiFine {}", build.designator()));
    download_any(
        &ctx.endpoints
            .optifine_download(&build.mcversion, &build.kind, &build.patch),
        &target,
        reporter,
        &ctx.cancel,
    )
    .await?;
    Ok(())
}

async fn integrate(
    ctx: &InstallContext,
    base_version: &str,
    build: &OptiFineBuild,
    reporter: Option<&dyn Reporter>,
) -> Result<(), MinecraftError> {
    let designator = build.designator();
    let custom_name = format!("{base_version}-OptiFine_{}_{}", build.kind, build.patch);

    let installer_path = temp_dir().join(&build.filename);
    if !installer_path.is_file() {
        reporter.status(format!("Downloading OptiFine installer {designator}"));
        download_any(
            &ctx.endpoints
                .optifine_download(&build.mcversion, &build.kind, &build.patch),
            &installer_path,
            reporter,
            &ctx.cancel,
        )
        .await?;
    }
    ctx.check_cancelled()?;

    let optifine_coordinate = format!("optifine:OptiFine:{designator}");
    let optifine_target = ctx.library_path(&parse_lib_path(&optifine_coordinate)?);
    if let Some(parent) = optifine_target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let archive = open_archive(&installer_path).await?;
    if has_entry(&archive, "optifine/Patcher.class") {
        // The installer ships a patcher that merges its changes against
        // the vanilla client jar.
        reporter.status(format!("Patching {designator} against {base_version}"));
        let status = Command::new(&ctx.java)
            .arg("-cp")
            .arg(&installer_path)
            .arg("optifine.Patcher")
            .arg(ctx.version_jar_path(base_version))
            .arg(&installer_path)
            .arg(&optifine_target)
            .status()
            .await?;
        if !status.success() {
            return Err(MinecraftError::Processor("optifine.Patcher".to_string()));
        }
    } else {
        fs::copy(&installer_path, &optifine_target).await?;
    }

    let launchwrapper = extract_launchwrapper(ctx, &archive, &installer_path).await?;
    ctx.check_cancelled()?;

    let base_meta: VersionMeta = read_json(&ctx.version_json_path(base_version)).await?;
    let mut meta = VersionMeta {
        id: custom_name.clone(),
        inherits_from: Some(base_version.to_string()),
        main_class: Some("net.minecraft.launchwrapper.Launch".to_string()),
        asset_index: None,
        assets: None,
        downloads: None,
        libraries: vec![
            name_only(&optifine_coordinate),
            name_only(&launchwrapper),
        ],
        arguments: None,
        minecraft_arguments: None,
        java_version: None,
        release_time: base_meta.release_time.clone(),
        time: base_meta.time.clone(),
        r#type: base_meta.r#type.clone(),
    };

    // Integration targets pre-1.13 bases, which carry the legacy argument
    // string; the tweaker has to ride in the child's copy because the
    // scalar is nearest-wins across the chain.
    if let Some(base_args) = &base_meta.minecraft_arguments {
        meta.minecraft_arguments = Some(format!("{base_args} --tweakClass optifine.OptiFine"));
    } else {
        meta.arguments = Some(Arguments {
            game: vec![
                Element::Plain("--tweakClass".to_string()),
                Element::Plain("optifine.OptiFine".to_string()),
            ],
            jvm: Vec::new(),
        });
    }

    let staging = Staging::begin(&ctx.versions_dir(), &custom_name).await?;
    write_json(staging.dir().join(format!("{custom_name}.json")), &meta).await?;
    write_json(
        staging.dir().join(VERSION_CONFIG_FILE),
        &VersionConfig {
            use_version_isolation: None,
            loader: Some(LoaderFamily::OptiFine),
        },
    )
    .await?;
    staging.commit().await?;

    Ok(())
}

/// OptiFine ships its own launchwrapper build inside the installer,
/// announced by a `launchwrapper-of.txt` version marker. Installers
/// without one rely on Mojang's stock launchwrapper instead.
async fn extract_launchwrapper(
    ctx: &InstallContext,
    archive: &crate::util::extract::Archive,
    installer_path: &std::path::Path,
) -> Result<String, MinecraftError> {
    if has_entry(archive, "launchwrapper-of.txt") {
        let wrapper_version = read_entry_to_string(installer_path, "launchwrapper-of.txt")
            .await?
            .trim()
            .to_string();
        let coordinate = format!("optifine:launchwrapper-of:{wrapper_version}");
        let target = ctx.library_path(&parse_lib_path(&coordinate)?);
        if !target.is_file() {
            extract_entry(
                installer_path,
                &format!("launchwrapper-of-{wrapper_version}.jar"),
                &target,
            )
            .await?;
        }
        return Ok(coordinate);
    }

    let coordinate = "net.minecraft:launchwrapper:1.12".to_string();
    let path = parse_lib_path(&coordinate)?;
    let target = ctx.library_path(&path);
    if !target.is_file() {
        download_any(&ctx.endpoints.library(&path), &target, None, &ctx.cancel).await?;
    }
    Ok(coordinate)
}

fn name_only(coordinate: &str) -> Library {
    Library {
        name: coordinate.to_string(),
        downloads: None,
        rules: None,
        url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designator_matches_published_file_names() {
        let build = OptiFineBuild {
            mcversion: "1.12.2".into(),
            kind: "HD_U".into(),
            patch: "G5".into(),
            filename: "OptiFine_1.12.2_HD_U_G5.jar".into(),
        };
        assert_eq!(build.designator(), "1.12.2_HD_U_G5");
    }

    #[tokio::test]
    async fn refusal_reaches_caller_before_any_io() {
        let ctx = InstallContext::new("/nonexistent/game-root");
        let err = install_optifine(&ctx, "1.20.1", "HD_U", "I6", Some("48.0.13"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MinecraftError::Incompatible(_)));
    }
}

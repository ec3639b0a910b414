pub const VERSION_MANIFEST_ENDPOINT: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const RESOURCES_ENDPOINT: &str = "https://resources.download.minecraft.net";
pub const LIBRARIES_ENDPOINT: &str = "https://libraries.minecraft.net";
pub const FABRIC_META_ENDPOINT: &str = "https://meta.fabricmc.net/v2";
pub const FABRIC_MAVEN_ENDPOINT: &str = "https://maven.fabricmc.net";
pub const QUILT_META_ENDPOINT: &str = "https://meta.quiltmc.org/v3";
pub const QUILT_MAVEN_ENDPOINT: &str = "https://maven.quiltmc.org/repository/release";
pub const FORGE_MAVEN_ENDPOINT: &str = "https://maven.minecraftforge.net";
pub const FORGE_METADATA_ENDPOINT: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/maven-metadata.json";
pub const BMCLAPI_ENDPOINT: &str = "https://bmclapi2.bangbang93.com";

/// Hosts whose version-descriptor URLs a mirror can serve by host swap.
const MOJANG_META_HOSTS: [&str; 2] = [
    "https://piston-meta.mojang.com",
    "https://launchermeta.mojang.com",
];

/// One origin for remote metadata and artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Official,
    /// A BMCLAPI-layout mirror, identified by its base URL.
    Mirror(String),
}

/// Maps abstract acquisition operations to priority-ordered URL lists for
/// the configured source chain. Callers walk each list in order and take
/// the first endpoint that answers (`fetch_any` / `download_any`).
#[derive(Debug, Clone)]
pub struct Endpoints {
    sources: Vec<Source>,
}

impl Endpoints {
    /// Official endpoints only.
    pub fn official() -> Self {
        Self {
            sources: vec![Source::Official],
        }
    }

    /// Mirror first, falling back to the official endpoints.
    pub fn with_mirror(base: impl Into<String>) -> Self {
        Self {
            sources: vec![
                Source::Mirror(base.into().trim_end_matches('/').to_string()),
                Source::Official,
            ],
        }
    }

    fn map(&self, f: impl Fn(&Source) -> Option<String>) -> Vec<String> {
        self.sources.iter().filter_map(f).collect()
    }

    pub fn version_manifest(&self) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(VERSION_MANIFEST_ENDPOINT.to_string()),
            Source::Mirror(m) => Some(format!("{m}/mc/game/version_manifest_v2.json")),
        })
    }

    /// Candidate URLs for a version descriptor, given the URL published in
    /// the version manifest. Mirrors serve the same path under their host.
    pub fn version_json(&self, upstream_url: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(upstream_url.to_string()),
            Source::Mirror(m) => MOJANG_META_HOSTS
                .iter()
                .find(|host| upstream_url.starts_with(*host))
                .map(|host| format!("{m}{}", &upstream_url[host.len()..])),
        })
    }

    pub fn asset_object(&self, hash: &str) -> Vec<String> {
        let tail = format!("{}/{}", &hash[..2.min(hash.len())], hash);
        self.map(|s| match s {
            Source::Official => Some(format!("{RESOURCES_ENDPOINT}/{tail}")),
            Source::Mirror(m) => Some(format!("{m}/assets/{tail}")),
        })
    }

    /// Candidate URLs for a library by its repository-relative path.
    pub fn library(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{LIBRARIES_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/maven/{path}")),
        })
    }

    pub fn fabric_meta(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{FABRIC_META_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/fabric-meta/{path}")),
        })
    }

    pub fn fabric_maven(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{FABRIC_MAVEN_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/maven/{path}")),
        })
    }

    pub fn quilt_meta(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{QUILT_META_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/quilt-meta/{path}")),
        })
    }

    pub fn quilt_maven(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{QUILT_MAVEN_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/maven/{path}")),
        })
    }

    pub fn forge_maven(&self, path: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{FORGE_MAVEN_ENDPOINT}/{path}")),
            Source::Mirror(m) => Some(format!("{m}/maven/{path}")),
        })
    }

    /// The Forge version index. Only the origin publishes this document.
    pub fn forge_metadata(&self) -> Vec<String> {
        vec![FORGE_METADATA_ENDPOINT.to_string()]
    }

    /// OptiFine has no official metadata API; the list is served by the
    /// mirror layout only, so the official source also resolves to BMCLAPI.
    pub fn optifine_list(&self, mc_version: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => Some(format!("{BMCLAPI_ENDPOINT}/optifine/{mc_version}")),
            Source::Mirror(m) => Some(format!("{m}/optifine/{mc_version}")),
        })
    }

    pub fn optifine_download(&self, mc_version: &str, kind: &str, patch: &str) -> Vec<String> {
        self.map(|s| match s {
            Source::Official => {
                Some(format!("{BMCLAPI_ENDPOINT}/optifine/{mc_version}/{kind}/{patch}"))
            }
            Source::Mirror(m) => Some(format!("{m}/optifine/{mc_version}/{kind}/{patch}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_rewrites_version_json_host() {
        let endpoints = Endpoints::with_mirror("https://mirror.example");
        let urls = endpoints
            .version_json("https://piston-meta.mojang.com/v1/packages/abc/1.20.1.json");
        assert_eq!(
            urls,
            vec![
                "https://mirror.example/v1/packages/abc/1.20.1.json".to_string(),
                "https://piston-meta.mojang.com/v1/packages/abc/1.20.1.json".to_string(),
            ]
        );
    }

    #[test]
    fn mirror_skips_unknown_hosts() {
        let endpoints = Endpoints::with_mirror("https://mirror.example");
        let urls = endpoints.version_json("https://other.example/foo.json");
        assert_eq!(urls, vec!["https://other.example/foo.json".to_string()]);
    }

    #[test]
    fn asset_object_splits_hash_prefix() {
        let endpoints = Endpoints::official();
        let urls = endpoints.asset_object("da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            urls,
            vec![format!(
                "{RESOURCES_ENDPOINT}/da/da39a3ee5e6b4b0d3255bfef95601890afd80709"
            )]
        );
    }
}

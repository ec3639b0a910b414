use std::{collections::HashSet, path::Path};

use crate::{
    json::version::meta::{
        Arguments, AssetIndexRef, Downloads, JavaVersion, Library, VersionMeta,
    },
    util::json::read_json,
};

use super::error::MinecraftError;

/// A version with its inheritance chain applied: libraries are the union
/// of every descriptor in the chain, scalars come from the nearest
/// descriptor that declares them.
#[derive(Debug, Clone)]
pub struct EffectiveVersion {
    pub id: String,
    pub main_class: Option<String>,
    pub asset_index: Option<AssetIndexRef>,
    pub assets: Option<String>,
    pub downloads: Option<Downloads>,
    pub libraries: Vec<Library>,
    pub arguments: Option<Arguments>,
    pub minecraft_arguments: Option<String>,
    pub java_version: Option<JavaVersion>,
}

/// Loads the descriptor chain for `id`, child first. Parents are sibling
/// version directories named after the parent id. A missing parent or a
/// repeated id surfaces as a typed broken-chain error instead of a silent
/// truncation or an unbounded walk.
pub async fn load_chain(root: &Path, id: &str) -> Result<Vec<VersionMeta>, MinecraftError> {
    let mut chain = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = id.to_string();

    loop {
        if !visited.insert(current.clone()) {
            return Err(MinecraftError::BrokenChain {
                id: id.to_string(),
                reason: format!("inheritance cycle through {current}"),
            });
        }

        let path = root
            .join("versions")
            .join(&current)
            .join(format!("{current}.json"));
        if !path.is_file() {
            return Err(MinecraftError::BrokenChain {
                id: id.to_string(),
                reason: format!("missing descriptor for {current}"),
            });
        }

        let meta: VersionMeta = read_json(&path).await?;
        let parent = meta.inherits_from.clone();
        chain.push(meta);

        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Ok(chain)
}

/// Merges a child-first chain into one effective version.
///
/// Libraries are additive: the union over the chain, deduplicated by full
/// `name`, child declarations winning ties. Scalar fields override only
/// when the child declares them.
pub fn merge_chain(chain: &[VersionMeta]) -> EffectiveVersion {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut libraries = Vec::new();
    for meta in chain {
        for lib in &meta.libraries {
            if seen.insert(lib.name.as_str()) {
                libraries.push(lib.clone());
            }
        }
    }

    fn first<'a, T>(chain: &'a [VersionMeta], f: impl Fn(&'a VersionMeta) -> Option<&'a T>) -> Option<T>
    where
        T: Clone + 'a,
    {
        chain.iter().find_map(|meta| f(meta)).cloned()
    }

    EffectiveVersion {
        id: chain.first().map(|meta| meta.id.clone()).unwrap_or_default(),
        main_class: first(chain, |m| m.main_class.as_ref()),
        asset_index: first(chain, |m| m.asset_index.as_ref()),
        assets: first(chain, |m| m.assets.as_ref()),
        downloads: first(chain, |m| m.downloads.as_ref()),
        libraries,
        arguments: first(chain, |m| m.arguments.as_ref()),
        minecraft_arguments: first(chain, |m| m.minecraft_arguments.as_ref()),
        java_version: first(chain, |m| m.java_version.as_ref()),
    }
}

/// Loads and merges in one step.
pub async fn resolve_effective(root: &Path, id: &str) -> Result<EffectiveVersion, MinecraftError> {
    let chain = load_chain(root, id).await?;
    Ok(merge_chain(&chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::json::write_json;

    fn meta(id: &str, parent: Option<&str>) -> VersionMeta {
        VersionMeta {
            id: id.to_string(),
            inherits_from: parent.map(str::to_string),
            main_class: None,
            asset_index: None,
            assets: None,
            downloads: None,
            libraries: Vec::new(),
            arguments: None,
            minecraft_arguments: None,
            java_version: None,
            release_time: None,
            time: None,
            r#type: None,
        }
    }

    fn lib(name: &str) -> Library {
        Library {
            name: name.to_string(),
            downloads: None,
            rules: None,
            url: None,
        }
    }

    fn asset_index(id: &str) -> AssetIndexRef {
        AssetIndexRef {
            id: id.to_string(),
            url: format!("https://example.invalid/{id}.json"),
            sha1: None,
            size: None,
            total_size: None,
        }
    }

    #[test]
    fn libraries_are_union_without_duplicates() {
        let mut a = meta("a", Some("b"));
        a.libraries = vec![lib("x:shared:1"), lib("x:a-only:1")];
        let mut b = meta("b", Some("c"));
        b.libraries = vec![lib("x:shared:1"), lib("x:b-only:1")];
        let mut c = meta("c", None);
        c.libraries = vec![lib("x:c-only:1")];

        let effective = merge_chain(&[a, b, c]);
        let names: Vec<&str> = effective
            .libraries
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["x:shared:1", "x:a-only:1", "x:b-only:1", "x:c-only:1"]
        );
    }

    #[test]
    fn scalars_come_from_nearest_declaring_ancestor() {
        let a = meta("a", Some("b"));
        let b = meta("b", Some("c"));
        let mut c = meta("c", None);
        c.asset_index = Some(asset_index("5"));
        c.main_class = Some("net.minecraft.client.main.Main".to_string());

        let effective = merge_chain(&[a, b, c]);
        assert_eq!(effective.id, "a");
        assert_eq!(effective.asset_index.unwrap().id, "5");
        assert_eq!(
            effective.main_class.as_deref(),
            Some("net.minecraft.client.main.Main")
        );
    }

    #[test]
    fn child_scalar_overrides_parent() {
        let mut a = meta("a", Some("b"));
        a.main_class = Some("child.Main".to_string());
        let mut b = meta("b", None);
        b.main_class = Some("parent.Main".to_string());

        let effective = merge_chain(&[a, b]);
        assert_eq!(effective.main_class.as_deref(), Some("child.Main"));
    }

    #[tokio::test]
    async fn chain_walk_reads_sibling_version_dirs() {
        let root = tempfile::tempdir().unwrap();
        let mut child = meta("custom", Some("base"));
        child.libraries = vec![lib("x:loader:1")];
        let mut base = meta("base", None);
        base.libraries = vec![lib("x:game:1")];
        base.asset_index = Some(asset_index("5"));

        write_json(root.path().join("versions/custom/custom.json"), &child)
            .await
            .unwrap();
        write_json(root.path().join("versions/base/base.json"), &base)
            .await
            .unwrap();

        let effective = resolve_effective(root.path(), "custom").await.unwrap();
        assert_eq!(effective.id, "custom");
        assert_eq!(effective.libraries.len(), 2);
        assert_eq!(effective.asset_index.unwrap().id, "5");
    }

    #[tokio::test]
    async fn missing_parent_is_a_broken_chain() {
        let root = tempfile::tempdir().unwrap();
        let child = meta("custom", Some("gone"));
        write_json(root.path().join("versions/custom/custom.json"), &child)
            .await
            .unwrap();

        let err = resolve_effective(root.path(), "custom").await.unwrap_err();
        assert!(matches!(err, MinecraftError::BrokenChain { .. }));
    }

    #[tokio::test]
    async fn cycle_is_a_broken_chain() {
        let root = tempfile::tempdir().unwrap();
        let a = meta("a", Some("b"));
        let b = meta("b", Some("a"));
        write_json(root.path().join("versions/a/a.json"), &a)
            .await
            .unwrap();
        write_json(root.path().join("versions/b/b.json"), &b)
            .await
            .unwrap();

        let err = resolve_effective(root.path(), "a").await.unwrap_err();
        assert!(matches!(err, MinecraftError::BrokenChain { .. }));
    }
}

use super::error::MinecraftError;

/// Translates a Maven coordinate `group:artifact:version[:classifier][@ext]`
/// into its repository-relative file path.
///
/// The derivation is the canonical Maven layout, so it matches what the
/// loaders' own repositories serve:
/// `net.fabricmc:fabric-loader:0.15.0` becomes
/// `net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar`.
pub fn parse_lib_path(artifact: &str) -> Result<String, MinecraftError> {
    let name_items: Vec<&str> = artifact.split(':').collect();
    if name_items.len() < 3 {
        return Err(MinecraftError::Parse(format!(
            "Invalid artifact format: {artifact}"
        )));
    }

    let package = name_items[0];
    let name = name_items[1];
    let version_ext: Vec<&str> = name_items[2].split('@').collect();
    let version = version_ext[0];
    let ext = version_ext.get(1).unwrap_or(&"jar");

    if name_items.len() == 3 {
        Ok(format!(
            "{}/{}/{}/{}-{}.{}",
            package.replace('.', "/"),
            name,
            version,
            name,
            version,
            ext
        ))
    } else {
        let data_ext: Vec<&str> = name_items[3].split('@').collect();
        let data = data_ext[0];
        let data_ext = data_ext.get(1).unwrap_or(&"jar");

        Ok(format!(
            "{}/{}/{}/{}-{}-{}.{}",
            package.replace('.', "/"),
            name,
            version,
            name,
            version,
            data,
            data_ext
        ))
    }
}

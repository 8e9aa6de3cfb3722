//! Extension version lookup and companion release selection.

use crate::packaging::traits::{ManifestError, ResolveError};
use semver::{Prerelease, Version};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ExtensionManifest {
    version: Option<String>,
}

/// Reads the `version` field of the JSON manifest at `manifest_path`.
pub fn read_extension_version(manifest_path: &Path) -> Result<Version, ManifestError> {
    let content = fs::read_to_string(manifest_path).map_err(|source| ManifestError::Read {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    let manifest: ExtensionManifest =
        serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let raw = manifest.version.ok_or_else(|| ManifestError::MissingVersion {
        path: manifest_path.to_path_buf(),
    })?;

    Version::parse(&raw).map_err(|source| ManifestError::InvalidVersion {
        path: manifest_path.to_path_buf(),
        version: raw.clone(),
        source,
    })
}

/// Picks the newest tag that parses as a semantic version and is not newer
/// than `extension_version`. Tags that are not valid versions are skipped.
pub fn select_compatible_version<S: AsRef<str>>(
    tags: &[S],
    extension_version: &Version,
) -> Result<Version, ResolveError> {
    let ceiling = precedence(extension_version);

    tags.iter()
        .filter_map(|tag| Version::parse(tag.as_ref()).ok())
        .filter(|version| precedence(version) <= ceiling)
        .max_by(|a, b| precedence(a).cmp(&precedence(b)))
        .ok_or_else(|| ResolveError::NoCompatibleRelease {
            extension_version: extension_version.clone(),
            candidates: tags.len(),
        })
}

// Build metadata does not take part in semver precedence.
fn precedence(version: &Version) -> (u64, u64, u64, &Prerelease) {
    (version.major, version.minor, version.patch, &version.pre)
}

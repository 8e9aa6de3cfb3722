use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system a package is built for, spelled the way the runtime
/// archives name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        }
    }

    /// Archive format the runtime is published in for this platform.
    pub fn runtime_archive_kind(&self) -> ArchiveKind {
        match self {
            Platform::Windows => ArchiveKind::Zip,
            Platform::Linux | Platform::Mac => ArchiveKind::TarGz,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (platform, architecture) pair an offline package is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    pub platform: Platform,
    pub arch: Arch,
}

impl TargetSpec {
    pub const fn new(platform: Platform, arch: Arch) -> Self {
        Self { platform, arch }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}

/// Targets built by a default run, in build order.
pub const DEFAULT_TARGETS: [TargetSpec; 3] = [
    TargetSpec::new(Platform::Linux, Arch::X64),
    TargetSpec::new(Platform::Mac, Arch::X64),
    TargetSpec::new(Platform::Windows, Arch::X64),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Entry of the release listing. Only the tag is used; other fields of the
/// listing are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_archive_kind_per_platform() {
        assert_eq!(Platform::Linux.runtime_archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::Mac.runtime_archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::Windows.runtime_archive_kind(), ArchiveKind::Zip);
    }

    #[test]
    fn test_default_targets_order() {
        let names: Vec<String> = DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["linux-x64", "mac-x64", "windows-x64"]);
    }

    #[test]
    fn test_release_ignores_extra_fields() {
        let json = r#"[{"tag_name": "5.0.0", "draft": false, "assets": []}]"#;
        let releases: Vec<Release> = serde_json::from_str(json).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].tag_name, "5.0.0");
    }
}

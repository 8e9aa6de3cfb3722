//! Packaging configuration.
//!
//! Every path, URL template, pinned version and command line the packager
//! uses lives in [`PackagerConfig`]. [`PackagerConfig::for_project`] yields the
//! values used for the vscode-ltex release process; the `with_*` builders
//! override single settings.
//!
//! URL templates are filled by replacing `{name}` placeholders. The companion
//! template understands `{version}`; the runtime template understands
//! `{runtime_tag}`, `{runtime_version}`, `{platform}`, `{arch}` and `{ext}`.

use crate::model::{ArchiveKind, TargetSpec, DEFAULT_TARGETS};
use semver::Version;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/valentjn/ltex-ls/releases";

pub const DEFAULT_COMPANION_URL_TEMPLATE: &str =
    "https://github.com/valentjn/ltex-ls/releases/download/{version}/ltex-ls-{version}.tar.gz";

pub const DEFAULT_RUNTIME_URL_TEMPLATE: &str =
    "https://github.com/AdoptOpenJDK/openjdk11-binaries/releases/download/{runtime_tag}/OpenJDK11U-jre_{arch}_{platform}_hotspot_{runtime_version}.{ext}";

/// Release tag of the pinned runtime, already percent-encoded for URLs.
pub const DEFAULT_RUNTIME_TAG: &str = "jdk-11.0.7%2B10";
pub const DEFAULT_RUNTIME_VERSION: &str = "11.0.7_10";

/// Kind of filesystem entry left behind by an earlier packaging layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    Directory,
    File,
}

/// Entry of the working directory removed before a runtime is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPath {
    /// Path relative to the working directory
    pub relative: PathBuf,
    pub kind: LegacyKind,
}

impl LegacyPath {
    pub fn directory(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            kind: LegacyKind::Directory,
        }
    }

    pub fn file(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            kind: LegacyKind::File,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Root of the extension's source tree (a git checkout)
    pub project_root: PathBuf,

    /// Scratch directory for downloaded and extracted artifacts
    pub working_dir: PathBuf,

    /// JSON manifest carrying the extension's `version`
    pub manifest_path: PathBuf,

    /// Base name of produced packages, e.g. `vscode-ltex`
    pub package_name: String,

    /// Extension of produced packages without the dot, e.g. `vsix`
    pub package_extension: String,

    pub releases_url: String,
    pub companion_url_template: String,
    pub runtime_url_template: String,
    pub runtime_tag: String,
    pub runtime_version: String,

    /// Entries from the previous runtime layout, relative to `working_dir`
    pub legacy_runtime: Vec<LegacyPath>,

    /// Targets in build order
    pub targets: Vec<TargetSpec>,

    /// Packaging program and the arguments preceding the output file name
    pub package_program: String,
    pub package_args: Vec<String>,

    /// Version-control program used to clean the working directory
    pub vcs_program: String,

    pub user_agent: String,

    /// Connect timeout, release list request timeout and download idle
    /// timeout (default: 60 seconds)
    pub http_timeout: Duration,

    /// Timeout of each pipeline stage (default: 10 minutes)
    pub stage_timeout: Duration,
}

impl PackagerConfig {
    /// Default configuration for the extension checked out at `project_root`.
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            working_dir: project_root.join("lib"),
            manifest_path: project_root.join("package.json"),
            project_root,
            package_name: "vscode-ltex".to_string(),
            package_extension: "vsix".to_string(),
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            companion_url_template: DEFAULT_COMPANION_URL_TEMPLATE.to_string(),
            runtime_url_template: DEFAULT_RUNTIME_URL_TEMPLATE.to_string(),
            runtime_tag: DEFAULT_RUNTIME_TAG.to_string(),
            runtime_version: DEFAULT_RUNTIME_VERSION.to_string(),
            legacy_runtime: vec![
                LegacyPath::directory("jdk-11.0.7+10-jre"),
                LegacyPath::file("._jdk-11.0.7+10-jre"),
            ],
            targets: DEFAULT_TARGETS.to_vec(),
            package_program: "vsce".to_string(),
            package_args: vec!["package".to_string(), "-o".to_string()],
            vcs_program: "git".to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            http_timeout: Duration::from_secs(60),
            stage_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_targets(mut self, targets: Vec<TargetSpec>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    pub fn with_releases_url(mut self, url: impl Into<String>) -> Self {
        self.releases_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Download URL of the companion archive for `version`.
    pub fn companion_url(&self, version: &Version) -> String {
        let version = version.to_string();
        fill_template(
            &self.companion_url_template,
            &[("version", version.as_str())],
        )
    }

    /// Companion releases are always published as gzipped tarballs.
    pub fn companion_archive_kind(&self) -> ArchiveKind {
        ArchiveKind::TarGz
    }

    /// Download URL of the pinned runtime for `target`.
    pub fn runtime_url(&self, target: TargetSpec) -> String {
        fill_template(
            &self.runtime_url_template,
            &[
                ("runtime_tag", self.runtime_tag.as_str()),
                ("runtime_version", self.runtime_version.as_str()),
                ("platform", target.platform.as_str()),
                ("arch", target.arch.as_str()),
                ("ext", target.platform.runtime_archive_kind().extension()),
            ],
        )
    }

    pub fn legacy_runtime_paths(&self) -> impl Iterator<Item = (PathBuf, LegacyKind)> + '_ {
        self.legacy_runtime
            .iter()
            .map(|entry| (self.working_dir.join(&entry.relative), entry.kind))
    }
}

fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}

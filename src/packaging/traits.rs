//! Stage traits and error types for the packaging workflow.
//!
//! The network-facing stages sit behind [`ReleaseSource`] and
//! [`ArtifactFetcher`] so the orchestrator can be driven by mocks in tests.
//! External commands go through [`crate::traits::CommandRunner`].

use crate::model::ArchiveKind;
use async_trait::async_trait;
use semver::Version;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Stage Traits
// ============================================================================

/// Source of the companion component's release listing.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetches the listing at `endpoint_url` and returns the release tags in
    /// listing order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the endpoint is unreachable, answers with a
    /// non-success status, or the body is not a JSON array of releases.
    async fn fetch_release_list(&self, endpoint_url: &str) -> Result<Vec<String>, FetchError>;
}

/// Downloads an archive and unpacks it into a directory.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Downloads `url` into `destination_dir`, extracts it there with the
    /// extractor for `kind`, then deletes the downloaded archive so that only
    /// the extracted contents remain.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the download fails, the archive is corrupt,
    /// or writing the extracted files fails.
    async fn download_and_extract(
        &self,
        url: &str,
        destination_dir: &Path,
        kind: ArchiveKind,
    ) -> Result<(), FetchError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors reading the extension manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest '{}' has no 'version' field", path.display())]
    MissingVersion { path: PathBuf },

    #[error("Manifest '{}' declares invalid version '{version}': {source}", path.display())]
    InvalidVersion {
        path: PathBuf,
        version: String,
        #[source]
        source: semver::Error,
    },
}

/// Errors selecting the companion component's version.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No release tag is a valid version at or below the extension version
    #[error(
        "No compatible release found: none of {candidates} release tags is a version <= {extension_version}"
    )]
    NoCompatibleRelease {
        extension_version: Version,
        candidates: usize,
    },
}

/// Errors fetching the release listing or downloading and unpacking archives.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request failed before a response arrived (DNS, connect, timeout)
    #[error("Request to '{url}' failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server went silent for longer than the idle timeout
    #[error("Download of '{url}' stalled: no data received for {idle:?}")]
    Stalled { url: String, idle: Duration },

    #[error("Request to '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Release list from '{url}' is malformed: {source}")]
    InvalidReleaseList {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// URL has no final path segment to name the downloaded file after
    #[error("Cannot derive an archive file name from '{url}'")]
    InvalidUrl { url: String },

    /// Archive is corrupt or could not be unpacked
    #[error("Failed to extract '{}': {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

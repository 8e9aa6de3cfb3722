//! Release listing, archive download and extraction.
//!
//! [`HttpFetcher`] implements both [`ReleaseSource`] and [`ArtifactFetcher`]
//! on top of a single `reqwest` client. Extraction is CPU and disk bound and
//! runs on the blocking pool; the downloaded archive is removed once its
//! contents are on disk.

use crate::config::LegacyKind;
use crate::model::{ArchiveKind, Release};
use crate::packaging::traits::{ArtifactFetcher, FetchError, ReleaseSource};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use percent_encoding::percent_decode_str;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher bounded by `timeout`.
    ///
    /// The release list request is limited as a whole. Downloads have no
    /// overall limit; they fail once the server sends nothing for `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, timeout })
    }

    fn request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
    }

    fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Awaits `future`, failing with [`FetchError::Stalled`] when it takes
    /// longer than the idle timeout.
    async fn within_idle_timeout<T>(
        &self,
        url: &str,
        future: impl std::future::Future<Output = Result<T, reqwest::Error>>,
    ) -> Result<T, FetchError> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result.map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            }),
            Err(_) => Err(FetchError::Stalled {
                url: url.to_string(),
                idle: self.timeout,
            }),
        }
    }

    /// Streams `url` into the file at `destination`. Returns the byte count.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let response = self
            .within_idle_timeout(url, self.request(url, "application/octet-stream").send())
            .await?;
        let mut response = Self::check_status(url, response)?;

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(FetchError::io(destination))?;
        let mut written: u64 = 0;

        while let Some(chunk) = self.within_idle_timeout(url, response.chunk()).await? {
            file.write_all(&chunk)
                .await
                .map_err(FetchError::io(destination))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(FetchError::io(destination))?;
        Ok(written)
    }
}

#[async_trait]
impl ReleaseSource for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_release_list(&self, endpoint_url: &str) -> Result<Vec<String>, FetchError> {
        info!("Fetching list of releases from '{}'", endpoint_url);

        let network = |source: reqwest::Error| FetchError::Network {
            url: endpoint_url.to_string(),
            source,
        };
        let response = self
            .request(endpoint_url, "application/vnd.github.v3+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(network)?;
        let body = Self::check_status(endpoint_url, response)?
            .text()
            .await
            .map_err(network)?;

        parse_release_list(endpoint_url, &body)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    #[instrument(skip(self, destination_dir), fields(dir = %destination_dir.display()))]
    async fn download_and_extract(
        &self,
        url: &str,
        destination_dir: &Path,
        kind: ArchiveKind,
    ) -> Result<(), FetchError> {
        let archive_path = destination_dir.join(archive_file_name(url)?);

        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(FetchError::io(destination_dir))?;

        info!(
            "Downloading '{}' to '{}'",
            url,
            archive_path.display()
        );
        let bytes = self.download(url, &archive_path).await?;
        debug!(bytes, "Download completed");

        unpack_and_remove(&archive_path, destination_dir, kind).await
    }
}

/// Parses a release listing body into its tags, in listing order.
pub fn parse_release_list(url: &str, body: &str) -> Result<Vec<String>, FetchError> {
    let releases: Vec<Release> =
        serde_json::from_str(body).map_err(|source| FetchError::InvalidReleaseList {
            url: url.to_string(),
            source,
        })?;

    Ok(releases.into_iter().map(|r| r.tag_name).collect())
}

/// Name of the downloaded file: the last path segment of `url`,
/// percent-decoded.
pub fn archive_file_name(url: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidUrl {
        url: url.to_string(),
    };

    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(invalid)?;
    let name = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| invalid())?;

    // A decoded name must still be a single plain file name.
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(invalid());
    }

    Ok(name.into_owned())
}

/// Extracts `archive_path` into `destination_dir`, then deletes the archive.
pub async fn unpack_and_remove(
    archive_path: &Path,
    destination_dir: &Path,
    kind: ArchiveKind,
) -> Result<(), FetchError> {
    info!("Extracting '{}'", archive_path.display());

    let archive = archive_path.to_path_buf();
    let destination = destination_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &destination, kind))
        .await
        .map_err(|e| FetchError::Archive {
            path: archive_path.to_path_buf(),
            message: format!("extraction task failed: {}", e),
        })??;

    info!("Removing archive '{}'", archive_path.display());
    tokio::fs::remove_file(archive_path)
        .await
        .map_err(FetchError::io(archive_path))
}

/// Unpacks an archive in place. Blocking.
pub fn extract_archive(
    archive_path: &Path,
    destination_dir: &Path,
    kind: ArchiveKind,
) -> Result<(), FetchError> {
    let file = File::open(archive_path).map_err(FetchError::io(archive_path))?;
    let corrupt = |message: String| FetchError::Archive {
        path: archive_path.to_path_buf(),
        message,
    };

    match kind {
        ArchiveKind::TarGz => {
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            archive
                .unpack(destination_dir)
                .map_err(|e| corrupt(e.to_string()))
        }
        ArchiveKind::Zip => {
            let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
            archive
                .extract(destination_dir)
                .map_err(|e| corrupt(e.to_string()))
        }
    }
}

/// Removes entries left by the previous runtime layout. Directories are only
/// removed if they are directories, files only if they are files. Returns the
/// removed paths.
pub async fn remove_legacy_runtime<I>(entries: I) -> Result<Vec<PathBuf>, FetchError>
where
    I: IntoIterator<Item = (PathBuf, LegacyKind)>,
{
    let mut removed = Vec::new();

    for (path, kind) in entries {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(FetchError::io(&path)(e)),
        };

        match kind {
            LegacyKind::Directory if metadata.is_dir() => {
                info!("Removing old runtime directory '{}'", path.display());
                tokio::fs::remove_dir_all(&path)
                    .await
                    .map_err(FetchError::io(&path))?;
            }
            LegacyKind::File if metadata.is_file() => {
                info!("Removing old runtime file '{}'", path.display());
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(FetchError::io(&path))?;
            }
            _ => continue,
        }

        removed.push(path);
    }

    Ok(removed)
}

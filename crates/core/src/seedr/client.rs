//! reqwest-backed Seedr REST client.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{multipart, Client, RequestBuilder, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::SeedrConfig;

use super::types::FolderListing;
use super::{AddTorrentResponse, SeedrApi, SeedrError, SeedrFolder};

/// Seedr REST client using HTTP basic auth.
pub struct SeedrClient {
    client: Client,
    config: SeedrConfig,
}

impl SeedrClient {
    /// Create a new Seedr client.
    pub fn new(config: SeedrConfig) -> Result<Self, SeedrError> {
        // No client-wide timeout: folder downloads may legitimately run for hours.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SeedrError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs as u64)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.config.email, Some(&self.config.password))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SeedrError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(SeedrError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SeedrError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SeedrError::ApiError(format!("HTTP {}", status)));
        }
        Ok(response)
    }

    async fn parse_add_response(response: Response) -> Result<AddTorrentResponse, SeedrError> {
        let body = response.text().await.map_err(SeedrError::from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            SeedrError::InvalidResponse(format!(
                "{}: {}",
                e,
                body.chars().take(100).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl SeedrApi for SeedrClient {
    async fn list_root_folders(&self) -> Result<Vec<SeedrFolder>, SeedrError> {
        let url = format!("{}/folder", self.base_url());
        let response = self
            .send(self.client.get(&url).timeout(self.request_timeout()))
            .await?;

        let listing: FolderListing = response
            .json()
            .await
            .map_err(|e| SeedrError::InvalidResponse(e.to_string()))?;

        debug!(count = listing.folders.len(), "Listed Seedr root folders");
        Ok(listing.folders)
    }

    async fn add_magnet(&self, magnet: &str) -> Result<AddTorrentResponse, SeedrError> {
        let url = format!("{}/transfer/magnet", self.base_url());
        let response = self
            .send(
                self.client
                    .post(&url)
                    .form(&[("magnet", magnet)])
                    .timeout(self.request_timeout()),
            )
            .await?;

        Self::parse_add_response(response).await
    }

    async fn add_torrent_file(&self, path: &Path) -> Result<AddTorrentResponse, SeedrError> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.torrent".to_string());

        let part = multipart::Part::bytes(data)
            .file_name(filename)
            .mime_str("application/x-bittorrent")
            .map_err(|e| SeedrError::ApiError(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/transfer/file", self.base_url());
        let response = self
            .send(
                self.client
                    .post(&url)
                    .multipart(form)
                    .timeout(self.request_timeout()),
            )
            .await?;

        Self::parse_add_response(response).await
    }

    async fn download_archive(&self, id: i64, archive: &Path) -> Result<u64, SeedrError> {
        let url = format!("{}/folder/{}/download", self.base_url(), id);
        let response = self.send(self.client.get(&url)).await?;

        let mut file = tokio::fs::File::create(archive).await?;
        let mut bytes = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(SeedrError::from_reqwest)?;
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(seedr_id = id, bytes, "Archive received");
        Ok(bytes)
    }
}

/// Unpack a downloaded archive into `dest` and delete it.
///
/// Runs to completion even if the caller stops polling, so callers must not
/// wrap it in a timeout.
pub async fn unpack_download(archive: &Path, dest: &Path) -> Result<usize, SeedrError> {
    let unpack_from = archive.to_path_buf();
    let unpack_into = dest.to_path_buf();
    let files = tokio::task::spawn_blocking(move || unpack_archive(&unpack_from, &unpack_into))
        .await
        .map_err(|e| SeedrError::Archive(e.to_string()))??;

    tokio::fs::remove_file(archive).await?;
    info!(archive = %archive.display(), files, "Archive unpacked");
    Ok(files)
}

/// Unpack a zip archive into `dest`, skipping entries that would escape it.
/// Returns the number of files written.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<usize, SeedrError> {
    let file = File::open(archive)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| SeedrError::Archive(format!("Failed to open archive: {}", e)))?;

    let mut files = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SeedrError::Archive(format!("Failed to read entry {}: {}", i, e)))?;

        let out_path: PathBuf = match entry.enclosed_name() {
            Some(path) => dest.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
        files += 1;
    }

    Ok(files)
}

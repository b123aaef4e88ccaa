//! Mock Seedr client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use zip::write::SimpleFileOptions;

use crate::seedr::{AddTorrentResponse, SeedrApi, SeedrError, SeedrFolder};

/// How the mock answers an upload.
#[derive(Debug, Clone)]
pub enum MockUpload {
    /// Accept and report this transfer title.
    Accept(String),
    /// Answer 200 but refuse with this reason.
    Reject(String),
    /// Fail the request itself.
    Fail(String),
}

/// How the mock performs a folder download.
#[derive(Debug, Clone)]
pub enum MockDownload {
    /// Serve an archive of these (relative path, contents) entries.
    Files(Vec<(String, Vec<u8>)>),
    /// Like `Files`, but only after [`MockSeedrClient::release_download`].
    Gated(Vec<(String, Vec<u8>)>),
    /// Fail with this message.
    Fail(String),
    /// Never finish.
    Hang,
}

/// A recorded API call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ListFolders,
    AddMagnet(String),
    AddTorrentFile(PathBuf),
    Download { id: i64, archive: PathBuf },
}

/// Mock implementation of the SeedrApi trait.
///
/// Uploads are keyed by the magnet text or the .torrent file name.
/// Unconfigured uploads fail; unconfigured downloads serve an empty archive.
/// Archives are written synchronously, so a download never yields to the
/// runtime unless it is gated or hangs.
///
/// # Example
///
/// ```rust,ignore
/// let seedr = MockSeedrClient::new();
/// seedr.accept_upload("movie.torrent", "Movie 2024 1080p").await;
/// seedr.add_folder(7, "Movie.2024.1080p").await;
/// seedr.set_download(7, MockDownload::Files(vec![("movie.mkv".into(), b"x".to_vec())])).await;
/// ```
#[derive(Debug)]
pub struct MockSeedrClient {
    folders: Arc<RwLock<Vec<SeedrFolder>>>,
    list_error: Arc<RwLock<Option<String>>>,
    uploads: Arc<RwLock<HashMap<String, MockUpload>>>,
    downloads: Arc<RwLock<HashMap<i64, MockDownload>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    gate: Arc<Semaphore>,
}

impl Default for MockSeedrClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSeedrClient {
    pub fn new() -> Self {
        Self {
            folders: Arc::new(RwLock::new(Vec::new())),
            list_error: Arc::new(RwLock::new(None)),
            uploads: Arc::new(RwLock::new(HashMap::new())),
            downloads: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Replace the root folder listing.
    pub async fn set_folders(&self, folders: Vec<SeedrFolder>) {
        *self.folders.write().await = folders;
    }

    /// Add one folder to the root listing.
    pub async fn add_folder(&self, id: i64, name: &str) {
        self.folders.write().await.push(SeedrFolder {
            id,
            name: name.to_string(),
            size: 0,
            last_update: None,
        });
    }

    /// Make folder listing fail until cleared with `None`.
    pub async fn set_list_error(&self, error: Option<&str>) {
        *self.list_error.write().await = error.map(str::to_string);
    }

    pub async fn set_upload(&self, key: &str, upload: MockUpload) {
        self.uploads.write().await.insert(key.to_string(), upload);
    }

    pub async fn accept_upload(&self, key: &str, title: &str) {
        self.set_upload(key, MockUpload::Accept(title.to_string()))
            .await;
    }

    pub async fn reject_upload(&self, key: &str, reason: &str) {
        self.set_upload(key, MockUpload::Reject(reason.to_string()))
            .await;
    }

    pub async fn set_download(&self, id: i64, download: MockDownload) {
        self.downloads.write().await.insert(id, download);
    }

    /// Let one gated download proceed.
    pub fn release_download(&self) {
        self.gate.add_permits(1);
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of upload requests made.
    pub async fn upload_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCall::AddMagnet(_) | RecordedCall::AddTorrentFile(_)
                )
            })
            .count()
    }

    /// Folder ids downloads were requested for.
    pub async fn download_requests(&self) -> Vec<i64> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Download { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: RecordedCall) {
        self.calls.write().await.push(call);
    }

    async fn respond(&self, key: &str) -> Result<AddTorrentResponse, SeedrError> {
        let upload = self.uploads.read().await.get(key).cloned();
        match upload {
            Some(MockUpload::Accept(title)) => Ok(AddTorrentResponse {
                result: Some(serde_json::Value::Bool(true)),
                code: Some(200),
                user_torrent_id: Some(1),
                title: Some(title),
                torrent_hash: Some(format!("mockhash-{}", key.len())),
                error: None,
            }),
            Some(MockUpload::Reject(reason)) => Ok(AddTorrentResponse {
                result: Some(serde_json::Value::Bool(false)),
                code: Some(400),
                error: Some(reason),
                ..Default::default()
            }),
            Some(MockUpload::Fail(message)) => Err(SeedrError::ApiError(message)),
            None => Err(SeedrError::ApiError(format!(
                "no mock upload configured for {}",
                key
            ))),
        }
    }

    fn write_archive(archive: &Path, files: &[(String, Vec<u8>)]) -> Result<u64, SeedrError> {
        let archive_error = |e: zip::result::ZipError| SeedrError::Archive(e.to_string());

        let mut writer = zip::ZipWriter::new(File::create(archive)?);
        for (name, contents) in files {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .map_err(archive_error)?;
            writer.write_all(contents)?;
        }
        writer.finish().map_err(archive_error)?;

        Ok(std::fs::metadata(archive)?.len())
    }
}

#[async_trait]
impl SeedrApi for MockSeedrClient {
    async fn list_root_folders(&self) -> Result<Vec<SeedrFolder>, SeedrError> {
        self.record(RecordedCall::ListFolders).await;
        if let Some(error) = self.list_error.read().await.clone() {
            return Err(SeedrError::ConnectionFailed(error));
        }
        Ok(self.folders.read().await.clone())
    }

    async fn add_magnet(&self, magnet: &str) -> Result<AddTorrentResponse, SeedrError> {
        self.record(RecordedCall::AddMagnet(magnet.to_string()))
            .await;
        self.respond(magnet).await
    }

    async fn add_torrent_file(&self, path: &Path) -> Result<AddTorrentResponse, SeedrError> {
        self.record(RecordedCall::AddTorrentFile(path.to_path_buf()))
            .await;
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.respond(&key).await
    }

    async fn download_archive(&self, id: i64, archive: &Path) -> Result<u64, SeedrError> {
        self.record(RecordedCall::Download {
            id,
            archive: archive.to_path_buf(),
        })
        .await;

        let download = self.downloads.read().await.get(&id).cloned();
        match download {
            None => Self::write_archive(archive, &[]),
            Some(MockDownload::Files(files)) => Self::write_archive(archive, &files),
            Some(MockDownload::Gated(files)) => {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| SeedrError::ApiError(e.to_string()))?;
                permit.forget();
                Self::write_archive(archive, &files)
            }
            Some(MockDownload::Fail(message)) => Err(SeedrError::ConnectionFailed(message)),
            Some(MockDownload::Hang) => std::future::pending().await,
        }
    }
}

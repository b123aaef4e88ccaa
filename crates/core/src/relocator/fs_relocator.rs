//! File system relocator implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::torrent::{MediaManager, NewTorrent, TorrentType};

use super::error::RelocatorError;

/// Outcome of moving a download directory's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationResult {
    /// Destinations that now hold moved entries.
    pub moved: Vec<PathBuf>,
    /// Sources that vanished before they could be moved.
    pub skipped: Vec<PathBuf>,
    /// Sources that could not be moved, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl RelocationResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Moves and removes files on the local file system.
#[derive(Debug, Clone, Default)]
pub struct Relocator;

impl Relocator {
    pub fn new() -> Self {
        Self
    }

    /// List torrent descriptors in a blackhole directory.
    ///
    /// Only regular files ending in `.torrent` or `.magnet` are returned;
    /// everything else is ignored.
    pub async fn list_descriptors(
        &self,
        blackhole: &Path,
        media_manager: MediaManager,
    ) -> Result<Vec<NewTorrent>, RelocatorError> {
        let read_err = |error| RelocatorError::ReadDirFailed {
            path: blackhole.to_path_buf(),
            error,
        };

        let mut entries = fs::read_dir(blackhole).await.map_err(read_err)?;
        let mut descriptors = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(torrent_type) = TorrentType::from_filename(&file_name) else {
                continue;
            };
            // Follows symlinks, so a linked descriptor still counts
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }

            descriptors.push(NewTorrent {
                filename: file_name,
                media_manager,
                torrent_type,
            });
        }

        descriptors.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(descriptors)
    }

    /// Create directories (and parents); existing directories are fine.
    pub async fn ensure_dir(&self, path: &Path) -> Result<(), RelocatorError> {
        fs::create_dir_all(path)
            .await
            .map_err(|error| RelocatorError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                error,
            })
    }

    /// Move every entry of `from_dir` into `to_dir`, keeping names.
    ///
    /// Each entry is attempted independently. An entry that disappears
    /// before it is moved counts as skipped, which makes a repeated call
    /// after a partial failure pick up only what is left. A missing
    /// `from_dir` has nothing left to move.
    pub async fn relocate_all(
        &self,
        from_dir: &Path,
        to_dir: &Path,
    ) -> Result<RelocationResult, RelocatorError> {
        let mut result = RelocationResult::default();

        let mut entries = match fs::read_dir(from_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(result),
            Err(error) => {
                return Err(RelocatorError::ReadDirFailed {
                    path: from_dir.to_path_buf(),
                    error,
                })
            }
        };

        self.ensure_dir(to_dir).await?;

        let mut sources = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|error| RelocatorError::ReadDirFailed {
                    path: from_dir.to_path_buf(),
                    error,
                })?
        {
            sources.push(entry.path());
        }
        sources.sort();

        for source in sources {
            let Some(name) = source.file_name() else {
                continue;
            };
            let destination = to_dir.join(name);

            match self.move_entry(&source, &destination).await {
                Ok(true) => {
                    debug!(from = %source.display(), to = %destination.display(), "Moved");
                    result.moved.push(destination);
                }
                Ok(false) => result.skipped.push(source),
                Err(e) => {
                    warn!(error = %e, "Relocation failed");
                    let reason = match &e {
                        RelocatorError::MoveFailed { error, .. } => error.to_string(),
                        other => other.to_string(),
                    };
                    result.failed.push((source, reason));
                }
            }
        }

        Ok(result)
    }

    /// Move a file or directory, replacing an existing destination.
    ///
    /// Returns `Ok(false)` if the source no longer exists.
    pub async fn move_entry(&self, source: &Path, destination: &Path) -> Result<bool, RelocatorError> {
        match fs::symlink_metadata(source).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(error) => {
                return Err(RelocatorError::move_failed(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    error,
                ))
            }
        }

        self.remove_path(destination).await?;

        match Self::try_atomic_move(source, destination).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                // Cross-filesystem: copy then remove the source
                let from = source.to_path_buf();
                let to = destination.to_path_buf();
                tokio::task::spawn_blocking(move || copy_recursive(&from, &to))
                    .await
                    .map_err(|e| {
                        RelocatorError::move_failed(
                            source.to_path_buf(),
                            destination.to_path_buf(),
                            std::io::Error::other(e.to_string()),
                        )
                    })?
                    .map_err(|e| {
                        RelocatorError::move_failed(
                            source.to_path_buf(),
                            destination.to_path_buf(),
                            e,
                        )
                    })?;
                self.remove_path(source).await?;
                Ok(true)
            }
            Err(e) => Err(RelocatorError::move_failed(
                source.to_path_buf(),
                destination.to_path_buf(),
                e,
            )),
        }
    }

    /// Attempts to move atomically (rename). `Ok(false)` means the paths are
    /// on different file systems.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Remove a file or a directory tree. A missing path is not an error.
    pub async fn remove_path(&self, path: &Path) -> Result<(), RelocatorError> {
        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(error) => {
                return Err(RelocatorError::RemoveFailed {
                    path: path.to_path_buf(),
                    error,
                })
            }
        };

        let removed = if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match removed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(RelocatorError::RemoveFailed {
                path: path.to_path_buf(),
                error,
            }),
        }
    }
}

fn copy_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::fs::create_dir_all(destination)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &destination.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        std::fs::copy(source, destination).map(|_| ())
    }
}

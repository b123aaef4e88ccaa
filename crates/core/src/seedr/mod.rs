//! Seedr seedbox client.
//!
//! This module provides the `SeedrApi` trait the orchestrator drives, and
//! `SeedrClient`, its implementation over the Seedr REST API.

mod client;
mod types;

pub use client::{unpack_archive, unpack_download, SeedrClient};
pub use types::{AddTorrentResponse, DownloadSummary, SeedrApi, SeedrError, SeedrFolder, UploadOutcome};

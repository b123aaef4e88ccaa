//! Persistent torrent records and their lifecycle.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTorrentStore;
pub use store::{SeedrIdAssignment, TorrentError, TorrentStore, UploadedTorrent};
pub use types::{MediaManager, NewTorrent, Torrent, TorrentKey, TorrentStatus, TorrentType};

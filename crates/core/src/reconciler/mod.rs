//! Maps uploaded torrents to the Seedr folders their transfers produced.
//!
//! A folder only shows up in the Seedr root once the remote transfer has
//! finished, so a match means "ready to download".

mod index;

use std::collections::HashSet;

use tracing::debug;

use crate::seedr::SeedrFolder;
use crate::torrent::{SeedrIdAssignment, Torrent};

pub use index::{FolderIndex, FolderMatch};

/// Fuzzy matcher between local torrent names and remote folders.
#[derive(Debug, Clone)]
pub struct Reconciler {
    min_score: f32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl Reconciler {
    pub fn new(min_score: f32) -> Self {
        Self { min_score }
    }

    /// Resolve Seedr folder ids for `uploaded` torrents.
    ///
    /// Torrents are matched in the order given; each takes its single best
    /// scoring folder. Folders in `claimed` (already owned by a record) and
    /// folders taken earlier in the pass are not offered again, so one folder
    /// never ends up on two records. Torrents that already carry a
    /// `seedr_id` or have no name are skipped.
    pub fn reconcile(
        &self,
        uploaded: &[Torrent],
        folders: &[SeedrFolder],
        claimed: &HashSet<i64>,
    ) -> Vec<SeedrIdAssignment> {
        let index = FolderIndex::new(folders, self.min_score);
        let mut taken = claimed.clone();
        let mut assignments = Vec::new();

        for torrent in uploaded {
            if torrent.seedr_id.is_some() {
                continue;
            }
            let Some(name) = torrent.torrent_name.as_deref() else {
                continue;
            };

            match index.search_excluding(name, &taken) {
                Some(found) => {
                    debug!(
                        torrent = name,
                        folder = %found.folder.name,
                        seedr_id = found.folder.id,
                        score = found.score,
                        "Matched Seedr folder"
                    );
                    taken.insert(found.folder.id);
                    assignments.push(SeedrIdAssignment {
                        torrent_name: name.to_string(),
                        seedr_id: found.folder.id,
                    });
                }
                None => debug!(torrent = name, "No finished Seedr folder yet"),
            }
        }

        assignments
    }
}

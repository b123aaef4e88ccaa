//! SQLite-backed torrent store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    NewTorrent, SeedrIdAssignment, Torrent, TorrentError, TorrentKey, TorrentStatus,
    TorrentStore, UploadedTorrent,
};

const SELECT_COLUMNS: &str = "SELECT id, filename, media_manager, type, torrent_name, seedr_id, status, created_at, updated_at FROM torrents";

/// SQLite-backed torrent store.
pub struct SqliteTorrentStore {
    conn: Mutex<Connection>,
}

impl SqliteTorrentStore {
    /// Create a new SQLite torrent store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, TorrentError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite torrent store (useful for testing).
    pub fn in_memory() -> Result<Self, TorrentError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TorrentError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS torrents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                media_manager TEXT NOT NULL,
                type TEXT NOT NULL,
                torrent_name TEXT,
                seedr_id INTEGER UNIQUE,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (filename, media_manager)
            );

            CREATE INDEX IF NOT EXISTS idx_torrents_status ON torrents(status);
            CREATE INDEX IF NOT EXISTS idx_torrents_torrent_name ON torrents(torrent_name);
            "#,
        )?;
        Ok(())
    }

    fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<Torrent> {
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        // Timestamps are always written by this store as RFC3339
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Torrent {
            id: row.get(0)?,
            filename: row.get(1)?,
            media_manager: parse_column(row, 2)?,
            torrent_type: parse_column(row, 3)?,
            torrent_name: row.get(4)?,
            seedr_id: row.get(5)?,
            status: parse_column(row, 6)?,
            created_at,
            updated_at,
        })
    }

    fn query_one(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<Torrent>, TorrentError> {
        let sql = format!("{} WHERE {}", SELECT_COLUMNS, where_clause);
        let torrent = conn
            .query_row(&sql, params, Self::row_to_torrent)
            .optional()?;
        Ok(torrent)
    }

    fn query_many(
        conn: &Connection,
        where_clause: Option<&str>,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Torrent>, TorrentError> {
        let sql = match where_clause {
            Some(clause) => format!("{} WHERE {} ORDER BY id ASC", SELECT_COLUMNS, clause),
            None => format!("{} ORDER BY id ASC", SELECT_COLUMNS),
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_torrent)?;

        let mut torrents = Vec::new();
        for row_result in rows {
            torrents.push(row_result?);
        }
        Ok(torrents)
    }

    /// Validate the lifecycle edge and write the new status.
    fn transition(
        conn: &Connection,
        current: Torrent,
        status: TorrentStatus,
    ) -> Result<Torrent, TorrentError> {
        if !current.status.can_transition_to(status) {
            return Err(TorrentError::InvalidTransition {
                torrent: current.key().to_string(),
                from: current.status,
                to: status,
            });
        }

        let now = Utc::now();
        conn.execute(
            "UPDATE torrents SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), now.to_rfc3339(), current.id],
        )?;

        Ok(Torrent {
            status,
            updated_at: now,
            ..current
        })
    }
}

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

impl TorrentStore for SqliteTorrentStore {
    fn create_if_absent_many(&self, torrents: &[NewTorrent]) -> Result<usize, TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let now = Utc::now().to_rfc3339();
        let mut created = 0;
        for torrent in torrents {
            created += tx.execute(
                "INSERT INTO torrents (filename, media_manager, type, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT (filename, media_manager) DO NOTHING",
                params![
                    torrent.filename,
                    torrent.media_manager.as_str(),
                    torrent.torrent_type.as_str(),
                    TorrentStatus::New.as_str(),
                    now,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(created)
    }

    fn get(&self, key: &TorrentKey) -> Result<Option<Torrent>, TorrentError> {
        let conn = self.conn.lock().unwrap();
        Self::query_one(
            &conn,
            "filename = ? AND media_manager = ?",
            params![key.filename, key.media_manager.as_str()],
        )
    }

    fn list_all(&self) -> Result<Vec<Torrent>, TorrentError> {
        let conn = self.conn.lock().unwrap();
        Self::query_many(&conn, None, params![])
    }

    fn list_by_status(&self, status: TorrentStatus) -> Result<Vec<Torrent>, TorrentError> {
        let conn = self.conn.lock().unwrap();
        Self::query_many(&conn, Some("status = ?"), params![status.as_str()])
    }

    fn count_by_status(&self, status: TorrentStatus) -> Result<i64, TorrentError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM torrents WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn mark_uploaded(&self, uploads: &[UploadedTorrent]) -> Result<(), TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let now = Utc::now().to_rfc3339();
        for upload in uploads {
            let current = Self::query_one(
                &tx,
                "filename = ? AND media_manager = ?",
                params![upload.key.filename, upload.key.media_manager.as_str()],
            )?
            .ok_or_else(|| TorrentError::NotFound(upload.key.to_string()))?;

            if current.status != TorrentStatus::New {
                return Err(TorrentError::InvalidTransition {
                    torrent: upload.key.to_string(),
                    from: current.status,
                    to: TorrentStatus::Uploaded,
                });
            }

            tx.execute(
                "UPDATE torrents SET torrent_name = ?, status = ?, updated_at = ? WHERE id = ?",
                params![
                    upload.torrent_name,
                    TorrentStatus::Uploaded.as_str(),
                    now,
                    current.id
                ],
            )?;
        }

        // Dropping `tx` on an early return rolls the batch back
        tx.commit()?;
        Ok(())
    }

    fn assign_seedr_ids(&self, assignments: &[SeedrIdAssignment]) -> Result<usize, TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let now = Utc::now().to_rfc3339();
        let mut updated = 0;
        for assignment in assignments {
            updated += tx.execute(
                "UPDATE torrents SET seedr_id = ?, updated_at = ? WHERE id = (SELECT id FROM torrents WHERE torrent_name = ? AND seedr_id IS NULL ORDER BY id ASC LIMIT 1)",
                params![assignment.seedr_id, now, assignment.torrent_name],
            )?;
        }

        tx.commit()?;
        Ok(updated)
    }

    fn update_status_by_seedr_id(
        &self,
        seedr_id: i64,
        status: TorrentStatus,
    ) -> Result<Torrent, TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current = Self::query_one(&tx, "seedr_id = ?", params![seedr_id])?
            .ok_or_else(|| TorrentError::NotFound(format!("seedr_id {}", seedr_id)))?;
        let updated = Self::transition(&tx, current, status)?;

        tx.commit()?;
        Ok(updated)
    }

    fn update_status(
        &self,
        key: &TorrentKey,
        status: TorrentStatus,
    ) -> Result<Torrent, TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current = Self::query_one(
            &tx,
            "filename = ? AND media_manager = ?",
            params![key.filename, key.media_manager.as_str()],
        )?
        .ok_or_else(|| TorrentError::NotFound(key.to_string()))?;
        let updated = Self::transition(&tx, current, status)?;

        tx.commit()?;
        Ok(updated)
    }

    fn delete_many(&self, keys: &[TorrentKey]) -> Result<usize, TorrentError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut deleted = 0;
        for key in keys {
            deleted += tx.execute(
                "DELETE FROM torrents WHERE filename = ? AND media_manager = ?",
                params![key.filename, key.media_manager.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(deleted)
    }
}

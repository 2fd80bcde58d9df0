//! Peer directory (§4.6): a small relational store of known host/port pairs.
//!
//! Grounded on the original `node.py`'s `PeerDB` class for the schema and
//! upsert shape, rebuilt on `rusqlite` per the pack's own bundled-SQLite
//! precedent rather than the donor's RocksDB (this is a small relational
//! table, not a block graph).

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::types::peer::PeerRecord;

/// Directory of known peers.
pub trait PeerStore: Send + Sync {
    /// Inserts `(host, port)` if absent, or refreshes `last_seen` if present.
    fn upsert(&self, host: &str, port: u16) -> Result<()>;

    /// Returns every known peer.
    fn list(&self) -> Result<Vec<PeerRecord>>;

    /// Returns one peer chosen uniformly at random, or `None` if the
    /// directory is empty.
    fn sample_one(&self) -> Result<Option<PeerRecord>>;
}

/// `rusqlite`-backed [`PeerStore`], serialized by a single connection mutex
/// per §4.6/§5's "one mutex around connection acquisition."
pub struct SqlitePeerStore {
    conn: Mutex<Connection>,
}

impl SqlitePeerStore {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                last_seen TEXT,
                UNIQUE(host, port)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                last_seen TEXT,
                UNIQUE(host, port)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PeerStore for SqlitePeerStore {
    fn upsert(&self, host: &str, port: u16) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("peer db lock poisoned");
        conn.execute(
            "INSERT INTO peers (host, port, last_seen) VALUES (?1, ?2, ?3)
             ON CONFLICT(host, port) DO UPDATE SET last_seen = excluded.last_seen",
            params![host, port as i64, now],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<PeerRecord>> {
        let conn = self.conn.lock().expect("peer db lock poisoned");
        let mut stmt = conn.prepare("SELECT host, port, last_seen FROM peers")?;
        let rows = stmt.query_map([], row_to_peer)?;
        let mut peers = Vec::new();
        for row in rows {
            peers.push(row?);
        }
        Ok(peers)
    }

    fn sample_one(&self) -> Result<Option<PeerRecord>> {
        let conn = self.conn.lock().expect("peer db lock poisoned");
        conn.query_row(
            "SELECT host, port, last_seen FROM peers ORDER BY RANDOM() LIMIT 1",
            [],
            row_to_peer,
        )
        .optional()
        .map_err(Into::into)
    }
}

fn row_to_peer(row: &rusqlite::Row<'_>) -> rusqlite::Result<PeerRecord> {
    let host: String = row.get(0)?;
    let port: i64 = row.get(1)?;
    let last_seen: Option<String> = row.get(2)?;
    let last_seen = last_seen
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Ok(PeerRecord::new(host, port as u16, last_seen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_list_round_trips() {
        let store = SqlitePeerStore::open_in_memory().unwrap();
        store.upsert("10.0.0.1", 8080).unwrap();

        let peers = store.list().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].host, "10.0.0.1");
        assert_eq!(peers[0].port, 8080);
    }

    #[test]
    fn upsert_is_idempotent_on_host_port_pair() {
        let store = SqlitePeerStore::open_in_memory().unwrap();
        store.upsert("10.0.0.1", 8080).unwrap();
        store.upsert("10.0.0.1", 8080).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn sample_one_returns_none_when_empty() {
        let store = SqlitePeerStore::open_in_memory().unwrap();
        assert!(store.sample_one().unwrap().is_none());
    }

    #[test]
    fn sample_one_returns_a_known_peer_when_nonempty() {
        let store = SqlitePeerStore::open_in_memory().unwrap();
        store.upsert("10.0.0.1", 8080).unwrap();
        store.upsert("10.0.0.2", 9090).unwrap();

        let sampled = store.sample_one().unwrap().unwrap();
        assert!(sampled.port == 8080 || sampled.port == 9090);
    }
}

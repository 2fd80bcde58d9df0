//! Pending-transaction pool: a framed flat file of not-yet-sealed `xmif`
//! records (§4.3).
//!
//! Grounded on the original `mempool.py` for framing and eager-parse-on-
//! store semantics, and on the donor workspace's `storage::mem` module for
//! the in-memory-store-plus-trait idiom, generalized here to file-backed
//! persistence.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{Error, Result};
use crate::types::tx::{Xmif, parse_microformat};

/// Configuration for [`FileMempoolStore`].
#[derive(Clone, Debug)]
pub struct MempoolConfig {
    pub path: PathBuf,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db/mempool.bin"),
        }
    }
}

/// Pending-transaction queue.
pub trait MempoolStore: Send + Sync {
    /// Re-reads the backing file, replacing the in-memory view.
    fn reload(&self) -> Result<()>;

    /// Validates `xmif.mc` eagerly (exactly five pipe segments, segment 3
    /// valid `money_json`) and, if valid, appends it to the file and the
    /// in-memory list. Rejects with `BadFormat` otherwise.
    fn store(&self, xmif: Xmif) -> Result<()>;

    /// Returns a snapshot of the current in-memory queue, in file order.
    fn snapshot(&self) -> Vec<Xmif>;

    /// Empties the file and the in-memory list in one critical section,
    /// returning what was drained.
    fn drain(&self) -> Result<Vec<Xmif>>;
}

const FRAME_SEPARATOR: u8 = b'\n';

/// File-backed [`MempoolStore`] implementation.
pub struct FileMempoolStore {
    path: PathBuf,
    state: Mutex<Vec<Xmif>>,
}

impl FileMempoolStore {
    pub fn open(config: &MempoolConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        let store = Self {
            path: config.path.clone(),
            state: Mutex::new(Vec::new()),
        };
        store.reload()?;
        Ok(store)
    }

    fn read_file_bytes(path: &Path) -> Result<Vec<u8>> {
        let mut file = OpenOptions::new().read(true).open(path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl MempoolStore for FileMempoolStore {
    fn reload(&self) -> Result<()> {
        let data = Self::read_file_bytes(&self.path)?;
        let mut xmifs = Vec::new();

        for frame in data.split(|b| *b == FRAME_SEPARATOR) {
            if frame.is_empty() {
                continue;
            }
            match decode_frame(frame) {
                Ok(xmif) => xmifs.push(xmif),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt mempool frame");
                }
            }
        }

        let mut guard = self
            .state
            .lock()
            .map_err(|_| Error::Fatal("mempool lock poisoned".into()))?;
        *guard = xmifs;
        Ok(())
    }

    fn store(&self, xmif: Xmif) -> Result<()> {
        // Eagerly validate the microformat structure before persisting.
        parse_microformat(&xmif.mc)?;

        let frame = encode_frame(&xmif)?;

        let mut guard = self
            .state
            .lock()
            .map_err(|_| Error::Fatal("mempool lock poisoned".into()))?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&frame)?;
        file.write_all(&[FRAME_SEPARATOR])?;
        file.sync_all()?;

        guard.push(xmif);
        Ok(())
    }

    fn snapshot(&self) -> Vec<Xmif> {
        self.state.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn drain(&self) -> Result<Vec<Xmif>> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| Error::Fatal("mempool lock poisoned".into()))?;
        let drained = std::mem::take(&mut *guard);

        let file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        file.sync_all()?;

        Ok(drained)
    }
}

fn encode_frame(xmif: &Xmif) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(xmif)?;
    Ok(BASE64.encode(json).into_bytes())
}

fn decode_frame(frame: &[u8]) -> Result<Xmif> {
    let decoded = BASE64
        .decode(frame)
        .map_err(|e| Error::BadFormat(format!("invalid base64 mempool frame: {e}")))?;
    let xmif: Xmif = serde_json::from_slice(&decoded)?;
    Ok(xmif)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn valid_xmif(n: u32) -> Xmif {
        let mc = format!(
            "00000000000{n}|000000000002|{{\"amount\":\"10\",\"currency\":\"NGN\",\"owner\":\"000000000001\"}}|27/07/2026, 10:00:00|0.0001"
        );
        Xmif {
            mc,
            signature: vec![1, 2, 3],
        }
    }

    #[test]
    fn store_then_snapshot_round_trips() {
        let dir = tempdir().unwrap();
        let config = MempoolConfig {
            path: dir.path().join("mempool.bin"),
        };
        let store = FileMempoolStore::open(&config).unwrap();
        store.store(valid_xmif(1)).unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0], valid_xmif(1));
    }

    #[test]
    fn store_rejects_malformed_microformat() {
        let dir = tempdir().unwrap();
        let config = MempoolConfig {
            path: dir.path().join("mempool.bin"),
        };
        let store = FileMempoolStore::open(&config).unwrap();
        let bad = Xmif {
            mc: "too|few|segments".to_string(),
            signature: vec![],
        };
        let err = store.store(bad).unwrap_err();
        assert!(matches!(err, Error::BadFormat(_)));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn drain_empties_file_and_memory_together() {
        let dir = tempdir().unwrap();
        let config = MempoolConfig {
            path: dir.path().join("mempool.bin"),
        };
        let store = FileMempoolStore::open(&config).unwrap();
        store.store(valid_xmif(1)).unwrap();
        store.store(valid_xmif(2)).unwrap();

        let drained = store.drain().unwrap();
        assert_eq!(drained.len(), 2);
        assert!(store.snapshot().is_empty());

        let bytes = std::fs::read(&config.path).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn reload_recovers_state_from_disk() {
        let dir = tempdir().unwrap();
        let config = MempoolConfig {
            path: dir.path().join("mempool.bin"),
        };
        {
            let store = FileMempoolStore::open(&config).unwrap();
            store.store(valid_xmif(1)).unwrap();
        }
        let reopened = FileMempoolStore::open(&config).unwrap();
        assert_eq!(reopened.snapshot().len(), 1);
    }
}

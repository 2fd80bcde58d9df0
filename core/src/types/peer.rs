//! Peer directory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `(host, port)` peer entry with its last-seen UTC instant.
///
/// `(host, port)` is the unique key (§3); `upsert` refreshes `last_seen`
/// only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub host: String,
    pub port: u16,
    pub last_seen: DateTime<Utc>,
}

impl PeerRecord {
    pub fn new(host: impl Into<String>, port: u16, last_seen: DateTime<Utc>) -> Self {
        Self {
            host: host.into(),
            port,
            last_seen,
        }
    }
}

//! Durable storage for sealed blocks and pending transactions (§4.2, §4.3).

pub mod mempool;
pub mod store;

pub use mempool::{FileMempoolStore, MempoolConfig, MempoolStore};
pub use store::{FileLedgerStore, LedgerConfig, LedgerStore};

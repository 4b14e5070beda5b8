pub mod billing;
pub mod config;
pub mod error;
pub mod logger;
pub mod replay;
pub mod storage;
pub mod store;
pub mod tariff;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Current wall-clock time. Only the CLI boundary reads the clock; commands carry their own time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate SHA256 digest
pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// SHA256 of data as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_digest(data))
}

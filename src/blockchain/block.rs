use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{GENESIS_MESSAGE, GENESIS_PREVIOUS_HASH};

/// How many nonces are tried between two looks at the abort signal.
pub const ABORT_CHECK_INTERVAL: u64 = 1024;

/// A single block in the ledger holding one opaque message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: i64, // Unix timestamp in milliseconds (UTC)
    pub message: String,
    pub previous_hash: String,
    pub nonce: u64,   // Proof-of-Work nonce
    pub hash: String, // Cached hash of the block
}

/// Returned by [`Block::seal_until`] when the search was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("proof-of-work abandoned after {attempts} attempts")]
pub struct SealAborted {
    pub attempts: u64,
}

/// Shared flag used to abandon an in-flight proof-of-work search.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn lower(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Block {
    /// Create the genesis block (first block in the chain). Never mined.
    pub fn genesis() -> Self {
        Self::new(0, GENESIS_MESSAGE.to_string(), GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Create a new block (not mined yet). Call `seal()` to perform PoW.
    pub fn new(index: u64, message: String, previous_hash: String) -> Self {
        Self::new_with_timestamp(index, Utc::now().timestamp_millis(), message, previous_hash)
    }

    pub fn new_with_timestamp(
        index: u64,
        timestamp: i64,
        message: String,
        previous_hash: String,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            message,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Compute the SHA-256 hash of this block using its fields
    /// (excluding the `hash` field itself). The message goes into the
    /// preimage JSON-quoted so a ':' inside it cannot shift field boundaries.
    pub fn compute_hash(&self) -> String {
        let message_json = serde_json::Value::from(self.message.as_str()).to_string();
        let preimage = format!(
            "{}:{}:{}:{}:{}",
            self.index, self.timestamp, message_json, self.previous_hash, self.nonce
        );
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Perform Proof-of-Work by finding a nonce that yields a hash
    /// starting with `difficulty` leading zeros (in hex).
    pub fn seal(&mut self, difficulty: u32) {
        self.hash = self.compute_hash();
        while !meets_difficulty(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
        }
    }

    /// Same search as [`Block::seal`], but gives up once `abort` is raised.
    /// The signal is polled every [`ABORT_CHECK_INTERVAL`] attempts.
    pub fn seal_until(&mut self, difficulty: u32, abort: &AbortSignal) -> Result<(), SealAborted> {
        let mut attempts: u64 = 0;
        self.hash = self.compute_hash();
        while !meets_difficulty(&self.hash, difficulty) {
            attempts += 1;
            if attempts % ABORT_CHECK_INTERVAL == 0 && abort.is_raised() {
                return Err(SealAborted { attempts });
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
        }
        Ok(())
    }

    /// Validate that the block's cached `hash` matches its content and
    /// satisfies the PoW difficulty. (Does NOT validate chain linkage.)
    pub fn is_valid(&self, difficulty: u32) -> bool {
        self.hash == self.compute_hash() && meets_difficulty(&self.hash, difficulty)
    }
}

/// True when the first `difficulty` hex characters of `hash` are all '0'.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let needed = difficulty as usize;
    hash.len() >= needed && hash.bytes().take(needed).all(|c| c == b'0')
}

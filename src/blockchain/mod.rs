pub mod block;
pub mod model;
pub mod verify;

pub use block::{AbortSignal, Block};
pub use model::{Ledger, LedgerSnapshot, SharedLedger};
pub use verify::verify_chain;

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Difficulty ceiling (keep low in dev to avoid long waits)
pub const DIFF_MAX: u32 = 6;

/// Message carried by every genesis block.
pub const GENESIS_MESSAGE: &str = "Genesis Block";

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

use thiserror::Error;

use super::block::{Block, meets_difficulty};
use super::{GENESIS_MESSAGE, GENESIS_PREVIOUS_HASH};

/// First inconsistency found while walking a candidate chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("block 0 is not a well-formed genesis block")]
    BadGenesis,
    #[error("block at position {position} carries index {index}")]
    IndexGap { position: usize, index: u64 },
    #[error("block {position} hash does not match its contents")]
    HashMismatch { position: usize },
    #[error("block {position} does not link to its predecessor")]
    BrokenLink { position: usize },
    #[error("block {position} hash does not meet difficulty {difficulty}")]
    InsufficientWork { position: usize, difficulty: u32 },
}

/// Walk `chain` and report the first broken invariant.
///
/// The genesis is accepted as a trusted root as long as it is shaped like
/// one; its timestamp is node-local, so it is never compared across nodes.
/// Every later block must hash to its stored `hash`, link to its
/// predecessor, sit at its own index, and satisfy `difficulty`.
pub fn verify_chain(chain: &[Block], difficulty: u32) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::Empty)?;
    if genesis.index != 0
        || genesis.message != GENESIS_MESSAGE
        || genesis.previous_hash != GENESIS_PREVIOUS_HASH
        || genesis.hash != genesis.compute_hash()
    {
        return Err(ChainError::BadGenesis);
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (prev, current) = (&pair[0], &pair[1]);
        let position = position + 1;

        if current.index != position as u64 {
            return Err(ChainError::IndexGap {
                position,
                index: current.index,
            });
        }
        // Rebuild from the stored fields so a stale cached hash is caught.
        let mut replayed = Block::new_with_timestamp(
            current.index,
            current.timestamp,
            current.message.clone(),
            current.previous_hash.clone(),
        );
        replayed.nonce = current.nonce;
        if replayed.compute_hash() != current.hash {
            return Err(ChainError::HashMismatch { position });
        }
        if current.previous_hash != prev.hash {
            return Err(ChainError::BrokenLink { position });
        }
        if !meets_difficulty(&current.hash, difficulty) {
            return Err(ChainError::InsufficientWork {
                position,
                difficulty,
            });
        }
    }

    Ok(())
}

pub fn is_valid_chain(chain: &[Block], difficulty: u32) -> bool {
    verify_chain(chain, difficulty).is_ok()
}

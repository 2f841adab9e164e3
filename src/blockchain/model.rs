use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Block, verify};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("block was sealed on {got}, but the tip is now {expected}")]
    StaleTip { expected: String, got: String },
    #[error("block index {got} does not follow tip (expected {expected})")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("block hash is inconsistent or misses difficulty {difficulty}")]
    InvalidBlock { difficulty: u32 },
    #[error("refusing to install an empty chain")]
    EmptyChain,
}

/// Full ledger as served to peers: the chain plus the pending messages
/// that have been accepted but not sealed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub chain: Vec<Block>,
    pub difficulty: u32,
    #[serde(default)]
    pub pending_messages: Vec<String>,
}

/// Simple in-memory message ledger with Proof-of-Work.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    difficulty: u32,
    pending: Vec<String>,
    /// Bumped whenever `pending` is swapped for a peer's list.
    generation: u64,
}

impl Ledger {
    /// Initialize a new ledger with a genesis block.
    pub fn new(difficulty: u32) -> Self {
        Self {
            chain: vec![Self::create_genesis_block()],
            difficulty,
            pending: Vec::new(),
            generation: 0,
        }
    }

    pub fn create_genesis_block() -> Block {
        Block::genesis()
    }

    /// Return the last block in the chain.
    pub fn latest_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger should always have at least the genesis block")
    }

    /// Link `block` to the current tip, mine it and append it.
    /// Mining runs on the caller's thread.
    pub fn append_sealed_block(&mut self, mut block: Block) -> &Block {
        block.previous_hash = self.latest_block().hash.clone();
        block.seal(self.difficulty);
        self.push(block)
    }

    /// Build, mine and append a new block carrying `message`.
    pub fn create_and_append(&mut self, message: String) -> &Block {
        let mut block = self.next_block(message);
        block.seal(self.difficulty);
        self.push(block)
    }

    /// Unsealed block positioned right after the current tip.
    pub fn next_block(&self, message: String) -> Block {
        Block::new(
            self.chain.len() as u64,
            message,
            self.latest_block().hash.clone(),
        )
    }

    /// Append a block that was sealed elsewhere. The tip may have moved
    /// while it was being mined, so linkage and work are re-checked here.
    pub fn append_premined_block(&mut self, block: Block) -> Result<&Block, LedgerError> {
        let tip = self.latest_block();
        if block.previous_hash != tip.hash {
            return Err(LedgerError::StaleTip {
                expected: tip.hash.clone(),
                got: block.previous_hash,
            });
        }
        let expected = self.chain.len() as u64;
        if block.index != expected {
            return Err(LedgerError::IndexMismatch {
                expected,
                got: block.index,
            });
        }
        if !block.is_valid(self.difficulty) {
            return Err(LedgerError::InvalidBlock {
                difficulty: self.difficulty,
            });
        }
        Ok(self.push(block))
    }

    fn push(&mut self, block: Block) -> &Block {
        info!(
            "LEDGER - appended block #{} (hash={}, nonce={})",
            block.index, block.hash, block.nonce
        );
        self.chain.push(block);
        self.latest_block()
    }

    /// Validate the entire chain: linkage, hashes and PoW.
    pub fn is_chain_valid(&self) -> bool {
        verify::is_valid_chain(&self.chain, self.difficulty)
    }

    /// Swap in `new_chain` wholesale. Callers validate it first.
    pub fn replace_chain(&mut self, new_chain: Vec<Block>) -> Result<(), LedgerError> {
        if new_chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        info!(
            "LEDGER - chain replaced: {} -> {} blocks",
            self.chain.len(),
            new_chain.len()
        );
        self.chain = new_chain;
        Ok(())
    }

    /// Install a peer's chain together with its pending messages.
    pub fn replace_with(&mut self, snapshot: LedgerSnapshot) -> Result<(), LedgerError> {
        self.replace_chain(snapshot.chain)?;
        self.pending = snapshot.pending_messages;
        self.generation += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            chain: self.chain.clone(),
            difficulty: self.difficulty,
            pending_messages: self.pending.clone(),
        }
    }

    /// Returns the generation to hand back to [`Ledger::settle_pending`].
    pub fn queue_pending(&mut self, message: String) -> u64 {
        self.pending.push(message);
        self.generation
    }

    /// Drop the first pending entry equal to `message`, if any. Entries
    /// queued before the pending list was replaced are already gone, so a
    /// stale `generation` leaves the adopted list alone.
    pub fn settle_pending(&mut self, message: &str, generation: u64) {
        if generation != self.generation {
            debug!("LEDGER - pending list was replaced; not settling {message:?}");
            return;
        }
        if let Some(pos) = self.pending.iter().position(|m| m == message) {
            self.pending.remove(pos);
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }
}

/// Ledger shared between the miner, the consensus resolver and readers.
/// Every append or replacement happens under one write guard.
#[derive(Debug, Clone)]
pub struct SharedLedger(Arc<RwLock<Ledger>>);

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self(Arc::new(RwLock::new(ledger)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Ledger, LedgerError, LedgerSnapshot};
    use crate::blockchain::Block;

    fn ledger_with(blocks: usize, difficulty: u32) -> Ledger {
        let mut ledger = Ledger::new(difficulty);
        for i in 0..blocks {
            ledger.create_and_append(format!("msg-{i}"));
        }
        ledger
    }

    #[test]
    fn starts_with_genesis() {
        let ledger = Ledger::new(2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.latest_block().previous_hash, "0");
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn create_and_append_links_blocks() {
        let ledger = ledger_with(3, 1);
        let chain = ledger.chain();
        assert_eq!(chain.len(), 4);
        for i in 1..chain.len() {
            assert_eq!(chain[i].previous_hash, chain[i - 1].hash);
            assert_eq!(chain[i].index, i as u64);
        }
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn order_42_end_to_end() {
        let mut ledger = Ledger::new(2);
        let genesis_hash = ledger.latest_block().hash.clone();
        let block = ledger.create_and_append("order-42".into()).clone();
        assert!(block.hash.starts_with("00"));
        assert_eq!(block.previous_hash, genesis_hash);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn append_sealed_block_relinks_to_tip() {
        let mut ledger = ledger_with(1, 1);
        let tip = ledger.latest_block().hash.clone();
        let block = Block::new(2, "external".into(), "whatever".into());
        let appended = ledger.append_sealed_block(block);
        assert_eq!(appended.previous_hash, tip);
        assert!(appended.hash.starts_with('0'));
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn tampering_is_detected() {
        for field in ["message", "index", "previous_hash"] {
            let mut ledger = ledger_with(3, 1);
            let block = &mut ledger.chain[2];
            match field {
                "message" => block.message.push('!'),
                "index" => block.index += 10,
                _ => block.previous_hash = "0".repeat(64),
            }
            assert!(!ledger.is_chain_valid(), "tampered {field} went unnoticed");
        }
    }

    #[test]
    fn reordering_is_detected() {
        let mut ledger = ledger_with(3, 1);
        ledger.chain.swap(1, 2);
        assert!(!ledger.is_chain_valid());
    }

    #[test]
    fn premined_block_is_accepted_on_current_tip() {
        let mut ledger = Ledger::new(1);
        let mut block = ledger.next_block("off-lock".into());
        block.seal(1);
        assert!(ledger.append_premined_block(block).is_ok());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn premined_block_on_stale_tip_is_rejected() {
        let mut ledger = Ledger::new(1);
        let mut block = ledger.next_block("late".into());
        block.seal(1);
        ledger.create_and_append("winner".into());
        assert!(matches!(
            ledger.append_premined_block(block),
            Err(LedgerError::StaleTip { .. })
        ));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn premined_block_without_work_is_rejected() {
        let mut ledger = Ledger::new(1);
        let mut block = ledger.next_block("lazy".into());
        while block.hash.starts_with('0') {
            block.nonce += 1;
            block.hash = block.compute_hash();
        }
        assert_eq!(
            ledger.append_premined_block(block),
            Err(LedgerError::InvalidBlock { difficulty: 1 })
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn replace_chain_refuses_empty() {
        let mut ledger = Ledger::new(1);
        assert_eq!(ledger.replace_chain(Vec::new()), Err(LedgerError::EmptyChain));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn replace_with_swaps_chain_and_pending() {
        let mut ledger = Ledger::new(1);
        ledger.queue_pending("local".into());
        let donor = ledger_with(2, 1);
        let snapshot = LedgerSnapshot {
            pending_messages: vec!["remote".into()],
            ..donor.snapshot()
        };
        ledger.replace_with(snapshot).unwrap();
        assert_eq!(ledger.chain(), donor.chain());
        assert_eq!(ledger.pending(), ["remote".to_string()]);
    }

    #[test]
    fn settle_pending_removes_one_entry() {
        let mut ledger = Ledger::new(0);
        ledger.queue_pending("a".into());
        let generation = ledger.queue_pending("a".into());
        ledger.settle_pending("a", generation);
        ledger.settle_pending("missing", generation);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn settling_after_replacement_keeps_adopted_pending() {
        let mut ledger = Ledger::new(1);
        let generation = ledger.queue_pending("transfer".into());
        let snapshot = LedgerSnapshot {
            pending_messages: vec!["transfer".into()],
            ..ledger_with(2, 1).snapshot()
        };
        ledger.replace_with(snapshot).unwrap();

        ledger.settle_pending("transfer", generation);

        assert_eq!(ledger.pending(), ["transfer".to_string()]);
    }
}

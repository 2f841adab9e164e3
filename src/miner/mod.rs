//! Proof-of-work worker.
//!
//! All appends go through one dedicated thread, so two requests can never
//! seal against the same tip. The thread only holds the ledger lock to take
//! a snapshot of the tip and to append the result; the nonce search itself
//! runs unlocked and can be abandoned through the shared [`AbortSignal`]
//! when consensus swaps the chain underneath it.

use std::io;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::blockchain::{AbortSignal, Block, Ledger, SharedLedger};

/// How many times a job is re-targeted at a moved tip before giving up.
pub const MAX_REBASE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    #[error("miner is not running")]
    Unavailable,
    #[error("tip moved {attempts} times while mining; giving up")]
    TipKeptMoving { attempts: usize },
}

#[derive(Debug)]
enum JobKind {
    Message(String),
    Prebuilt(Block),
}

impl JobKind {
    fn message(&self) -> &str {
        match self {
            JobKind::Message(message) => message,
            JobKind::Prebuilt(block) => &block.message,
        }
    }

    /// Unsealed block targeting the ledger's current tip.
    fn template(&self, ledger: &Ledger) -> Block {
        match self {
            JobKind::Message(message) => ledger.next_block(message.clone()),
            JobKind::Prebuilt(block) => Block::new_with_timestamp(
                ledger.len() as u64,
                block.timestamp,
                block.message.clone(),
                ledger.latest_block().hash.clone(),
            ),
        }
    }
}

#[derive(Debug)]
struct MineJob {
    kind: JobKind,
    /// Ledger generation the message was queued as pending under.
    generation: u64,
    reply: oneshot::Sender<Result<Block, MineError>>,
}

/// Cheap, cloneable front door to the mining thread.
#[derive(Debug, Clone)]
pub struct MinerHandle {
    jobs: mpsc::Sender<MineJob>,
    abort: AbortSignal,
    ledger: SharedLedger,
}

impl MinerHandle {
    /// Build a block for `message` on the current tip, mine and append it.
    pub async fn create_and_append(&self, message: String) -> Result<Block, MineError> {
        self.submit(JobKind::Message(message)).await
    }

    /// Mine a block built by the caller. Its `index` and `previous_hash`
    /// are re-targeted at whatever the tip is when mining starts.
    pub async fn append_block(&self, block: Block) -> Result<Block, MineError> {
        self.submit(JobKind::Prebuilt(block)).await
    }

    /// Signal observed by the in-flight nonce search.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    async fn submit(&self, kind: JobKind) -> Result<Block, MineError> {
        let message = kind.message().to_string();
        let generation = self.ledger.write().queue_pending(message.clone());

        let (reply, done) = oneshot::channel();
        let job = MineJob {
            kind,
            generation,
            reply,
        };
        if self.jobs.send(job).is_err() {
            self.ledger.write().settle_pending(&message, generation);
            return Err(MineError::Unavailable);
        }
        done.await.map_err(|_| MineError::Unavailable)?
    }
}

pub struct Miner {
    ledger: SharedLedger,
    abort: AbortSignal,
    max_attempts: usize,
}

impl Miner {
    /// Start the mining thread. It exits once every handle is dropped.
    pub fn spawn(ledger: SharedLedger) -> io::Result<MinerHandle> {
        let (jobs, queue) = mpsc::channel();
        let abort = AbortSignal::new();
        let miner = Miner {
            ledger: ledger.clone(),
            abort: abort.clone(),
            max_attempts: MAX_REBASE_ATTEMPTS,
        };
        thread::Builder::new()
            .name("ledger-miner".into())
            .spawn(move || miner.run(queue))?;
        Ok(MinerHandle {
            jobs,
            abort,
            ledger,
        })
    }

    fn run(self, queue: mpsc::Receiver<MineJob>) {
        for job in queue {
            let result = self.mine(&job.kind, job.generation);
            if job.reply.send(result).is_err() {
                debug!("MINER - requester went away before the block was sealed");
            }
        }
        debug!("MINER - job queue closed, stopping");
    }

    fn mine(&self, kind: &JobKind, generation: u64) -> Result<Block, MineError> {
        for attempt in 1..=self.max_attempts {
            self.abort.lower();
            let (mut block, difficulty) = {
                let ledger = self.ledger.read();
                (kind.template(&ledger), ledger.difficulty())
            };
            debug!(
                "MINER - sealing block #{} on {} (difficulty={difficulty}, attempt={attempt})",
                block.index, block.previous_hash
            );

            if let Err(aborted) = block.seal_until(difficulty, &self.abort) {
                warn!("MINER - {aborted}; rebasing block #{}", block.index);
                continue;
            }

            let mut ledger = self.ledger.write();
            match ledger.append_premined_block(block) {
                Ok(sealed) => {
                    let sealed = sealed.clone();
                    ledger.settle_pending(kind.message(), generation);
                    info!("MINER - sealed block #{} (hash={})", sealed.index, sealed.hash);
                    return Ok(sealed);
                }
                Err(err) => warn!("MINER - {err}; rebasing"),
            }
        }

        self.ledger
            .write()
            .settle_pending(kind.message(), generation);
        Err(MineError::TipKeptMoving {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::{JobKind, MAX_REBASE_ATTEMPTS, MineError, Miner};
    use crate::blockchain::{AbortSignal, Block, Ledger, SharedLedger};

    #[actix_web::test]
    async fn create_and_append_seals_on_tip() {
        let ledger = SharedLedger::new(Ledger::new(2));
        let genesis = ledger.read().latest_block().hash.clone();
        let miner = Miner::spawn(ledger.clone()).unwrap();

        let block = miner.create_and_append("order-42".into()).await.unwrap();

        assert!(block.hash.starts_with("00"));
        assert_eq!(block.previous_hash, genesis);
        let ledger = ledger.read();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.pending().is_empty());
        assert!(ledger.is_chain_valid());
    }

    #[actix_web::test]
    async fn concurrent_requests_serialize() {
        let ledger = SharedLedger::new(Ledger::new(1));
        let miner = Miner::spawn(ledger.clone()).unwrap();

        let (a, b, c) = futures::join!(
            miner.create_and_append("a".into()),
            miner.create_and_append("b".into()),
            miner.create_and_append("c".into()),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let ledger = ledger.read();
        assert_eq!(ledger.len(), 4);
        assert!(ledger.is_chain_valid());
    }

    #[actix_web::test]
    async fn prebuilt_block_is_retargeted() {
        let ledger = SharedLedger::new(Ledger::new(1));
        let miner = Miner::spawn(ledger.clone()).unwrap();
        let stray = Block::new(99, "external".into(), "not-the-tip".into());

        let block = miner.append_block(stray).await.unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.message, "external");
        assert!(ledger.read().is_chain_valid());
    }

    #[test]
    fn mines_on_latest_tip() {
        let ledger = SharedLedger::new(Ledger::new(1));
        let miner = Miner {
            ledger: ledger.clone(),
            abort: AbortSignal::new(),
            max_attempts: MAX_REBASE_ATTEMPTS,
        };
        ledger.write().create_and_append("first".into());

        let block = miner.mine(&JobKind::Message("second".into()), 0).unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, ledger.read().chain()[1].hash);
    }

    #[actix_web::test]
    async fn in_flight_job_moves_onto_adopted_chain() {
        // 16 leading zeros is out of reach; only the abort ends the first search.
        let ledger = SharedLedger::new(Ledger::new(16));
        let miner = Miner::spawn(ledger.clone()).unwrap();
        let abort = miner.abort_signal();

        let mut adopted = Ledger::new(1);
        for i in 1..4 {
            adopted.create_and_append(format!("peer-{i}"));
        }
        let adopted_tip = adopted.latest_block().hash.clone();

        let swap = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            *ledger.write() = adopted;
            abort.raise();
        };
        let (block, ()) = futures::join!(miner.create_and_append("local".into()), swap);
        let block = block.unwrap();

        assert_eq!(block.index, 4);
        assert_eq!(block.previous_hash, adopted_tip);
        let ledger = ledger.read();
        assert_eq!(ledger.len(), 5);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn gives_up_when_tip_keeps_moving() {
        let ledger = SharedLedger::new(Ledger::new(16));
        let miner = Miner {
            ledger: ledger.clone(),
            abort: AbortSignal::new(),
            max_attempts: 3,
        };
        let generation = ledger.write().queue_pending("doomed".into());
        let done = AtomicBool::new(false);

        let result = thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    miner.abort.raise();
                    thread::sleep(Duration::from_millis(1));
                }
            });
            let result = miner.mine(&JobKind::Message("doomed".into()), generation);
            done.store(true, Ordering::SeqCst);
            result
        });

        assert_eq!(result, Err(MineError::TipKeptMoving { attempts: 3 }));
        let ledger = ledger.read();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.pending().is_empty());
    }
}

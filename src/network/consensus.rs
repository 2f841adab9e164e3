use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::timeout;

use super::client::{PeerClient, PeerError};
use super::peers::SharedPeers;
use crate::blockchain::{AbortSignal, Block, LedgerSnapshot, SharedLedger, verify_chain};

/// A peer that could not contribute a candidate chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerFailure {
    pub peer: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsensusOutcome {
    pub replaced: bool,
    pub chain: Vec<Block>,
    pub failures: Vec<PeerFailure>,
}

/// Longest-valid-chain reconciliation against every registered peer.
pub struct ConsensusResolver<C> {
    ledger: SharedLedger,
    peers: SharedPeers,
    abort: AbortSignal,
    client: C,
    peer_timeout: Duration,
}

impl<C: PeerClient> ConsensusResolver<C> {
    pub fn new(
        ledger: SharedLedger,
        peers: SharedPeers,
        abort: AbortSignal,
        client: C,
        peer_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            peers,
            abort,
            client,
            peer_timeout,
        }
    }

    /// Fetch every peer's ledger concurrently and adopt the longest one if
    /// it is strictly longer than ours and valid. Only the single longest
    /// candidate is considered; if it fails validation nothing changes.
    /// Never fails as a whole: unreachable peers end up in `failures`.
    pub async fn resolve(&self) -> ConsensusOutcome {
        let peers = self.peers.read().peers().to_vec();
        let local_len = self.ledger.read().len();
        debug!("CONSENSUS - querying {} peers (local length {local_len})", peers.len());

        let fetches = peers.iter().map(|peer| async move {
            let result = timeout(self.peer_timeout, self.client.fetch_ledger(peer))
                .await
                .unwrap_or_else(|_| Err(PeerError::Timeout(self.peer_timeout)));
            (peer, result)
        });

        let mut failures = Vec::new();
        let mut best: Option<(&String, LedgerSnapshot)> = None;
        for (peer, result) in join_all(fetches).await {
            match result {
                Ok(snapshot) => {
                    let longest = best.as_ref().map_or(local_len, |(_, s)| s.chain.len());
                    debug!("CONSENSUS - {peer} offers {} blocks", snapshot.chain.len());
                    if snapshot.chain.len() > longest {
                        best = Some((peer, snapshot));
                    }
                }
                Err(err) => {
                    warn!("CONSENSUS - skipping {peer}: {err}");
                    failures.push(PeerFailure {
                        peer: peer.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let Some((peer, candidate)) = best else {
            info!("CONSENSUS - no peer has a longer chain; keeping ours");
            return self.unchanged(failures);
        };

        let difficulty = self.ledger.read().difficulty();
        if let Err(err) = verify_chain(&candidate.chain, difficulty) {
            warn!("CONSENSUS - rejecting chain from {peer}: {err}");
            return self.unchanged(failures);
        }

        let mut ledger = self.ledger.write();
        // The miner may have appended while peers were being queried.
        if candidate.chain.len() <= ledger.len() {
            info!("CONSENSUS - local chain grew to {} blocks meanwhile; keeping it", ledger.len());
            return ConsensusOutcome {
                replaced: false,
                chain: ledger.chain().to_vec(),
                failures,
            };
        }
        let adopted = candidate.chain.len();
        if let Err(err) = ledger.replace_with(candidate) {
            warn!("CONSENSUS - could not install chain from {peer}: {err}");
            return ConsensusOutcome {
                replaced: false,
                chain: ledger.chain().to_vec(),
                failures,
            };
        }
        self.abort.raise();
        info!("CONSENSUS - adopted {adopted}-block chain from {peer}");

        ConsensusOutcome {
            replaced: true,
            chain: ledger.chain().to_vec(),
            failures,
        }
    }

    fn unchanged(&self, failures: Vec<PeerFailure>) -> ConsensusOutcome {
        ConsensusOutcome {
            replaced: false,
            chain: self.ledger.read().chain().to_vec(),
            failures,
        }
    }
}

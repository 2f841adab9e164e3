use std::io;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::addressbook::AddressBook;
use crate::blockchain::{Block, Ledger, SharedLedger};
use crate::config::NodeConfig;
use crate::miner::{Miner, MinerHandle};
use crate::network::{ConsensusResolver, HttpPeerClient, PeerFailure, PeerRegistry, SharedPeers};

/// Shared application state: the ledger, its peers, the mining worker and
/// the consensus resolver built on top of them.
pub struct AppState {
    pub ledger: SharedLedger,
    pub peers: SharedPeers,
    pub miner: MinerHandle,
    pub resolver: ConsensusResolver<HttpPeerClient>,
    pub address_book: Mutex<AddressBook>,
}

impl AppState {
    pub fn new(config: &NodeConfig) -> io::Result<Self> {
        let ledger = SharedLedger::new(Ledger::new(config.difficulty));

        let mut registry = PeerRegistry::new(config.node_url.as_str());
        registry.register_many(&config.bootstrap_peers);
        let peers = SharedPeers::new(registry);

        let miner = Miner::spawn(ledger.clone())?;
        let client = HttpPeerClient::new(config.peer_timeout).map_err(io::Error::other)?;
        let resolver = ConsensusResolver::new(
            ledger.clone(),
            peers.clone(),
            miner.abort_signal(),
            client,
            config.peer_timeout,
        );

        Ok(Self {
            ledger,
            peers,
            miner,
            resolver,
            address_book: Mutex::new(AddressBook::new()),
        })
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct NewBlockRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ConsensusResponse {
    pub note: &'static str,
    pub replaced: bool,
    pub chain: Vec<Block>,
    pub failures: Vec<PeerFailure>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub peers: usize,
    pub pending_messages: usize,
    pub window: usize,
    pub last_interval_ms: Option<i64>,
    pub avg_interval_ms: Option<f64>,
}

/* ---------- Message API Models ---------- */

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub secret: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub note: &'static str,
    pub encrypted_message: String,
    pub block: Block,
}

#[derive(Deserialize)]
pub struct SecretQuery {
    pub secret: String,
}

#[derive(Serialize)]
pub struct ReceiveMessageResponse {
    pub index: u64,
    pub decrypted_message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/* ---------- Peer API Models ---------- */

#[derive(Deserialize)]
pub struct RegisterPeerRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct RegisterPeersRequest {
    pub addresses: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub registered: usize,
    pub total_peers: usize,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub self_address: String,
    pub peers: Vec<String>,
}

/* ---------- Address Book Models ---------- */

#[derive(Serialize)]
pub struct AddressEntriesResponse {
    pub address: String,
    pub entries: Vec<serde_json::Value>,
}

#[derive(Serialize)]
pub struct AddressRecordResponse {
    pub address: String,
    pub count: usize,
}

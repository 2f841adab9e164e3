use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::LedgerSnapshot;

/// Path under which every node serves its full ledger.
pub const LEDGER_PATH: &str = "/api/v1/blockchain/";

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("malformed ledger payload: {0}")]
    Malformed(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Fetches a peer's whole ledger. This is the only inter-node message.
#[async_trait(?Send)]
pub trait PeerClient {
    async fn fetch_ledger(&self, peer: &str) -> Result<LedgerSnapshot, PeerError>;
}

/// `PeerClient` over plain HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl PeerClient for HttpPeerClient {
    async fn fetch_ledger(&self, peer: &str) -> Result<LedgerSnapshot, PeerError> {
        let url = format!("{peer}{LEDGER_PATH}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(PeerError::Status(resp.status().as_u16()));
        }
        resp.json::<LedgerSnapshot>()
            .await
            .map_err(|e| PeerError::Malformed(e.to_string()))
    }
}

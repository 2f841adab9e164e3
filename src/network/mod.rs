pub mod client;
pub mod consensus;
pub mod peers;

pub use client::HttpPeerClient;
pub use consensus::{ConsensusResolver, PeerFailure};
pub use peers::{PeerRegistry, SharedPeers};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};

/// Known peer addresses, excluding this node's own address.
/// Grows by explicit registration only.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_address: String,
    peers: Vec<String>,
}

impl PeerRegistry {
    pub fn new(self_address: impl Into<String>) -> Self {
        Self {
            self_address: normalize(&self_address.into()),
            peers: Vec::new(),
        }
    }

    /// Add `address` unless it is empty, our own, or already known.
    /// Returns whether the set grew.
    pub fn register(&mut self, address: &str) -> bool {
        let address = normalize(address);
        if address.is_empty() || address == self.self_address || self.contains(&address) {
            debug!("PEERS - ignoring registration of {address:?}");
            return false;
        }
        info!("PEERS - registered {address}");
        self.peers.push(address);
        true
    }

    /// Register every address; returns how many were new.
    pub fn register_many<I, S>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses
            .into_iter()
            .filter(|address| self.register(address.as_ref()))
            .count()
    }

    pub fn contains(&self, address: &str) -> bool {
        let address = normalize(address);
        self.peers.iter().any(|p| *p == address)
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// "http://a:1/" and "http://a:1" name the same node.
fn normalize(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}

#[derive(Debug, Clone)]
pub struct SharedPeers(Arc<RwLock<PeerRegistry>>);

impl SharedPeers {
    pub fn new(registry: PeerRegistry) -> Self {
        Self(Arc::new(RwLock::new(registry)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PeerRegistry> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PeerRegistry> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::PeerRegistry;

    #[test]
    fn register_is_idempotent() {
        let mut reg = PeerRegistry::new("http://localhost:3001");
        assert!(reg.register("http://localhost:3002"));
        assert!(!reg.register("http://localhost:3002"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn own_address_is_never_registered() {
        let mut reg = PeerRegistry::new("http://localhost:3001");
        assert!(!reg.register("http://localhost:3001"));
        assert!(!reg.register("http://localhost:3001/"));
        assert!(reg.is_empty());
    }

    #[test]
    fn trailing_slash_and_blank_are_normalized() {
        let mut reg = PeerRegistry::new("http://a:1");
        assert!(reg.register(" http://b:2/ "));
        assert!(!reg.register("http://b:2"));
        assert!(!reg.register("   "));
        assert_eq!(reg.peers(), ["http://b:2".to_string()]);
    }

    #[test]
    fn register_many_counts_new_entries() {
        let mut reg = PeerRegistry::new("http://a:1");
        let added = reg.register_many(["http://b:2", "http://a:1", "http://c:3", "http://b:2"]);
        assert_eq!(added, 2);
        assert_eq!(reg.peers(), ["http://b:2".to_string(), "http://c:3".to_string()]);
    }
}

/// Known peers plus this node's own address, which is never stored as a peer.
///
/// Peers are kept in registration order, which is also the order consensus
/// polls them in.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    current_node_url: String,
    network_nodes: Vec<String>,
}

impl PeerRegistry {
    pub fn new(current_node_url: impl Into<String>) -> Self {
        PeerRegistry {
            current_node_url: current_node_url.into(),
            network_nodes: Vec::new(),
        }
    }

    pub fn self_address(&self) -> &str {
        &self.current_node_url
    }

    /// Adds a peer. Returns false for self and for addresses already known.
    pub fn add(&mut self, address: &str) -> bool {
        if address == self.current_node_url || self.contains(address) {
            return false;
        }
        self.network_nodes.push(address.to_string());
        true
    }

    /// Adds every address, returning how many were new
    pub fn add_bulk<I, S>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses
            .into_iter()
            .filter(|address| self.add(address.as_ref()))
            .count()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.network_nodes.iter().any(|known| known == address)
    }

    /// Every known peer, excluding this node
    pub fn list_others(&self) -> Vec<String> {
        self.network_nodes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_skips_self_and_duplicates() {
        let mut registry = PeerRegistry::new("http://localhost:3001");

        assert!(registry.add("http://localhost:3002"));
        assert!(!registry.add("http://localhost:3002"));
        assert!(!registry.add("http://localhost:3001"));

        assert_eq!(registry.list_others(), vec!["http://localhost:3002".to_string()]);
    }

    #[test]
    fn test_add_bulk_keeps_registration_order() {
        let mut registry = PeerRegistry::new("http://localhost:3001");
        registry.add("http://localhost:3003");

        let added = registry.add_bulk([
            "http://localhost:3002",
            "http://localhost:3001",
            "http://localhost:3003",
            "http://localhost:3004",
        ]);

        assert_eq!(added, 2);
        assert_eq!(
            registry.list_others(),
            vec![
                "http://localhost:3003".to_string(),
                "http://localhost:3002".to_string(),
                "http://localhost:3004".to_string(),
            ]
        );
    }

    #[test]
    fn test_exact_string_equality() {
        let mut registry = PeerRegistry::new("http://localhost:3001");

        assert!(registry.add("http://localhost:3001/"));
        assert!(registry.contains("http://localhost:3001/"));
    }
}

use std::time::Duration;

use futures::future::join_all;
use log::warn;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::{Block, ChainSnapshot, Transaction};

/// Errors talking to a single peer
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Peer {url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Outbound calls to other nodes. Every call is best effort: failures are
/// logged and reported per peer, never propagated into the ledger.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::ClientBuild(e.to_string()))?;

        Ok(PeerClient { client })
    }

    fn endpoint(peer: &str, path: &str) -> String {
        format!(
            "{}/{}",
            peer.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post<B: Serialize + ?Sized>(&self, peer: &str, path: &str, body: &B) -> Result<(), PeerError> {
        let url = Self::endpoint(peer, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| PeerError::Transport { url: url.clone(), source })?;

        if !response.status().is_success() {
            return Err(PeerError::Status { url, status: response.status().as_u16() });
        }
        Ok(())
    }

    /// POSTs `body` to `path` on every peer concurrently; returns how many succeeded
    async fn post_all<B: Serialize + ?Sized>(&self, peers: &[String], path: &str, body: &B) -> usize {
        let results = join_all(peers.iter().map(|peer| self.post(peer, path, body))).await;

        results
            .into_iter()
            .filter(|result| match result {
                Ok(()) => true,
                Err(err) => {
                    warn!("Broadcast to {} failed: {}", path, err);
                    false
                }
            })
            .count()
    }

    pub async fn broadcast_transaction(&self, peers: &[String], transaction: &Transaction) -> usize {
        self.post_all(peers, "/transaction", transaction).await
    }

    pub async fn broadcast_block(&self, peers: &[String], block: &Block) -> usize {
        self.post_all(peers, "/receive-new-block", &serde_json::json!({ "newBlock": block }))
            .await
    }

    pub async fn broadcast_registration(&self, peers: &[String], new_node_url: &str) -> usize {
        self.post_all(peers, "/register-node", &serde_json::json!({ "newNodeUrl": new_node_url }))
            .await
    }

    pub async fn register_bulk(&self, peer: &str, all_network_nodes: &[String]) -> Result<(), PeerError> {
        self.post(
            peer,
            "/register-nodes-bulk",
            &serde_json::json!({ "allNetworkNodes": all_network_nodes }),
        )
        .await
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, PeerError> {
        let url = Self::endpoint(peer, "/blockchain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| PeerError::Transport { url: url.clone(), source })?;

        if !response.status().is_success() {
            return Err(PeerError::Status { url, status: response.status().as_u16() });
        }

        response
            .json::<ChainSnapshot>()
            .await
            .map_err(|source| PeerError::Transport { url, source })
    }

    /// Fetches every peer's chain. Results keep the order of `peers`;
    /// unreachable or malformed peers are skipped.
    pub async fn fetch_chains(&self, peers: &[String]) -> Vec<ChainSnapshot> {
        let results = join_all(peers.iter().map(|peer| self.fetch_chain(peer))).await;

        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!("Skipping peer chain: {}", err);
                    None
                }
            })
            .collect()
    }
}

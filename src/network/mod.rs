// Network module
//
// Peer bookkeeping and the HTTP client used to talk to other nodes

pub mod client;
pub mod peers;

pub use client::{PeerClient, PeerError};
pub use peers::PeerRegistry;

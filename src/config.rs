//! Node configuration, read from command-line flags with environment fallbacks.

use std::time::Duration;

use clap::Parser;

use crate::blockchain::pow::DEFAULT_DIFFICULTY_PREFIX;
use crate::blockchain::GenesisConfig;

/// Constants the ledger engine is built with. Not changeable at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub difficulty_prefix: String,
    pub genesis: GenesisConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty_prefix: DEFAULT_DIFFICULTY_PREFIX.to_string(),
            genesis: GenesisConfig::default(),
        }
    }
}

/// The transaction a node pays itself after mining a block
#[derive(Debug, Clone, PartialEq)]
pub struct RewardConfig {
    pub resource: String,
    pub amount: f64,
    pub sender: String,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            resource: "Mining reward".to_string(),
            amount: 10.0,
            sender: "00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pow-ledger", about = "Replicated proof-of-work ledger node")]
pub struct NodeConfig {
    /// Port to listen on
    #[arg(long, env = "LEDGER_PORT", default_value_t = 3001)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "LEDGER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// URL peers use to reach this node; defaults to http://localhost:<port>
    #[arg(long, env = "LEDGER_NODE_URL")]
    pub node_url: Option<String>,

    /// Hex prefix every block hash must start with
    #[arg(
        long,
        env = "LEDGER_DIFFICULTY_PREFIX",
        default_value = DEFAULT_DIFFICULTY_PREFIX,
        value_parser = parse_difficulty_prefix
    )]
    pub difficulty_prefix: String,

    /// Amount paid to this node for each mined block
    #[arg(long, env = "LEDGER_MINING_REWARD", default_value_t = 10.0)]
    pub mining_reward: f64,

    /// Timeout for each request to a peer, in seconds
    #[arg(long, env = "LEDGER_PEER_TIMEOUT_SECS", default_value_t = 5)]
    pub peer_timeout_secs: u64,
}

/// Digests are lowercase hex, so any other prefix could never be met
fn parse_difficulty_prefix(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err("difficulty prefix must not be empty".to_string());
    }
    if let Some(bad) = value.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
        return Err(format!("'{}' is not a lowercase hex digit", bad));
    }
    Ok(value.to_string())
}

impl NodeConfig {
    pub fn current_node_url(&self) -> String {
        self.node_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty_prefix: self.difficulty_prefix.clone(),
            genesis: GenesisConfig::default(),
        }
    }

    pub fn reward_config(&self) -> RewardConfig {
        RewardConfig {
            amount: self.mining_reward,
            ..RewardConfig::default()
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

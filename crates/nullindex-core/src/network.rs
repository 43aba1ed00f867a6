//! Network profiles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// A network the indexer can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    /// Height of the deepest block the backward walk indexes down to.
    pub fn depth_limit(self) -> u64 {
        match self {
            Self::Mainnet => 500_000,
            Self::Testnet => 1_000_000,
        }
    }

    /// Default JSON-RPC port of a Bitcoin Core node on this network.
    pub fn default_rpc_port(self) -> u16 {
        match self {
            Self::Mainnet => 8332,
            Self::Testnet => 18332,
        }
    }

    /// Whether `chain`, as reported by `getblockchaininfo`, is this network.
    pub fn matches_chain(self, chain: &str) -> bool {
        match self {
            Self::Mainnet => chain == "main",
            Self::Testnet => chain == "test",
        }
    }

    /// `http://127.0.0.1:<default port>`.
    pub fn default_rpc_url(self) -> String {
        format!("http://127.0.0.1:{}", self.default_rpc_port())
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Self::Mainnet),
            "testnet" | "test" | "testnet3" => Ok(Self::Testnet),
            other => Err(IndexerError::Config(format!(
                "unknown network '{other}' (expected 'mainnet' or 'testnet')"
            ))),
        }
    }
}

//! Bitcoin Core chain source.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use nullindex_core::{Block, ChainSource, IndexerError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::http::HttpTransport;
use crate::transport::RpcTransport;

/// `getblock` verbosity that includes decoded transactions with their outputs.
const VERBOSITY_FULL_TX: u8 = 2;

/// The subset of `getblockchaininfo` the indexer looks at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockchainInfo {
    /// `main`, `test`, `testnet4`, `signet` or `regtest`.
    pub chain: String,
    /// Height of the validated tip.
    pub blocks: u64,
    /// Height of the best known header.
    pub headers: u64,
    #[serde(rename = "initialblockdownload", default)]
    pub initial_block_download: bool,
}

#[derive(Deserialize)]
struct BlockHeader {
    height: u64,
}

/// [`ChainSource`] over a Bitcoin Core node's JSON-RPC interface.
pub struct BitcoindClient<T = HttpTransport> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> BitcoindClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// The node endpoint.
    pub fn url(&self) -> &str {
        self.transport.url()
    }

    /// `getblockchaininfo`.
    pub async fn blockchain_info(&self) -> Result<BlockchainInfo, IndexerError> {
        self.call("getblockchaininfo", vec![]).await
    }

    async fn call<R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R, IndexerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, method, "rpc call");
        self.transport
            .call(id, method, params)
            .await
            .map_err(|e| match e {
                TransportError::Deserialization(e) => {
                    IndexerError::Decode(format!("{method}: {e}"))
                }
                other => IndexerError::Rpc(format!("{method}: {other}")),
            })
    }
}

#[async_trait]
impl<T: RpcTransport> ChainSource for BitcoindClient<T> {
    async fn block_hash(&self, height: u64) -> Result<String, IndexerError> {
        self.call("getblockhash", vec![json!(height)]).await
    }

    async fn best_block_hash(&self) -> Result<String, IndexerError> {
        self.call("getbestblockhash", vec![]).await
    }

    async fn block(&self, hash: &str) -> Result<Block, IndexerError> {
        self.call("getblock", vec![json!(hash), json!(VERBOSITY_FULL_TX)])
            .await
    }

    async fn block_height(&self, hash: &str) -> Result<u64, IndexerError> {
        let header: BlockHeader = self.call("getblockheader", vec![json!(hash), json!(true)]).await?;
        Ok(header.height)
    }
}

//! nullindex-rpc — talking to a Bitcoin Core node over JSON-RPC.
//!
//! - [`request`]: wire types (bitcoind speaks JSON-RPC 1.0)
//! - [`transport`]: the [`RpcTransport`] trait
//! - [`http`]: reqwest transport with basic auth and retry
//! - [`bitcoind`]: [`BitcoindClient`], the `ChainSource` implementation

pub mod bitcoind;
pub mod error;
pub mod http;
pub mod policy;
pub mod request;
pub mod transport;

pub use bitcoind::{BitcoindClient, BlockchainInfo};
pub use error::TransportError;
pub use http::{HttpTransport, HttpTransportConfig};
pub use policy::{RetryConfig, RetryPolicy};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use transport::RpcTransport;

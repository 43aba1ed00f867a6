//! JSON-RPC wire types.
//!
//! Bitcoin Core accepts both 1.0 and 2.0 envelopes; 1.0 is used because it
//! is the only one older nodes understand. Responses from a 1.0 server carry
//! no `jsonrpc` field and always include both `result` and `error`, one of
//! them `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request ID: string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    /// Create a JSON-RPC 1.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "1.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// bitcoind `RPC_IN_WARMUP`: the node is still loading and will answer later.
    pub const IN_WARMUP: i64 = -28;
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub id: RpcId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Returns `true` if the node reported no error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Unwrap the result value or return the node's error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_json_rpc_1() {
        let req = JsonRpcRequest::new(7, "getblock", vec![Value::from("00ab"), Value::from(2)]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "1.0");
        assert_eq!(json["method"], "getblock");
        assert_eq!(json["params"], serde_json::json!(["00ab", 2]));
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn bitcoind_success_response() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"result":812345,"error":null,"id":1}"#).unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.jsonrpc, None);
        assert_eq!(resp.into_result().unwrap(), Value::from(812345));
    }

    #[test]
    fn bitcoind_error_response() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"result":null,"error":{"code":-8,"message":"Block height out of range"},"id":"x"}"#,
        )
        .unwrap();
        assert!(!resp.is_ok());
        assert_eq!(resp.id, RpcId::String("x".into()));
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -8);
        assert_eq!(err.to_string(), "JSON-RPC error -8: Block height out of range");
    }
}

//! HTTP JSON-RPC transport backed by `reqwest`.
//!
//! - HTTP basic auth (bitcoind `rpcuser` / `rpcpassword`)
//! - per-request timeout
//! - automatic retry with exponential backoff for transient errors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::TransportError;
use crate::policy::{RetryConfig, RetryPolicy};
use crate::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

/// Longest slice of an error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }
}

impl HttpTransportConfig {
    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// HTTP JSON-RPC transport with retry.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    username: Option<String>,
    password: Option<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpTransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            username: config.username,
            password: config.password,
            request_timeout: config.request_timeout,
        })
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut builder = self.http.post(&self.url).json(req);
        if let Some(user) = &self.username {
            builder = builder.basic_auth(user, self.password.as_ref());
        }

        let resp = builder.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_reqwest(e))?;
        parse_body(status, &body)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Turn a raw HTTP reply into a JSON-RPC response.
///
/// bitcoind reports RPC errors with a 404 or 500 status *and* a JSON body, so
/// the body is tried first regardless of status.
fn parse_body(status: StatusCode, body: &str) -> Result<JsonRpcResponse, TransportError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TransportError::Unauthorized {
            status: status.as_u16(),
        });
    }

    match serde_json::from_str::<JsonRpcResponse>(body) {
        Ok(resp) => Ok(resp),
        Err(_) if !status.is_success() => Err(TransportError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }),
        Err(e) => Err(TransportError::Deserialization(e)),
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let e = match self.send_once(&req).await {
                // Node warmup arrives as a well-formed error response.
                Ok(JsonRpcResponse { error: Some(err), .. }) if err.code == JsonRpcError::IN_WARMUP => {
                    TransportError::Rpc(err)
                }
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            if !e.is_retryable() {
                return Err(e);
            }
            match self.retry.next_delay(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        method = %req.method,
                        error = %e,
                        url = %self.url,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(
                        attempt,
                        method = %req.method,
                        error = %e,
                        url = %self.url,
                        "max retries exceeded"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_body_wins_over_status() {
        let resp = parse_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"result":null,"error":{"code":-5,"message":"Block not found"},"id":3}"#,
        )
        .unwrap();
        assert_eq!(resp.into_result().unwrap_err().code, -5);
    }

    #[test]
    fn bare_503_is_a_retryable_status() {
        let err = parse_body(StatusCode::SERVICE_UNAVAILABLE, "Work queue depth exceeded").unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejected_credentials() {
        let err = parse_body(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert!(matches!(err, TransportError::Unauthorized { status: 401 }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn garbage_with_ok_status_is_a_decode_error() {
        let err = parse_body(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, TransportError::Deserialization(_)));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(4 * MAX_ERROR_BODY);
        match parse_body(StatusCode::BAD_GATEWAY, &body).unwrap_err() {
            TransportError::Status { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_output_hides_password() {
        let transport = HttpTransport::new(
            "http://127.0.0.1:8332",
            HttpTransportConfig::default().with_credentials("alice", "hunter2"),
        )
        .unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}

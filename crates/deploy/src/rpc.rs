//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::chain::ChainError;

/// Default timeout for RPC requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Make a JSON-RPC call and deserialize the result.
///
/// An error object in the response is reported as [`ChainError::Rejected`]; failing to
/// reach the endpoint or to decode its answer is a [`ChainError::Transport`].
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, ChainError> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        let error: RpcErrorObject = serde_json::from_value(error.clone())
            .with_context(|| format!("Malformed error in {} response", method))?;
        tracing::trace!(method, code = error.code, data = ?error.data, "RPC error response");
        return Err(ChainError::Rejected {
            code: error.code,
            message: error.message,
        });
    }

    // `null` is a valid result (e.g. a receipt for a pending transaction).
    let result_value = result.get("result").cloned().unwrap_or(Value::Null);

    Ok(serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))?)
}

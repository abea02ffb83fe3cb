//! Chain client capability used by the deployer, and its JSON-RPC implementation.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes, U64, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::rpc;

/// Errors returned by a [`ChainClient`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The node answered with an error (invalid transaction, execution reverted, ...).
    #[error("rejected by node ({code}): {message}")]
    Rejected { code: i64, message: String },
    /// The node could not be reached or its answer could not be decoded.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// A call used to estimate the gas of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(rename = "data")]
    pub input: Bytes,
}

/// Receipt of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: U64,
    pub gas_used: U64,
    /// `0x1` on success, `0x0` when execution reverted.
    pub status: U64,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == U64::from(1)
    }
}

/// Access to the target chain. All operations are single requests, never retried here.
pub trait ChainClient: Send + Sync {
    /// The chain id reported by the node.
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Number of transactions sent from `address`, including pending ones.
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Current gas price in wei.
    fn gas_price(&self) -> impl Future<Output = Result<u128, ChainError>> + Send;

    /// Gas needed to execute `request`.
    fn estimate_gas(
        &self,
        request: &CallRequest,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Submit a signed transaction, returning its hash.
    fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> impl Future<Output = Result<B256, ChainError>> + Send;

    /// Receipt of `hash`, `None` while the transaction is not included.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, ChainError>> + Send;
}

/// [`ChainClient`] talking JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    client: reqwest::Client,
    url: Url,
}

impl RpcChainClient {
    /// Create a client for `url` with the default request timeout.
    pub fn new(url: Url) -> Result<Self, anyhow::Error> {
        Self::with_timeout(url, rpc::DEFAULT_TIMEOUT)
    }

    /// Create a client for `url` whose requests time out after `timeout`.
    pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: rpc::create_client(timeout)?,
            url,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, ChainError> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }
}

impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        let id: U64 = self.call("eth_chainId", vec![]).await?;
        Ok(id.to())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        let count: U64 = self
            .call("eth_getTransactionCount", vec![json!(address), json!("pending")])
            .await?;
        Ok(count.to())
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let price: U256 = self.call("eth_gasPrice", vec![]).await?;
        Ok(price.saturating_to())
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError> {
        let gas: U64 = self.call("eth_estimateGas", vec![json!(request)]).await?;
        Ok(gas.to())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, ChainError> {
        self.call("eth_sendRawTransaction", vec![json!(raw)]).await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        self.call("eth_getTransactionReceipt", vec![json!(hash)]).await
    }
}

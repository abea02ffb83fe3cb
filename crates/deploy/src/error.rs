//! Error types for configuration resolution and deployment.

use std::time::Duration;

use alloy_core::primitives::B256;

use crate::chain::ChainError;

/// Errors raised while resolving the project, compiler or network configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),
    #[error("network '{0}' has no accounts configured")]
    NoAccounts(String),
    #[error("network '{network}': account variable '{variable}' is not set or empty")]
    MissingCredential { network: String, variable: String },
    #[error("no compiler versions configured")]
    NoCompilers,
    #[error("invalid compiler version '{version}': {source}")]
    InvalidCompilerVersion {
        version: String,
        source: semver::Error,
    },
    #[error("network '{network}' expects chain id {expected}, endpoint reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Errors raised by the deployment orchestrator.
///
/// Every variant is terminal for the run.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),
    #[error("artifact not found for contract '{contract}': {reason}")]
    ArtifactNotFound { contract: String, reason: String },
    #[error("invalid constructor arguments for '{contract}': {reason}")]
    ConstructorArgument { contract: String, reason: String },
    #[error("deployment reverted{}: {reason}", fmt_tx_hash(.tx_hash))]
    DeploymentReverted {
        tx_hash: Option<B256>,
        reason: String,
    },
    /// `waited` is the time actually spent polling, request latency included.
    #[error("transaction {tx_hash} not confirmed after {waited:?}")]
    NetworkTimeout { tx_hash: B256, waited: Duration },
    #[error("chain client error: {0:#}")]
    Chain(anyhow::Error),
}

impl From<ChainError> for DeploymentError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Transport(e) => Self::Chain(e),
            rejected => Self::Chain(rejected.into()),
        }
    }
}

fn fmt_tx_hash(tx_hash: &Option<B256>) -> String {
    tx_hash
        .map(|hash| format!(" (tx {hash})"))
        .unwrap_or_default()
}

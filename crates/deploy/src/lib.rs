//! paymaster-deploy - Deployment library for the LinkPaymaster contract.
//!
//! This crate resolves the project configuration (compiler versions, networks and
//! accounts) and deploys a single contract instance to an EVM network, waiting for the
//! deployment transaction to be confirmed.

pub mod artifacts;
pub mod chain;
pub mod config;
mod deployer;
mod error;
mod factory;
pub mod report;
pub mod rpc;
pub mod signer;
pub mod transaction;

pub use artifacts::{ArtifactRegistry, ContractArtifact, HardhatArtifacts, InMemoryArtifacts};
pub use chain::{CallRequest, ChainClient, ChainError, RpcChainClient, TransactionReceipt};
pub use config::{
    CompilerConfig, ConfirmationPolicy, Credential, DeployConfig, Environment, NetworkConfig,
    ProcessEnvironment, ProjectConfig, resolve_compiler_config, resolve_network_config,
};
pub use deployer::{
    Deployer, DeploymentTarget, ENTRYPOINT_ADDRESS, PAYMASTER_CONTRACT, deploy,
};
pub use error::{ConfigurationError, DeploymentError};
pub use factory::{
    ConstructorArg, ContractFactory, DeployedContractHandle, DeploymentStatus, PendingDeployment,
};
pub use report::{DeploymentReport, OutputFormat};
pub use signer::signer_from_credential;

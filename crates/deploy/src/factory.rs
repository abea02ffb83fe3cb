//! Contract factory: binds an artifact to a signer, submits the creation transaction
//! and waits for it to be confirmed.

use std::time::Instant;

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    primitives::{Address, B256, Bytes},
};
use alloy_signer_local::PrivateKeySigner;
use backon::{ConstantBuilder, Retryable};
use serde::Serialize;

use crate::{
    ConfigurationError, DeploymentError,
    artifacts::ContractArtifact,
    chain::{CallRequest, ChainClient, ChainError, TransactionReceipt},
    config::{ConfirmationPolicy, NetworkConfig},
    transaction::{creation_transaction, sign_transaction},
};

/// A constructor argument of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArg {
    /// A fixed address.
    Address(Address),
    /// The address of the account deploying the contract.
    DeployerAddress,
    /// A value parsed according to the constructor input type (`"42"`, `"true"`, `"0x..."`).
    Literal(String),
}

/// Lifecycle of a deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Submitted, not yet included.
    Pending,
    /// Included in a block with a successful status.
    Confirmed { block_number: u64, gas_used: u64 },
}

/// Handle to a contract instance created by a deployment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedContractHandle {
    pub contract: String,
    pub address: Address,
    pub transaction_hash: B256,
    pub deployer: Address,
    #[serde(flatten)]
    pub status: DeploymentStatus,
}

impl DeployedContractHandle {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, DeploymentStatus::Confirmed { .. })
    }
}

/// A contract artifact bound to the signer that will deploy it.
#[derive(Debug)]
pub struct ContractFactory {
    artifact: ContractArtifact,
    signer: PrivateKeySigner,
}

impl ContractFactory {
    pub fn new(artifact: ContractArtifact, signer: PrivateKeySigner) -> Self {
        Self { artifact, signer }
    }

    /// Creation code followed by the ABI-encoded constructor arguments.
    ///
    /// Argument count and types are checked against the constructor inputs of the ABI.
    /// A contract without an explicit constructor takes no arguments.
    pub fn encode_deployment(&self, args: &[ConstructorArg]) -> Result<Bytes, DeploymentError> {
        let inputs = self
            .artifact
            .abi
            .constructor()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default();

        if inputs.len() != args.len() {
            let signature = inputs
                .iter()
                .map(|param| param.ty.as_str())
                .collect::<Vec<_>>()
                .join(",");
            return Err(self.argument_error(format!(
                "constructor({signature}) takes {} arguments, {} given",
                inputs.len(),
                args.len()
            )));
        }

        let values = inputs
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (param, arg))| {
                let ty: DynSolType = param.resolve().map_err(|e| {
                    self.argument_error(format!("unsupported input type '{}': {e}", param.ty))
                })?;
                let value = match arg {
                    ConstructorArg::Address(address) => DynSolValue::Address(*address),
                    ConstructorArg::DeployerAddress => DynSolValue::Address(self.signer.address()),
                    ConstructorArg::Literal(literal) => ty.coerce_str(literal).map_err(|e| {
                        self.argument_error(format!(
                            "argument {index} ('{}'): cannot parse '{literal}' as {ty}: {e}",
                            param.name
                        ))
                    })?,
                };
                if !ty.matches(&value) {
                    return Err(self.argument_error(format!(
                        "argument {index} ('{}'): expected {ty}",
                        param.name
                    )));
                }
                Ok(value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut code = self.artifact.bytecode.to_vec();
        if !values.is_empty() {
            code.extend(DynSolValue::Tuple(values).abi_encode_params());
        }
        Ok(code.into())
    }

    /// Sign and submit the creation transaction for `init_code`.
    ///
    /// The contract address is derived from the deployer and its nonce before submission.
    pub async fn submit<C: ChainClient>(
        self,
        init_code: Bytes,
        chain: &C,
        network: &NetworkConfig,
    ) -> Result<PendingDeployment, DeploymentError> {
        let deployer = self.signer.address();

        let chain_id = chain.chain_id().await?;
        if let Some(expected) = network.chain_id {
            if expected != chain_id {
                return Err(ConfigurationError::ChainIdMismatch {
                    network: network.name.clone(),
                    expected,
                    actual: chain_id,
                }
                .into());
            }
        }

        let nonce = chain.transaction_count(deployer).await?;

        let gas_price = match network.gas_price {
            Some(gas_price) => u128::from(gas_price),
            None => chain.gas_price().await?,
        };

        let gas_limit = match network.gas_limit {
            Some(gas_limit) => gas_limit,
            None => chain
                .estimate_gas(&CallRequest {
                    from: deployer,
                    to: None,
                    input: init_code.clone(),
                })
                .await
                .map_err(|e| rejected_as_revert(e, None))?,
        };

        let transaction = creation_transaction(chain_id, nonce, gas_price, gas_limit, init_code);
        let signed = sign_transaction(transaction, &self.signer)?;
        let address = deployer.create(nonce);

        tracing::debug!(
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            tx_hash = %signed.hash,
            "Submitting deployment transaction"
        );

        let transaction_hash = chain
            .send_raw_transaction(signed.raw)
            .await
            .map_err(|e| rejected_as_revert(e, Some(signed.hash)))?;

        if transaction_hash != signed.hash {
            tracing::warn!(
                expected = %signed.hash,
                reported = %transaction_hash,
                "Node reported an unexpected transaction hash"
            );
        }

        tracing::info!(
            contract = %self.artifact.contract_name,
            address = %address,
            tx_hash = %transaction_hash,
            "Deployment transaction submitted"
        );

        Ok(PendingDeployment {
            handle: DeployedContractHandle {
                contract: self.artifact.contract_name,
                address,
                transaction_hash,
                deployer,
                status: DeploymentStatus::Pending,
            },
        })
    }

    fn argument_error(&self, reason: String) -> DeploymentError {
        DeploymentError::ConstructorArgument {
            contract: self.artifact.contract_name.clone(),
            reason,
        }
    }
}

/// A submitted deployment waiting to be included.
#[derive(Debug, Clone)]
pub struct PendingDeployment {
    handle: DeployedContractHandle,
}

enum PollError {
    Pending,
    Chain(ChainError),
}

impl PendingDeployment {
    /// The handle in its pending state.
    pub fn handle(&self) -> &DeployedContractHandle {
        &self.handle
    }

    /// Poll for the receipt until it shows up or `policy` runs out.
    pub async fn wait_for_confirmation<C: ChainClient>(
        self,
        chain: &C,
        policy: ConfirmationPolicy,
    ) -> Result<DeployedContractHandle, DeploymentError> {
        let tx_hash = self.handle.transaction_hash;
        let started = Instant::now();

        let backoff = ConstantBuilder::default()
            .with_delay(policy.poll_interval)
            .with_max_times(policy.max_attempts().saturating_sub(1));

        let receipt = (|| async move {
            match chain.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => Ok(receipt),
                Ok(None) => Err(PollError::Pending),
                // The transaction is already out, an unreachable node only delays the answer.
                Err(ChainError::Transport(e)) => {
                    tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                    Err(PollError::Pending)
                }
                Err(e) => Err(PollError::Chain(e)),
            }
        })
        .retry(backoff)
        .when(|e| matches!(e, PollError::Pending))
        .notify(|_, delay| {
            tracing::trace!(tx_hash = %tx_hash, ?delay, "Transaction pending, polling again");
        })
        .await;

        match receipt {
            Ok(receipt) => self.confirm(receipt),
            Err(PollError::Pending) => Err(DeploymentError::NetworkTimeout {
                tx_hash,
                waited: started.elapsed(),
            }),
            Err(PollError::Chain(e)) => Err(e.into()),
        }
    }

    fn confirm(self, receipt: TransactionReceipt) -> Result<DeployedContractHandle, DeploymentError> {
        let mut handle = self.handle;

        if !receipt.succeeded() {
            return Err(DeploymentError::DeploymentReverted {
                tx_hash: Some(handle.transaction_hash),
                reason: format!("transaction reverted in block {}", receipt.block_number),
            });
        }

        if let Some(address) = receipt.contract_address {
            if address != handle.address {
                tracing::warn!(
                    expected = %handle.address,
                    reported = %address,
                    "Receipt reports a different contract address"
                );
                handle.address = address;
            }
        }

        handle.status = DeploymentStatus::Confirmed {
            block_number: receipt.block_number.to(),
            gas_used: receipt.gas_used.to(),
        };
        Ok(handle)
    }
}

/// A node rejecting a deployment (failed estimation or submission) means the chain refused it.
fn rejected_as_revert(err: ChainError, tx_hash: Option<B256>) -> DeploymentError {
    match err {
        ChainError::Rejected { message, .. } => DeploymentError::DeploymentReverted {
            tx_hash,
            reason: message,
        },
        other => other.into(),
    }
}

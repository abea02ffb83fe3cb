use alloy_core::primitives::{Address, address};
use alloy_signer_local::PrivateKeySigner;

use crate::{
    ArtifactRegistry, ChainClient, ConstructorArg, ContractFactory, DeployConfig,
    DeployedContractHandle, DeploymentError, signer::signer_from_credential,
};

/// The ERC-4337 `EntryPoint` (v0.6) the paymaster is bound to.
pub const ENTRYPOINT_ADDRESS: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Name of the paymaster contract artifact.
pub const PAYMASTER_CONTRACT: &str = "LinkPaymaster";

/// What to deploy: a contract name and its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub contract: String,
    pub constructor_args: Vec<ConstructorArg>,
}

impl DeploymentTarget {
    pub fn new(contract: impl Into<String>, constructor_args: Vec<ConstructorArg>) -> Self {
        Self {
            contract: contract.into(),
            constructor_args,
        }
    }

    /// `LinkPaymaster(entryPoint, owner)`, owned by the deploying account.
    pub fn link_paymaster() -> Self {
        Self::new(
            PAYMASTER_CONTRACT,
            vec![
                ConstructorArg::Address(ENTRYPOINT_ADDRESS),
                ConstructorArg::DeployerAddress,
            ],
        )
    }
}

/// Deploys a single contract instance with the resolved configuration.
///
/// Artifact lookup and chain access go through the injected `registry` and `chain`.
/// Only the receipt is polled again while the confirmation budget lasts. Any other
/// failure ends the run.
pub struct Deployer<R, C> {
    config: DeployConfig,
    registry: R,
    chain: C,
}

impl<R, C> Deployer<R, C>
where
    R: ArtifactRegistry,
    C: ChainClient,
{
    pub fn new(config: DeployConfig, registry: R, chain: C) -> Self {
        Self {
            config,
            registry,
            chain,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Deploy `target` and wait for its confirmation.
    pub async fn deploy(
        &self,
        target: &DeploymentTarget,
    ) -> Result<DeployedContractHandle, DeploymentError> {
        tracing::info!(
            contract = %target.contract,
            network = %self.config.network.name,
            "Starting deployment..."
        );

        let signer = self.select_signer()?;
        let factory = self.build_factory(&target.contract, signer)?;

        // Arguments are checked before anything is sent to the chain.
        let init_code = factory.encode_deployment(&target.constructor_args)?;

        let pending = factory
            .submit(init_code, &self.chain, &self.config.network)
            .await?;

        tracing::info!(
            address = %pending.handle().address,
            tx_hash = %pending.handle().transaction_hash,
            timeout = ?self.config.network.confirmation.timeout,
            "Waiting for confirmation..."
        );

        let handle = pending
            .wait_for_confirmation(&self.chain, self.config.network.confirmation)
            .await?;

        tracing::info!(
            contract = %handle.contract,
            address = %handle.address,
            "✓ Deployment confirmed"
        );

        Ok(handle)
    }

    /// The first account of the network signs the deployment.
    fn select_signer(&self) -> Result<PrivateKeySigner, DeploymentError> {
        let network = &self.config.network;
        let credential = network.accounts.first().ok_or_else(|| {
            DeploymentError::SignerUnavailable(format!(
                "network '{}' has no accounts",
                network.name
            ))
        })?;

        let signer = signer_from_credential(credential)?;
        tracing::info!(address = %signer.address(), "Deploying using account");
        Ok(signer)
    }

    /// Look up the artifact of `contract` and bind it to `signer`.
    fn build_factory(
        &self,
        contract: &str,
        signer: PrivateKeySigner,
    ) -> Result<ContractFactory, DeploymentError> {
        let artifact = self.registry.artifact(contract)?;

        if !artifact.is_deployable() {
            return Err(DeploymentError::ArtifactNotFound {
                contract: contract.to_string(),
                reason: "artifact has no creation bytecode (interface or abstract contract)"
                    .to_string(),
            });
        }

        if let Some(version) = &artifact.compiler_version {
            if !self.config.compilers.contains(version) {
                return Err(DeploymentError::ArtifactNotFound {
                    contract: contract.to_string(),
                    reason: format!("compiled with solc {version}, which is not a configured compiler"),
                });
            }
        }

        tracing::debug!(
            contract,
            source = %artifact.source_name,
            compiler = ?artifact.compiler_version.as_ref().map(ToString::to_string),
            "Artifact loaded"
        );

        Ok(ContractFactory::new(artifact, signer))
    }
}

/// Deploy `target` with `config`, using `registry` for artifacts and `chain` for the network.
pub async fn deploy<R, C>(
    config: DeployConfig,
    target: &DeploymentTarget,
    registry: R,
    chain: C,
) -> Result<DeployedContractHandle, DeploymentError>
where
    R: ArtifactRegistry,
    C: ChainClient,
{
    Deployer::new(config, registry, chain).deploy(target).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paymaster_target() {
        let target = DeploymentTarget::link_paymaster();
        assert_eq!(target.contract, "LinkPaymaster");
        assert_eq!(
            target.constructor_args,
            vec![
                ConstructorArg::Address(ENTRYPOINT_ADDRESS),
                ConstructorArg::DeployerAddress
            ]
        );
        assert_eq!(
            ENTRYPOINT_ADDRESS.to_string(),
            "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"
        );
    }
}

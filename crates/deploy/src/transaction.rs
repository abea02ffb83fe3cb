//! EIP-155 legacy contract creation transactions.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{B256, Bytes, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use crate::DeploymentError;

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
}

/// A legacy transaction creating a contract from `init_code`.
pub fn creation_transaction(
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    init_code: Bytes,
) -> TxLegacy {
    TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Create,
        value: U256::ZERO,
        input: init_code,
    }
}

/// Sign `tx` with `signer` and encode it for submission.
pub fn sign_transaction(
    tx: TxLegacy,
    signer: &PrivateKeySigner,
) -> Result<SignedTransaction, DeploymentError> {
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| DeploymentError::SignerUnavailable(format!("failed to sign: {e}")))?;

    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let raw = TxEnvelope::from(signed).encoded_2718();

    Ok(SignedTransaction {
        hash,
        raw: raw.into(),
    })
}

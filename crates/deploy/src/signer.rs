//! Local signers for resolved account credentials.

use std::str::FromStr;

use alloy_signer_local::PrivateKeySigner;

use crate::{DeploymentError, config::Credential};

/// Build a signer from a hex private key credential (with or without `0x` prefix).
pub fn signer_from_credential(credential: &Credential) -> Result<PrivateKeySigner, DeploymentError> {
    PrivateKeySigner::from_str(credential.expose().trim())
        .map_err(|e| DeploymentError::SignerUnavailable(format!("invalid private key: {e}")))
}

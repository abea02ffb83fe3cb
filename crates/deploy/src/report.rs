//! Operator-facing output of a finished deployment.

use anyhow::Context;
use serde::Serialize;

use crate::{DeployedContractHandle, DeploymentStatus};

/// How the result of a deployment is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Result of a deployment run, as reported to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport<'a> {
    pub network: &'a str,
    #[serde(flatten)]
    pub handle: &'a DeployedContractHandle,
}

impl<'a> DeploymentReport<'a> {
    pub fn new(network: &'a str, handle: &'a DeployedContractHandle) -> Self {
        Self { network, handle }
    }

    /// Render the report in `format`.
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize deployment report")
            }
        }
    }

    fn render_text(&self) -> String {
        let handle = self.handle;
        let mut lines = vec![
            format!("Deploying using: {}", handle.deployer),
            format!("Network: {}", self.network),
            format!("Transaction: {}", handle.transaction_hash),
        ];
        if let DeploymentStatus::Confirmed { block_number, .. } = handle.status {
            lines.push(format!("Block: {block_number}"));
        }
        lines.push(format!("{} deployed at: {}", handle.contract, handle.address));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{B256, address};
    use pretty_assertions::assert_eq;

    fn handle() -> DeployedContractHandle {
        DeployedContractHandle {
            contract: "LinkPaymaster".to_string(),
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            transaction_hash: B256::repeat_byte(0x11),
            deployer: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            status: DeploymentStatus::Confirmed {
                block_number: 1,
                gas_used: 1_000_000,
            },
        }
    }

    #[test]
    fn test_text_output() {
        let handle = handle();
        let text = DeploymentReport::new("localhost", &handle)
            .render(OutputFormat::Text)
            .unwrap();

        assert_eq!(
            text,
            format!(
                "Deploying using: 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
                 Network: localhost\n\
                 Transaction: 0x{}\n\
                 Block: 1\n\
                 LinkPaymaster deployed at: 0x5FbDB2315678afecb367f032d93F642f64180aa3",
                "11".repeat(32)
            )
        );
    }

    #[test]
    fn test_json_output() {
        let handle = handle();
        let json = DeploymentReport::new("localhost", &handle)
            .render(OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["network"], "localhost");
        assert_eq!(value["contract"], "LinkPaymaster");
        assert_eq!(value["status"], "confirmed");
        assert_eq!(
            value["address"].as_str().unwrap().to_lowercase(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "text");
    }
}

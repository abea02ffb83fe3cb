//! Compiled contract artifacts (bytecode + ABI) looked up by contract name.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use anyhow::Context;
use semver::Version;
use serde::Deserialize;

use crate::DeploymentError;

/// Name of the Hardhat directory holding compiler inputs/outputs, which is not an artifact.
const BUILD_INFO_DIR: &str = "build-info";

/// A compiled contract, as produced by the compiler for a single contract name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
    /// The compiler that produced this artifact, when known.
    pub compiler_version: Option<Version>,
}

impl ContractArtifact {
    /// Whether the artifact carries creation code. Interfaces and abstract contracts do not.
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

/// Source of compiled contract artifacts.
pub trait ArtifactRegistry {
    /// Look up the artifact compiled for contract `name`.
    fn artifact(&self, name: &str) -> Result<ContractArtifact, DeploymentError>;
}

/// Registry held in memory, keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifacts {
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl InMemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `artifact`, replacing any artifact with the same contract name.
    pub fn with_artifact(mut self, artifact: ContractArtifact) -> Self {
        self.artifacts.insert(artifact.contract_name.clone(), artifact);
        self
    }
}

impl ArtifactRegistry for InMemoryArtifacts {
    fn artifact(&self, name: &str) -> Result<ContractArtifact, DeploymentError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name, "no artifact with this name"))
    }
}

/// Hardhat artifact file (`hh-sol-artifact-1`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: Bytes,
}

/// Hardhat debug file sitting next to each artifact, pointing at its build info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatDebugFile {
    build_info: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_version: String,
}

/// Registry reading a Hardhat `artifacts/` directory.
///
/// Artifacts live at `<root>/<source path>/<Contract>.json`. The compiler version is read
/// from the build info referenced by the companion `<Contract>.dbg.json`, if present.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find every `<name>.json` artifact file under the root.
    fn find_artifact_files(&self, name: &str) -> anyhow::Result<Vec<PathBuf>> {
        let file_name = format!("{name}.json");
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read directory {}", dir.display()))?;

            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    if path.file_name().is_some_and(|n| n != BUILD_INFO_DIR) {
                        pending.push(path);
                    }
                } else if path.file_name().is_some_and(|n| n == file_name.as_str()) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn read_artifact(path: &Path) -> anyhow::Result<ContractArtifact> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let artifact: HardhatArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        let compiler_version = Self::read_compiler_version(path);

        Ok(ContractArtifact {
            contract_name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
            compiler_version,
        })
    }

    /// Compiler version from `<artifact>.dbg.json` → build info. Missing data is not an error.
    fn read_compiler_version(artifact_path: &Path) -> Option<Version> {
        let debug_path = artifact_path.with_extension("dbg.json");
        let parent = artifact_path.parent()?;

        let result = (|| -> anyhow::Result<Version> {
            let debug: HardhatDebugFile =
                serde_json::from_str(&std::fs::read_to_string(&debug_path)?)?;
            let build_info_path = parent.join(debug.build_info);
            let build_info: BuildInfo =
                serde_json::from_str(&std::fs::read_to_string(&build_info_path)?)?;
            Ok(Version::parse(&build_info.solc_version)?)
        })();

        match result {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::debug!(
                    path = %debug_path.display(),
                    error = %e,
                    "Compiler version unavailable for artifact"
                );
                None
            }
        }
    }
}

impl ArtifactRegistry for HardhatArtifacts {
    fn artifact(&self, name: &str) -> Result<ContractArtifact, DeploymentError> {
        if !self.root.is_dir() {
            return Err(not_found(
                name,
                &format!(
                    "artifacts directory {} does not exist, compile the contracts first",
                    self.root.display()
                ),
            ));
        }

        let files = self
            .find_artifact_files(name)
            .map_err(|e| not_found(name, &format!("{e:#}")))?;

        let path = match files.as_slice() {
            [] => return Err(not_found(name, "no artifact with this name")),
            [path] => path,
            _ => {
                return Err(not_found(
                    name,
                    &format!(
                        "ambiguous name, {} artifacts match: {}",
                        files.len(),
                        files
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }
        };

        tracing::debug!(contract = name, path = %path.display(), "Reading artifact");
        Self::read_artifact(path).map_err(|e| not_found(name, &format!("{e:#}")))
    }
}

fn not_found(contract: &str, reason: &str) -> DeploymentError {
    DeploymentError::ArtifactNotFound {
        contract: contract.to_string(),
        reason: reason.to_string(),
    }
}

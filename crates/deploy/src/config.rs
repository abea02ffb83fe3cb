//! Configuration resolution for compiler versions, networks and accounts.
//!
//! The static part of the configuration lives in [`ProjectConfig`], which is layered
//! from built-in defaults, an optional `Paymaster.toml` file and `PAYMASTER_`-prefixed
//! environment variables. Account secrets are never stored in the configuration itself:
//! each account entry names the environment variable holding the private key, and is
//! read through an [`Environment`] when a network is resolved. A project `.env` file can
//! provide them, see [`load_dotenv`].

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use derive_more::Deref;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigurationError;

/// The default name for the project configuration file.
pub const CONFIG_FILENAME: &str = "Paymaster.toml";

/// Prefix of the environment variables overriding [`ProjectConfig`] fields.
pub const ENV_PREFIX: &str = "PAYMASTER_";

/// Default time to wait for a deployment transaction to be included.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Default interval between two receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// A single compiler entry of the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub version: String,
}

/// Static settings of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// JSON-RPC endpoint of the network.
    pub url: Url,
    /// Names of the environment variables holding the account private keys, in order.
    pub accounts: Vec<String>,
    /// Expected chain id. Checked against the endpoint before submitting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Fixed gas price in wei. Queried from the endpoint when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    /// Fixed gas limit. Estimated by the endpoint when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl NetworkSettings {
    /// Create settings for `url` using the given account variables and default timings.
    pub fn new(url: Url, accounts: Vec<String>) -> Self {
        Self {
            url,
            accounts,
            chain_id: None,
            gas_price: None,
            gas_limit: None,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// The static project configuration: compilers and network table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Network used when none is requested explicitly.
    pub default_network: String,
    /// Compiler versions, in declaration order.
    pub compilers: Vec<CompilerSettings>,
    /// Networks by name.
    pub networks: BTreeMap<String, NetworkSettings>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let compilers = ["0.8.17", "0.4.18", "0.7.5", "0.5.0"]
            .into_iter()
            .map(|version| CompilerSettings {
                version: version.to_string(),
            })
            .collect();

        let mut networks = BTreeMap::new();
        networks.insert(
            "mumbai".to_string(),
            NetworkSettings::new(
                Url::parse("https://rpc.ankr.com/polygon_mumbai").expect("static url is valid"),
                vec!["PRIVATE_KEY".to_string()],
            ),
        );

        Self {
            default_network: "mumbai".to_string(),
            compilers,
            networks,
        }
    }
}

impl ProjectConfig {
    /// Load the configuration, layering the defaults, the TOML file at `path` (if it
    /// exists) and `PAYMASTER_*` environment variables, in that order.
    ///
    /// Nested keys are addressed with `__`, e.g. `PAYMASTER_NETWORKS__MUMBAI__URL`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Reading configuration file");
                figment = figment.merge(Toml::file(path));
            } else {
                tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
            }
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&[
                "VERBOSITY",
                "CONFIG",
                "NETWORK",
                "ARTIFACTS",
                "OUTPUT",
            ]))
            .extract()
            .map_err(Box::new)?;

        tracing::info!(
            networks = config.networks.len(),
            compilers = config.compilers.len(),
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Load the nearest `.env` file (working directory or a parent) into the process
/// environment. Variables that are already set keep their value.
///
/// Returns the path of the loaded file, if one was found.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Read access to the process environment.
pub trait Environment {
    /// The value of variable `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// [`Environment`] backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Ordered, non-empty set of compiler versions used by the project.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct CompilerConfig(Vec<Version>);

impl CompilerConfig {
    /// Whether `version` is one of the configured compilers.
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().any(|v| v == version)
    }
}

/// Resolve the compiler versions declared by `config`, preserving declaration order.
pub fn resolve_compiler_config(config: &ProjectConfig) -> Result<CompilerConfig, ConfigurationError> {
    if config.compilers.is_empty() {
        return Err(ConfigurationError::NoCompilers);
    }

    let versions = config
        .compilers
        .iter()
        .map(|compiler| {
            Version::parse(compiler.version.trim()).map_err(|source| {
                ConfigurationError::InvalidCompilerVersion {
                    version: compiler.version.clone(),
                    source,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompilerConfig(versions))
}

/// A private key read from the environment. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Bounded wait applied to the confirmation of a deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ConfirmationPolicy {
    /// Number of receipt polls fitting into the timeout, at least one.
    pub fn max_attempts(&self) -> usize {
        if self.poll_interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_millis().div_ceil(self.poll_interval.as_millis());
        usize::try_from(attempts).unwrap_or(usize::MAX).max(1)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// A fully resolved network: endpoint, credentials and submission settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub url: Url,
    pub accounts: Vec<Credential>,
    pub chain_id: Option<u64>,
    pub gas_price: Option<u64>,
    pub gas_limit: Option<u64>,
    pub confirmation: ConfirmationPolicy,
}

/// Resolve network `name`, reading its account secrets from `env`.
///
/// Fails when the network is unknown, has no accounts, or when any account
/// variable is unset or blank.
pub fn resolve_network_config(
    config: &ProjectConfig,
    name: &str,
    env: &impl Environment,
) -> Result<NetworkConfig, ConfigurationError> {
    let settings = config
        .networks
        .get(name)
        .ok_or_else(|| ConfigurationError::UnknownNetwork(name.to_string()))?;

    if settings.accounts.is_empty() {
        return Err(ConfigurationError::NoAccounts(name.to_string()));
    }

    let accounts = settings
        .accounts
        .iter()
        .map(|variable| match env.var(variable) {
            Some(secret) if !secret.trim().is_empty() => Ok(Credential::new(secret.trim())),
            _ => Err(ConfigurationError::MissingCredential {
                network: name.to_string(),
                variable: variable.clone(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NetworkConfig {
        name: name.to_string(),
        url: settings.url.clone(),
        accounts,
        chain_id: settings.chain_id,
        gas_price: settings.gas_price,
        gas_limit: settings.gas_limit,
        confirmation: ConfirmationPolicy {
            timeout: Duration::from_secs(settings.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        },
    })
}

/// Everything the orchestrator needs to know about the run, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub compilers: CompilerConfig,
    pub network: NetworkConfig,
}

impl DeployConfig {
    /// Resolve both the compiler set and network `name` from `config`.
    pub fn resolve(
        config: &ProjectConfig,
        name: &str,
        env: &impl Environment,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            compilers: resolve_compiler_config(config)?,
            network: resolve_network_config(config, name, env)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> BTreeMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compiler_config_keeps_declaration_order() {
        let compilers = resolve_compiler_config(&ProjectConfig::default()).unwrap();
        let versions: Vec<String> = compilers.iter().map(ToString::to_string).collect();
        assert_eq!(versions, ["0.8.17", "0.4.18", "0.7.5", "0.5.0"]);
    }

    #[test]
    fn test_compiler_config_rejects_empty_set() {
        let config = ProjectConfig {
            compilers: vec![],
            ..ProjectConfig::default()
        };
        assert!(matches!(
            resolve_compiler_config(&config),
            Err(ConfigurationError::NoCompilers)
        ));
    }

    #[test]
    fn test_compiler_config_rejects_invalid_version() {
        let config = ProjectConfig {
            compilers: vec![CompilerSettings {
                version: "0.8".to_string(),
            }],
            ..ProjectConfig::default()
        };
        assert!(matches!(
            resolve_compiler_config(&config),
            Err(ConfigurationError::InvalidCompilerVersion { .. })
        ));
    }

    #[test]
    fn test_network_resolution_is_idempotent() {
        let config = ProjectConfig::default();
        let env = env(&[("PRIVATE_KEY", "0x01")]);

        let first = resolve_network_config(&config, "mumbai", &env).unwrap();
        let second = resolve_network_config(&config, "mumbai", &env).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.url.as_str(), "https://rpc.ankr.com/polygon_mumbai");
        assert_eq!(first.accounts, vec![Credential::new("0x01")]);
        assert_eq!(first.confirmation, ConfirmationPolicy::default());
    }

    #[test]
    fn test_unknown_network() {
        let result = resolve_network_config(
            &ProjectConfig::default(),
            "unknown-network",
            &env(&[("PRIVATE_KEY", "0x01")]),
        );
        assert!(matches!(result, Err(ConfigurationError::UnknownNetwork(name)) if name == "unknown-network"));
    }

    #[test]
    fn test_missing_and_blank_credentials() {
        let config = ProjectConfig::default();

        let missing = resolve_network_config(&config, "mumbai", &env(&[]));
        assert!(matches!(
            missing,
            Err(ConfigurationError::MissingCredential { ref variable, .. }) if variable == "PRIVATE_KEY"
        ));

        let blank = resolve_network_config(&config, "mumbai", &env(&[("PRIVATE_KEY", "  ")]));
        assert!(matches!(blank, Err(ConfigurationError::MissingCredential { .. })));
    }

    #[test]
    fn test_one_blank_credential_among_several() {
        let mut config = ProjectConfig::default();
        config.networks.get_mut("mumbai").unwrap().accounts =
            vec!["PRIVATE_KEY".to_string(), "SECOND_KEY".to_string()];

        let result = resolve_network_config(
            &config,
            "mumbai",
            &env(&[("PRIVATE_KEY", "0x01"), ("SECOND_KEY", "")]),
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingCredential { ref variable, .. }) if variable == "SECOND_KEY"
        ));
    }

    #[test]
    fn test_network_without_accounts() {
        let mut config = ProjectConfig::default();
        config.networks.get_mut("mumbai").unwrap().accounts.clear();
        assert!(matches!(
            resolve_network_config(&config, "mumbai", &env(&[])),
            Err(ConfigurationError::NoAccounts(_))
        ));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("0xdeadbeef");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
    }

    #[test]
    fn test_env_layer_overrides_project_config() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PAYMASTER_DEFAULT_NETWORK", "polygon");
            jail.set_env("PAYMASTER_NETWORKS__MUMBAI__CHAIN_ID", "80001");
            jail.set_env("PAYMASTER_NETWORKS__MUMBAI__POLL_INTERVAL_MS", "500");
            // Command line settings share the prefix and must not reach the project config.
            jail.set_env("PAYMASTER_NETWORK", "ignored");
            jail.set_env("PAYMASTER_VERBOSITY", "debug");
            jail.set_env("PAYMASTER_OUTPUT", "json");

            let config = ProjectConfig::load(None).unwrap();

            assert_eq!(config.default_network, "polygon");
            let mumbai = &config.networks["mumbai"];
            assert_eq!(mumbai.chain_id, Some(80001));
            assert_eq!(mumbai.poll_interval_ms, 500);
            assert_eq!(mumbai.accounts, vec!["PRIVATE_KEY".to_string()]);
            assert_eq!(config.compilers, ProjectConfig::default().compilers);
            Ok(())
        });
    }

    #[test]
    fn test_env_layer_wins_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILENAME,
                r#"
                    default_network = "localhost"

                    [networks.localhost]
                    url = "http://127.0.0.1:8545"
                    accounts = ["LOCAL_KEY"]
                "#,
            )?;
            jail.set_env("PAYMASTER_NETWORKS__LOCALHOST__GAS_LIMIT", "3000000");

            let config = ProjectConfig::load(Some(Path::new(CONFIG_FILENAME))).unwrap();

            assert_eq!(config.default_network, "localhost");
            assert_eq!(config.networks["localhost"].gas_limit, Some(3_000_000));
            assert!(config.networks.contains_key("mumbai"));
            Ok(())
        });
    }

    #[test]
    fn test_dotenv_credentials_reach_network_resolution() {
        const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

        figment::Jail::expect_with(|jail| {
            jail.create_file(".env", &format!("DOTENV_DEPLOYER_KEY={KEY}\n"))?;

            let loaded = load_dotenv().expect(".env file is found");
            assert_eq!(loaded.file_name().unwrap(), ".env");

            let mut config = ProjectConfig::default();
            config.networks.insert(
                "localhost".to_string(),
                NetworkSettings::new(
                    Url::parse("http://127.0.0.1:8545").unwrap(),
                    vec!["DOTENV_DEPLOYER_KEY".to_string()],
                ),
            );

            let network = resolve_network_config(&config, "localhost", &ProcessEnvironment).unwrap();
            assert_eq!(network.accounts, vec![Credential::new(KEY)]);
            Ok(())
        });
    }

    #[test]
    fn test_confirmation_attempts() {
        let policy = ConfirmationPolicy {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
        };
        assert_eq!(policy.max_attempts(), 3);

        let policy = ConfirmationPolicy {
            timeout: Duration::ZERO,
            poll_interval: Duration::from_secs(2),
        };
        assert_eq!(policy.max_attempts(), 1);

        assert_eq!(ConfirmationPolicy::default().max_attempts(), 60);
    }
}

use clap::Parser;
use paymaster_deploy::{OutputFormat, config::CONFIG_FILENAME};
use tracing::level_filters::LevelFilter;

/// The default location of the compiled contract artifacts.
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Every argument is optional: running `paymaster` without arguments deploys the
/// paymaster to the default network of the configuration.
#[derive(Parser)]
#[command(name = "paymaster")]
#[command(
    author,
    version,
    about = "Deploy the LinkPaymaster contract and print its address"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "PAYMASTER_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the project configuration file.
    ///
    /// A missing file is not an error: the built-in defaults are used.
    #[arg(long, alias = "conf", env = "PAYMASTER_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: String,

    /// The network to deploy to. Defaults to the `default_network` of the configuration.
    #[arg(short, long, env = "PAYMASTER_NETWORK")]
    pub network: Option<String>,

    /// Path to the compiled contract artifacts.
    #[arg(long, env = "PAYMASTER_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: String,

    /// Output format of the deployment result (text or json).
    #[arg(short, long, env = "PAYMASTER_OUTPUT", default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

//! paymaster deploys the LinkPaymaster contract to an EVM network and prints its address.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use paymaster_deploy::{
    DeployConfig, Deployer, DeploymentReport, DeploymentTarget, HardhatArtifacts,
    ProcessEnvironment, ProjectConfig, RpcChainClient, config::load_dotenv,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` also feeds the `PAYMASTER_*` argument fallbacks.
    let dotenv = load_dotenv();
    let cli = Cli::parse();

    // Logs go to stderr, stdout only carries the deployment result.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let project = ProjectConfig::load(Some(Path::new(&cli.config)))
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    let network = cli
        .network
        .clone()
        .unwrap_or_else(|| project.default_network.clone());

    let config = DeployConfig::resolve(&project, &network, &ProcessEnvironment)
        .with_context(|| format!("Failed to resolve configuration for network '{network}'"))?;

    tracing::info!(
        network = %config.network.name,
        url = %config.network.url,
        compilers = ?config.compilers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Configuration resolved"
    );

    let chain = RpcChainClient::new(config.network.url.clone())?;
    let registry = HardhatArtifacts::new(&cli.artifacts);
    let deployer = Deployer::new(config, registry, chain);
    let target = DeploymentTarget::link_paymaster();

    let handle = tokio::select! {
        result = deployer.deploy(&target) => result.context("Deployment failed")?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("Deployment interrupted"),
    };

    let report = DeploymentReport::new(&network, &handle).render(cli.output)?;
    println!("{report}");

    Ok(())
}

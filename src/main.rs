mod config;
mod contracts;
mod deploy;
mod error;
mod frontend;
mod network;
mod pipeline;
mod project;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::utils::parse_ether;
use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;

use config::{AppConfig, NetworkConfig};
use contracts::{AlloyBackend, ArtifactStore, DeploymentStore};
use deploy::{Deployer, ExplorerVerifier};
use frontend::FrontendExporter;
use network::NetworkRegistry;
use pipeline::{MintAndList, PipelineRunner, listed_token};
use project::Project;

#[derive(Parser, Debug)]
#[command(name = "nftops")]
#[command(about = "Deploy and operate an NFT marketplace on Hardhat and Foundry networks")]
#[command(version)]
struct Cli {
    /// Path to the project directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Config file (defaults to <config dir>/nftops/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip project detection and force a specific project type
    #[arg(long, global = true, value_parser = ["foundry", "hardhat"])]
    project_type: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the deploy scripts matching the given tags
    Deploy {
        #[arg(long)]
        network: Option<String>,
        /// Comma separated; all scripts when omitted
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        wallet: Option<String>,
    },
    /// Mint a BasicNft, approve the marketplace and list it
    MintAndList {
        #[arg(long)]
        network: Option<String>,
        /// Listing price in ether
        #[arg(long, default_value = "0.1")]
        price: String,
        #[arg(long)]
        wallet: Option<String>,
    },
    /// List known networks and their confirmation policy
    Networks,
    /// Write deployed addresses and ABIs to the configured front ends
    Export {
        #[arg(long)]
        network: Option<String>,
    },
}

/// The network an invocation runs against
struct Target<'a> {
    name: String,
    network: &'a NetworkConfig,
    chain_id: u64,
}

fn target<'a>(
    config: &'a AppConfig,
    registry: &NetworkRegistry,
    name: Option<&str>,
) -> Result<Target<'a>> {
    let (name, network) = config
        .get_network(name)
        .ok_or_else(|| eyre::eyre!("Unknown network {:?}; add it to the config file", name))?;

    let chain_id = match network.chain_id {
        Some(id) => id,
        None => registry.resolve_by_name(name)?.chain_id,
    };

    Ok(Target {
        name: name.clone(),
        network,
        chain_id,
    })
}

/// Detect the project, unless `--project-type` forces one
fn detect_project(path: &Path, project_type: Option<&str>) -> Result<Project> {
    let project = match project_type {
        Some("foundry") => Project::new_foundry(path)?,
        Some("hardhat") => Project::new_hardhat(path)?,
        _ => project::detect(path)?,
    };
    tracing::debug!(project = %project.name, kind = %project.project_type, "Detected project");
    Ok(project)
}

/// One line per known network with its confirmation policy
fn network_lines(registry: &NetworkRegistry) -> Result<Vec<String>> {
    registry
        .profiles()
        .map(|profile| {
            let kind = if registry.is_development(profile.chain_id) {
                "development"
            } else {
                "public"
            };
            Ok(format!(
                "{:>10}  {:<12} {:<12} confirmations: {}",
                profile.chain_id,
                profile.name,
                kind,
                registry.deployment_confirmations(profile.chain_id)?
            ))
        })
        .collect()
}

async fn connect(
    config: &AppConfig,
    target: &Target<'_>,
    wallet: Option<&str>,
) -> Result<Arc<AlloyBackend>> {
    let key = config.resolve_deployer_key(wallet)?;
    let backend = AlloyBackend::connect(&target.network.rpc_url, target.chain_id, key).await?;
    Ok(Arc::new(backend))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let project_path = cli.path.canonicalize().unwrap_or(cli.path);

    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }

    let project_type = cli.project_type.as_deref();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let registry = Arc::new(NetworkRegistry::from_config(&config)?);

    match cli.command {
        Command::Deploy {
            network,
            tags,
            wallet,
        } => {
            let project = detect_project(&project_path, project_type)?;
            let target = target(&config, &registry, network.as_deref())?;
            let scripts = deploy::select(&tags)?;
            let backend = connect(&config, &target, wallet.as_deref()).await?;

            let records = DeploymentStore::new(&project, &target.name, target.chain_id);
            let mut deployer = Deployer::new(
                registry.clone(),
                target.chain_id,
                backend,
                ArtifactStore::new(&project),
            )
            .with_records(records);

            // Only touch the keychain when verification could happen
            if registry.verification_enabled(target.chain_id, true) {
                if let Some(api_key) = config.resolve_explorer_key(target.network)? {
                    deployer = deployer.with_verifier(Arc::new(ExplorerVerifier::new(
                        &project,
                        &target.name,
                        target.chain_id,
                        api_key,
                    )));
                }
            }

            for script in scripts {
                for result in script.run(&deployer).await? {
                    tracing::debug!(
                        contract = %result.contract,
                        address = %result.address,
                        tx = %result.tx_hash,
                        block = result.block_number,
                        confirmations = result.confirmations,
                        gas = result.gas_used,
                        verification = ?result.verification,
                        "Deployed"
                    );
                }
            }
        }
        Command::MintAndList {
            network,
            price,
            wallet,
        } => {
            let project = detect_project(&project_path, project_type)?;
            let target = target(&config, &registry, network.as_deref())?;
            let price = parse_ether(&price).wrap_err_with(|| format!("Invalid price: {}", price))?;

            let store = DeploymentStore::new(&project, &target.name, target.chain_id);
            let nft = store.handle("BasicNft")?;
            let marketplace = store.handle("NftMarketplace")?;

            let backend = connect(&config, &target, wallet.as_deref()).await?;
            let runner = PipelineRunner::new(registry.clone(), target.chain_id, backend);

            let outcome = MintAndList::new(nft, marketplace)
                .with_price(price)
                .run(&runner)
                .await?;
            for step in &outcome.steps {
                tracing::debug!(
                    action = %step.action,
                    tx = %step.tx_hash,
                    block = step.block_number,
                    confirmations = step.confirmations,
                    extracted = ?step.extracted,
                    "Step confirmed"
                );
            }
            if let Some(token_id) = listed_token(&outcome) {
                tracing::debug!(%token_id, steps = outcome.steps.len(), "Pipeline complete");
            }
        }
        Command::Networks => {
            for line in network_lines(&registry)? {
                println!("{}", line);
            }
        }
        Command::Export { network } => {
            let project = detect_project(&project_path, project_type)?;
            let target = target(&config, &registry, network.as_deref())?;
            let store = DeploymentStore::new(&project, &target.name, target.chain_id);
            let records = store.scan()?;

            FrontendExporter::new(&config.frontend, &project.root)
                .export(target.chain_id, &records)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nftops-main-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_networks_command_takes_no_project() {
        let cli = Cli::try_parse_from(["nftops", "/nonexistent", "networks"]).unwrap();
        assert!(matches!(cli.command, Command::Networks));

        let lines = network_lines(&NetworkRegistry::builtin()).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("localhost") && lines[0].contains("development"));
        assert!(lines[1].ends_with("confirmations: 6"));
    }

    #[test]
    fn test_detect_project_outside_project_fails() {
        let dir = scratch_dir("empty");
        assert!(detect_project(&dir, None).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_forced_project_type() {
        let dir = scratch_dir("hardhat");
        std::fs::write(dir.join("hardhat.config.js"), "module.exports = {}").unwrap();

        let project = detect_project(&dir, Some("hardhat")).unwrap();
        assert_eq!(project.out_dir, dir.join("artifacts"));
        assert!(detect_project(&dir, Some("foundry")).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}

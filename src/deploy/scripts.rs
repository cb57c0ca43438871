use super::orchestrator::{DeploymentResult, DeploymentSpec, Deployer};
use crate::error::{Error, Result};

/// A named, tagged group of deployments run together
#[derive(Debug, Clone, Copy)]
pub struct DeployScript {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub contracts: &'static [&'static str],
}

/// Every deploy script, in execution order
pub const SCRIPTS: [DeployScript; 2] = [
    DeployScript {
        name: "01-deploy-nft-marketplace",
        tags: &["all", "nftmarketplace"],
        contracts: &["NftMarketplace"],
    },
    DeployScript {
        name: "02-deploy-basic-nft",
        tags: &["all", "basicnft"],
        contracts: &["BasicNft", "BasicNftTwo"],
    },
];

impl DeployScript {
    pub fn specs(&self) -> Vec<DeploymentSpec> {
        self.contracts
            .iter()
            .map(|name| DeploymentSpec::new(name))
            .collect()
    }

    /// Run this script's deployments as one bracketed group
    pub async fn run(&self, deployer: &Deployer) -> Result<Vec<DeploymentResult>> {
        tracing::debug!(script = self.name, "Running deploy script");
        deployer.deploy_all(&self.specs()).await
    }
}

/// Scripts carrying any of `tags`, in order. No tags selects everything.
pub fn select(tags: &[String]) -> Result<Vec<&'static DeployScript>> {
    if let Some(unknown) = tags
        .iter()
        .find(|tag| !SCRIPTS.iter().any(|s| s.tags.contains(&tag.as_str())))
    {
        return Err(Error::config(format!(
            "no deploy script is tagged `{}`",
            unknown
        )));
    }

    Ok(SCRIPTS
        .iter()
        .filter(|s| tags.is_empty() || tags.iter().any(|t| s.tags.contains(&t.as_str())))
        .collect())
}

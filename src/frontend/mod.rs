use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use serde_json::{Map, Value};

use crate::config::FrontendConfig;
use crate::contracts::DeploymentRecord;

/// Copies deployed addresses and ABIs into front-end projects.
///
/// Each contracts file holds `{ "<chainId>": { "<Name>": ["<address>", ...] } }`;
/// addresses are appended so earlier deployments stay reachable.
pub struct FrontendExporter {
    contracts_files: Vec<PathBuf>,
    abi_dirs: Vec<PathBuf>,
}

impl FrontendExporter {
    /// Relative targets resolve against the project root
    pub fn new(config: &FrontendConfig, root: &Path) -> Self {
        Self {
            contracts_files: config
                .contracts_files
                .iter()
                .map(|p| root.join(p))
                .collect(),
            abi_dirs: config.abi_dirs.iter().map(|p| root.join(p)).collect(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.contracts_files.is_empty() || !self.abi_dirs.is_empty()
    }

    pub fn export(&self, chain_id: u64, deployments: &[(String, DeploymentRecord)]) -> Result<()> {
        if !self.is_configured() {
            tracing::info!("No front-end targets configured, skipping export");
            return Ok(());
        }

        tracing::info!("Updating front end...");
        for file in &self.contracts_files {
            update_mapping(file, chain_id, deployments)?;
        }
        for dir in &self.abi_dirs {
            write_abis(dir, deployments)?;
        }
        tracing::info!("Front end written!");
        Ok(())
    }
}

fn update_mapping(
    path: &Path,
    chain_id: u64,
    deployments: &[(String, DeploymentRecord)],
) -> Result<()> {
    let mut mapping = if path.exists() {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str::<Map<String, Value>>(&content)
            .wrap_err_with(|| format!("Failed to parse {:?}", path))?
    } else {
        Map::new()
    };

    let chain = mapping
        .entry(chain_id.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let chain = chain
        .as_object_mut()
        .ok_or_else(|| eyre::eyre!("{:?}: entry for chain {} is not an object", path, chain_id))?;

    for (name, record) in deployments {
        let address = Value::String(record.address.to_string());
        let addresses = chain
            .entry(name.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        let addresses = addresses
            .as_array_mut()
            .ok_or_else(|| eyre::eyre!("{:?}: addresses for {} are not a list", path, name))?;
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("Failed to create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(&mapping)?;
    fs::write(path, content).wrap_err_with(|| format!("Failed to write {:?}", path))?;

    tracing::debug!("Updated {:?}", path);
    Ok(())
}

fn write_abis(dir: &Path, deployments: &[(String, DeploymentRecord)]) -> Result<()> {
    fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {:?}", dir))?;

    for (name, record) in deployments {
        let path = dir.join(format!("{}.json", name));
        let content = serde_json::to_string_pretty(&record.abi)?;
        fs::write(&path, content).wrap_err_with(|| format!("Failed to write {:?}", path))?;
    }
    Ok(())
}

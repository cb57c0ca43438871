use std::fs;
use std::path::PathBuf;

use alloy::primitives::{Address, TxHash};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::abi::{ContractAbi, parse_abi};
use crate::error::Error;
use crate::project::Project;

const CHAIN_ID_FILE: &str = ".chainId";

/// Persisted record of a deployed contract, one file per contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub args: Vec<String>,
    pub abi: Value,
}

/// A deployed contract a pipeline can call
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub name: String,
    pub address: Address,
    pub abi: ContractAbi,
}

/// Reads and writes `deployments/<network>/<Name>.json`
pub struct DeploymentStore {
    dir: PathBuf,
    chain_id: u64,
}

impl DeploymentStore {
    pub fn new(project: &Project, network: &str, chain_id: u64) -> Self {
        Self::at(project.deployments_dir.join(network), chain_id)
    }

    pub fn at(dir: PathBuf, chain_id: u64) -> Self {
        Self { dir, chain_id }
    }

    /// Write a record, tagging the directory with its chain id
    pub fn save(&self, name: &str, record: &DeploymentRecord) -> Result<PathBuf> {
        self.check_chain_id()?;

        fs::create_dir_all(&self.dir).wrap_err_with(|| format!("Failed to create {:?}", self.dir))?;

        fs::write(self.dir.join(CHAIN_ID_FILE), self.chain_id.to_string())
            .wrap_err("Failed to write chain id marker")?;

        let path = self.dir.join(format!("{}.json", name));
        let content =
            serde_json::to_string_pretty(record).wrap_err("Failed to serialize deployment")?;
        fs::write(&path, content).wrap_err_with(|| format!("Failed to write {:?}", path))?;

        tracing::debug!("Saved deployment of {} to {:?}", name, path);
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        self.check_chain_id()?;

        let path = self.dir.join(format!("{}.json", name));
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
        let record = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse {:?}", path))?;
        Ok(Some(record))
    }

    /// Resolve a previously deployed contract by name
    pub fn handle(&self, name: &str) -> crate::error::Result<ContractHandle> {
        let record = self
            .load(name)
            .map_err(|e| Error::config(format!("{:#}", e)))?
            .ok_or_else(|| {
                Error::config(format!(
                    "{} has not been deployed to {:?}; run `deploy` first",
                    name, self.dir
                ))
            })?;

        let abi = parse_abi(&record.abi)
            .map_err(|e| Error::config(format!("invalid stored ABI for {}: {}", name, e)))?;

        Ok(ContractHandle {
            name: name.to_string(),
            address: record.address,
            abi,
        })
    }

    /// All records in this network's directory, sorted by name
    pub fn scan(&self) -> Result<Vec<(String, DeploymentRecord)>> {
        if !self.dir.exists() {
            tracing::info!("Deployments directory does not exist: {:?}", self.dir);
            return Ok(Vec::new());
        }
        self.check_chain_id()?;

        let entries =
            fs::read_dir(&self.dir).wrap_err_with(|| format!("Failed to read {:?}", self.dir))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match self.load(name) {
                Ok(Some(record)) => records.push((name.to_string(), record)),
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to parse {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::info!("Found {} deployments", records.len());
        Ok(records)
    }

    /// Records from a reset or different chain must not be reused
    fn check_chain_id(&self) -> Result<()> {
        let marker = self.dir.join(CHAIN_ID_FILE);
        if !marker.exists() {
            return Ok(());
        }

        let stored = fs::read_to_string(&marker)
            .wrap_err_with(|| format!("Failed to read {:?}", marker))?;

        match stored.trim().parse::<u64>() {
            Ok(id) if id == self.chain_id => Ok(()),
            Ok(id) => Err(eyre::eyre!(
                "{:?} holds deployments for chain {}, not {}",
                self.dir,
                id,
                self.chain_id
            )),
            Err(_) => Err(eyre::eyre!("Malformed chain id marker in {:?}", self.dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nftops-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn record() -> DeploymentRecord {
        DeploymentRecord {
            address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            transaction_hash: TxHash::repeat_byte(0x71),
            block_number: Some(1),
            confirmations: 1,
            args: vec![],
            abi: json!([{"type": "function", "name": "listItem", "stateMutability": "nonpayable",
                         "inputs": [{"name": "nftAddress", "type": "address"}], "outputs": []}]),
        }
    }

    #[test]
    fn test_save_then_resolve_handle() {
        let dir = temp_dir("handle");
        let store = DeploymentStore::at(dir.clone(), 31337);

        store.save("NftMarketplace", &record()).unwrap();
        let handle = store.handle("NftMarketplace").unwrap();
        assert_eq!(handle.address, record().address);
        assert!(handle.abi.function("listItem", 1).is_some());

        assert_eq!(store.scan().unwrap().len(), 1);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_deployment_is_configuration_error() {
        let store = DeploymentStore::at(temp_dir("missing"), 31337);
        let err = store.handle("BasicNft").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_chain_id_mismatch_rejected() {
        let dir = temp_dir("mismatch");
        DeploymentStore::at(dir.clone(), 31337)
            .save("BasicNft", &record())
            .unwrap();

        let other = DeploymentStore::at(dir.clone(), 11155111);
        assert!(other.load("BasicNft").is_err());
        fs::remove_dir_all(dir).unwrap();
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use alloy::primitives::Bytes;
use serde_json::Value;

use super::abi::{ContractAbi, parse_abi};
use crate::error::{Error, Result};
use crate::project::Project;

/// Compiled contract: ABI plus creation bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: ContractAbi,
    pub abi_json: Value,
    pub bytecode: Bytes,
}

/// Finds compiled artifacts in the project's output directory
pub struct ArtifactStore {
    out_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, ContractArtifact>>,
}

impl ArtifactStore {
    pub fn new(project: &Project) -> Self {
        Self {
            out_dir: Some(project.out_dir.clone()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Store that only serves artifacts added with [`ArtifactStore::insert`]
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            out_dir: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, artifact: ContractArtifact) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(artifact.name.clone(), artifact);
        }
    }

    /// Load an artifact by contract name
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact> {
        if let Some(artifact) = self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(contract_name).cloned())
        {
            return Ok(artifact);
        }

        let out_dir = self
            .out_dir
            .as_ref()
            .ok_or_else(|| Error::config(format!("no artifact available for {}", contract_name)))?;

        let path = find_artifact(out_dir, contract_name)?.ok_or_else(|| {
            Error::config(format!(
                "artifact for {} not found under {:?}; compile the project first",
                contract_name, out_dir
            ))
        })?;

        tracing::debug!("Loading artifact {:?}", path);
        let artifact = read_artifact(&path, contract_name)?;
        self.insert(artifact.clone());
        Ok(artifact)
    }
}

/// Walk the output directory for `<Name>.sol/<Name>.json`
fn find_artifact(dir: &Path, contract_name: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| Error::config(format!("Failed to read {:?}: {}", dir, e)))?;

    let file_name = format!("{}.json", contract_name);

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == "build-info") {
                continue;
            }
            if let Some(found) = find_artifact(&path, contract_name)? {
                return Ok(Some(found));
            }
        } else if path.file_name().is_some_and(|n| n == file_name.as_str())
            && path
                .parent()
                .and_then(|p| p.extension())
                .is_some_and(|ext| ext == "sol")
        {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn read_artifact(path: &Path, contract_name: &str) -> Result<ContractArtifact> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read {:?}: {}", path, e)))?;

    let json: Value = serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {:?}: {}", path, e)))?;

    parse_artifact(contract_name, &json)
}

/// Accepts both Hardhat (`bytecode: "0x.."`) and Foundry (`bytecode.object`) layouts
pub fn parse_artifact(contract_name: &str, json: &Value) -> Result<ContractArtifact> {
    let abi_json = json
        .get("abi")
        .cloned()
        .ok_or_else(|| Error::config(format!("artifact for {} has no ABI", contract_name)))?;

    let abi = parse_abi(&abi_json)
        .map_err(|e| Error::config(format!("invalid ABI for {}: {}", contract_name, e)))?;

    let bytecode_hex = match json.get("bytecode") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Object(obj)) => obj.get("object").and_then(|o| o.as_str()).unwrap_or(""),
        _ => "",
    };

    let clean = bytecode_hex.strip_prefix("0x").unwrap_or(bytecode_hex);
    if clean.is_empty() {
        return Err(Error::config(format!(
            "artifact for {} has no creation bytecode (abstract contract or interface?)",
            contract_name
        )));
    }

    let bytecode = hex::decode(clean)
        .map_err(|e| Error::config(format!("invalid bytecode for {}: {}", contract_name, e)))?;

    Ok(ContractArtifact {
        name: contract_name.to_string(),
        abi,
        abi_json,
        bytecode: bytecode.into(),
    })
}

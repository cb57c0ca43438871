use std::sync::Arc;

use alloy::primitives::{Address, TxHash};

use super::verify::{VerificationOutcome, VerificationRequest, Verifier};
use crate::contracts::{
    ArtifactStore, ContractBackend, DeploymentRecord, DeploymentStore, encode_constructor_args,
    encode_deploy_data,
};
use crate::error::{Error, Result};
use crate::network::{ChainParams, NetworkRegistry};

/// Constructor arguments with this prefix are read from the network's chain parameters
const PARAM_PREFIX: &str = "param:";

const MARKER: &str = "----------------------------------------------------";

/// One contract to deploy
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub contract: String,
    pub args: Vec<String>,
}

impl DeploymentSpec {
    pub fn new(contract: &str) -> Self {
        Self {
            contract: contract.to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Development network or no explorer credential
    Skipped,
    Verified,
    AlreadyVerified,
    /// Logged and otherwise ignored
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub contract: String,
    pub address: Address,
    pub tx_hash: TxHash,
    pub confirmations: u64,
    pub block_number: u64,
    pub gas_used: u64,
    pub verification: VerificationStatus,
}

/// Deploys contracts to a single network and optionally verifies them
pub struct Deployer {
    registry: Arc<NetworkRegistry>,
    chain_id: u64,
    backend: Arc<dyn ContractBackend>,
    artifacts: ArtifactStore,
    records: Option<DeploymentStore>,
    verifier: Option<Arc<dyn Verifier>>,
}

impl Deployer {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        chain_id: u64,
        backend: Arc<dyn ContractBackend>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            registry,
            chain_id,
            backend,
            artifacts,
            records: None,
            verifier: None,
        }
    }

    /// Persist a record of every successful deployment
    pub fn with_records(mut self, records: DeploymentStore) -> Self {
        self.records = Some(records);
        self
    }

    /// Only consulted on non-development networks
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Deploy every spec in order, stopping at the first fatal error
    pub async fn deploy_all(&self, specs: &[DeploymentSpec]) -> Result<Vec<DeploymentResult>> {
        tracing::info!("{}", MARKER);

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            results.push(self.deploy(&spec.contract, &spec.args).await?);
        }

        tracing::info!("{}", MARKER);
        Ok(results)
    }

    /// Deploy one contract, wait for its confirmation depth, then record and verify it
    pub async fn deploy(&self, contract: &str, args: &[String]) -> Result<DeploymentResult> {
        let profile = self.registry.resolve(self.chain_id)?;
        let confirmations = self.registry.deployment_confirmations(self.chain_id)?;
        let policy = self.registry.confirmation_policy(self.chain_id, confirmations)?;

        let artifact = self.artifacts.load(contract)?;
        let args = resolve_args(args, &profile.params)?;
        let encoded_args = encode_constructor_args(artifact.abi.constructor_inputs(), &args)?;
        let code = encode_deploy_data(&artifact.bytecode, &encoded_args);

        let action = format!("deploy {}", contract);
        let tx_hash = self
            .backend
            .deploy(code)
            .await
            .map_err(|e| e.for_action(&action))?;

        tracing::info!("deploying \"{}\" (tx: {})...", contract, tx_hash);

        let receipt = self.backend.wait_for_receipt(tx_hash, policy).await?;
        if !receipt.success {
            return Err(Error::rejected(action, "deployment transaction reverted"));
        }
        let address = receipt
            .contract_address
            .ok_or_else(|| Error::rejected(&action, "receipt carries no contract address"))?;

        tracing::info!(
            "deploying \"{}\" (tx: {})...: deployed at {} with {} gas",
            contract,
            tx_hash,
            address,
            receipt.gas_used
        );

        if let Some(records) = &self.records {
            let record = DeploymentRecord {
                address,
                transaction_hash: tx_hash,
                block_number: Some(receipt.block_number),
                confirmations: policy.confirmations,
                args: args.clone(),
                abi: artifact.abi_json.clone(),
            };
            if let Err(e) = records.save(contract, &record) {
                tracing::warn!(contract = %contract, "Failed to save deployment record: {:#}", e);
            }
        }

        let request = VerificationRequest {
            contract: contract.to_string(),
            address,
            constructor_args: args,
            encoded_args,
        };
        let verification = self.verify(&request).await;

        Ok(DeploymentResult {
            contract: contract.to_string(),
            address,
            tx_hash,
            confirmations: policy.confirmations,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            verification,
        })
    }

    async fn verify(&self, request: &VerificationRequest) -> VerificationStatus {
        let enabled = self
            .registry
            .verification_enabled(self.chain_id, self.verifier.is_some());
        let verifier = match &self.verifier {
            Some(v) if enabled => v,
            _ => {
                tracing::debug!(contract = %request.contract, "Skipping verification");
                return VerificationStatus::Skipped;
            }
        };

        match verifier.verify(request).await {
            Ok(VerificationOutcome::Verified) => VerificationStatus::Verified,
            Ok(VerificationOutcome::AlreadyVerified) => {
                tracing::info!(contract = %request.contract, "Already verified!");
                VerificationStatus::AlreadyVerified
            }
            Err(e) => {
                tracing::warn!(contract = %request.contract, "{}", e);
                VerificationStatus::Failed(e.to_string())
            }
        }
    }
}

/// Substitute `param:<name>` arguments with the network's chain parameters
fn resolve_args(args: &[String], params: &ChainParams) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| match arg.strip_prefix(PARAM_PREFIX) {
            Some(name) => params.require(name),
            None => Ok(arg.clone()),
        })
        .collect()
}

use std::time::{Duration, Instant};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256, Bytes, TxHash, U256},
    providers::{
        DynProvider, PendingTransactionConfig, PendingTransactionError, Provider,
        ProviderBuilder, WatchTxError,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::network::ConfirmationPolicy;

/// A log emitted during a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Confirmed outcome of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

/// The remote side of every deployment and pipeline step.
///
/// Submissions return as soon as the network accepted the transaction; the
/// caller decides how deep it must be buried via [`ContractBackend::wait_for_receipt`].
#[async_trait]
pub trait ContractBackend: Send + Sync {
    /// Submit a contract creation transaction
    async fn deploy(&self, code: Bytes) -> Result<TxHash>;

    /// Submit a state-mutating call
    async fn send(&self, to: Address, calldata: Bytes, value: Option<U256>) -> Result<TxHash>;

    /// Block until the transaction has the required confirmations
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        policy: ConfirmationPolicy,
    ) -> Result<Receipt>;
}

/// Sends transactions through an Alloy provider with a local signer
pub struct AlloyBackend {
    provider: DynProvider,
    chain_id: u64,
}

impl AlloyBackend {
    /// Connect to the RPC endpoint, signing with the given private key
    pub async fn connect(
        rpc_url: &str,
        chain_id: u64,
        private_key: Zeroizing<String>,
    ) -> Result<Self> {
        let key_str = private_key.as_str().trim();
        let clean_key = key_str.strip_prefix("0x").unwrap_or(key_str);

        let signer: PrivateKeySigner = clean_key
            .parse()
            .map_err(|e| Error::config(format!("Failed to parse private key: {}", e)))?;

        tracing::info!(deployer = %signer.address(), chain_id, "Using signer");

        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await
            .map_err(|e| Error::Network(format!("Failed to connect to RPC: {}", e)))?;

        let remote_chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| Error::Network(format!("Failed to query chain id: {}", e)))?;

        if remote_chain_id != chain_id {
            return Err(Error::config(format!(
                "RPC endpoint reports chain {} but network is configured as {}",
                remote_chain_id, chain_id
            )));
        }

        Ok(Self {
            provider: provider.erased(),
            chain_id,
        })
    }

    async fn submit(&self, action: &str, tx: TransactionRequest) -> Result<TxHash> {
        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_submit_error(action, &e.to_string()))?;

        let tx_hash = *pending_tx.tx_hash();
        tracing::debug!(%tx_hash, chain_id = self.chain_id, "Transaction submitted");
        Ok(tx_hash)
    }
}

#[async_trait]
impl ContractBackend for AlloyBackend {
    async fn deploy(&self, code: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::default().with_deploy_code(code);
        self.submit("deploy", tx).await
    }

    async fn send(&self, to: Address, calldata: Bytes, value: Option<U256>) -> Result<TxHash> {
        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);

        if let Some(v) = value {
            tx = tx.with_value(v);
        }

        self.submit("call", tx).await
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        policy: ConfirmationPolicy,
    ) -> Result<Receipt> {
        tracing::info!(
            %tx_hash,
            confirmations = policy.confirmations,
            timeout_secs = policy.timeout.as_secs(),
            "Waiting for confirmations"
        );

        let started = Instant::now();
        let config = PendingTransactionConfig::new(tx_hash)
            .with_required_confirmations(policy.confirmations)
            .with_timeout(Some(policy.timeout));

        let pending_tx = self
            .provider
            .watch_pending_transaction(config)
            .await
            .map_err(|e| classify_wait_error(e, tx_hash, &policy, started.elapsed()))?;

        pending_tx
            .await
            .map_err(|e| classify_wait_error(e, tx_hash, &policy, started.elapsed()))?;

        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| Error::Network(format!("Failed to get receipt: {}", e)))?
            .ok_or_else(|| unconfirmed(tx_hash, &policy, started.elapsed()))?;

        Ok(convert_receipt(&receipt))
    }
}

fn unconfirmed(tx_hash: TxHash, policy: &ConfirmationPolicy, waited: Duration) -> Error {
    Error::Unconfirmed {
        tx_hash,
        confirmations: policy.confirmations,
        waited,
    }
}

/// A watcher timeout means the required depth was never reached
fn classify_wait_error(
    err: PendingTransactionError,
    tx_hash: TxHash,
    policy: &ConfirmationPolicy,
    waited: Duration,
) -> Error {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            unconfirmed(tx_hash, policy, waited)
        }
        other => Error::Network(format!("Failed to confirm transaction: {}", other)),
    }
}

fn convert_receipt(receipt: &TransactionReceipt) -> Receipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| LogEntry {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
        .collect();

    Receipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        success: receipt.status(),
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
        logs,
    }
}

/// Reverts surface at gas estimation time, before anything is broadcast
fn classify_submit_error(action: &str, message: &str) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("revert") || lower.contains("execution reverted") {
        Error::rejected(action, message)
    } else {
        Error::Network(format!("Failed to send transaction: {}", message))
    }
}


#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;

    fn policy() -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirmations: 6,
            timeout: Duration::from_secs(372),
        }
    }

    fn rpc_receipt(status: &str) -> TransactionReceipt {
        let hash = format!("0x{}", "ab".repeat(32));
        serde_json::from_value(json!({
            "transactionHash": hash,
            "transactionIndex": "0x0",
            "blockHash": format!("0x{}", "cd".repeat(32)),
            "blockNumber": "0x2a",
            "from": "0x9a53bfba35269414f3b2d20b52ca01b15932c7b2",
            "to": null,
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "gasUsed": "0x5208",
            "cumulativeGasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "type": "0x2",
            "status": status,
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "logs": [{
                "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                "topics": [format!("0x{}", "11".repeat(32))],
                "data": "0x01",
                "blockNumber": "0x2a",
                "transactionHash": hash,
                "transactionIndex": "0x0",
                "logIndex": "0x0",
                "removed": false
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_classify_revert_as_rejection() {
        let err = classify_submit_error(
            "listItem",
            "server returned an error response: error code 3: execution reverted: AlreadyListed",
        );
        assert!(matches!(err, Error::TransactionRejected { .. }));
    }

    #[test]
    fn test_classify_transport_failure() {
        let err = classify_submit_error("deploy", "error sending request: connection refused");
        assert!(matches!(err, Error::Network(_)));
    }

    #[test]
    fn test_watcher_timeout_is_unconfirmed() {
        let tx_hash = TxHash::repeat_byte(7);
        let err = classify_wait_error(
            PendingTransactionError::TxWatcher(WatchTxError::Timeout),
            tx_hash,
            &policy(),
            Duration::from_secs(400),
        );

        match err {
            Error::Unconfirmed {
                tx_hash: hash,
                confirmations,
                waited,
            } => {
                assert_eq!(hash, tx_hash);
                assert_eq!(confirmations, 6);
                assert_eq!(waited, Duration::from_secs(400));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_watcher_registration_failure_is_network_error() {
        let err = classify_wait_error(
            PendingTransactionError::FailedToRegister,
            TxHash::ZERO,
            &policy(),
            Duration::ZERO,
        );
        assert!(matches!(err, Error::Network(_)));
    }

    #[test]
    fn test_convert_successful_receipt() {
        let receipt = convert_receipt(&rpc_receipt("0x1"));

        assert!(receipt.success);
        assert_eq!(receipt.block_number, 42);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(
            receipt.contract_address,
            Some(address!("5fbdb2315678afecb367f032d93f642f64180aa3"))
        );
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].topics, vec![B256::repeat_byte(0x11)]);
        assert_eq!(receipt.logs[0].data, Bytes::from(vec![1u8]));
    }

    #[test]
    fn test_convert_failed_receipt_reports_failure() {
        let receipt = convert_receipt(&rpc_receipt("0x0"));
        assert!(!receipt.success);
        assert_eq!(receipt.tx_hash, TxHash::repeat_byte(0xab));
    }
}

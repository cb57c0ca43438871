use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Bytes, TxHash};
use thiserror::Error;

use super::extract::{ExtractedValue, extract};
use super::step::{PipelineStep, StepArg, StepState};
use crate::contracts::{ContractBackend, encode_call_data};
use crate::error::{self, Error};
use crate::network::NetworkRegistry;

/// A step that reached its confirmation depth
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub action: String,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub confirmations: u64,
    pub extracted: Option<ExtractedValue>,
}

/// Every step confirmed, with the values bound along the way
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub steps: Vec<StepRecord>,
    pub bindings: HashMap<String, ExtractedValue>,
}

/// Why a pipeline stopped. Steps after `index` were never submitted.
#[derive(Debug, Error)]
#[error("step {index} ({action}) failed after reaching {state:?}: {source}")]
pub struct StepFailure {
    pub index: usize,
    pub action: String,
    /// Last state the step reached before failing
    pub state: StepState,
    #[source]
    pub source: Error,
}

/// Drives a list of dependent transactions one at a time.
///
/// A step is only submitted once the previous one reached its confirmation
/// depth and any value it had to produce was extracted. Nothing is retried
/// and nothing already on-chain is undone.
pub struct PipelineRunner {
    registry: Arc<NetworkRegistry>,
    chain_id: u64,
    backend: Arc<dyn ContractBackend>,
}

impl PipelineRunner {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        chain_id: u64,
        backend: Arc<dyn ContractBackend>,
    ) -> Self {
        Self {
            registry,
            chain_id,
            backend,
        }
    }

    pub async fn run(&self, steps: &[PipelineStep]) -> Result<PipelineOutcome, StepFailure> {
        let mut bindings = HashMap::new();
        let mut records = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let mut state = StepState::Pending;
            match self.run_step(step, &bindings, &mut state).await {
                Ok(record) => {
                    if let (Some(rule), Some(value)) = (&step.extract, record.extracted) {
                        tracing::debug!(bind = %rule.bind, %value, "Bound extracted value");
                        bindings.insert(rule.bind.clone(), value);
                    }
                    records.push(record);
                }
                Err(source) => {
                    tracing::error!(
                        index,
                        action = %step.action,
                        from = ?state,
                        to = ?StepState::Failed,
                        "{}",
                        source
                    );
                    return Err(StepFailure {
                        index,
                        action: step.action.clone(),
                        state,
                        source,
                    });
                }
            }
        }

        Ok(PipelineOutcome {
            steps: records,
            bindings,
        })
    }

    async fn run_step(
        &self,
        step: &PipelineStep,
        bindings: &HashMap<String, ExtractedValue>,
        state: &mut StepState,
    ) -> error::Result<StepRecord> {
        let policy = self
            .registry
            .confirmation_policy(self.chain_id, step.confirmations)?;
        let calldata = encode_step(step, bindings)?;

        if let Some(progress) = &step.progress {
            tracing::info!("{}", progress);
        }

        let tx_hash = self
            .backend
            .send(step.contract.address, calldata, step.value)
            .await
            .map_err(|e| e.for_action(&step.action))?;
        *state = StepState::Submitted;
        tracing::debug!(action = %step.action, %tx_hash, "Submitted");

        let receipt = self.backend.wait_for_receipt(tx_hash, policy).await?;
        if !receipt.success {
            return Err(Error::rejected(&step.action, "transaction reverted"));
        }
        *state = StepState::Confirmed;
        tracing::debug!(
            action = %step.action,
            block = receipt.block_number,
            confirmations = policy.confirmations,
            "Confirmed"
        );

        let extracted = step
            .extract
            .as_ref()
            .map(|rule| extract(&receipt, &step.contract, rule))
            .transpose()?;

        Ok(StepRecord {
            action: step.action.clone(),
            tx_hash,
            block_number: receipt.block_number,
            confirmations: policy.confirmations,
            extracted,
        })
    }
}

/// Resolve bindings and encode the step's call
fn encode_step(
    step: &PipelineStep,
    bindings: &HashMap<String, ExtractedValue>,
) -> error::Result<Bytes> {
    let function = step
        .contract
        .abi
        .function(&step.method, step.args.len())
        .ok_or_else(|| {
            Error::config(format!(
                "{} has no function {} taking {} arguments",
                step.contract.name,
                step.method,
                step.args.len()
            ))
        })?;

    let args = step
        .args
        .iter()
        .map(|arg| match arg {
            StepArg::Literal(s) => Ok(s.clone()),
            StepArg::Address(a) => Ok(a.to_string()),
            StepArg::Binding(name) => bindings
                .get(name)
                .map(|v| v.to_string())
                .ok_or_else(|| {
                    Error::config(format!("`{}` is not bound by an earlier step", name))
                }),
        })
        .collect::<error::Result<Vec<_>>>()?;

    encode_call_data(function, &args)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::contracts::testing::{FakeBackend, Recorded, Scripted};
    use crate::pipeline::fixtures::{self, MARKETPLACE, NFT};

    const LOCALHOST: u64 = 31337;

    fn runner(backend: Arc<FakeBackend>) -> PipelineRunner {
        PipelineRunner::new(Arc::new(NetworkRegistry::builtin()), LOCALHOST, backend)
    }

    fn mint() -> PipelineStep {
        let step = PipelineStep::new("mint", fixtures::basic_nft(), "mintNft");
        step.extracting("Transfer", "tokenId", "tokenId")
    }

    fn approve() -> PipelineStep {
        PipelineStep::new("approve", fixtures::basic_nft(), "approve")
            .arg(StepArg::Address(MARKETPLACE))
            .arg(StepArg::Binding("tokenId".into()))
    }

    fn list() -> PipelineStep {
        PipelineStep::new("list", fixtures::marketplace(), "listItem")
            .arg(StepArg::Address(NFT))
            .arg(StepArg::Binding("tokenId".into()))
            .arg(StepArg::Literal("100000000000000000".into()))
    }

    #[tokio::test]
    async fn test_each_step_confirmed_before_next_submitted() {
        let minted = Scripted::Confirm(vec![fixtures::minted(3)]);
        let backend = Arc::new(FakeBackend::new([minted]));
        let outcome = runner(backend.clone())
            .run(&[mint(), approve(), list()])
            .await
            .unwrap();

        assert_eq!(outcome.steps.len(), 3);
        assert_eq!(backend.confirmations(), vec![1, 1, 1]);
        let history = backend.history();
        assert_eq!(history.len(), 6);
        for pair in history.chunks(2) {
            match (&pair[0], &pair[1]) {
                (Recorded::Send { at: sent, .. }, Recorded::Confirmed { at, .. }) => {
                    assert!(sent < at)
                }
                other => panic!("out of order: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_event_stops_pipeline() {
        let backend = Arc::new(FakeBackend::confirming());
        let failure = runner(backend.clone())
            .run(&[mint(), approve(), list()])
            .await
            .unwrap_err();

        assert_eq!(failure.index, 0);
        assert_eq!(failure.state, StepState::Confirmed);
        assert!(matches!(failure.source, Error::Extraction { .. }));
        assert_eq!(backend.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_revert_stops_later_steps() {
        let backend = Arc::new(FakeBackend::new([
            Scripted::Confirm(vec![fixtures::minted(1)]),
            Scripted::Revert,
        ]));
        let failure = runner(backend.clone())
            .run(&[mint(), approve(), list()])
            .await
            .unwrap_err();

        assert_eq!(failure.index, 1);
        assert_eq!(failure.state, StepState::Submitted);
        match failure.source {
            Error::TransactionRejected { action, .. } => assert_eq!(action, "approve"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_already_listed_is_rejection() {
        let backend = Arc::new(FakeBackend::new([
            Scripted::Confirm(vec![fixtures::minted(1)]),
            Scripted::Confirm(vec![]),
            Scripted::RejectOnSubmit("execution reverted: NftMarketplace__AlreadyListed".into()),
        ]));
        let failure = runner(backend.clone())
            .run(&[mint(), approve(), list()])
            .await
            .unwrap_err();

        assert_eq!(failure.index, 2);
        assert_eq!(failure.state, StepState::Pending);
        match &failure.source {
            Error::TransactionRejected { action, reason } => {
                assert_eq!(action, "list");
                assert!(reason.contains("AlreadyListed"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_hung_confirmation_surfaces_unconfirmed() {
        let backend = Arc::new(FakeBackend::new([Scripted::Hang]));
        let failure = runner(backend.clone())
            .run(&[mint(), approve()])
            .await
            .unwrap_err();

        assert_eq!(failure.state, StepState::Submitted);
        match failure.source {
            Error::Unconfirmed { waited, .. } => assert_eq!(waited.as_secs(), 26),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_unbound_argument_is_configuration_error() {
        let backend = Arc::new(FakeBackend::confirming());
        let failure = runner(backend.clone()).run(&[approve()]).await.unwrap_err();

        assert_eq!(failure.state, StepState::Pending);
        assert!(matches!(failure.source, Error::Configuration(_)));
        assert!(backend.history().is_empty());
    }

    #[tokio::test]
    async fn test_step_confirmation_override() {
        let backend = Arc::new(FakeBackend::confirming());
        let runner = PipelineRunner::new(
            Arc::new(NetworkRegistry::builtin()),
            11155111,
            backend.clone(),
        );

        let mut step = approve();
        step.args[1] = StepArg::Literal("4".into());
        step.confirmations = 3;
        step.value = Some(U256::ZERO);

        let outcome = runner.run(&[step]).await.unwrap();
        assert_eq!(outcome.steps[0].confirmations, 3);
        assert_eq!(backend.confirmations(), vec![3]);
        assert!(outcome.bindings.is_empty());
    }
}

use alloy::primitives::U256;

use super::extract::ExtractedValue;
use super::runner::{PipelineOutcome, PipelineRunner, StepFailure};
use super::step::{PipelineStep, StepArg};
use crate::contracts::ContractHandle;

/// Binding the minted token id is stored under
pub const TOKEN_ID: &str = "tokenId";

/// 0.1 ether
pub fn default_price() -> U256 {
    U256::from(100_000_000_000_000_000u64)
}

/// Mint a fresh NFT, approve the marketplace for it, then list it
#[derive(Debug, Clone)]
pub struct MintAndList {
    pub nft: ContractHandle,
    pub marketplace: ContractHandle,
    /// Listing price in wei
    pub price: U256,
}

impl MintAndList {
    pub fn new(nft: ContractHandle, marketplace: ContractHandle) -> Self {
        Self {
            nft,
            marketplace,
            price: default_price(),
        }
    }

    pub fn with_price(mut self, price: U256) -> Self {
        self.price = price;
        self
    }

    pub fn steps(&self) -> Vec<PipelineStep> {
        vec![
            PipelineStep::new("mint", self.nft.clone(), "mintNft")
                .announcing("Minting NFT...")
                .extracting("Transfer", "tokenId", TOKEN_ID),
            PipelineStep::new("approve", self.nft.clone(), "approve")
                .announcing("Approving NFT...")
                .arg(StepArg::Address(self.marketplace.address))
                .arg(StepArg::Binding(TOKEN_ID.to_string())),
            PipelineStep::new("list", self.marketplace.clone(), "listItem")
                .announcing("Listing NFT...")
                .arg(StepArg::Address(self.nft.address))
                .arg(StepArg::Binding(TOKEN_ID.to_string()))
                .arg(StepArg::Literal(self.price.to_string())),
        ]
    }

    pub async fn run(&self, runner: &PipelineRunner) -> Result<PipelineOutcome, StepFailure> {
        let outcome = runner.run(&self.steps()).await?;
        tracing::info!("NFT Listed!");
        Ok(outcome)
    }
}

/// The token id a completed run minted and listed
pub fn listed_token(outcome: &PipelineOutcome) -> Option<U256> {
    match outcome.bindings.get(TOKEN_ID) {
        Some(ExtractedValue::Uint(id)) => Some(*id),
        _ => None,
    }
}

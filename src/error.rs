use std::time::Duration;

use alloy::primitives::TxHash;
use thiserror::Error;

/// Failures raised by the deployment and pipeline core.
///
/// Everything except [`Error::Verification`] is fatal to the invocation that
/// produced it. Verification failures are only ever logged by the deployer.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown network, missing chain parameter, artifact or ABI member.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The network refused or reverted a submitted transaction.
    #[error("{action} transaction rejected: {reason}")]
    TransactionRejected { action: String, reason: String },

    /// A confirmed receipt did not carry the event data a later step needs.
    #[error("could not extract `{arg}` from `{event}`: {reason}")]
    Extraction {
        event: String,
        arg: String,
        reason: String,
    },

    /// The block explorer did not accept the source submission.
    #[error("verification failed: {0}")]
    Verification(String),

    /// The transaction did not reach the required depth within its wait bound.
    #[error("transaction {tx_hash} not confirmed ({confirmations} confirmations) after {waited:?}")]
    Unconfirmed {
        tx_hash: TxHash,
        confirmations: u64,
        waited: Duration,
    },

    /// Transport failure talking to the RPC endpoint.
    #[error("network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn rejected(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::TransactionRejected {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Attribute a rejection to the action that submitted it
    pub fn for_action(self, action: &str) -> Self {
        match self {
            Error::TransactionRejected { reason, .. } => Error::rejected(action, reason),
            other => other,
        }
    }
}

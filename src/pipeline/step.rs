use alloy::primitives::{Address, U256};

use crate::contracts::ContractHandle;

/// Confirmations each pipeline step waits for unless it asks for more
pub const DEFAULT_STEP_CONFIRMATIONS: u64 = 1;

/// An argument to a step's contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArg {
    /// Passed through to the ABI encoder as written
    Literal(String),
    Address(Address),
    /// A value extracted by an earlier step
    Binding(String),
}

/// Pull one argument of one event out of a step's receipt and bind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    pub event: String,
    pub arg: String,
    pub bind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

/// One state-mutating call in a dependent transaction sequence
#[derive(Debug, Clone)]
pub struct PipelineStep {
    /// Label used in logs and errors
    pub action: String,
    pub contract: ContractHandle,
    pub method: String,
    pub args: Vec<StepArg>,
    pub value: Option<U256>,
    pub confirmations: u64,
    pub extract: Option<ExtractionRule>,
    /// Logged when the step starts
    pub progress: Option<String>,
}

impl PipelineStep {
    pub fn new(action: &str, contract: ContractHandle, method: &str) -> Self {
        Self {
            action: action.to_string(),
            contract,
            method: method.to_string(),
            args: Vec::new(),
            value: None,
            confirmations: DEFAULT_STEP_CONFIRMATIONS,
            extract: None,
            progress: None,
        }
    }

    pub fn arg(mut self, arg: StepArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn announcing(mut self, progress: &str) -> Self {
        self.progress = Some(progress.to_string());
        self
    }

    pub fn extracting(mut self, event: &str, arg: &str, bind: &str) -> Self {
        self.extract = Some(ExtractionRule {
            event: event.to_string(),
            arg: arg.to_string(),
            bind: bind.to_string(),
        });
        self
    }
}

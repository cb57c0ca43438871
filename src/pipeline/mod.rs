//! Dependent transaction sequences: each step waits for the previous one to
//! be confirmed and may consume values extracted from its receipt.

mod extract;
mod mint_and_list;
mod runner;
mod step;

#[cfg(test)]
mod fixtures;

pub use mint_and_list::{MintAndList, listed_token};
pub use runner::PipelineRunner;

mod profile;
mod registry;

pub use profile::{ChainParams, NetworkProfile};
pub use registry::{ConfirmationPolicy, NetworkRegistry};

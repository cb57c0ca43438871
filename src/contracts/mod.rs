mod abi;
mod artifact;
mod backend;
mod codec;
mod deployment;

pub use abi::FunctionParam;
pub use artifact::ArtifactStore;
pub use backend::{AlloyBackend, ContractBackend, LogEntry, Receipt};
pub use codec::{
    decode_data, decode_topic, encode_call_data, encode_constructor_args, encode_deploy_data,
};
pub use deployment::{ContractHandle, DeploymentRecord, DeploymentStore};

#[cfg(test)]
pub use abi::parse_abi;
#[cfg(test)]
pub use artifact::parse_artifact;
#[cfg(test)]
pub use backend::testing;

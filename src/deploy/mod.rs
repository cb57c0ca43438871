mod orchestrator;
mod scripts;
mod verify;

pub use orchestrator::Deployer;
pub use scripts::select;
pub use verify::ExplorerVerifier;

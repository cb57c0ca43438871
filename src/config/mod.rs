mod keychain;
mod settings;

pub use keychain::KeychainManager;
pub use settings::{AppConfig, EXPLORER_API_KEY_ENV, FrontendConfig, NetworkConfig};

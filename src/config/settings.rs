use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use serde::Deserialize;
use zeroize::Zeroizing;

use super::KeychainManager;
use crate::network::{ChainParams, NetworkProfile};

const CONFIG_DIR: &str = "nftops";
const CONFIG_FILE: &str = "config.toml";

/// Environment fallback for the explorer credential
pub const EXPLORER_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";
/// Environment fallback for the deployer key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,

    #[serde(default)]
    pub wallets: HashMap<String, WalletConfig>,

    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    #[serde(default)]
    pub defaults: Option<Defaults>,

    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Chain ids treated as development networks in addition to 31337
    #[serde(default)]
    pub development_chains: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub explorer_api_key: Option<String>,
    pub block_confirmations: Option<u64>,
    pub block_time_secs: Option<u64>,
    #[serde(default)]
    pub params: ChainParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Reference to keychain entry (e.g., "nftops:dev_wallet")
    pub keychain: Option<String>,
    /// Environment variable containing private key
    pub env_var: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    pub network: Option<String>,
    pub wallet: Option<String>,
}

/// Front-end projects that consume deployed addresses and ABIs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub contracts_files: Vec<PathBuf>,
    #[serde(default)]
    pub abi_dirs: Vec<PathBuf>,
}

impl AppConfig {
    /// Load configuration from default location or fall back to built-in networks
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config at {:?}, using built-in networks", config_path);
            Ok(create_default_config())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).wrap_err("Failed to parse config file")
    }

    /// Get the default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre::eyre!("Could not determine config directory"))?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get a network by name, falling back to default
    pub fn get_network(&self, name: Option<&str>) -> Option<(&String, &NetworkConfig)> {
        if let Some(name) = name {
            return self.networks.get_key_value(name);
        }

        match self.defaults.as_ref().and_then(|d| d.network.as_deref()) {
            Some(default_name) => self.networks.get_key_value(default_name),
            None => self.networks.iter().min_by_key(|(name, _)| name.as_str()),
        }
    }

    /// Profiles for every configured network that declares a chain id
    pub fn network_profiles(&self) -> Vec<NetworkProfile> {
        self.networks
            .iter()
            .filter_map(|(name, network)| {
                let chain_id = network.chain_id?;
                Some(NetworkProfile {
                    chain_id,
                    name: name.clone(),
                    block_confirmations: network.block_confirmations,
                    block_time_secs: network.block_time_secs,
                    params: network.params.clone(),
                })
            })
            .collect()
    }

    /// Resolve an API key value (handling keychain references)
    pub fn resolve_api_key(&self, name: &str) -> Result<Option<String>> {
        match self.api_keys.get(name) {
            Some(value) => resolve_secret(value),
            None => Ok(None),
        }
    }

    /// Explorer credential for a network: per-network key, then the shared
    /// `etherscan` key, then the environment
    pub fn resolve_explorer_key(
        &self,
        network: &NetworkConfig,
    ) -> Result<Option<Zeroizing<String>>> {
        let configured = match &network.explorer_api_key {
            Some(value) => resolve_secret(value)?,
            None => self.resolve_api_key("etherscan")?,
        };

        Ok(configured
            .or_else(|| std::env::var(EXPLORER_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .map(Zeroizing::new))
    }

    /// Resolve a wallet private key
    pub fn resolve_wallet_key(&self, name: &str) -> Result<Option<Zeroizing<String>>> {
        let wallet = match self.wallets.get(name) {
            Some(w) => w,
            None => return Ok(None),
        };

        if let Some(keychain_ref) = &wallet.keychain {
            let km = KeychainManager::new();
            let entry = keychain_ref
                .strip_prefix("nftops:")
                .unwrap_or(keychain_ref);
            km.get_zeroizing(entry)
        } else if let Some(env_var) = &wallet.env_var {
            Ok(std::env::var(env_var).ok().map(Zeroizing::new))
        } else {
            Ok(None)
        }
    }

    /// Key for the deployer: named wallet, default wallet, then `PRIVATE_KEY`
    pub fn resolve_deployer_key(&self, wallet: Option<&str>) -> Result<Zeroizing<String>> {
        let name = wallet.or_else(|| self.defaults.as_ref().and_then(|d| d.wallet.as_deref()));

        if let Some(name) = name {
            if let Some(key) = self.resolve_wallet_key(name)? {
                return Ok(key);
            }
            if wallet.is_some() {
                return Err(eyre::eyre!(
                    "Wallet '{}' has no resolvable private key",
                    name
                ));
            }
        }

        std::env::var(PRIVATE_KEY_ENV)
            .ok()
            .map(Zeroizing::new)
            .ok_or_else(|| {
                eyre::eyre!(
                    "No deployer key: configure a wallet or set {}",
                    PRIVATE_KEY_ENV
                )
            })
    }
}

/// Values prefixed with `keychain:` are looked up in the OS keychain
fn resolve_secret(value: &str) -> Result<Option<String>> {
    if let Some(keychain_ref) = value.strip_prefix("keychain:") {
        KeychainManager::new().get(keychain_ref)
    } else {
        Ok(Some(value.to_string()))
    }
}

/// Configuration used when no config file exists
pub fn create_default_config() -> AppConfig {
    let mut networks = HashMap::new();

    networks.insert(
        "localhost".to_string(),
        NetworkConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: Some(31337),
            ..Default::default()
        },
    );

    networks.insert(
        "sepolia".to_string(),
        NetworkConfig {
            rpc_url: std::env::var("SEPOLIA_RPC_URL")
                .unwrap_or_else(|_| "https://sepolia.drpc.org".to_string()),
            chain_id: Some(11155111),
            ..Default::default()
        },
    );

    AppConfig {
        networks,
        defaults: Some(Defaults {
            network: Some("localhost".to_string()),
            wallet: None,
        }),
        ..Default::default()
    }
}

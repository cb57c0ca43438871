use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{Error, Result};

use super::profile::{NetworkProfile, builtin_profiles};

/// Confirmation depth applied to deployments on public networks
pub const VERIFICATION_BLOCK_CONFIRMATIONS: u64 = 6;

/// Chains where finality risk is negligible (hardhat, localhost, anvil)
pub const DEVELOPMENT_CHAIN_IDS: [u64; 1] = [31337];

/// Blocks allowed for a transaction to be included before its
/// confirmation count starts
pub const INCLUSION_ALLOWANCE_BLOCKS: u64 = 25;

const DEFAULT_BLOCK_TIME_SECS: u64 = 12;

/// How deep a transaction must be buried and how long to wait for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub confirmations: u64,
    pub timeout: Duration,
}

/// Read-only lookup of network profiles.
///
/// Built once at startup and shared by the deployer and the pipeline runner.
/// Whether a chain is a development network is decided here and nowhere else.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    profiles: BTreeMap<u64, NetworkProfile>,
    development: BTreeSet<u64>,
}

impl NetworkRegistry {
    /// Registry with no profiles and the default development chain set
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
            development: DEVELOPMENT_CHAIN_IDS.into_iter().collect(),
        }
    }

    /// Registry holding the profiles shipped with the tool
    pub fn builtin() -> Self {
        builtin_profiles()
            .into_iter()
            .fold(Self::empty(), |registry, profile| {
                registry.with_profile(profile)
            })
    }

    /// Add a profile, merging it over any existing entry for the same chain
    pub fn with_profile(mut self, profile: NetworkProfile) -> Self {
        match self.profiles.get_mut(&profile.chain_id) {
            Some(existing) => existing.merge(profile),
            None => {
                self.profiles.insert(profile.chain_id, profile);
            }
        }
        self
    }

    /// Built-in profiles overlaid with the configured networks
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = config
            .network_profiles()
            .into_iter()
            .fold(Self::builtin(), |registry, profile| {
                registry.with_profile(profile)
            });

        let registry = config
            .development_chains
            .iter()
            .fold(registry, |registry, &chain_id| {
                registry.with_development_chain(chain_id)
            });

        registry.validate()?;
        Ok(registry)
    }

    pub fn with_development_chain(mut self, chain_id: u64) -> Self {
        self.development.insert(chain_id);
        self
    }

    /// Reject profiles that would produce an undefined confirmation depth
    pub fn validate(&self) -> Result<()> {
        for profile in self.profiles.values() {
            if profile.block_confirmations == Some(0) {
                return Err(Error::config(format!(
                    "network `{}` ({}) configures 0 block confirmations",
                    profile.name, profile.chain_id
                )));
            }
            if profile.block_time_secs == Some(0) {
                return Err(Error::config(format!(
                    "network `{}` ({}) configures a 0 second block time",
                    profile.name, profile.chain_id
                )));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, chain_id: u64) -> Result<&NetworkProfile> {
        self.profiles
            .get(&chain_id)
            .ok_or_else(|| Error::config(format!("no network profile for chain {}", chain_id)))
    }

    pub fn resolve_by_name(&self, name: &str) -> Result<&NetworkProfile> {
        self.profiles
            .values()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::config(format!("no network profile named `{}`", name)))
    }

    pub fn is_development(&self, chain_id: u64) -> bool {
        self.development.contains(&chain_id)
    }

    /// Confirmation depth a deployment must reach before it is returned
    pub fn deployment_confirmations(&self, chain_id: u64) -> Result<u64> {
        let profile = self.resolve(chain_id)?;
        if self.is_development(chain_id) {
            return Ok(1);
        }
        Ok(profile
            .block_confirmations
            .unwrap_or(VERIFICATION_BLOCK_CONFIRMATIONS))
    }

    /// Wait policy for a transaction that needs `confirmations` blocks.
    ///
    /// The bound scales with the chain's block time rather than being fixed.
    pub fn confirmation_policy(
        &self,
        chain_id: u64,
        confirmations: u64,
    ) -> Result<ConfirmationPolicy> {
        let profile = self.resolve(chain_id)?;
        let confirmations = confirmations.max(1);
        let block_time = profile.block_time_secs.unwrap_or(DEFAULT_BLOCK_TIME_SECS);
        let timeout =
            Duration::from_secs((confirmations + INCLUSION_ALLOWANCE_BLOCKS) * block_time);

        Ok(ConfirmationPolicy {
            confirmations,
            timeout,
        })
    }

    /// Whether a deployment on this chain should be submitted for verification
    pub fn verification_enabled(&self, chain_id: u64, credential_present: bool) -> bool {
        credential_present && !self.is_development(chain_id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

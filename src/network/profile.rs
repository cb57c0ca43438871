use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256, address, b256, utils::parse_ether};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Deployment parameters for one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub chain_id: u64,
    pub name: String,
    /// Confirmation override; only honored on public networks
    pub block_confirmations: Option<u64>,
    pub block_time_secs: Option<u64>,
    pub params: ChainParams,
}

/// Chain-specific values consumed opaquely by constructor arguments.
///
/// Names can be looked up either in config spelling (`gas_lane`) or in the
/// camelCase spelling contracts and deploy scripts use (`gasLane`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChainParams {
    pub gas_lane: Option<B256>,
    pub subscription_id: Option<u64>,
    pub vrf_coordinator_v2: Option<Address>,
    pub keepers_update_interval: Option<u64>,
    #[serde(default, deserialize_with = "ether_amount")]
    pub entrance_fee: Option<U256>,
    pub callback_gas_limit: Option<u64>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl NetworkProfile {
    pub fn new(chain_id: u64, name: &str) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            block_confirmations: None,
            block_time_secs: None,
            params: ChainParams::default(),
        }
    }

    #[cfg(test)]
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.block_confirmations = Some(confirmations);
        self
    }

    pub fn with_params(mut self, params: ChainParams) -> Self {
        self.params = params;
        self
    }

    /// Overlay configured values on top of this profile
    pub fn merge(&mut self, other: NetworkProfile) {
        self.name = other.name;
        if other.block_confirmations.is_some() {
            self.block_confirmations = other.block_confirmations;
        }
        if other.block_time_secs.is_some() {
            self.block_time_secs = other.block_time_secs;
        }
        self.params.merge(other.params);
    }
}

impl ChainParams {
    /// Look up a parameter as an ABI-encodable string
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "gas_lane" | "gasLane" => self.gas_lane.map(|v| v.to_string()),
            "subscription_id" | "subscriptionId" => self.subscription_id.map(|v| v.to_string()),
            "vrf_coordinator_v2" | "vrfCoordinatorV2" => {
                self.vrf_coordinator_v2.map(|v| v.to_string())
            }
            "keepers_update_interval" | "keepersUpdateInterval" => {
                self.keepers_update_interval.map(|v| v.to_string())
            }
            "entrance_fee" | "entranceFee" | "raffleEntranceFee" => {
                self.entrance_fee.map(|v| v.to_string())
            }
            "callback_gas_limit" | "callbackGasLimit" => {
                self.callback_gas_limit.map(|v| v.to_string())
            }
            other => self.extra.get(other).cloned(),
        }
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .ok_or_else(|| Error::config(format!("missing chain parameter `{}`", name)))
    }

    fn merge(&mut self, other: ChainParams) {
        self.gas_lane = other.gas_lane.or(self.gas_lane);
        self.subscription_id = other.subscription_id.or(self.subscription_id);
        self.vrf_coordinator_v2 = other.vrf_coordinator_v2.or(self.vrf_coordinator_v2);
        self.keepers_update_interval = other
            .keepers_update_interval
            .or(self.keepers_update_interval);
        self.entrance_fee = other.entrance_fee.or(self.entrance_fee);
        self.callback_gas_limit = other.callback_gas_limit.or(self.callback_gas_limit);
        self.extra.extend(other.extra);
    }
}

fn ether_amount<'de, D>(deserializer: D) -> std::result::Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_ether(&s).map_err(serde::de::Error::custom))
        .transpose()
}

const GAS_LANE_30_GWEI: B256 =
    b256!("0x474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c");

/// 0.01 ether
fn default_entrance_fee() -> U256 {
    U256::from(10_000_000_000_000_000u64)
}

/// Profiles shipped with the tool
pub fn builtin_profiles() -> Vec<NetworkProfile> {
    let local = ChainParams {
        gas_lane: Some(GAS_LANE_30_GWEI),
        keepers_update_interval: Some(30),
        entrance_fee: Some(default_entrance_fee()),
        callback_gas_limit: Some(500_000),
        ..Default::default()
    };

    let sepolia = ChainParams {
        subscription_id: Some(4647),
        vrf_coordinator_v2: Some(address!("0x8103B0A8A00be2DDC778e6e7eaa21791Cd364625")),
        ..local.clone()
    };

    vec![
        NetworkProfile {
            block_time_secs: Some(1),
            ..NetworkProfile::new(31337, "localhost").with_params(local)
        },
        NetworkProfile {
            block_time_secs: Some(12),
            ..NetworkProfile::new(11155111, "sepolia").with_params(sepolia)
        },
    ]
}

use alloy::primitives::{B256, keccak256};
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a contract function from the ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractFunction {
    pub name: String,
    pub inputs: Vec<FunctionParam>,
    pub outputs: Vec<FunctionParam>,
    pub state_mutability: String,
}

/// Represents an event from the ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub inputs: Vec<FunctionParam>,
    pub anonymous: bool,
}

/// Represents a function or event parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    pub param_type: String,
    pub components: Option<Vec<FunctionParam>>,
    #[serde(default)]
    pub indexed: bool,
}

/// Everything the tool needs from a contract ABI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractAbi {
    pub functions: Vec<ContractFunction>,
    pub events: Vec<ContractEvent>,
    pub constructor: Option<Vec<FunctionParam>>,
}

impl ContractAbi {
    /// Find a function by name, preferring the overload with matching arity
    pub fn function(&self, name: &str, arity: usize) -> Option<&ContractFunction> {
        let mut candidates = self.functions.iter().filter(|f| f.name == name);
        let first = candidates.next()?;
        if first.inputs.len() == arity {
            return Some(first);
        }
        candidates
            .find(|f| f.inputs.len() == arity)
            .or(Some(first))
    }

    pub fn event(&self, name: &str) -> Option<&ContractEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn constructor_inputs(&self) -> &[FunctionParam] {
        self.constructor.as_deref().unwrap_or(&[])
    }
}

impl ContractEvent {
    /// Topic under which non-anonymous emissions of this event are logged
    pub fn topic0(&self) -> B256 {
        keccak256(event_signature(self).as_bytes())
    }
}

/// Parse an ABI JSON array into functions, events and the constructor
pub fn parse_abi(abi_json: &Value) -> Result<ContractAbi> {
    let abi_array = abi_json
        .as_array()
        .ok_or_else(|| eyre::eyre!("ABI must be a JSON array"))?;

    let mut abi = ContractAbi::default();

    for item in abi_array {
        let Some(item_type) = item.get("type").and_then(|t| t.as_str()) else {
            continue;
        };

        match item_type {
            "function" => {
                let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                    continue;
                };
                let state_mutability = item
                    .get("stateMutability")
                    .and_then(|v| v.as_str())
                    .unwrap_or("nonpayable")
                    .to_string();

                abi.functions.push(ContractFunction {
                    name: name.to_string(),
                    inputs: parse_params(item.get("inputs")),
                    outputs: parse_params(item.get("outputs")),
                    state_mutability,
                });
            }
            "event" => {
                let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                    continue;
                };
                abi.events.push(ContractEvent {
                    name: name.to_string(),
                    inputs: parse_params(item.get("inputs")),
                    anonymous: item
                        .get("anonymous")
                        .and_then(|a| a.as_bool())
                        .unwrap_or(false),
                });
            }
            "constructor" => {
                abi.constructor = Some(parse_params(item.get("inputs")));
            }
            _ => {}
        }
    }

    Ok(abi)
}

fn parse_params(params: Option<&Value>) -> Vec<FunctionParam> {
    params
        .and_then(|p| p.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|param| {
                    let name = param
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("")
                        .to_string();

                    let param_type = param.get("type").and_then(|t| t.as_str())?.to_string();

                    let components = param
                        .get("components")
                        .filter(|c| c.is_array())
                        .map(|c| parse_params(Some(c)));

                    let indexed = param
                        .get("indexed")
                        .and_then(|i| i.as_bool())
                        .unwrap_or(false);

                    Some(FunctionParam {
                        name,
                        param_type,
                        components,
                        indexed,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Get function signature string (for selector calculation)
pub fn function_signature(func: &ContractFunction) -> String {
    signature(&func.name, &func.inputs)
}

pub fn event_signature(event: &ContractEvent) -> String {
    signature(&event.name, &event.inputs)
}

fn signature(name: &str, inputs: &[FunctionParam]) -> String {
    let params: Vec<String> = inputs.iter().map(param_type_string).collect();
    format!("{}({})", name, params.join(","))
}

/// Canonical type string of a parameter, expanding tuples
pub fn param_type_string(param: &FunctionParam) -> String {
    if let Some(components) = &param.components {
        // Tuple type
        let inner: Vec<String> = components.iter().map(param_type_string).collect();
        let suffix = param.param_type.strip_prefix("tuple").unwrap_or("");
        format!("({}){}", inner.join(","), suffix)
    } else {
        param.param_type.clone()
    }
}

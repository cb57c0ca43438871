use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{B256, Bytes, keccak256},
};

use super::abi::{ContractFunction, FunctionParam, function_signature, param_type_string};
use crate::error::{Error, Result};

/// Encode call data for a function call
pub fn encode_call_data(function: &ContractFunction, params: &[String]) -> Result<Bytes> {
    // Calculate function selector
    let signature = function_signature(function);
    let selector = &keccak256(signature.as_bytes())[..4];

    let mut calldata = selector.to_vec();
    let args = encode_args(&function.inputs, params)
        .map_err(|e| Error::config(format!("{}: {}", signature, e)))?;
    calldata.extend(args);

    Ok(calldata.into())
}

/// ABI-encode constructor arguments (empty for argument-less constructors)
pub fn encode_constructor_args(constructor: &[FunctionParam], args: &[String]) -> Result<Bytes> {
    encode_args(constructor, args)
        .map(Bytes::from)
        .map_err(|e| Error::config(format!("constructor: {}", e)))
}

/// Append ABI-encoded constructor arguments to creation bytecode
pub fn encode_deploy_data(bytecode: &Bytes, encoded_args: &Bytes) -> Bytes {
    let mut code = bytecode.to_vec();
    code.extend_from_slice(encoded_args);
    code.into()
}

/// ABI-encode string arguments against their declared parameter types
pub fn encode_args(
    inputs: &[FunctionParam],
    args: &[String],
) -> std::result::Result<Vec<u8>, String> {
    if inputs.len() != args.len() {
        return Err(format!(
            "expected {} arguments, got {}",
            inputs.len(),
            args.len()
        ));
    }

    let values = inputs
        .iter()
        .zip(args)
        .map(|(param, value)| encode_param(param, value))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if values.is_empty() {
        return Ok(Vec::new());
    }

    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// Parse a single parameter value
fn encode_param(param: &FunctionParam, value: &str) -> std::result::Result<DynSolValue, String> {
    let type_str = param_type_string(param);
    let ty = DynSolType::parse(&type_str)
        .map_err(|e| format!("unsupported parameter type {}: {}", type_str, e))?;

    ty.coerce_str(value.trim())
        .map_err(|e| format!("invalid {} for `{}`: {}", type_str, param.name, e))
}

/// Decode an indexed event argument from its topic.
///
/// Dynamic types are logged as the keccak hash of their contents, so only the
/// hash can be recovered.
pub fn decode_topic(param: &FunctionParam, topic: &B256) -> alloy::dyn_abi::Result<DynSolValue> {
    let ty = DynSolType::parse(&param_type_string(param))?;
    if ty.is_dynamic() {
        return Ok(DynSolValue::FixedBytes(*topic, 32));
    }
    ty.abi_decode(topic.as_slice())
}

/// Decode the non-indexed event arguments carried in a log's data
pub fn decode_data(
    params: &[&FunctionParam],
    data: &[u8],
) -> alloy::dyn_abi::Result<Vec<DynSolValue>> {
    let types = params
        .iter()
        .map(|p| DynSolType::parse(&param_type_string(p)))
        .collect::<alloy::dyn_abi::Result<Vec<_>>>()?;

    match DynSolType::Tuple(types).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

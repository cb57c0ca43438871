use std::fmt;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};

use super::step::ExtractionRule;
use crate::contracts::{ContractHandle, FunctionParam, LogEntry, Receipt, decode_data, decode_topic};
use crate::error::{Error, Result};

/// A typed value read from an emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedValue {
    Uint(U256),
    Address(Address),
    Bool(bool),
    /// Left-aligned in the word, with the declared width in bytes
    FixedBytes(B256, usize),
}

impl fmt::Display for ExtractedValue {
    /// Renders in the form the ABI encoder accepts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractedValue::Uint(v) => write!(f, "{}", v),
            ExtractedValue::Address(a) => write!(f, "{}", a),
            ExtractedValue::Bool(b) => write!(f, "{}", b),
            ExtractedValue::FixedBytes(b, size) => write!(f, "0x{}", hex::encode(&b[..*size])),
        }
    }
}

impl ExtractedValue {
    fn from_sol(value: DynSolValue) -> Option<Self> {
        match value {
            DynSolValue::Uint(v, _) => Some(ExtractedValue::Uint(v)),
            DynSolValue::Address(a) => Some(ExtractedValue::Address(a)),
            DynSolValue::Bool(b) => Some(ExtractedValue::Bool(b)),
            DynSolValue::FixedBytes(b, size) => Some(ExtractedValue::FixedBytes(b, size)),
            _ => None,
        }
    }
}

/// Read `rule.arg` of the first `rule.event` the contract emitted in this receipt
pub fn extract(
    receipt: &Receipt,
    contract: &ContractHandle,
    rule: &ExtractionRule,
) -> Result<ExtractedValue> {
    let fail = |reason: String| Error::Extraction {
        event: rule.event.clone(),
        arg: rule.arg.clone(),
        reason,
    };

    let event = contract
        .abi
        .event(&rule.event)
        .ok_or_else(|| fail(format!("{} ABI declares no such event", contract.name)))?;
    if event.anonymous {
        return Err(fail("anonymous events carry no selector topic".into()));
    }

    let position = event
        .inputs
        .iter()
        .position(|p| p.name == rule.arg)
        .ok_or_else(|| fail("event has no such argument".into()))?;
    let param = &event.inputs[position];

    let topic0 = event.topic0();
    let log = receipt
        .logs
        .iter()
        .find(|log| log.address == contract.address && log.topics.first() == Some(&topic0))
        .ok_or_else(|| {
            fail(format!(
                "transaction {} emitted no such event from {}",
                receipt.tx_hash, contract.address
            ))
        })?;

    let value = if param.indexed {
        read_indexed(log, &event.inputs[..position], param)
    } else {
        read_data(log, &event.inputs, position)
    }
    .map_err(fail)?;

    ExtractedValue::from_sol(value)
        .ok_or_else(|| fail(format!("unsupported argument type {}", param.param_type)))
}

fn read_indexed(
    log: &LogEntry,
    preceding: &[FunctionParam],
    param: &FunctionParam,
) -> std::result::Result<DynSolValue, String> {
    // topic 0 is the event selector
    let index = 1 + preceding.iter().filter(|p| p.indexed).count();
    let topic = log
        .topics
        .get(index)
        .ok_or_else(|| format!("log has {} topics, expected topic {}", log.topics.len(), index))?;

    decode_topic(param, topic).map_err(|e| e.to_string())
}

fn read_data(
    log: &LogEntry,
    inputs: &[FunctionParam],
    position: usize,
) -> std::result::Result<DynSolValue, String> {
    let index = inputs[..position].iter().filter(|p| !p.indexed).count();
    let params: Vec<&FunctionParam> = inputs.iter().filter(|p| !p.indexed).collect();

    decode_data(&params, &log.data)
        .map_err(|e| e.to_string())?
        .into_iter()
        .nth(index)
        .ok_or_else(|| "log data is shorter than the event declares".to_string())
}

#[cfg(test)]
mod tests {
    use alloy::dyn_abi::DynSolType;
    use alloy::primitives::{Bytes, TxHash, address};
    use serde_json::json;

    use super::*;
    use crate::contracts::parse_abi;

    const NFT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const SELLER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn handle() -> ContractHandle {
        let abi = parse_abi(&json!([
            {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "tokenId", "type": "uint256", "indexed": true}
            ]},
            {"type": "event", "name": "ItemListed", "anonymous": false, "inputs": [
                {"name": "seller", "type": "address", "indexed": true},
                {"name": "nftAddress", "type": "address", "indexed": true},
                {"name": "price", "type": "uint256", "indexed": false}
            ]},
            {"type": "event", "name": "InterfaceAdded", "anonymous": false, "inputs": [
                {"name": "interfaceId", "type": "bytes4", "indexed": true},
                {"name": "tag", "type": "bytes4", "indexed": false}
            ]}
        ]))
        .unwrap();
        ContractHandle {
            name: "BasicNft".to_string(),
            address: NFT,
            abi,
        }
    }

    fn rule(event: &str, arg: &str) -> ExtractionRule {
        ExtractionRule {
            event: event.to_string(),
            arg: arg.to_string(),
            bind: arg.to_string(),
        }
    }

    fn receipt(logs: Vec<LogEntry>) -> Receipt {
        Receipt {
            tx_hash: TxHash::repeat_byte(1),
            block_number: 1,
            success: true,
            contract_address: None,
            gas_used: 0,
            logs,
        }
    }

    fn transfer_log(address: Address, token_id: u64) -> LogEntry {
        let transfer = handle().abi.event("Transfer").unwrap().topic0();
        LogEntry {
            address,
            topics: vec![
                transfer,
                B256::ZERO,
                SELLER.into_word(),
                B256::from(U256::from(token_id).to_be_bytes::<32>()),
            ],
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_extract_indexed_token_id() {
        let receipt = receipt(vec![transfer_log(NFT, 7)]);
        let value = extract(&receipt, &handle(), &rule("Transfer", "tokenId")).unwrap();
        assert_eq!(value, ExtractedValue::Uint(U256::from(7)));
        assert_eq!(value.to_string(), "7");

        let to = extract(&receipt, &handle(), &rule("Transfer", "to")).unwrap();
        assert_eq!(to, ExtractedValue::Address(SELLER));
    }

    #[test]
    fn test_extract_from_data() {
        let listed = handle().abi.event("ItemListed").unwrap().topic0();
        let log = LogEntry {
            address: NFT,
            topics: vec![listed, SELLER.into_word(), NFT.into_word()],
            data: DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(100), 256)])
                .abi_encode_params()
                .into(),
        };
        let value = extract(&receipt(vec![log]), &handle(), &rule("ItemListed", "price")).unwrap();
        assert_eq!(value, ExtractedValue::Uint(U256::from(100)));
    }

    #[test]
    fn test_fixed_bytes_keep_declared_width() {
        let erc721 = B256::right_padding_from(&[0x80, 0xac, 0x58, 0xcd]);
        let erc165 = B256::right_padding_from(&[0x01, 0xff, 0xc9, 0xa7]);
        let added = handle().abi.event("InterfaceAdded").unwrap().topic0();
        let log = LogEntry {
            address: NFT,
            topics: vec![added, erc721],
            data: DynSolValue::Tuple(vec![DynSolValue::FixedBytes(erc165, 4)])
                .abi_encode_params()
                .into(),
        };
        let receipt = receipt(vec![log]);

        let id = extract(&receipt, &handle(), &rule("InterfaceAdded", "interfaceId")).unwrap();
        assert_eq!(id, ExtractedValue::FixedBytes(erc721, 4));
        assert_eq!(id.to_string(), "0x80ac58cd");

        let tag = extract(&receipt, &handle(), &rule("InterfaceAdded", "tag")).unwrap();
        assert_eq!(tag.to_string(), "0x01ffc9a7");

        // the rendered value binds into a later bytes4 argument
        let bytes4 = DynSolType::FixedBytes(4);
        let rebound = bytes4.coerce_str(&tag.to_string()).unwrap();
        assert_eq!(rebound, DynSolValue::FixedBytes(erc165, 4));
    }

    #[test]
    fn test_ignores_events_from_other_contracts() {
        let other = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
        let receipt = receipt(vec![transfer_log(other, 3), transfer_log(NFT, 9)]);
        let value = extract(&receipt, &handle(), &rule("Transfer", "tokenId")).unwrap();
        assert_eq!(value, ExtractedValue::Uint(U256::from(9)));
    }

    #[test]
    fn test_missing_event_is_extraction_error() {
        let err = extract(&receipt(vec![]), &handle(), &rule("Transfer", "tokenId")).unwrap_err();
        match err {
            Error::Extraction { event, arg, .. } => {
                assert_eq!(event, "Transfer");
                assert_eq!(arg, "tokenId");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_argument_and_short_topics() {
        let receipt_ok = receipt(vec![transfer_log(NFT, 7)]);
        assert!(matches!(
            extract(&receipt_ok, &handle(), &rule("Transfer", "amount")),
            Err(Error::Extraction { .. })
        ));

        let mut log = transfer_log(NFT, 7);
        log.topics.truncate(3);
        assert!(matches!(
            extract(&receipt(vec![log]), &handle(), &rule("Transfer", "tokenId")),
            Err(Error::Extraction { .. })
        ));
    }
}

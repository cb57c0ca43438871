//! Deployed-contract handles and logs shared by the pipeline tests.

use alloy::primitives::{Address, B256, Bytes, U256, address};
use serde_json::json;

use crate::contracts::{ContractHandle, LogEntry, parse_abi};

pub const NFT: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const MARKETPLACE: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const OWNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub fn basic_nft() -> ContractHandle {
    let abi = parse_abi(&json!([
        {"type": "function", "name": "mintNft", "stateMutability": "nonpayable",
         "inputs": [], "outputs": [{"name": "", "type": "uint256"}]},
        {"type": "function", "name": "approve", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "tokenId", "type": "uint256"}],
         "outputs": []},
        {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
            {"name": "from", "type": "address", "indexed": true},
            {"name": "to", "type": "address", "indexed": true},
            {"name": "tokenId", "type": "uint256", "indexed": true}
        ]}
    ]))
    .unwrap();

    ContractHandle {
        name: "BasicNft".to_string(),
        address: NFT,
        abi,
    }
}

pub fn marketplace() -> ContractHandle {
    let abi = parse_abi(&json!([
        {"type": "function", "name": "listItem", "stateMutability": "nonpayable", "inputs": [
            {"name": "nftAddress", "type": "address"},
            {"name": "tokenId", "type": "uint256"},
            {"name": "price", "type": "uint256"}
        ], "outputs": []}
    ]))
    .unwrap();

    ContractHandle {
        name: "NftMarketplace".to_string(),
        address: MARKETPLACE,
        abi,
    }
}

/// The log `mintNft` emits when minting `token_id` to [`OWNER`]
pub fn minted(token_id: u64) -> LogEntry {
    let transfer = basic_nft().abi.event("Transfer").unwrap().topic0();
    LogEntry {
        address: NFT,
        topics: vec![
            transfer,
            B256::ZERO,
            OWNER.into_word(),
            B256::from(U256::from(token_id).to_be_bytes::<32>()),
        ],
        data: Bytes::new(),
    }
}

/// Argument word `index` of ABI-encoded call data
pub fn call_word(calldata: &Bytes, index: usize) -> U256 {
    let start = 4 + index * 32;
    U256::from_be_slice(&calldata[start..start + 32])
}

pub fn call_address(calldata: &Bytes, index: usize) -> Address {
    let start = 4 + index * 32 + 12;
    Address::from_slice(&calldata[start..start + 20])
}

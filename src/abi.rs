//! Event signatures of the bridge contract.
//!
//! The contract ABI is parsed with `alloy_json_abi`; a topic hash is the
//! event's selector (Keccak-256 of its canonical signature). The watcher only
//! keeps the resolved `name -> topic hash` table.

use alloy_json_abi::{Event, JsonAbi};
use std::fs;
use std::path::Path;

use crate::error::{AbiError, ConfigError, Result};
use crate::models::normalize_hex;
use crate::rpc::parser::extract_field;

pub const DEPOSIT_EVENT: &str = "Deposit";
pub const CONTRACT_CREATION_EVENT: &str = "ContractCreation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignature {
    pub name: String,
    pub topic_hash: [u8; 32],
}

impl EventSignature {
    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            topic_hash: event.selector().0,
        }
    }

    /// Build from an already resolved topic hash, `0x` optional
    pub fn from_hex(name: &str, hash: &str) -> std::result::Result<Self, AbiError> {
        let invalid = || AbiError::InvalidTopicHash {
            name: name.to_string(),
            hash: hash.to_string(),
        };

        let bytes = hex::decode(normalize_hex(hash)).map_err(|_| invalid())?;
        let topic_hash: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self { name: name.to_string(), topic_hash })
    }

    pub fn topic_hex(&self) -> String {
        format!("0x{}", hex::encode(self.topic_hash))
    }

    /// Case-insensitive comparison against a log topic, `0x` optional
    pub fn matches(&self, topic: &str) -> bool {
        normalize_hex(topic) == hex::encode(self.topic_hash)
    }
}

/// The two events the watcher recognizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignatures {
    pub deposit: EventSignature,
    pub contract_creation: EventSignature,
}

impl EventSignatures {
    pub fn new(deposit: EventSignature, contract_creation: EventSignature) -> Self {
        Self { deposit, contract_creation }
    }

    /// Resolve both events from an ABI array or a Truffle artifact (`{"abi": [...]}`)
    pub fn from_abi_json(document: &str) -> Result<Self> {
        let abi = parse_abi(document)?;
        Ok(Self::from_abi(&abi)?)
    }

    pub fn from_abi(abi: &JsonAbi) -> std::result::Result<Self, AbiError> {
        Ok(Self {
            deposit: resolve(abi, DEPOSIT_EVENT)?,
            contract_creation: resolve(abi, CONTRACT_CREATION_EVENT)?,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_abi_json(&document)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventSignature> {
        [&self.deposit, &self.contract_creation].into_iter()
    }
}

// Overloads share a name; the first declaration wins.
fn resolve(abi: &JsonAbi, name: &str) -> std::result::Result<EventSignature, AbiError> {
    abi.event(name)
        .and_then(|overloads| overloads.first())
        .map(EventSignature::from_event)
        .ok_or_else(|| AbiError::MissingEvent(name.to_string()))
}

fn parse_abi(document: &str) -> std::result::Result<JsonAbi, AbiError> {
    let trimmed = document.trim_start();
    let abi_text = if trimmed.starts_with('{') {
        extract_field(trimmed, "abi").map_err(|e| AbiError::Parsing(e.to_string()))?
    } else {
        trimmed.to_string()
    };

    serde_json::from_str(&abi_text).map_err(|e| AbiError::Parsing(e.to_string()))
}

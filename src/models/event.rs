use serde::{Deserialize, Serialize};
use std::fmt;

/// A single entry of an `eth_getLogs` result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLogEntry {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(rename = "logIndex", default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<String>,
}

/// Which of the two mirrored bridge contracts emitted a log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Foreign,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deposit,
    ContractCreation,
    Unrecognized,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Foreign => "foreign",
            Side::Unknown => "unknown",
        }
    }
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposit => "deposit",
            EventKind::ContractCreation => "contract_creation",
            EventKind::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub side: Side,
    pub kind: EventKind,
    pub raw: RawLogEntry,
}

/// Recipient and value of a bridge deposit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositPayload {
    /// `0x`-prefixed 20-byte address
    pub recipient_address: String,
    /// Full 256-bit ABI word as 64 hex digits, not interpreted
    pub value: String,
}

/// What the poller hands to its consumer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchedEvent {
    pub event: ClassifiedEvent,
    pub deposit: Option<DepositPayload>,
}

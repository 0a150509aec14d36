use crate::abi::EventSignatures;
use crate::models::{normalize_hex, BridgeConfig, ClassifiedEvent, EventKind, RawLogEntry, Side};

/// Determine origin side and event kind of a raw log entry
///
/// Address matching is advisory: entries from neither contract are still
/// classified, with `Side::Unknown`.
pub fn classify(entry: &RawLogEntry, config: &BridgeConfig, signatures: &EventSignatures) -> ClassifiedEvent {
    ClassifiedEvent {
        side: side_of(&entry.address, config),
        kind: kind_of(entry, signatures),
        raw: entry.clone(),
    }
}

fn side_of(address: &str, config: &BridgeConfig) -> Side {
    let address = normalize_hex(address);

    if address == normalize_hex(config.home_contract_address()) {
        Side::Home
    } else if address == normalize_hex(config.foreign_contract_address()) {
        Side::Foreign
    } else {
        Side::Unknown
    }
}

fn kind_of(entry: &RawLogEntry, signatures: &EventSignatures) -> EventKind {
    let Some(topic) = entry.topics.first() else {
        return EventKind::Unrecognized;
    };

    if signatures.deposit.matches(topic) {
        EventKind::Deposit
    } else if signatures.contract_creation.matches(topic) {
        EventKind::ContractCreation
    } else {
        EventKind::Unrecognized
    }
}

/// Bridge addresses and signatures bundled for repeated classification
#[derive(Debug, Clone)]
pub struct EventClassifier {
    config: BridgeConfig,
    signatures: EventSignatures,
}

impl EventClassifier {
    pub fn new(config: BridgeConfig, signatures: EventSignatures) -> Self {
        Self { config, signatures }
    }

    pub fn classify(&self, entry: &RawLogEntry) -> ClassifiedEvent {
        classify(entry, &self.config, &self.signatures)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn signatures(&self) -> &EventSignatures {
        &self.signatures
    }
}

use std::collections::HashMap;

use crate::error::{Result, WatcherError};
use crate::models::{DepositPayload, EventKind};

/// `0x` + two 32-byte ABI words
pub const DEPOSIT_DATA_LENGTH: usize = 130;

const WORD_HEX_LENGTH: usize = 64;
// The address sits in the low 20 bytes of the first word
const RECIPIENT_START: usize = 2 + WORD_HEX_LENGTH - 40;
const VALUE_START: usize = 2 + WORD_HEX_LENGTH;

/// Decode the data segment of a `Deposit(address,uint256)` log
pub fn decode_deposit(data: &str) -> Result<DepositPayload> {
    if data.len() != DEPOSIT_DATA_LENGTH {
        return Err(WatcherError::bad_encoding(format!(
            "deposit data must be {} characters, got {}",
            DEPOSIT_DATA_LENGTH,
            data.len()
        )));
    }

    let Some(words) = data.strip_prefix("0x") else {
        return Err(WatcherError::bad_encoding("deposit data is missing the 0x prefix"));
    };

    if !words.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WatcherError::bad_encoding("deposit data contains non-hex characters"));
    }

    Ok(DepositPayload {
        recipient_address: format!("0x{}", &data[RECIPIENT_START..VALUE_START]),
        value: data[VALUE_START..].to_string(),
    })
}

/// Payload produced by a registered decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    Deposit(DepositPayload),
}

pub type DecodeFn = fn(&str) -> Result<DecodedPayload>;

/// Data-segment decoders keyed by event kind
///
/// Kinds without a registered decoder carry no payload.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<EventKind, DecodeFn>,
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self { decoders: HashMap::new() }
    }

    pub fn register(&mut self, kind: EventKind, decoder: DecodeFn) {
        self.decoders.insert(kind, decoder);
    }

    pub fn has_decoder(&self, kind: EventKind) -> bool {
        self.decoders.contains_key(&kind)
    }

    /// `None` when nothing is registered for `kind`
    pub fn decode(&self, kind: EventKind, data: &str) -> Option<Result<DecodedPayload>> {
        self.decoders.get(&kind).map(|decoder| decoder(data))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(EventKind::Deposit, |data| decode_deposit(data).map(DecodedPayload::Deposit));
        registry
    }
}

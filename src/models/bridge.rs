use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result, WatcherError};
use crate::rpc::parser::extract_field;

/// Addresses of the two mirrored bridge contracts
///
/// Both addresses are held as `0x` + 40 lowercase hex digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    home_contract_address: String,
    foreign_contract_address: String,
}

impl BridgeConfig {
    pub fn new(home: &str, foreign: &str) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            home_contract_address: canonical_address("home", home)?,
            foreign_contract_address: canonical_address("foreign", foreign)?,
        })
    }

    /// Reads `home.contractAddr` and `foreign.contractAddr` from a JSON document
    pub fn from_json(document: &str) -> Result<Self> {
        let home = extract_field(document, "home.contractAddr")?;
        let foreign = extract_field(document, "foreign.contractAddr")?;
        Ok(Self::new(&home, &foreign)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_json(&document).map_err(|e| match e {
            WatcherError::Malformed(msg) => WatcherError::Config(ConfigError::Parsing(format!(
                "{}: {}",
                path.display(),
                msg
            ))),
            other => other,
        })
    }

    pub fn home_contract_address(&self) -> &str {
        &self.home_contract_address
    }

    pub fn foreign_contract_address(&self) -> &str {
        &self.foreign_contract_address
    }
}

fn canonical_address(side: &str, address: &str) -> std::result::Result<String, ConfigError> {
    validate_address(address).map_err(|_| ConfigError::InvalidAddress {
        side: side.to_string(),
        address: address.to_string(),
    })?;
    Ok(format!("0x{}", normalize_hex(address)))
}

/// Lowercase a hex string and drop any `0x`/`0X` prefix
pub fn normalize_hex(value: &str) -> String {
    let trimmed = value.trim();
    let without_prefix = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    without_prefix.to_lowercase()
}

/// Validate that an address is 20 bytes of hex, prefix optional
pub fn validate_address(address: &str) -> std::result::Result<(), String> {
    let normalized = normalize_hex(address);

    if normalized.len() != 40 {
        return Err(format!("Address must be 40 characters long, got {}", normalized.len()));
    }

    if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Address contains non-hexadecimal characters".to_string());
    }

    Ok(())
}

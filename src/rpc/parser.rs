//! Path-based field extraction from JSON documents.
//!
//! Values are returned as their raw text so callers decide how far to parse
//! them: strings come back unquoted, everything else verbatim.

use serde_json::value::RawValue;
use std::collections::HashMap;

use crate::error::{Result, WatcherError};

/// Extract the value at a dot-separated `path` (e.g. `home.contractAddr`)
pub fn extract_field(body: &str, path: &str) -> Result<String> {
    let mut fragment = body.trim();

    for key in path.split('.') {
        let object: HashMap<String, &RawValue> = serde_json::from_str(fragment)
            .map_err(|e| WatcherError::malformed(format!("expected object before '{}' in '{}': {}", key, path, e)))?;

        fragment = object
            .get(key)
            .copied()
            .map(RawValue::get)
            .ok_or_else(|| WatcherError::malformed(format!("missing field '{}'", path)))?;
    }

    unquote(fragment)
}

/// Extract `result` from a JSON-RPC response, surfacing error envelopes
pub fn extract_result(body: &str) -> Result<String> {
    match extract_field(body, "result") {
        Ok(result) => Ok(result),
        Err(missing) => {
            let Ok(message) = extract_field(body, "error.message") else {
                return Err(missing);
            };
            let code = extract_field(body, "error.code").unwrap_or_else(|_| "?".to_string());
            Err(WatcherError::malformed(format!("rpc error {}: {}", code, message)))
        }
    }
}

/// Raw text of every element of a JSON array
pub fn split_array(text: &str) -> Result<Vec<String>> {
    let elements: Vec<&RawValue> = serde_json::from_str(text.trim())
        .map_err(|e| WatcherError::malformed(format!("expected array: {}", e)))?;
    Ok(elements.into_iter().map(|value| value.get().to_string()).collect())
}

/// True for `[]`, whitespace inside the brackets allowed
pub fn is_empty_array(text: &str) -> bool {
    text.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map_or(false, |inner| inner.trim().is_empty())
}

fn unquote(fragment: &str) -> Result<String> {
    if fragment.starts_with('"') {
        serde_json::from_str::<String>(fragment)
            .map_err(|e| WatcherError::malformed(format!("invalid string value: {}", e)))
    } else {
        Ok(fragment.to_string())
    }
}

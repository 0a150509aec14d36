use crate::error::{Result, WatcherError};
use crate::logging::LogContext;

/// Block tag used before the cursor has seen the chain tip
pub const LATEST_BLOCK_TAG: &str = "latest";

/// Next block height to request logs from
///
/// Moves forward only; owned by a single poller.
#[derive(Debug, Default)]
pub struct BlockCursor {
    next_from_block: Option<u64>,
}

impl BlockCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hex height (`0x1b4`), or `latest` before the first sync
    pub fn current(&self) -> String {
        match self.next_from_block {
            Some(height) => format!("0x{:x}", height),
            None => LATEST_BLOCK_TAG.to_string(),
        }
    }

    /// Move to `height` as reported by the node; returns whether the cursor moved
    pub fn advance_to(&mut self, height: &str) -> Result<bool> {
        let parsed = parse_block_height(height)?;

        match self.next_from_block {
            Some(current) if parsed < current => {
                LogContext::new("cursor", "advance")
                    .with_block(height)
                    .with_metadata("current", serde_json::json!(self.current()))
                    .warn("Node reported a lower block height, keeping cursor");
                Ok(false)
            }
            Some(current) if parsed == current => Ok(false),
            _ => {
                self.next_from_block = Some(parsed);
                Ok(true)
            }
        }
    }
}

fn parse_block_height(height: &str) -> Result<u64> {
    let trimmed = height.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| WatcherError::malformed(format!("block height '{}' is not 0x-prefixed", height)))?;

    u64::from_str_radix(digits, 16)
        .map_err(|e| WatcherError::malformed(format!("block height '{}': {}", height, e)))
}

pub mod event;
pub mod bridge;

pub use event::{RawLogEntry, Side, EventKind, ClassifiedEvent, DepositPayload, WatchedEvent};
pub use bridge::{BridgeConfig, normalize_hex, validate_address};

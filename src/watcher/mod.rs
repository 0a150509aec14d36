pub mod cursor;
pub mod classifier;
pub mod decoder;
pub mod poller;

pub use cursor::{BlockCursor, LATEST_BLOCK_TAG};
pub use classifier::{classify, EventClassifier};
pub use decoder::{decode_deposit, DecodeFn, DecodedPayload, DecoderRegistry, DEPOSIT_DATA_LENGTH};
pub use poller::{CycleReport, LogPoller, PollerConfig, PollerState, PollerSummary};

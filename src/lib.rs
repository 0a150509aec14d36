pub mod abi;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod rpc;
pub mod watcher;

pub use abi::{EventSignature, EventSignatures};
pub use config::{AppConfig, RpcConfig, WatcherConfig, LoggingConfig};
pub use error::{WatcherError, NetworkError, ConfigError, AbiError, ErrorSeverity, Result};
pub use logging::{LogContext, OperationTimer, ErrorLogger, MetricsLogger};
pub use models::{BridgeConfig, ClassifiedEvent, DepositPayload, EventKind, RawLogEntry, Side, WatchedEvent};
pub use rpc::{HttpTransport, LogFilter, RpcClient, Transport};
pub use watcher::{classify, decode_deposit, BlockCursor, CycleReport, EventClassifier, LogPoller, PollerConfig, PollerSummary};

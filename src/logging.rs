use log::{info, Level, LevelFilter};
use serde_json::{json, Map, Value};
use std::fmt::Display;
use std::time::Instant;

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, WatcherError};

/// One structured log line: where it came from plus arbitrary fields
pub struct LogContext {
    component: String,
    operation: String,
    fields: Map<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            fields: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn with_block(self, block: &str) -> Self {
        self.with_metadata("block", json!(block))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    fn render(&self, level: Level, message: &str) -> String {
        let mut line = Map::new();
        line.insert("ts".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        line.insert("level".to_string(), json!(level.as_str()));
        line.insert("component".to_string(), json!(self.component));
        line.insert("operation".to_string(), json!(self.operation));
        line.insert("message".to_string(), json!(message));
        // Caller fields never shadow the envelope
        for (key, value) in &self.fields {
            line.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(line).to_string()
    }

    fn emit(&self, level: Level, message: &str) {
        if log::log_enabled!(level) {
            log::log!(level, "{}", self.render(level, message));
        }
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.emit(Level::Trace, message);
    }
}

/// Wall-clock timer for an RPC call or a poll cycle
pub struct OperationTimer {
    label: String,
    started: Instant,
}

impl OperationTimer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Elapsed milliseconds; failures are reported at warn, successes at trace
    pub fn finish<T, E: Display>(self, outcome: &Result<T, E>) -> u64 {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let context = LogContext::new("timer", &self.label).with_metadata("elapsed_ms", json!(elapsed_ms));

        match outcome {
            Ok(_) => context.trace(&format!("{} took {}ms", self.label, elapsed_ms)),
            Err(e) => context
                .with_metadata("error", json!(e.to_string()))
                .warn(&format!("{} failed after {}ms", self.label, elapsed_ms)),
        }

        elapsed_ms
    }
}

/// Reports errors to the log, routed by severity
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &WatcherError, context: Option<LogContext>) {
        let severity = error.severity();

        let context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_code", json!(error.code()))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        let message = error.to_string();
        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => context.error(&message),
            ErrorSeverity::Medium => context.warn(&message),
            ErrorSeverity::Low => context.info(&message),
        }
    }
}

/// Watcher metrics as structured log lines
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_metadata("duration_ms", json!(duration_ms))
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("{} ok in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("{} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_poll_cycle(
        from_block: &str,
        entries: usize,
        emitted: usize,
        unrecognized: usize,
        skipped: usize,
        duration_ms: u64,
    ) {
        let context = LogContext::new("metrics", "poll_cycle")
            .with_block(from_block)
            .with_metadata("entries", json!(entries))
            .with_metadata("emitted", json!(emitted))
            .with_metadata("unrecognized", json!(unrecognized))
            .with_metadata("skipped", json!(skipped))
            .with_metadata("duration_ms", json!(duration_ms));

        if entries == 0 {
            context.trace("No new logs");
        } else {
            context.info(&format!("{} logs from {}: {} emitted", entries, from_block, emitted));
        }
    }

    pub fn log_event_emitted(side: &str, kind: &str, address: &str, tx_hash: &str) {
        LogContext::new("metrics", "event_emitted")
            .with_metadata("side", json!(side))
            .with_metadata("kind", json!(kind))
            .with_address(address)
            .with_transaction_hash(tx_hash)
            .debug(&format!("{} {}", side, kind));
    }
}

/// Install env_logger; JSON lines are re-rendered, anything else gets a timestamped prefix
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level: LevelFilter = config.level.parse()?;
    let pretty = config.format == "pretty";

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(move |buf, record| {
            use std::io::Write;

            let message = record.args().to_string();
            match serde_json::from_str::<Value>(&message) {
                Ok(json_value) if json_value.is_object() => {
                    if pretty {
                        writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
                    } else {
                        writeln!(buf, "{}", json_value)
                    }
                }
                _ => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ),
            }
        })
        .try_init()?;

    info!("Logging initialized at level {}", level);
    Ok(())
}

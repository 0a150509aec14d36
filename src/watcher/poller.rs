use std::time::Duration;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, Result, WatcherError};
use crate::logging::{ErrorLogger, LogContext, MetricsLogger, OperationTimer};
use crate::models::{EventKind, RawLogEntry, WatchedEvent};
use crate::rpc::{is_empty_array, split_array, LogFilter, RpcClient, Transport};
use crate::watcher::classifier::EventClassifier;
use crate::watcher::cursor::BlockCursor;
use crate::watcher::decoder::{DecodedPayload, DecoderRegistry};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Must be non-zero
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub from_block: String,
    pub entries: usize,
    pub deposits: usize,
    pub contract_creations: usize,
    /// Counted but not handed to the consumer
    pub unrecognized: usize,
    /// Entries dropped because they could not be parsed or decoded
    pub skipped: usize,
}

impl CycleReport {
    pub fn emitted(&self) -> usize {
        self.deposits + self.contract_creations
    }
}

/// Totals over the lifetime of `LogPoller::run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    /// Events the consumer channel accepted, including those of an interrupted cycle
    pub events_emitted: u64,
}

/// Periodically fetches new logs, classifies them and hands them to a consumer
pub struct LogPoller<T> {
    client: RpcClient<T>,
    cursor: BlockCursor,
    classifier: EventClassifier,
    decoders: DecoderRegistry,
    sink: mpsc::Sender<WatchedEvent>,
    config: PollerConfig,
    state: PollerState,
    delivered: u64,
}

impl<T: Transport> LogPoller<T> {
    /// Fails with `ConfigError::InvalidValue` on a zero poll interval
    pub fn new(
        transport: T,
        classifier: EventClassifier,
        sink: mpsc::Sender<WatchedEvent>,
        config: Option<PollerConfig>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();
        if config.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval".to_string(),
                value: format!("{:?}", config.poll_interval),
            }
            .into());
        }

        Ok(Self {
            client: RpcClient::new(transport),
            cursor: BlockCursor::new(),
            classifier,
            decoders: DecoderRegistry::default(),
            sink,
            config,
            state: PollerState::Idle,
            delivered: 0,
        })
    }

    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn cursor(&self) -> &BlockCursor {
        &self.cursor
    }

    pub fn client(&self) -> &RpcClient<T> {
        &self.client
    }

    /// Events accepted by the consumer channel so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Run one cycle: sync the cursor, fetch logs, classify, decode, emit
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        self.state = PollerState::Polling;
        let result = self.run_cycle().await;
        self.state = PollerState::Idle;
        result
    }

    async fn run_cycle(&mut self) -> Result<CycleReport> {
        let timer = OperationTimer::start("poll_cycle");

        let height = self.client.block_number().await?;
        self.cursor.advance_to(&height)?;

        let filter = LogFilter {
            from_block: self.cursor.current(),
        };
        let logs = self.client.get_logs(&filter).await?;

        let mut report = CycleReport {
            from_block: filter.from_block,
            ..CycleReport::default()
        };

        if !is_empty_array(&logs) {
            let entries = split_array(&logs)?;
            report.entries = entries.len();

            for text in &entries {
                self.process_entry(text, &mut report).await?;
            }
        }

        let duration = timer.finish(&Ok::<_, WatcherError>(()));
        MetricsLogger::log_poll_cycle(
            &report.from_block,
            report.entries,
            report.emitted(),
            report.unrecognized,
            report.skipped,
            duration,
        );

        Ok(report)
    }

    /// Only a closed consumer is returned as an error; bad entries are logged and skipped
    async fn process_entry(&mut self, text: &str, report: &mut CycleReport) -> Result<()> {
        let entry: RawLogEntry = match serde_json::from_str(text) {
            Ok(entry) => entry,
            Err(e) => {
                let error = WatcherError::malformed(format!("unparsable log entry: {}", e));
                ErrorLogger::log_error(&error, Some(LogContext::new("poller", "parse_entry")));
                report.skipped += 1;
                return Ok(());
            }
        };

        let event = self.classifier.classify(&entry);

        if event.kind == EventKind::Unrecognized {
            report.unrecognized += 1;
            LogContext::new("poller", "classify")
                .with_address(&entry.address)
                .with_transaction_hash(&entry.transaction_hash)
                .trace("Ignoring log with unknown topic");
            return Ok(());
        }

        let deposit = match self.decoders.decode(event.kind, &entry.data) {
            None => None,
            Some(Ok(DecodedPayload::Deposit(payload))) => Some(payload),
            Some(Err(error)) => {
                let context = LogContext::new("poller", "decode")
                    .with_transaction_hash(&entry.transaction_hash)
                    .with_address(&entry.address)
                    .with_metadata("kind", json!(event.kind.as_str()));
                ErrorLogger::log_error(&error, Some(context));
                report.skipped += 1;
                return Ok(());
            }
        };

        match event.kind {
            EventKind::Deposit => report.deposits += 1,
            EventKind::ContractCreation => report.contract_creations += 1,
            EventKind::Unrecognized => {}
        }

        MetricsLogger::log_event_emitted(
            event.side.as_str(),
            event.kind.as_str(),
            &entry.address,
            &entry.transaction_hash,
        );

        self.sink
            .send(WatchedEvent { event, deposit })
            .await
            .map_err(|_| WatcherError::ConsumerClosed)?;
        self.delivered += 1;
        Ok(())
    }

    /// Poll on a fixed interval until `cancel` fires or the consumer goes away
    ///
    /// Cycles never overlap. Ticks that elapse while a cycle is in flight
    /// collapse into a single immediate follow-up cycle. Cancellation is only
    /// observed between cycles, so an in-flight request always completes.
    pub async fn run(mut self, cancel: CancellationToken) -> PollerSummary {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = PollerSummary::default();

        LogContext::new("poller", "run")
            .with_metadata("poll_interval_ms", json!(self.config.poll_interval.as_millis() as u64))
            .info("Starting log poller");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    LogContext::new("poller", "run").info("Stop requested, poller exiting");
                    break;
                }
                _ = ticker.tick() => {}
            }

            summary.cycles += 1;
            match self.poll_once().await {
                Ok(_) => {}
                Err(WatcherError::ConsumerClosed) => {
                    LogContext::new("poller", "run").info("Event consumer closed, poller exiting");
                    break;
                }
                Err(error) => {
                    summary.failed_cycles += 1;
                    let context = LogContext::new("poller", "cycle")
                        .with_block(&self.cursor.current());
                    ErrorLogger::log_error(&error, Some(context));
                }
            }
        }

        summary.events_emitted = self.delivered;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{EventSignature, EventSignatures};
    use crate::error::NetworkError;
    use crate::models::{BridgeConfig, Side};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const HOME: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const FOREIGN: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
    const DEPOSIT_TOPIC: &str = "0xe1fffcc4923d04b559f4d29a8bfc6cda04eb5b0d3c460751c2402c5c5cc9109c";
    const CONTRACT_CREATION_TOPIC: &str = "0x4db17dd5e4732fb6da34a148104a592783ca119a1e7bb8829eba6cbadef0b511";
    const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
    const RECIPIENT: &str = "f977814e90da44bfa03b6295a0616a897441acec";
    const VALUE: &str = "0000000000000000000000000000000000000000000000000de0b6b3a7640000";

    /// Scripted node: answers per method, optionally slow, tracks overlap
    #[derive(Default)]
    struct MockNode {
        block_numbers: Mutex<VecDeque<Result<String>>>,
        logs: Mutex<String>,
        get_logs_delay: Duration,
        get_logs_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        requested_from_blocks: Mutex<Vec<Value>>,
    }

    impl MockNode {
        fn new(logs: &str) -> Arc<Self> {
            Arc::new(Self {
                logs: Mutex::new(envelope(logs)),
                ..Self::default()
            })
        }

        fn slow(logs: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                logs: Mutex::new(envelope(logs)),
                get_logs_delay: delay,
                ..Self::default()
            })
        }
    }

    fn envelope(result: &str) -> String {
        format!(r#"{{"jsonrpc":"2.0","id":1,"result":{}}}"#, result)
    }

    #[async_trait]
    impl Transport for Arc<MockNode> {
        async fn call(&self, method: &str, params: Vec<Value>) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let response = match method {
                "eth_blockNumber" => {
                    let scripted = self.block_numbers.lock().unwrap().pop_front();
                    scripted.unwrap_or_else(|| Ok(envelope(r#""0x10""#)))
                }
                "eth_getLogs" => {
                    self.get_logs_calls.fetch_add(1, Ordering::SeqCst);
                    self.requested_from_blocks.lock().unwrap().push(params[0]["fromBlock"].clone());
                    if !self.get_logs_delay.is_zero() {
                        tokio::time::sleep(self.get_logs_delay).await;
                    }
                    let logs = self.logs.lock().unwrap().clone();
                    Ok(logs)
                }
                other => panic!("unexpected method {}", other),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }

    fn classifier() -> EventClassifier {
        EventClassifier::new(
            BridgeConfig::new(HOME, FOREIGN).unwrap(),
            EventSignatures::new(
                EventSignature::from_hex("Deposit", DEPOSIT_TOPIC).unwrap(),
                EventSignature::from_hex("ContractCreation", CONTRACT_CREATION_TOPIC).unwrap(),
            ),
        )
    }

    fn log_json(address: &str, topic: &str, data: &str, tx: &str) -> String {
        format!(
            r#"{{"address":"{}","topics":["{}"],"data":"{}","blockNumber":"0x10","transactionHash":"{}","logIndex":"0x0"}}"#,
            address, topic, data, tx
        )
    }

    fn deposit_data() -> String {
        format!("0x{}{}{}", "0".repeat(24), RECIPIENT, VALUE)
    }

    fn poller(node: &Arc<MockNode>, capacity: usize, interval_ms: u64) -> (LogPoller<Arc<MockNode>>, mpsc::Receiver<WatchedEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let config = PollerConfig { poll_interval: Duration::from_millis(interval_ms) };
        (LogPoller::new(Arc::clone(node), classifier(), tx, Some(config)).unwrap(), rx)
    }

    #[test]
    fn test_poller_config_default() {
        assert_eq!(PollerConfig::default().poll_interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_is_rejected() {
        let node = MockNode::new("[]");
        let (tx, _rx) = mpsc::channel(8);
        let config = PollerConfig { poll_interval: Duration::ZERO };

        let result = LogPoller::new(Arc::clone(&node), classifier(), tx.clone(), Some(config));
        assert!(matches!(
            result,
            Err(WatcherError::Config(ConfigError::InvalidValue { ref key, .. })) if key == "poll_interval"
        ));

        // The smallest non-zero period is accepted and runs
        let config = PollerConfig { poll_interval: Duration::from_nanos(1) };
        let poller = LogPoller::new(Arc::clone(&node), classifier(), tx, Some(config)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(poller.run(cancel).await, PollerSummary::default());

        let (tx, _rx) = mpsc::channel(8);
        assert!(LogPoller::new(node, classifier(), tx, None).is_ok());
    }

    #[tokio::test]
    async fn test_home_deposit_scenario() {
        let logs = format!("[{}]", log_json(&HOME.to_lowercase(), DEPOSIT_TOPIC, &deposit_data(), "0x01"));
        let node = MockNode::new(&logs);
        let (mut poller, mut rx) = poller(&node, 8, 500);

        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.from_block, "0x10");
        assert_eq!(report.entries, 1);
        assert_eq!(report.deposits, 1);
        assert_eq!(poller.state(), PollerState::Idle);

        let watched = rx.try_recv().unwrap();
        assert_eq!(watched.event.side, Side::Home);
        assert_eq!(watched.event.kind, EventKind::Deposit);
        let deposit = watched.deposit.unwrap();
        assert_eq!(deposit.recipient_address, format!("0x{}", RECIPIENT));
        assert_eq!(deposit.value, VALUE);
        assert!(rx.try_recv().is_err());
    }

    static COUNTED_DECODES: AtomicUsize = AtomicUsize::new(0);

    fn counting_decoder(data: &str) -> Result<DecodedPayload> {
        COUNTED_DECODES.fetch_add(1, Ordering::SeqCst);
        crate::watcher::decoder::decode_deposit(data).map(DecodedPayload::Deposit)
    }

    #[tokio::test]
    async fn test_empty_result_emits_nothing_and_decodes_nothing() {
        let node = MockNode::new("[]");
        let (poller, mut rx) = poller(&node, 8, 500);
        let mut registry = DecoderRegistry::empty();
        registry.register(EventKind::Deposit, counting_decoder);
        let mut poller = poller.with_decoders(registry);

        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(report.emitted(), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(COUNTED_DECODES.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mixed_batch_counts_without_drops_or_duplicates() {
        let logs = format!(
            "[{},{},{},{},{}]",
            log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x01"),
            log_json(FOREIGN, TRANSFER_TOPIC, "0x", "0x02"),
            log_json(FOREIGN, CONTRACT_CREATION_TOPIC, "0x", "0x03"),
            log_json("0x1234567890123456789012345678901234567890", TRANSFER_TOPIC, "0x", "0x04"),
            log_json(FOREIGN, DEPOSIT_TOPIC, &deposit_data(), "0x05"),
        );
        let node = MockNode::new(&logs);
        let (mut poller, mut rx) = poller(&node, 8, 500);

        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.entries, 5);
        assert_eq!(report.deposits + report.contract_creations, 3);
        assert_eq!(report.unrecognized, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.emitted(), 3);

        // Unrecognized logs are counted, never handed to the consumer
        let mut hashes = Vec::new();
        while let Ok(watched) = rx.try_recv() {
            assert_ne!(watched.event.kind, EventKind::Unrecognized);
            hashes.push(watched.event.raw.transaction_hash.clone());
        }
        assert_eq!(hashes, vec!["0x01", "0x03", "0x05"]);
        assert_eq!(poller.delivered(), 3);
    }

    #[tokio::test]
    async fn test_bad_encoding_skips_only_that_entry() {
        let logs = format!(
            "[{},{},{}]",
            log_json(HOME, DEPOSIT_TOPIC, "0x1234", "0x01"),
            r#"{"unexpected":true}"#,
            log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x03"),
        );
        let node = MockNode::new(&logs);
        let (mut poller, mut rx) = poller(&node, 8, 500);

        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.entries, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.deposits, 1);
        assert_eq!(report.emitted(), 1);

        let watched = rx.try_recv().unwrap();
        assert_eq!(watched.event.raw.transaction_hash, "0x03");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_network_error_ends_cycle_and_next_cycle_retries() {
        let node = MockNode::new("[]");
        node.block_numbers.lock().unwrap().extend([
            Err(WatcherError::Network(NetworkError::Connection("refused".to_string()))),
            Ok(envelope(r#""0x11""#)),
        ]);
        let (mut poller, _rx) = poller(&node, 8, 500);

        let first = poller.poll_once().await;
        assert!(matches!(first, Err(WatcherError::Network(_))));
        assert_eq!(poller.state(), PollerState::Idle);
        assert_eq!(node.get_logs_calls.load(Ordering::SeqCst), 0);

        let second = poller.poll_once().await.unwrap();
        assert_eq!(second.from_block, "0x11");
        assert_eq!(poller.cursor().current(), "0x11");
    }

    #[tokio::test]
    async fn test_error_envelope_is_malformed() {
        let node = MockNode::new("[]");
        node.block_numbers.lock().unwrap().push_back(Ok(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"busy"}}"#.to_string(),
        ));
        let (mut poller, _rx) = poller(&node, 8, 500);

        assert!(matches!(poller.poll_once().await, Err(WatcherError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_cursor_follows_chain_tip_between_cycles() {
        let node = MockNode::new("[]");
        node.block_numbers.lock().unwrap().extend([
            Ok(envelope(r#""0x20""#)),
            Ok(envelope(r#""0x1f""#)),
            Ok(envelope(r#""0x22""#)),
        ]);
        let (mut poller, _rx) = poller(&node, 8, 500);

        for _ in 0..3 {
            poller.poll_once().await.unwrap();
        }

        let requested = node.requested_from_blocks.lock().unwrap().clone();
        assert_eq!(requested, vec![json!("0x20"), json!("0x20"), json!("0x22")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_run_sequential_cycles() {
        let node = MockNode::new("[]");
        let (poller, _rx) = poller(&node, 8, 100);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(poller.run(cancel.clone()));
        // Ticks at 0, 100, 200 and 300ms
        tokio::time::sleep(Duration::from_millis(350)).await;
        cancel.cancel();

        let summary = handle.await.unwrap();
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.failed_cycles, 0);
        assert_eq!(node.get_logs_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_coalesces_missed_ticks() {
        // Each cycle takes 250ms against a 100ms period: the ticks at 100 and
        // 200ms collapse into one follow-up cycle starting at 250ms.
        let node = MockNode::slow("[]", Duration::from_millis(250));
        let (poller, _rx) = poller(&node, 8, 100);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(poller.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(node.get_logs_calls.load(Ordering::SeqCst), 2);

        // The second cycle is mid-request; it completes before run returns
        cancel.cancel();
        let summary = handle.await.unwrap();

        assert_eq!(summary.cycles, 2);
        assert_eq!(node.get_logs_calls.load(Ordering::SeqCst), 2);
        assert_eq!(node.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(node.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_runs_nothing() {
        let node = MockNode::new("[]");
        let (poller, _rx) = poller(&node, 8, 100);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = poller.run(cancel).await;
        assert_eq!(summary, PollerSummary::default());
        assert_eq!(node.get_logs_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_consumer_closes() {
        let logs = format!("[{}]", log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x01"));
        let node = MockNode::new(&logs);
        let (poller, rx) = poller(&node, 8, 100);
        drop(rx);

        let summary = poller.run(CancellationToken::new()).await;
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.events_emitted, 0);
    }

    #[tokio::test]
    async fn test_consumer_closing_mid_batch_keeps_delivered_count() {
        let logs = format!(
            "[{},{},{}]",
            log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x01"),
            log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x02"),
            log_json(HOME, DEPOSIT_TOPIC, &deposit_data(), "0x03"),
        );
        let node = MockNode::new(&logs);
        let (poller, mut rx) = poller(&node, 1, 100);

        // Take one event, then hang up while the poller is still sending
        let consumer = tokio::spawn(async move {
            let first = rx.recv().await;
            drop(rx);
            first.is_some() as u64
        });

        let summary = poller.run(CancellationToken::new()).await;
        let received = consumer.await.unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(received, 1);
        // A capacity-1 channel may hold one more accepted event than was read
        assert!(summary.events_emitted >= received, "{:?}", summary);
        assert!(summary.events_emitted <= received + 1, "{:?}", summary);
    }
}

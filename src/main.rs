use bridge_event_watcher::config::AppConfig;
use bridge_event_watcher::logging::{init_logging, LogContext};
use bridge_event_watcher::models::{BridgeConfig, WatchedEvent};
use bridge_event_watcher::rpc::HttpTransport;
use bridge_event_watcher::watcher::{EventClassifier, LogPoller, PollerConfig};
use bridge_event_watcher::EventSignatures;
use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "watcher")]
#[command(about = "Watches the home and foreign bridge contracts for Deposit and ContractCreation events")]
#[command(version = "0.1.0")]
struct Args {
    /// TOML configuration file (defaults to $CONFIG_FILE or ./watcher.toml)
    #[arg(long)]
    config: Option<String>,

    /// JSON-RPC endpoint of the node
    #[arg(long)]
    rpc_url: Option<String>,

    /// Bridge configuration with home/foreign contract addresses
    #[arg(long)]
    bridge_config: Option<String>,

    /// Contract ABI or Truffle build artifact
    #[arg(long)]
    abi: Option<String>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_from_file()?,
    };
    config.apply_env_overrides()?;

    // Command line wins over file and environment
    if let Some(rpc_url) = args.rpc_url {
        config.rpc.endpoint = rpc_url;
    }
    if let Some(path) = args.bridge_config {
        config.watcher.bridge_config_path = path;
    }
    if let Some(path) = args.abi {
        config.watcher.abi_path = path;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.watcher.poll_interval_ms = interval;
    }
    config.validate()?;

    init_logging(&config.logging)?;

    let bridge = BridgeConfig::from_file(&config.watcher.bridge_config_path)?;
    let signatures = EventSignatures::from_file(&config.watcher.abi_path)?;

    LogContext::new("main", "startup")
        .with_metadata("endpoint", json!(config.rpc.endpoint))
        .with_metadata("home", json!(bridge.home_contract_address()))
        .with_metadata("foreign", json!(bridge.foreign_contract_address()))
        .with_metadata("deposit_topic", json!(signatures.deposit.topic_hex()))
        .with_metadata("contract_creation_topic", json!(signatures.contract_creation.topic_hex()))
        .info("Starting bridge event watcher");

    let transport = HttpTransport::new_with_config(config.rpc.endpoint.clone(), config.rpc.timeout_seconds)?;
    let (sender, receiver) = mpsc::channel(config.watcher.event_channel_capacity);

    let poller = LogPoller::new(
        transport,
        EventClassifier::new(bridge, signatures),
        sender,
        Some(PollerConfig {
            poll_interval: config.watcher.poll_interval(),
        }),
    )?;

    let cancel = CancellationToken::new();
    let poller_handle = tokio::spawn(poller.run(cancel.clone()));
    let consumer_handle = tokio::spawn(consume_events(receiver));

    tokio::signal::ctrl_c().await?;
    LogContext::new("main", "shutdown").info("Interrupt received, waiting for the current poll cycle");
    cancel.cancel();

    let summary = poller_handle.await?;
    let consumed = consumer_handle.await?;

    LogContext::new("main", "shutdown")
        .with_metadata("cycles", json!(summary.cycles))
        .with_metadata("failed_cycles", json!(summary.failed_cycles))
        .with_metadata("events_emitted", json!(summary.events_emitted))
        .with_metadata("events_consumed", json!(consumed))
        .info("Bridge event watcher stopped");

    Ok(())
}

/// Log every event until the poller drops its sender
async fn consume_events(mut receiver: mpsc::Receiver<WatchedEvent>) -> u64 {
    let mut consumed = 0;

    while let Some(watched) = receiver.recv().await {
        consumed += 1;
        let event = &watched.event;

        let mut context = LogContext::new("consumer", "event")
            .with_address(&event.raw.address)
            .with_transaction_hash(&event.raw.transaction_hash)
            .with_metadata("side", json!(event.side.as_str()))
            .with_metadata("kind", json!(event.kind.as_str()));
        if let Some(block) = &event.raw.block_number {
            context = context.with_block(block);
        }

        match &watched.deposit {
            Some(deposit) => context
                .with_metadata("recipient", json!(deposit.recipient_address))
                .with_metadata("value", json!(deposit.value))
                .info("Deposit observed"),
            None => context.info(&format!("{} event observed", event.kind)),
        }
    }

    consumed
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WatcherError};
use crate::logging::{LogContext, MetricsLogger, OperationTimer};
use crate::rpc::parser::extract_result;
use crate::rpc::transport::Transport;

/// Filter for `eth_getLogs`; `toBlock` is left open so the node reads up to latest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogFilter {
    #[serde(rename = "fromBlock")]
    pub from_block: String,
}

/// The node methods the watcher consumes, over any transport
pub struct RpcClient<T> {
    transport: T,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn request(&self, method: &str, params: Vec<Value>) -> Result<String> {
        let timer = OperationTimer::start(format!("rpc_{}", method));

        let result = match self.transport.call(method, params).await {
            Ok(body) => extract_result(&body),
            Err(e) => Err(e),
        };

        let duration = timer.finish(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());

        result
    }

    /// Current chain height as the node reports it (hex)
    pub async fn block_number(&self) -> Result<String> {
        let height = self.request("eth_blockNumber", vec![]).await?;

        LogContext::new("rpc_client", "block_number")
            .with_block(&height)
            .trace("Retrieved latest block number");

        Ok(height)
    }

    /// Raw text of the `eth_getLogs` result array
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<String> {
        let params = vec![serde_json::to_value(filter)
            .map_err(|e| WatcherError::malformed(format!("unserializable log filter: {}", e)))?];
        self.request("eth_getLogs", params).await
    }

    /// Raw receipt object, `None` while the transaction is still pending
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<String>> {
        let receipt = self
            .request("eth_getTransactionReceipt", vec![Value::String(tx_hash.to_string())])
            .await?;

        if receipt == "null" {
            Ok(None)
        } else {
            Ok(Some(receipt))
        }
    }
}

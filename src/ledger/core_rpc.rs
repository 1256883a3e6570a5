use crate::config::BitcoinRpcConfig;
use crate::errors::{PortError, PortResult};
use crate::ledger::{
    classify_script, execute_blocking_with_timeout, with_retries, InputRef, LedgerDataPort,
    ResolvedOutput, ResolvedTransaction, TransactionCache,
};
use async_trait::async_trait;
use corepc_client::bitcoin::Txid;
use corepc_client::client_sync::{v28::Client, Auth};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Bitcoin Core realization of the Ledger Data Port.
///
/// Wraps the synchronous `corepc-client` in blocking-pool calls with a
/// timeout, classifies node errors into the port taxonomy, and retries
/// transient failures with a fixed delay. The raw-transaction fetch carries
/// no block time, so resolved transactions from this backend are untimed.
pub struct CoreRpcLedger {
    client: Arc<Client>,
    config: BitcoinRpcConfig,
    cache: TransactionCache,
}

impl CoreRpcLedger {
    /// Create the client handle and verify connectivity before first use
    pub async fn connect(config: BitcoinRpcConfig) -> PortResult<Self> {
        let client = Self::create_sync_client(&config)?;

        let test_client = Arc::clone(&client);
        execute_blocking_with_timeout(config.timeout_seconds, "connection_test", move || {
            test_client.get_blockchain_info().map_err(|e| {
                classify_rpc_failure(
                    "get_blockchain_info",
                    "Failed to connect to Bitcoin RPC - check URL, credentials, and that Bitcoin Core is running",
                    e,
                )
            })?;
            Ok(())
        })
        .await?;

        info!("Bitcoin RPC connection established successfully");

        Ok(Self {
            client,
            config,
            cache: TransactionCache::new(),
        })
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> crate::ledger::CacheStats {
        self.cache.get_stats()
    }

    fn create_sync_client(config: &BitcoinRpcConfig) -> PortResult<Arc<Client>> {
        let auth = Auth::UserPass(config.username.clone(), config.password.clone());
        let client = Client::new_with_auth(&config.url, auth).map_err(|e| {
            PortError::Transient(format!("Failed to create Bitcoin RPC client: {}", e))
        })?;

        Ok(Arc::new(client))
    }

    async fn fetch_transaction(&self, txid: &str) -> PortResult<ResolvedTransaction> {
        let tx_hash = Txid::from_str(txid).map_err(|_| PortError::Unknown(format!(
            "Invalid txid passed to resolver: {}",
            txid
        )))?;

        let client = Arc::clone(&self.client);
        let txid_owned = txid.to_string();

        let transaction = execute_blocking_with_timeout(
            self.config.timeout_seconds,
            "get_raw_transaction",
            move || {
                let raw_result = client.get_raw_transaction(tx_hash).map_err(|e| {
                    classify_rpc_failure("get_raw_transaction", &txid_owned, e)
                })?;

                // Deserialise the hex string into a Transaction
                let tx_bytes = hex::decode(&raw_result.0).map_err(|e| {
                    PortError::Unknown(format!("Failed to decode raw transaction hex: {}", e))
                })?;
                let transaction: corepc_client::bitcoin::Transaction =
                    corepc_client::bitcoin::consensus::deserialize(&tx_bytes).map_err(|e| {
                        PortError::Unknown(format!("Failed to deserialise raw transaction: {}", e))
                    })?;

                Ok(transaction)
            },
        )
        .await?;

        Ok(convert_transaction(txid, &transaction))
    }
}

#[async_trait]
impl LedgerDataPort for CoreRpcLedger {
    async fn resolve(&self, txid: &str) -> PortResult<ResolvedTransaction> {
        if let Some(cached) = self.cache.get(txid) {
            return Ok(cached);
        }

        let resolved = with_retries(
            self.config.max_retries,
            Duration::from_millis(self.config.retry_delay_ms),
            "get_raw_transaction",
            || self.fetch_transaction(txid),
        )
        .await?;

        self.cache.put(txid.to_string(), resolved.clone());
        Ok(resolved)
    }

    async fn ping(&self) -> PortResult<()> {
        let client = Arc::clone(&self.client);
        execute_blocking_with_timeout(self.config.timeout_seconds, "ping", move || {
            let info = client.get_blockchain_info().map_err(|e| {
                classify_rpc_failure("get_blockchain_info", "connectivity check", e)
            })?;
            debug!(
                "Bitcoin Core connection test successful - chain: {}, blocks: {}",
                info.chain, info.blocks
            );
            Ok(())
        })
        .await
    }
}

/// Map a Bitcoin Core transaction into the walker's resolved structure.
///
/// Coinbase inputs keep their all-zero previous txid; the walker owns the
/// sentinel check.
fn convert_transaction(
    txid: &str,
    tx: &corepc_client::bitcoin::Transaction,
) -> ResolvedTransaction {
    let inputs = tx
        .input
        .iter()
        .map(|input| InputRef {
            txid: input.previous_output.txid.to_string(),
            vout: input.previous_output.vout,
        })
        .collect();

    let outputs = tx
        .output
        .iter()
        .map(|output| {
            // Convert corepc script bytes to the bitcoin crate for address
            // extraction and type naming
            let script = bitcoin::ScriptBuf::from_bytes(output.script_pubkey.to_bytes());
            let addresses = bitcoin::Address::from_script(&script, bitcoin::Network::Bitcoin)
                .map(|addr| vec![addr.to_string()])
                .unwrap_or_default();

            ResolvedOutput {
                addresses,
                value_sat: output.value.to_sat(),
                script_type: classify_script(&script).to_string(),
            }
        })
        .collect();

    ResolvedTransaction {
        txid: txid.to_string(),
        inputs,
        outputs,
        block_time: None,
    }
}

/// Classify a Bitcoin Core RPC failure into the port error taxonomy
fn classify_rpc_failure(
    method: &str,
    context: &str,
    err: impl std::fmt::Display,
) -> PortError {
    let message = err.to_string();
    let lowered = message.to_lowercase();

    if message.contains("No such mempool or blockchain transaction")
        || message.contains("Invalid or non-wallet transaction id")
    {
        return PortError::NotFound {
            txid: context.to_string(),
        };
    }
    if lowered.contains("401")
        || lowered.contains("unauthorized")
        || lowered.contains("authentication")
    {
        return PortError::Unauthorized(format!("{}: {}", method, message));
    }
    if lowered.contains("connection")
        || lowered.contains("timed out")
        || lowered.contains("timeout")
        || lowered.contains("error sending request")
    {
        return PortError::Transient(format!("{} ({}): {}", method, context, message));
    }

    PortError::Unknown(format!("{} ({}): {}", method, context, message))
}

use crate::config::ElectrsConfig;
use crate::errors::{PortError, PortResult};
use crate::ledger::{
    with_retries, InputRef, LedgerDataPort, ResolvedOutput, ResolvedTransaction, TransactionCache,
};
use crate::types::outpoint::NULL_TXID;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// electrs/esplora realization of the Ledger Data Port.
///
/// Queries the index server's HTTP API (`GET /tx/{txid}`), which returns the
/// fully resolved transaction including prevout references and block time.
pub struct EsploraLedger {
    http: reqwest::Client,
    config: ElectrsConfig,
    cache: TransactionCache,
}

/// Transaction shape returned by the esplora API
#[derive(Debug, Deserialize)]
struct EsploraTransaction {
    txid: String,
    vin: Vec<EsploraInput>,
    vout: Vec<EsploraOutput>,
    #[serde(default)]
    status: EsploraStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraInput {
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    vout: Option<u32>,
    #[serde(default)]
    is_coinbase: bool,
}

#[derive(Debug, Deserialize)]
struct EsploraOutput {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
    #[serde(default)]
    scriptpubkey_type: Option<String>,
    value: u64,
}

#[derive(Debug, Default, Deserialize)]
struct EsploraStatus {
    #[serde(default)]
    block_time: Option<i64>,
}

impl EsploraLedger {
    /// Create the client handle; connectivity is verified lazily via `ping`
    pub fn new(config: ElectrsConfig) -> PortResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PortError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        info!("Esplora ledger handle created for {}", config.base_url);

        Ok(Self {
            http,
            config,
            cache: TransactionCache::new(),
        })
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> crate::ledger::CacheStats {
        self.cache.get_stats()
    }

    async fn fetch_transaction(&self, txid: &str) -> PortResult<ResolvedTransaction> {
        let url = format!("{}/tx/{}", self.config.base_url.trim_end_matches('/'), txid);
        debug!("Fetching {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_http_failure(txid, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_status(txid, status));
        }

        let tx: EsploraTransaction = response
            .json()
            .await
            .map_err(|e| PortError::Unknown(format!("Invalid esplora response: {}", e)))?;

        Ok(convert_transaction(tx))
    }
}

#[async_trait]
impl LedgerDataPort for EsploraLedger {
    async fn resolve(&self, txid: &str) -> PortResult<ResolvedTransaction> {
        if let Some(cached) = self.cache.get(txid) {
            return Ok(cached);
        }

        let resolved = with_retries(
            self.config.max_retries,
            Duration::from_millis(self.config.retry_delay_ms),
            "esplora_get_tx",
            || self.fetch_transaction(txid),
        )
        .await?;

        self.cache.put(txid.to_string(), resolved.clone());
        Ok(resolved)
    }

    async fn ping(&self) -> PortResult<()> {
        let url = format!(
            "{}/blocks/tip/height",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_http_failure("tip height", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_status("tip height", status));
        }

        let height = response
            .text()
            .await
            .map_err(|e| PortError::Unknown(format!("Invalid tip height response: {}", e)))?;
        debug!("Esplora connection test successful - tip height: {}", height);
        Ok(())
    }
}

fn convert_transaction(tx: EsploraTransaction) -> ResolvedTransaction {
    let inputs = tx
        .vin
        .into_iter()
        .map(|input| {
            if input.is_coinbase {
                // Normalise to the all-zero sentinel; the walker owns the check
                InputRef {
                    txid: NULL_TXID.to_string(),
                    vout: 0,
                }
            } else {
                InputRef {
                    txid: input.txid.unwrap_or_else(|| NULL_TXID.to_string()),
                    vout: input.vout.unwrap_or(0),
                }
            }
        })
        .collect();

    let outputs = tx
        .vout
        .into_iter()
        .map(|output| ResolvedOutput {
            addresses: output.scriptpubkey_address.into_iter().collect(),
            value_sat: output.value,
            script_type: normalise_script_type(output.scriptpubkey_type.as_deref()),
        })
        .collect();

    let block_time = tx
        .status
        .block_time
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    ResolvedTransaction {
        txid: tx.txid,
        inputs,
        outputs,
        block_time,
    }
}

/// Map esplora script type naming onto the Bitcoin Core naming used in
/// step events (esplora says `v0_p2wpkh`, Core says `witness_v0_keyhash`)
fn normalise_script_type(esplora_type: Option<&str>) -> String {
    match esplora_type {
        Some("p2pkh") => "pubkeyhash".to_string(),
        Some("p2sh") => "scripthash".to_string(),
        Some("v0_p2wpkh") => "witness_v0_keyhash".to_string(),
        Some("v0_p2wsh") => "witness_v0_scripthash".to_string(),
        Some("v1_p2tr") => "witness_v1_taproot".to_string(),
        Some("op_return") => "nulldata".to_string(),
        Some(other) => other.to_string(),
        None => "unknown".to_string(),
    }
}

fn classify_http_failure(context: &str, err: reqwest::Error) -> PortError {
    if err.is_timeout() || err.is_connect() {
        PortError::Transient(format!("esplora request failed ({}): {}", context, err))
    } else {
        PortError::Unknown(format!("esplora request failed ({}): {}", context, err))
    }
}

fn classify_http_status(context: &str, status: reqwest::StatusCode) -> PortError {
    match status.as_u16() {
        404 => PortError::NotFound {
            txid: context.to_string(),
        },
        401 | 403 => PortError::Unauthorized(format!("esplora returned {} for {}", status, context)),
        429 => PortError::Transient(format!("esplora rate-limited request for {}", context)),
        code if code >= 500 => {
            PortError::Transient(format!("esplora returned {} for {}", status, context))
        }
        _ => PortError::Unknown(format!("esplora returned {} for {}", status, context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "txid": "abababababababababababababababababababababababababababababababab",
            "version": 2,
            "vin": [
                {
                    "txid": "cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd",
                    "vout": 1,
                    "is_coinbase": false
                }
            ],
            "vout": [
                {
                    "scriptpubkey": "0014751e76e8199196d454941c45d1b3a323f1433bd6",
                    "scriptpubkey_type": "v0_p2wpkh",
                    "scriptpubkey_address": "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
                    "value": 150000
                }
            ],
            "status": { "confirmed": true, "block_height": 800000, "block_time": 1700000000 }
        }"#
    }

    #[test]
    fn test_convert_sample_transaction() {
        let tx: EsploraTransaction = serde_json::from_str(sample_json()).unwrap();
        let resolved = convert_transaction(tx);

        assert_eq!(resolved.txid, "ab".repeat(32));
        assert_eq!(resolved.inputs.len(), 1);
        assert_eq!(resolved.inputs[0].txid, "cd".repeat(32));
        assert_eq!(resolved.inputs[0].vout, 1);
        assert_eq!(resolved.outputs[0].value_sat, 150_000);
        assert_eq!(resolved.outputs[0].script_type, "witness_v0_keyhash");
        assert_eq!(
            resolved.outputs[0].addresses,
            vec!["bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string()]
        );
        assert_eq!(resolved.block_time.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_coinbase_input_normalised_to_sentinel() {
        let json = r#"{
            "txid": "abababababababababababababababababababababababababababababababab",
            "vin": [ { "is_coinbase": true } ],
            "vout": [],
            "status": {}
        }"#;
        let tx: EsploraTransaction = serde_json::from_str(json).unwrap();
        let resolved = convert_transaction(tx);
        assert_eq!(resolved.inputs[0].txid, NULL_TXID);
    }

    #[test]
    fn test_unconfirmed_transaction_has_no_block_time() {
        let json = r#"{
            "txid": "abababababababababababababababababababababababababababababababab",
            "vin": [],
            "vout": [],
            "status": { "confirmed": false }
        }"#;
        let tx: EsploraTransaction = serde_json::from_str(json).unwrap();
        assert!(convert_transaction(tx).block_time.is_none());
    }

    #[test]
    fn test_script_type_normalisation() {
        assert_eq!(normalise_script_type(Some("p2pkh")), "pubkeyhash");
        assert_eq!(normalise_script_type(Some("v1_p2tr")), "witness_v1_taproot");
        assert_eq!(normalise_script_type(Some("multisig")), "multisig");
        assert_eq!(normalise_script_type(None), "unknown");
    }

    #[test]
    fn test_http_status_classification() {
        assert!(matches!(
            classify_http_status("t", reqwest::StatusCode::NOT_FOUND),
            PortError::NotFound { .. }
        ));
        assert!(matches!(
            classify_http_status("t", reqwest::StatusCode::UNAUTHORIZED),
            PortError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_http_status("t", reqwest::StatusCode::BAD_GATEWAY),
            PortError::Transient(_)
        ));
        assert!(matches!(
            classify_http_status("t", reqwest::StatusCode::BAD_REQUEST),
            PortError::Unknown(_)
        ));
    }
}

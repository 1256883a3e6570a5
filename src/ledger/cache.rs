use crate::ledger::ResolvedTransaction;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Thread-safe resolved-transaction cache for avoiding duplicate backend calls.
///
/// A trace revisits the same transaction whenever several of its outputs
/// appear in one provenance chain; the cache makes those re-resolutions
/// free. Owned per ledger handle, never shared across backends.
#[derive(Clone)]
pub struct TransactionCache {
    cache: Arc<Mutex<HashMap<String, ResolvedTransaction>>>,
    hits: Arc<Mutex<u64>>,
    misses: Arc<Mutex<u64>>,
}

impl TransactionCache {
    /// Create a new empty transaction cache
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(0)),
            misses: Arc::new(Mutex::new(0)),
        }
    }

    /// Get a resolved transaction from cache if it exists
    pub fn get(&self, txid: &str) -> Option<ResolvedTransaction> {
        let cache = self.cache.lock().unwrap();
        match cache.get(txid) {
            Some(tx) => {
                *self.hits.lock().unwrap() += 1;
                debug!("Cache hit for transaction: {}", txid);
                Some(tx.clone())
            }
            None => {
                *self.misses.lock().unwrap() += 1;
                debug!("Cache miss for transaction: {}", txid);
                None
            }
        }
    }

    /// Store a resolved transaction in the cache
    pub fn put(&self, txid: String, tx: ResolvedTransaction) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(txid.clone(), tx);
        debug!("Cached transaction: {}", txid);
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> CacheStats {
        let hits = *self.hits.lock().unwrap();
        let misses = *self.misses.lock().unwrap();
        CacheStats { hits, misses }
    }
}

impl Default for TransactionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache performance statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64 / (self.hits + self.misses) as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InputRef, ResolvedOutput};

    fn dummy_transaction(txid: &str) -> ResolvedTransaction {
        ResolvedTransaction {
            txid: txid.to_string(),
            inputs: vec![InputRef {
                txid: "cd".repeat(32),
                vout: 0,
            }],
            outputs: vec![ResolvedOutput {
                addresses: vec![],
                value_sat: 100_000,
                script_type: "pubkeyhash".to_string(),
            }],
            block_time: None,
        }
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = TransactionCache::new();
        let txid = "ab".repeat(32);

        // Miss first
        assert!(cache.get(&txid).is_none());

        // Put then hit
        cache.put(txid.clone(), dummy_transaction(&txid));
        assert!(cache.get(&txid).is_some());

        let stats = cache.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_cache_returns_stored_structure() {
        let cache = TransactionCache::new();
        let txid = "ef".repeat(32);
        cache.put(txid.clone(), dummy_transaction(&txid));

        let resolved = cache.get(&txid).unwrap();
        assert_eq!(resolved.inputs.len(), 1);
        assert_eq!(resolved.outputs[0].value_sat, 100_000);
    }

    #[test]
    fn test_empty_cache_hit_rate() {
        let cache = TransactionCache::new();
        assert_eq!(cache.get_stats().hit_rate(), 0.0);
    }
}

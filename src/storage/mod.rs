//! Persistence layer.
//!
//! The engine only needs get/put/delete/query-by-index semantics over named
//! record collections; the `RecordStore` trait is that seam. `JsonFileStore`
//! keeps the whole store as one JSON document rewritten after every
//! mutation, which is sufficient for a single-owner bankroll and bet book.
//! `MemoryStore` backs tests and ephemeral embedders.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Collection holding bet records, keyed by record id.
pub const BETS: &str = "bets";
/// Collection holding the bankroll singleton under [`BANKROLL_KEY`].
pub const BANKROLL: &str = "bankroll";
/// Key of the single bankroll record.
pub const BANKROLL_KEY: &str = "main";

/// Errors surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Asynchronous record store over named collections of JSON records.
///
/// `query_by_index` treats the index name as a top-level record field and
/// returns every record whose field equals the given string value. Enough
/// for "all bet records with status = placed" lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Upsert a record under a key.
    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    async fn get_all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    async fn query_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> Result<Vec<Value>, StoreError>;
}

type Collections = HashMap<String, BTreeMap<String, Value>>;

fn filter_by_field(collection: &BTreeMap<String, Value>, field: &str, value: &str) -> Vec<Value> {
    collection
        .values()
        .filter(|record| record.get(field).and_then(Value::as_str) == Some(value))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// File-backed store: the full collection map is read once at open and the
/// document is rewritten after every mutation, so a mutation is durable by
/// the time `put`/`delete` returns.
pub struct JsonFileStore {
    path: PathBuf,
    collections: RwLock<Collections>,
}

impl JsonFileStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let collections: Collections = if path.exists() {
            let raw = tokio::fs::read_to_string(&path).await?;
            let collections = serde_json::from_str(&raw)?;
            info!(path = %path.display(), "Store loaded from disk");
            collections
        } else {
            info!(path = %path.display(), "No store file found, starting fresh");
            Collections::new()
        };

        Ok(Self {
            path,
            collections: RwLock::new(collections),
        })
    }

    async fn flush(&self, collections: &Collections) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(collections)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "Store flushed");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), record);
        self.flush(&collections).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|c| c.remove(key))
            .is_some();
        if removed {
            self.flush(&collections).await?;
        }
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| filter_by_field(c, index, value))
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Ephemeral store with the same semantics as [`JsonFileStore`], minus the
/// disk. Used in tests and by embedders that manage durability themselves.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(c) = collections.get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &str,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| filter_by_field(c, index, value))
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("hedgebook_test_store_{}.json", uuid::Uuid::new_v4()));
        p
    }

    #[tokio::test]
    async fn test_memory_put_get_delete() {
        let store = MemoryStore::new();
        store
            .put(BETS, "b1", json!({"id": "b1", "status": "placed"}))
            .await
            .unwrap();

        let got = store.get(BETS, "b1").await.unwrap().unwrap();
        assert_eq!(got["status"], "placed");

        store.delete(BETS, "b1").await.unwrap();
        assert!(store.get(BETS, "b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_put_is_upsert() {
        let store = MemoryStore::new();
        store.put(BETS, "b1", json!({"v": 1})).await.unwrap();
        store.put(BETS, "b1", json!({"v": 2})).await.unwrap();
        let got = store.get(BETS, "b1").await.unwrap().unwrap();
        assert_eq!(got["v"], 2);
        assert_eq!(store.get_all(BETS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_query_by_index() {
        let store = MemoryStore::new();
        store
            .put(BETS, "b1", json!({"id": "b1", "status": "placed"}))
            .await
            .unwrap();
        store
            .put(BETS, "b2", json!({"id": "b2", "status": "resolved"}))
            .await
            .unwrap();
        store
            .put(BETS, "b3", json!({"id": "b3", "status": "placed"}))
            .await
            .unwrap();

        let placed = store.query_by_index(BETS, "status", "placed").await.unwrap();
        assert_eq!(placed.len(), 2);

        let cashed = store
            .query_by_index(BETS, "status", "cashed_out")
            .await
            .unwrap();
        assert!(cashed.is_empty());
    }

    #[tokio::test]
    async fn test_memory_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get("nope", "k").await.unwrap().is_none());
        assert!(store.get_all("nope").await.unwrap().is_empty());
        store.delete("nope", "k").await.unwrap();
    }

    #[tokio::test]
    async fn test_json_file_store_persists_across_open() {
        let path = temp_path();

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store
                .put(BANKROLL, BANKROLL_KEY, json!({"balance": 90.0}))
                .await
                .unwrap();
            store
                .put(BETS, "b1", json!({"id": "b1", "status": "placed"}))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let bankroll = reopened.get(BANKROLL, BANKROLL_KEY).await.unwrap().unwrap();
        assert_eq!(bankroll["balance"], 90.0);
        let placed = reopened
            .query_by_index(BETS, "status", "placed")
            .await
            .unwrap();
        assert_eq!(placed.len(), 1);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_json_file_store_delete_persists() {
        let path = temp_path();

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.put(BETS, "b1", json!({"id": "b1"})).await.unwrap();
            store.delete(BETS, "b1").await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.get(BETS, "b1").await.unwrap().is_none());

        tokio::fs::remove_file(&path).await.unwrap();
    }
}

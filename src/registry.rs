//! Named stores with per-store usage counters.
//!
//! This is the surface an outer request layer talks to: stores are addressed
//! by name, request parameters arrive as signed integers and are validated
//! here, and every successful operation is counted.
//!
//! A `distance` of zero is served by an exact `get`; anything larger runs a
//! fuzzy query.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::info;

use crate::error::{FuzzyError, Result};
use crate::{Config, FuzzyIndex};

/// Store operations tracked in [`StoreStatistics`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Store creation
    Create,
    /// Single key insert
    Set,
    /// Exact single-key lookup
    Get,
    /// Fuzzy single-key lookup
    Query,
    /// Single key deletion
    Delete,
    /// Exact or fuzzy lookup of many keys
    BatchGet,
    /// Insert of many pairs
    BatchSet,
}

/// Snapshot of the usage counters of one store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    /// Successful calls per operation
    pub operations: BTreeMap<Operation, u64>,
}

impl StoreStatistics {
    /// Successful calls of `op`.
    pub fn count(&self, op: Operation) -> u64 {
        self.operations.get(&op).copied().unwrap_or(0)
    }
}

/// Result of a lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Lookup {
    /// Value of an exact match
    Value(String),
    /// Exact lookup of an absent key inside a batch
    Missing,
    /// Best-first keys of a fuzzy lookup
    Matches(Vec<String>),
}

struct Store {
    index: Arc<FuzzyIndex>,
    stats: Mutex<StoreStatistics>,
}

impl Store {
    fn record(&self, op: Operation) {
        *self.stats.lock().operations.entry(op).or_insert(0) += 1;
    }
}

/// A set of independent [`FuzzyIndex`] stores keyed by name.
pub struct Registry {
    stores: RwLock<HashMap<String, Arc<Store>>>,
    config: Config,
}

fn non_negative(name: &'static str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| FuzzyError::InvalidParameter {
        name,
        reason: format!("must be non-negative, got {value}"),
    })
}

impl Registry {
    /// Create an empty registry whose stores use the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty registry whose stores use `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn slot(&self, name: &str) -> Result<Arc<Store>> {
        self.stores
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FuzzyError::StoreNotFound(name.to_string()))
    }

    /// Create a new empty store.
    pub fn create(&self, name: &str) -> Result<Arc<FuzzyIndex>> {
        let mut stores = self.stores.write();
        if stores.contains_key(name) {
            return Err(FuzzyError::StoreExists(name.to_string()));
        }
        let store = Arc::new(Store {
            index: Arc::new(FuzzyIndex::with_config(self.config.clone())),
            stats: Mutex::new(StoreStatistics::default()),
        });
        store.record(Operation::Create);
        let index = Arc::clone(&store.index);
        stores.insert(name.to_string(), store);
        info!(store = name, "created store");
        Ok(index)
    }

    /// Drop a store and its statistics.
    ///
    /// Handles obtained from [`Registry::store`] keep the index alive.
    pub fn remove(&self, name: &str) -> Result<()> {
        match self.stores.write().remove(name) {
            Some(store) => {
                info!(store = name, keys = store.index.len(), "removed store");
                Ok(())
            }
            None => Err(FuzzyError::StoreNotFound(name.to_string())),
        }
    }

    /// Shared handle to a store's index. Not counted.
    pub fn store(&self, name: &str) -> Result<Arc<FuzzyIndex>> {
        self.slot(name).map(|s| Arc::clone(&s.index))
    }

    /// Names of all stores, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Usage counters of one store.
    pub fn statistics(&self, name: &str) -> Result<StoreStatistics> {
        Ok(self.slot(name)?.stats.lock().clone())
    }

    /// Usage counters of every store, by name.
    pub fn all_statistics(&self) -> BTreeMap<String, StoreStatistics> {
        self.stores
            .read()
            .iter()
            .map(|(name, store)| (name.clone(), store.stats.lock().clone()))
            .collect()
    }

    /// Insert or overwrite a key in a store.
    pub fn set(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let store = self.slot(name)?;
        store.index.set(key, value);
        store.record(Operation::Set);
        Ok(())
    }

    /// Insert many pairs into a store. Returns the number of new keys.
    pub fn set_many<I, K, V>(&self, name: &str, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let store = self.slot(name)?;
        let added = store.index.set_many(pairs);
        store.record(Operation::BatchSet);
        Ok(added)
    }

    /// Delete a key from a store. Deleting an absent key is an error here.
    pub fn delete(&self, name: &str, key: &str) -> Result<()> {
        let store = self.slot(name)?;
        if !store.index.delete(key) {
            return Err(FuzzyError::KeyNotFound(key.to_string()));
        }
        store.record(Operation::Delete);
        Ok(())
    }

    /// Look up one key.
    ///
    /// `distance == 0` returns the exact value ([`Lookup::Value`]) or
    /// [`FuzzyError::KeyNotFound`]. A positive distance returns up to
    /// `results` best-first keys ([`Lookup::Matches`]). Negative parameters
    /// are rejected.
    pub fn lookup(&self, name: &str, key: &str, distance: i64, results: i64) -> Result<Lookup> {
        let distance = non_negative("distance", distance)?;
        let store = self.slot(name)?;

        if distance == 0 {
            let value = store
                .index
                .get(key)
                .ok_or_else(|| FuzzyError::KeyNotFound(key.to_string()))?;
            store.record(Operation::Get);
            return Ok(Lookup::Value(value));
        }

        let results = non_negative("results", results)?;
        let matches = store.index.query(key, distance, results);
        store.record(Operation::Query);
        Ok(Lookup::Matches(matches))
    }

    /// Look up many keys, in parallel for fuzzy lookups.
    ///
    /// Output order follows `keys`. Exact misses become [`Lookup::Missing`].
    pub fn lookup_batch<S>(
        &self,
        name: &str,
        keys: &[S],
        distance: i64,
        results: i64,
    ) -> Result<Vec<Lookup>>
    where
        S: AsRef<str> + Sync,
    {
        let distance = non_negative("distance", distance)?;
        let store = self.slot(name)?;

        let out = if distance == 0 {
            keys.iter()
                .map(|k| match store.index.get(k) {
                    Some(value) => Lookup::Value(value),
                    None => Lookup::Missing,
                })
                .collect()
        } else {
            let results = non_negative("results", results)?;
            store
                .index
                .query_batch(keys, distance, results)
                .into_iter()
                .map(Lookup::Matches)
                .collect()
        };
        store.record(Operation::BatchGet);
        Ok(out)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

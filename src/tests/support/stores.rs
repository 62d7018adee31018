// Storage tiers with injectable faults for end-to-end tests.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::db::error::StoreError;
use crate::db::storage::{CacheStore, InMemoryCacheStore, InMemoryPersistentStore, PersistentStore};

pub type Rows = Arc<InMemoryPersistentStore<String, String>>;

/// What a faulty tier does for a poisoned key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Fail,
    Panic,
}

#[derive(Default)]
struct Faults {
    keys: Mutex<Vec<(String, Fault)>>,
}

impl Faults {
    fn set(&self, key: &str, fault: Fault) {
        let mut keys = self.keys.lock();
        keys.retain(|(k, _)| k != key);
        keys.push((key.to_string(), fault));
    }

    fn clear(&self, key: &str) {
        self.keys.lock().retain(|(k, _)| k != key);
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        let fault = self
            .keys
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, f)| *f);
        match fault {
            None => Ok(()),
            Some(Fault::Fail) => Err(StoreError::backend(anyhow::anyhow!("injected failure for {}", key))),
            Some(Fault::Panic) => panic!("injected panic for {}", key),
        }
    }
}

/// Persistent tier failing writes for poisoned keys.
#[derive(Default)]
pub struct FaultyRows {
    pub rows: InMemoryPersistentStore<String, String>,
    faults: Faults,
}

impl FaultyRows {
    pub fn poison(&self, key: &str, fault: Fault) {
        self.faults.set(key, fault);
    }

    pub fn heal(&self, key: &str) {
        self.faults.clear(key);
    }
}

impl PersistentStore<String, String> for FaultyRows {
    fn write(&self, key: &String, value: &String) -> Result<(), StoreError> {
        self.faults.check(key)?;
        self.rows.write(key, value)
    }

    fn read(&self, key: &String) -> Result<String, StoreError> {
        self.rows.read(key)
    }

    fn remove(&self, key: &String) -> Result<(), StoreError> {
        self.rows.remove(key)
    }
}

/// Cache tier failing puts for poisoned keys and recording which thread touched each key.
pub struct FaultyCache {
    inner: InMemoryCacheStore<String, String>,
    faults: Faults,
    threads: Mutex<Vec<(String, String)>>,
}

impl FaultyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: InMemoryCacheStore::new(capacity),
            faults: Faults::default(),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn poison(&self, key: &str, fault: Fault) {
        self.faults.set(key, fault);
    }

    pub fn heal(&self, key: &str) {
        self.faults.clear(key);
    }

    /// Distinct thread names that accessed `key`.
    pub fn threads_for(&self, key: &str) -> HashSet<String> {
        self.threads
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, t)| t.clone())
            .collect()
    }

    fn record(&self, key: &str) {
        let name = thread::current().name().unwrap_or("unnamed").to_string();
        self.threads.lock().push((key.to_string(), name));
    }
}

impl CacheStore<String, String> for FaultyCache {
    fn put(&self, key: &String, value: &String) -> Result<(), StoreError> {
        self.record(key);
        self.faults.check(key)?;
        self.inner.put(key, value)
    }

    fn get(&self, key: &String) -> Result<String, StoreError> {
        self.record(key);
        self.inner.get(key)
    }

    fn remove(&self, key: &String) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    fn contains_key(&self, key: &String) -> bool {
        self.inner.contains_key(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

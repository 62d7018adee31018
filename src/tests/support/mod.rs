// Shared test support code for end-to-end tests.

pub mod harness;
pub mod policies;
pub mod stores;

pub use harness::{init_test_logging, Engine, EngineSpec};
pub use policies::SlowEviction;
pub use stores::{Fault, FaultyCache, FaultyRows, Rows};

/// Blocks on a handle and unwraps it, naming the key on failure.
pub fn put_ok(engine: &Engine, key: &str, value: &str) {
    engine
        .put(key.to_string(), value.to_string())
        .wait()
        .unwrap_or_else(|e| panic!("put {} failed: {}", key, e));
}

pub fn get_value(engine: &Engine, key: &str) -> Option<String> {
    engine.get(key.to_string()).wait().ok()
}

/// Returns `n` keys that are owned by pairwise distinct workers.
pub fn keys_on_distinct_workers(engine: &Engine, n: usize) -> Vec<String> {
    let mut owners = Vec::with_capacity(n);
    let mut keys = Vec::with_capacity(n);
    for i in 0.. {
        if keys.len() == n {
            break;
        }
        let key = format!("k-{}", i);
        let owner = engine.owner_index_of(&key);
        if !owners.contains(&owner) {
            owners.push(owner);
            keys.push(key);
        }
    }
    keys
}

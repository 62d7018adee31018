//! Tests for the cache engine.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    use crate::config::new_test_config;
    use crate::db::engine::CacheEngine;
    use crate::db::error::{CacheError, StoreError};
    use crate::db::eviction::{new_eviction, EvictionKind};
    use crate::db::storage::{InMemoryCacheStore, InMemoryPersistentStore, PersistentStore};
    use crate::db::write::{new_write_policy, WriteKind};

    type Engine = CacheEngine<String, String>;
    type Rows = Arc<InMemoryPersistentStore<String, String>>;

    fn new_engine_with(
        capacity: usize,
        workers: usize,
        eviction: EvictionKind,
        write: WriteKind,
    ) -> (Engine, Rows) {
        let cache: Arc<InMemoryCacheStore<String, String>> =
            Arc::new(InMemoryCacheStore::new(capacity));
        let rows: Rows = Arc::new(InMemoryPersistentStore::new());
        let engine = CacheEngine::new(
            cache,
            rows.clone(),
            new_write_policy(write),
            new_eviction(eviction),
            workers,
        )
        .unwrap();
        (engine, rows)
    }

    fn new_engine(capacity: usize, workers: usize) -> (Engine, Rows) {
        new_engine_with(capacity, workers, EvictionKind::Lru, WriteKind::WriteThrough)
    }

    fn put(engine: &Engine, key: &str, value: &str) {
        engine.put(key.to_string(), value.to_string()).wait().unwrap();
    }

    fn get(engine: &Engine, key: &str) -> Result<String, CacheError> {
        engine.get(key.to_string()).wait()
    }

    /// Test that inserting one key past capacity evicts the least recently used one.
    #[test]
    fn test_overflow_evicts_least_recently_used() {
        let (engine, rows) = new_engine(5, 4);

        for key in ["A", "B", "C", "D", "E", "F"] {
            put(&engine, key, &format!("value-{}", key));
        }

        assert_eq!(engine.len(), 5);
        assert!(matches!(get(&engine, "A"), Err(CacheError::NotFound)));
        for key in ["B", "C", "D", "E", "F"] {
            assert_eq!(get(&engine, key).unwrap(), format!("value-{}", key));
        }
        // Eviction only touches the cache tier.
        assert_eq!(rows.read(&"A".to_string()).unwrap(), "value-A");
        assert_eq!(engine.stats().evictions(), 1);
    }

    /// Test that a read protects a key from being the next victim.
    #[test]
    fn test_get_refreshes_recency() {
        let (engine, _rows) = new_engine(5, 4);

        for key in ["A", "B", "C", "D", "E", "F"] {
            put(&engine, key, key);
        }
        assert_eq!(get(&engine, "B").unwrap(), "B");
        put(&engine, "G", "G");

        assert!(matches!(get(&engine, "C"), Err(CacheError::NotFound)));
        assert!(engine.contains(&"B".to_string()));
        assert!(engine.contains(&"G".to_string()));
        assert_eq!(engine.len(), 5);
    }

    /// Test that a get submitted after a put on the same key observes the put.
    #[test]
    fn test_read_your_own_write() {
        let (engine, rows) = new_engine(16, 4);

        let write = engine.put("k".to_string(), "v1".to_string());
        let read = engine.get("k".to_string());
        write.wait().unwrap();
        assert_eq!(read.wait().unwrap(), "v1");

        let write = engine.put("k".to_string(), "v2".to_string());
        let read = engine.get("k".to_string());
        write.wait().unwrap();
        assert_eq!(read.wait().unwrap(), "v2");
        assert_eq!(rows.read(&"k".to_string()).unwrap(), "v2");
    }

    /// Test that overwriting a resident key never evicts.
    #[test]
    fn test_update_does_not_evict() {
        let (engine, _rows) = new_engine(2, 2);

        put(&engine, "a", "1");
        put(&engine, "b", "1");
        put(&engine, "a", "2");

        assert_eq!(engine.len(), 2);
        assert_eq!(get(&engine, "a").unwrap(), "2");
        assert_eq!(get(&engine, "b").unwrap(), "1");
        let stats = engine.stats();
        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.evictions(), 0);
    }

    /// Test that a missing key resolves with NotFound and counts a miss.
    #[test]
    fn test_get_absent_key() {
        let (engine, _rows) = new_engine(2, 2);

        assert!(matches!(get(&engine, "ghost"), Err(CacheError::NotFound)));
        put(&engine, "real", "x");
        get(&engine, "real").unwrap();

        let stats = engine.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    /// Test that the cache never holds more than capacity keys under concurrent writers.
    #[test]
    fn test_capacity_holds_under_concurrency() {
        let (engine, rows) = new_engine(8, 4);
        let engine = Arc::new(engine);

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let engine = engine.clone();
                thread::spawn(move || {
                    let pending: Vec<_> = (0..250)
                        .map(|i| engine.put(format!("key-{}", (i * 7 + w) % 100), format!("{}", i)))
                        .collect();
                    for p in pending {
                        p.wait().unwrap();
                        assert!(engine.len() <= 8);
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        assert!(engine.len() <= 8);
        assert_eq!(rows.len(), 100);
        assert!(engine.stats().evictions() > 0);
    }

    /// Test that victims owned by other workers are removed through their owner.
    #[test]
    fn test_cross_worker_eviction() {
        let (engine, _rows) = new_engine(3, 4);

        for i in 0..40 {
            put(&engine, &format!("k{}", i), "v");
        }

        let stats = engine.stats();
        assert_eq!(engine.len(), 3);
        assert_eq!(stats.evictions(), 37);
        assert!(stats.evictions_remote > 0);
    }

    /// Test that remove deletes from both tiers and frees the slot.
    #[test]
    fn test_remove_frees_slot() {
        let (engine, rows) = new_engine(1, 2);

        put(&engine, "a", "1");
        engine.remove("a".to_string()).wait().unwrap();

        assert!(matches!(get(&engine, "a"), Err(CacheError::NotFound)));
        assert!(matches!(rows.read(&"a".to_string()), Err(StoreError::NotFound)));

        put(&engine, "b", "2");
        assert_eq!(engine.stats().evictions(), 0);
        assert_eq!(engine.stats().removals, 1);

        let again = engine.remove("a".to_string()).wait();
        assert!(matches!(again, Err(CacheError::NotFound)));
    }

    /// Test that load promotes a persisted value into the cache tier.
    #[test]
    fn test_load_reads_through() {
        let (engine, rows) = new_engine(2, 2);
        rows.write(&"cold".to_string(), &"stored".to_string()).unwrap();

        assert!(matches!(get(&engine, "cold"), Err(CacheError::NotFound)));
        assert_eq!(engine.load("cold".to_string()).wait().unwrap(), "stored");
        assert!(engine.contains(&"cold".to_string()));
        assert_eq!(get(&engine, "cold").unwrap(), "stored");

        let missing = engine.load("nowhere".to_string()).wait();
        assert!(matches!(missing, Err(CacheError::NotFound)));
    }

    /// Test that promotion evicts like an insert does.
    #[test]
    fn test_load_respects_capacity() {
        let (engine, rows) = new_engine(2, 2);
        put(&engine, "a", "1");
        put(&engine, "b", "2");
        rows.write(&"c".to_string(), &"3".to_string()).unwrap();

        engine.load("c".to_string()).wait().unwrap();

        assert_eq!(engine.len(), 2);
        assert!(!engine.contains(&"a".to_string()));
    }

    /// Test that write-around keeps writes out of the cache tier.
    #[test]
    fn test_write_around_bypasses_cache() {
        let (engine, rows) = new_engine_with(2, 2, EvictionKind::Lru, WriteKind::WriteAround);

        for key in ["a", "b", "c"] {
            put(&engine, key, key);
        }
        assert!(engine.is_empty());
        assert_eq!(rows.len(), 3);

        assert_eq!(engine.load("a".to_string()).wait().unwrap(), "a");
        assert_eq!(engine.len(), 1);

        // Overwriting invalidates the cached copy.
        put(&engine, "a", "new");
        assert!(!engine.contains(&"a".to_string()));
        assert_eq!(engine.load("a".to_string()).wait().unwrap(), "new");
    }

    /// Test that FIFO eviction ignores reads.
    #[test]
    fn test_fifo_engine_ignores_reads() {
        let (engine, _rows) = new_engine_with(2, 2, EvictionKind::Fifo, WriteKind::WriteThrough);

        put(&engine, "a", "1");
        put(&engine, "b", "2");
        get(&engine, "a").unwrap();
        put(&engine, "c", "3");

        assert!(!engine.contains(&"a".to_string()));
        assert!(engine.contains(&"b".to_string()));
    }

    /// Test that a zero-capacity cache tier is refused.
    #[test]
    fn test_zero_capacity_is_invalid() {
        let cache: Arc<InMemoryCacheStore<String, String>> = Arc::new(InMemoryCacheStore::new(0));
        let rows: Rows = Arc::new(InMemoryPersistentStore::new());
        let res = CacheEngine::new(
            cache,
            rows,
            new_write_policy(WriteKind::WriteThrough),
            new_eviction(EvictionKind::Lru),
            2,
        );
        assert!(matches!(res, Err(CacheError::InvalidConfig(_))));
    }

    /// Test that operations after shutdown resolve with ExecutorStopped.
    #[test]
    fn test_operations_after_shutdown() {
        let (engine, _rows) = new_engine(2, 2);
        put(&engine, "a", "1");

        engine.shutdown();
        engine.shutdown();

        let res = engine.put("b".to_string(), "2".to_string()).wait();
        assert!(matches!(res, Err(CacheError::ExecutorStopped)));
        let res = engine.get("a".to_string()).wait();
        assert!(matches!(res, Err(CacheError::ExecutorStopped)));
    }

    /// Test that an engine assembled from config honours its settings.
    #[test]
    fn test_from_config() {
        let cfg = new_test_config();
        let rows: Rows = Arc::new(InMemoryPersistentStore::new());
        let engine: Engine = CacheEngine::from_config(&cfg, rows).unwrap();

        assert_eq!(engine.capacity(), 5);
        assert_eq!(engine.worker_count(), 4);
        let key = "x".to_string();
        assert_eq!(engine.owner_index_of(&key), engine.owner_index_of(&key));
    }

    /// Test that engine handles can be awaited from async code.
    #[tokio::test]
    async fn test_async_put_get() {
        let (engine, _rows) = new_engine(4, 2);

        engine.put("k".to_string(), "v".to_string()).await.unwrap();
        assert_eq!(engine.get("k".to_string()).await.unwrap(), "v");

        let handles: Vec<_> = (0..10)
            .map(|i| engine.put(format!("n{}", i), i.to_string()))
            .collect();
        for res in futures::future::join_all(handles).await {
            res.unwrap();
        }
        assert!(engine.len() <= 4);
    }

    /// Test that the stats logger stops once its token is cancelled.
    #[tokio::test]
    async fn test_stats_logger_stops_on_cancel() {
        let (engine, _rows) = new_engine(4, 2);
        let token = CancellationToken::new();
        let logger = tokio::spawn(engine.stats_logger(token.clone(), Duration::from_millis(10)));

        engine.put("k".to_string(), "v".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), logger)
            .await
            .unwrap()
            .unwrap();
    }
}

//! Cache engine: a capacity-bounded cache tier in front of a persistent tier.
//
// Every operation on a key runs on the worker that owns the key, so operations on one key
// are serialized without per-key locks. Eviction picks a victim from the shared policy; when
// the victim belongs to another worker its removal is sent to that worker's urgent lane.
//
// Capacity is enforced with slot accounting: resident keys plus in-flight inserts that hold a
// reservation. An insert reserves a slot before deciding whether to evict, so inserts racing on
// different workers cannot jointly overshoot capacity. An insert that finds the tier full owes
// one eviction, settled by its own victim or by any slot freed elsewhere in the meantime.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigTrait};
use crate::db::counters::{Counters, Snapshot};
use crate::db::error::{CacheError, StoreError};
use crate::db::eviction::{new_eviction, EvictionPolicy};
use crate::db::slots::Slots;
use crate::db::storage::{CacheStore, InMemoryCacheStore, PersistentStore};
use crate::db::telemetry;
use crate::db::write::{new_write_policy, WritePolicy};
use crate::db::{CacheKey, CacheValue};
use crate::workers::{KeyAffinityExecutor, Pending};

const ENGINE_NAME: &str = "cache-engine";
const WORKER_NAME: &str = "cache-worker";

pub struct CacheEngine<K: CacheKey, V: CacheValue> {
    inner: Arc<Inner<K, V>>,
}

struct Inner<K: CacheKey, V: CacheValue> {
    cache: Arc<dyn CacheStore<K, V>>,
    persistent: Arc<dyn PersistentStore<K, V>>,
    write_policy: Box<dyn WritePolicy<K, V>>,
    eviction: Box<dyn EvictionPolicy<K>>,
    executor: KeyAffinityExecutor,
    capacity: usize,
    slots: Slots,
    /// Inserts parked until a victim or a credit shows up.
    waiting: AtomicUsize,
    counters: Arc<Counters>,
    stopped: AtomicBool,
}

/// A slot held by an insert in flight. Released on drop unless kept.
struct Reservation<'a, K: CacheKey, V: CacheValue> {
    inner: &'a Inner<K, V>,
    owes: bool,
    held: bool,
}

impl<K: CacheKey, V: CacheValue> Reservation<'_, K, V> {
    /// The key became resident; the slot now belongs to it.
    fn keep(mut self) {
        self.held = false;
    }
}

impl<K: CacheKey, V: CacheValue> Drop for Reservation<'_, K, V> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let credited = if self.owes {
            self.inner.slots.abandon()
        } else {
            self.inner.slots.release()
        };
        if credited {
            self.inner.wake_waiters();
        }
    }
}

/// What unblocks an insert that owes an eviction.
enum Room<K> {
    /// A slot freed elsewhere settled the debt.
    Freed,
    Victim(K),
}

impl<K: CacheKey, V: CacheValue> CacheEngine<K, V> {
    /// Builds an engine and starts `worker_count` worker threads.
    ///
    /// The cache tier must start empty and report a non-zero capacity.
    pub fn new(
        cache: Arc<dyn CacheStore<K, V>>,
        persistent: Arc<dyn PersistentStore<K, V>>,
        write_policy: Box<dyn WritePolicy<K, V>>,
        eviction: Box<dyn EvictionPolicy<K>>,
        worker_count: usize,
    ) -> Result<Self, CacheError> {
        let capacity = cache.capacity();
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "cache capacity must be greater than zero".to_string(),
            ));
        }
        if !cache.is_empty() {
            return Err(CacheError::InvalidConfig(
                "cache tier must be empty when the engine starts".to_string(),
            ));
        }

        let executor = KeyAffinityExecutor::new(WORKER_NAME, worker_count)?;

        info!(
            component = "engine",
            event = "started",
            workers = worker_count,
            capacity = capacity,
            "cache engine started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                cache,
                persistent,
                write_policy,
                eviction,
                executor,
                capacity,
                slots: Slots::new(capacity),
                waiting: AtomicUsize::new(0),
                counters: Arc::new(Counters::new()),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    /// Builds an engine with an in-memory cache tier and the policies named in `cfg`.
    pub fn from_config(
        cfg: &Config,
        persistent: Arc<dyn PersistentStore<K, V>>,
    ) -> Result<Self, CacheError> {
        let cache: Arc<dyn CacheStore<K, V>> = Arc::new(InMemoryCacheStore::new(cfg.capacity()));
        Self::new(
            cache,
            persistent,
            new_write_policy(cfg.write()),
            new_eviction(cfg.eviction()),
            cfg.workers(),
        )
    }

    /// Reads `key` from the cache tier. Resolves with `NotFound` on a miss.
    pub fn get(&self, key: K) -> Pending<V> {
        let inner = Arc::clone(&self.inner);
        let owner = inner.executor.owner_index_of(&key);
        self.inner.executor.submit_to(owner, move || inner.get(&key))
    }

    /// Writes `key = value` through the write policy, evicting if the cache is full.
    pub fn put(&self, key: K, value: V) -> Pending<()> {
        let inner = Arc::clone(&self.inner);
        let owner = inner.executor.owner_index_of(&key);
        self.inner
            .executor
            .submit_to(owner, move || inner.put(owner, &key, &value))
    }

    /// Deletes `key` from both tiers.
    pub fn remove(&self, key: K) -> Pending<()> {
        let inner = Arc::clone(&self.inner);
        let owner = inner.executor.owner_index_of(&key);
        self.inner.executor.submit_to(owner, move || inner.remove(&key))
    }

    /// Read-through: serves `key` from the cache tier, or reads it from the persistent tier
    /// and promotes it into the cache.
    pub fn load(&self, key: K) -> Pending<V> {
        let inner = Arc::clone(&self.inner);
        let owner = inner.executor.owner_index_of(&key);
        self.inner
            .executor
            .submit_to(owner, move || inner.load(owner, &key))
    }

    /// Whether `key` is resident in the cache tier. Not ordered with queued operations.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.cache.contains_key(key)
    }

    /// Number of keys resident in the cache tier.
    pub fn len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn worker_count(&self) -> usize {
        self.inner.executor.worker_count()
    }

    pub fn owner_index_of(&self, key: &K) -> usize {
        self.inner.executor.owner_index_of(key)
    }

    pub fn stats(&self) -> Snapshot {
        self.inner.counters.snapshot()
    }

    /// Future that logs counter deltas every `each` until `shutdown_token` is cancelled.
    pub fn stats_logger(
        &self,
        shutdown_token: CancellationToken,
        each: Duration,
    ) -> impl Future<Output = ()> + Send + 'static {
        let cache = Arc::clone(&self.inner.cache);
        let len: Arc<dyn Fn() -> usize + Send + Sync> = Arc::new(move || cache.len());
        telemetry::logger(
            shutdown_token,
            ENGINE_NAME.to_string(),
            Arc::clone(&self.inner.counters),
            len,
            self.inner.capacity,
            each,
        )
    }

    /// Drains every queued operation and stops the workers. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.executor.shutdown();
        telemetry::log_final(ENGINE_NAME, &self.stats(), self.len(), self.capacity());
    }
}

impl<K: CacheKey, V: CacheValue> Drop for CacheEngine<K, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<K: CacheKey, V: CacheValue> Inner<K, V> {
    fn get(&self, key: &K) -> Result<V, CacheError> {
        match self.cache.get(key) {
            Ok(value) => {
                self.eviction.key_accessed(key);
                Counters::incr(&self.counters.hits);
                Ok(value)
            }
            Err(StoreError::NotFound) => {
                Counters::incr(&self.counters.misses);
                Err(CacheError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn put(self: &Arc<Self>, from: usize, key: &K, value: &V) -> Result<(), CacheError> {
        let existed = self.cache.contains_key(key);
        let reservation = if !existed && self.write_policy.caches_writes() {
            Some(self.reserve(from)?)
        } else {
            None
        };

        let res = self
            .write_policy
            .write(key, value, &*self.cache, &*self.persistent);
        self.settle(key, existed, reservation);

        match &res {
            Ok(()) if existed => Counters::incr(&self.counters.updates),
            Ok(()) => Counters::incr(&self.counters.inserts),
            Err(CacheError::PropagationFailure { .. }) => {
                Counters::incr(&self.counters.propagation_failures)
            }
            Err(_) => {}
        }
        res
    }

    fn remove(&self, key: &K) -> Result<(), CacheError> {
        let existed = self.cache.contains_key(key);
        let res = self
            .write_policy
            .delete(key, &*self.cache, &*self.persistent);

        if !self.cache.contains_key(key) {
            self.eviction.forget(key);
            if existed {
                self.free_slot();
            }
        }
        if res.is_ok() {
            Counters::incr(&self.counters.removals);
        }
        res
    }

    fn load(self: &Arc<Self>, from: usize, key: &K) -> Result<V, CacheError> {
        match self.get(key) {
            Err(CacheError::NotFound) => {}
            other => return other,
        }

        let value = self.persistent.read(key)?;
        let reservation = self.reserve(from)?;
        if let Err(err) = self.cache.put(key, &value) {
            warn!(
                component = "engine",
                event = "promotion_failed",
                key = ?key,
                error = %err,
                "read-through value not cached"
            );
        }
        self.settle(key, false, Some(reservation));
        if self.cache.contains_key(key) {
            Counters::incr(&self.counters.inserts);
        }
        Ok(value)
    }

    /// Brings the eviction state and slot accounting in line with whether `key` ended up resident.
    fn settle(&self, key: &K, existed: bool, reservation: Option<Reservation<'_, K, V>>) {
        if self.cache.contains_key(key) {
            match reservation {
                Some(reservation) => reservation.keep(),
                None if !existed => {
                    self.slots.acquire();
                }
                None => {}
            }
            self.eviction.key_accessed(key);
            if !existed {
                // A new victim candidate for parked inserts.
                self.wake_waiters();
            }
        } else {
            self.eviction.forget(key);
            if existed {
                self.free_slot();
            }
        }
    }

    /// Takes a slot for a new key, evicting one victim when the cache is full.
    fn reserve(self: &Arc<Self>, from: usize) -> Result<Reservation<'_, K, V>, CacheError> {
        let mut reservation = Reservation {
            inner: &**self,
            owes: self.slots.acquire(),
            held: true,
        };
        if reservation.owes {
            self.make_room(from)?;
            reservation.owes = false;
        }
        Ok(reservation)
    }

    /// Settles the eviction a reservation on a full tier owes.
    fn make_room(self: &Arc<Self>, from: usize) -> Result<(), CacheError> {
        loop {
            match self.next_room(from) {
                Room::Freed => return Ok(()),
                Room::Victim(victim) => {
                    // Whether or not it was still resident, re-check for a credit.
                    self.evict(from, victim)?;
                }
            }
        }
    }

    /// Claims a credit or takes a victim. Parks the worker while neither exists, serving
    /// its urgent lane until a slot is freed or a key becomes resident.
    fn next_room(&self, from: usize) -> Room<K> {
        let poll = || {
            if self.slots.claim() {
                return Some(Room::Freed);
            }
            self.eviction.evict_key().map(Room::Victim)
        };
        if let Some(room) = poll() {
            return room;
        }

        self.waiting.fetch_add(1, Ordering::SeqCst);
        let room = self.executor.serve_urgent_until(from, poll);
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        room
    }

    fn free_slot(&self) {
        if self.slots.release() {
            self.wake_waiters();
        }
    }

    fn wake_waiters(&self) {
        if self.waiting.load(Ordering::SeqCst) > 0 {
            self.executor.wake_all();
        }
    }

    /// Removes `victim` on its owning worker. False when it was no longer resident.
    fn evict(self: &Arc<Self>, from: usize, victim: K) -> Result<bool, CacheError> {
        let owner = self.executor.owner_index_of(&victim);
        let inner = Arc::clone(self);
        let target = victim.clone();
        let removed = self
            .executor
            .call_on_owner(from, &victim, move || inner.remove_victim(&target))?;

        if removed {
            let counter = if owner == from {
                &self.counters.evictions_local
            } else {
                &self.counters.evictions_remote
            };
            Counters::incr(counter);
            debug!(
                component = "engine",
                event = "evicted",
                key = ?victim,
                owner = owner,
                from = from,
                "key evicted"
            );
        }
        Ok(removed)
    }

    /// Runs on the victim's owner. Never evicts.
    fn remove_victim(&self, victim: &K) -> Result<bool, CacheError> {
        let removed = match self.cache.remove(victim) {
            Ok(()) => true,
            Err(StoreError::NotFound) => false,
            Err(err) => {
                // Still resident, keep it evictable.
                self.eviction.key_accessed(victim);
                self.wake_waiters();
                return Err(err.into());
            }
        };
        self.eviction.forget(victim);
        if removed {
            self.free_slot();
        }
        Ok(removed)
    }
}

// Eviction policy wrappers for timing-sensitive tests.

use std::thread;
use std::time::Duration;

use crate::db::eviction::EvictionPolicy;

/// Delays every victim selection, holding inserts on a full cache in that window.
pub struct SlowEviction {
    inner: Box<dyn EvictionPolicy<String>>,
    delay: Duration,
}

impl SlowEviction {
    pub fn new(inner: Box<dyn EvictionPolicy<String>>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl EvictionPolicy<String> for SlowEviction {
    fn key_accessed(&self, key: &String) {
        self.inner.key_accessed(key);
    }

    fn evict_key(&self) -> Option<String> {
        thread::sleep(self.delay);
        self.inner.evict_key()
    }

    fn forget(&self, key: &String) {
        self.inner.forget(key);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

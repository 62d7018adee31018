//! Slot accounting for the cache tier.
//
// `used` counts resident keys plus inserts holding a slot. An insert that finds the tier full
// still takes a slot but owes one eviction. A slot freed while the tier is over capacity becomes
// a credit that settles one owed eviction, whichever insert picks it up.

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Counts {
    used: usize,
    credits: usize,
}

#[derive(Debug)]
pub(crate) struct Slots {
    capacity: usize,
    counts: Mutex<Counts>,
}

impl Slots {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            counts: Mutex::new(Counts::default()),
        }
    }

    /// Takes a slot. True when the tier was already full and the caller owes an eviction.
    pub(crate) fn acquire(&self) -> bool {
        let mut counts = self.counts.lock();
        counts.used += 1;
        counts.used > self.capacity
    }

    /// Frees a slot held by a resident key or a settled insert.
    /// True when the freed slot became a credit.
    pub(crate) fn release(&self) -> bool {
        let mut counts = self.counts.lock();
        Self::free(&mut counts, self.capacity)
    }

    /// Settles one owed eviction with a credit, if there is one.
    pub(crate) fn claim(&self) -> bool {
        let mut counts = self.counts.lock();
        if counts.credits == 0 {
            return false;
        }
        counts.credits -= 1;
        true
    }

    /// Frees the slot of an insert that gives up while still owing an eviction.
    /// True when the freed slot became a credit.
    pub(crate) fn abandon(&self) -> bool {
        let mut counts = self.counts.lock();
        if counts.credits > 0 {
            counts.credits -= 1;
            return Self::free(&mut counts, self.capacity);
        }
        counts.used -= 1;
        false
    }

    #[cfg(test)]
    pub(crate) fn used(&self) -> usize {
        self.counts.lock().used
    }

    #[cfg(test)]
    pub(crate) fn credits(&self) -> usize {
        self.counts.lock().credits
    }

    fn free(counts: &mut Counts, capacity: usize) -> bool {
        let credited = counts.used > capacity;
        if credited {
            counts.credits += 1;
        }
        counts.used -= 1;
        credited
    }
}

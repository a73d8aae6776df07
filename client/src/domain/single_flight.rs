//! In-flight guards.
//!
//! `SingleFlight` is a single-slot lock: at most one holder at a time, and a
//! failed `try_acquire` returns immediately instead of waiting. `KeyedSingleFlight`
//! applies the same rule independently per key (one slot per event id).
//! Permits release on drop, so a cancelled future never leaves the slot taken.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // State behind these locks stays consistent even if a holder panicked
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-slot lock that remembers a label for whoever holds it
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    holder: Arc<Mutex<Option<String>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot if it is free. `label` identifies the holder (e.g. the phone being notified).
    pub fn try_acquire(&self, label: &str) -> Option<SingleFlightPermit> {
        let mut holder = lock(&self.holder);
        if holder.is_some() {
            return None;
        }
        *holder = Some(label.to_string());
        Some(SingleFlightPermit {
            holder: Arc::clone(&self.holder),
        })
    }

    pub fn is_held(&self) -> bool {
        lock(&self.holder).is_some()
    }

    /// Label of the current holder, if any
    pub fn holder(&self) -> Option<String> {
        lock(&self.holder).clone()
    }
}

/// Proof of holding a `SingleFlight` slot
#[derive(Debug)]
pub struct SingleFlightPermit {
    holder: Arc<Mutex<Option<String>>>,
}

impl SingleFlightPermit {
    /// Give the slot back. Equivalent to dropping the permit.
    pub fn release(self) {}
}

impl Drop for SingleFlightPermit {
    fn drop(&mut self) {
        *lock(&self.holder) = None;
    }
}

/// One single-flight slot per key
#[derive(Debug, Clone)]
pub struct KeyedSingleFlight<K: Eq + Hash + Clone> {
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Default for KeyedSingleFlight<K> {
    fn default() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedSingleFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: K) -> Option<KeyedPermit<K>> {
        let mut active = lock(&self.active);
        if !active.insert(key.clone()) {
            return None;
        }
        Some(KeyedPermit {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_held(&self, key: &K) -> bool {
        lock(&self.active).contains(key)
    }
}

#[derive(Debug)]
pub struct KeyedPermit<K: Eq + Hash + Clone> {
    key: K,
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> Drop for KeyedPermit<K> {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let flight = SingleFlight::new();

        let permit = flight.try_acquire("+998901111111").unwrap();
        assert!(flight.is_held());
        assert_eq!(flight.holder().as_deref(), Some("+998901111111"));
        assert!(flight.try_acquire("+998902222222").is_none());

        permit.release();
        assert!(!flight.is_held());
        assert!(flight.try_acquire("+998902222222").is_some());
    }

    #[test]
    fn test_drop_releases_slot() {
        let flight = SingleFlight::new();
        {
            let _permit = flight.try_acquire("a").unwrap();
        }
        assert!(flight.holder().is_none());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let flight = SingleFlight::new();
        let other = flight.clone();
        let _permit = flight.try_acquire("a").unwrap();
        assert!(other.try_acquire("b").is_none());
    }

    #[test]
    fn test_keyed_slots_are_independent() {
        let flights = KeyedSingleFlight::new();

        let first = flights.try_acquire(1_i64).unwrap();
        assert!(flights.try_acquire(1).is_none());
        let _other = flights.try_acquire(2).unwrap();

        drop(first);
        assert!(!flights.is_held(&1));
        assert!(flights.is_held(&2));
        assert!(flights.try_acquire(1).is_some());
    }
}

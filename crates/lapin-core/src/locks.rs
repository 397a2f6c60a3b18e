//! Per-record mutation exclusivity.
//!
//! Every username maps to its own `Mutex<()>`. Operations that touch several
//! records acquire their locks in ascending username order, so two players
//! attacking each other at the same time cannot deadlock. The registry mutex
//! is only held while looking up handles, never while a record lock is
//! waited on. Entries nobody holds a handle to are evicted when a
//! [`LockSet`] is dropped, so the registry only tracks records in use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{EngineError, EngineResult};

type Registry = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Registry of record locks.
#[derive(Debug, Default)]
pub struct RecordLocks {
    registry: Registry,
}

/// Lock handles for a set of records, sorted by username.
#[derive(Debug)]
pub struct LockSet<'r> {
    registry: &'r Registry,
    handles: Vec<(String, Arc<Mutex<()>>)>,
}

/// Guards held while a set of records is being mutated.
#[derive(Debug)]
pub struct LockGuards<'a> {
    guards: Vec<MutexGuard<'a, ()>>,
}

impl LockGuards<'_> {
    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns true if no record is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl LockSet<'_> {
    /// Usernames covered, in acquisition order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(name, _)| name.as_str())
    }

    /// Returns true if `username` is covered.
    #[must_use]
    pub fn covers(&self, username: &str) -> bool {
        self.handles
            .binary_search_by(|(name, _)| name.as_str().cmp(username))
            .is_ok()
    }

    /// Blocks until every lock in the set is held.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if a previous holder panicked.
    pub fn acquire(&self) -> EngineResult<LockGuards<'_>> {
        let guards = self
            .handles
            .iter()
            .map(|(name, lock)| {
                lock.lock()
                    .map_err(|_| EngineError::Storage(format!("record lock for '{name}' poisoned")))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(LockGuards { guards })
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        let names: Vec<String> = self.handles.drain(..).map(|(name, _)| name).collect();
        // Handles are only cloned under the registry lock, so a count of one
        // here means no other set refers to the entry.
        let Ok(mut registry) = self.registry.lock() else {
            return;
        };
        for name in names {
            if registry.get(&name).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                registry.remove(&name);
            }
        }
    }
}

impl RecordLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles for one record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if the registry is poisoned.
    pub fn lock_one(&self, username: &str) -> EngineResult<LockSet<'_>> {
        self.lock_set([username])
    }

    /// Handles for several records, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if the registry is poisoned.
    pub fn lock_set<'n>(
        &self,
        usernames: impl IntoIterator<Item = &'n str>,
    ) -> EngineResult<LockSet<'_>> {
        let mut names: Vec<&str> = usernames.into_iter().collect();
        names.sort_unstable();
        names.dedup();

        let mut registry = self
            .registry
            .lock()
            .map_err(|_| EngineError::Storage("lock registry poisoned".into()))?;
        let handles = names
            .into_iter()
            .map(|name| {
                let lock = registry.entry(name.to_string()).or_default();
                (name.to_string(), Arc::clone(lock))
            })
            .collect();
        Ok(LockSet {
            registry: &self.registry,
            handles,
        })
    }

    /// Number of records with a live lock entry.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.registry.lock().map_or(0, |r| r.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sets_are_sorted_and_deduplicated() {
        let locks = RecordLocks::new();
        let set = locks.lock_set(["carol", "alice", "bob", "alice"]).unwrap();
        assert_eq!(set.usernames().collect::<Vec<_>>(), vec!["alice", "bob", "carol"]);
        assert!(set.covers("bob"));
        assert!(!set.covers("dave"));
        assert_eq!(set.acquire().unwrap().len(), 3);
    }

    #[test]
    fn same_name_shares_a_lock() {
        let locks = RecordLocks::new();
        let a = locks.lock_one("alice").unwrap();
        let b = locks.lock_one("alice").unwrap();
        let _held = a.acquire().unwrap();
        assert!(b.handles[0].1.try_lock().is_err());
    }

    #[test]
    fn opposite_order_requests_do_not_deadlock() {
        let locks = Arc::new(RecordLocks::new());
        let workers: Vec<_> = [["alice", "bob"], ["bob", "alice"]]
            .into_iter()
            .map(|pair| {
                let locks = Arc::clone(&locks);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let set = locks.lock_set(pair).unwrap();
                        let _guards = set.acquire().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn released_sets_leave_no_entries() {
        let locks = RecordLocks::new();
        for i in 0..100 {
            let name = format!("ghost{i}");
            let set = locks.lock_one(&name).unwrap();
            let _guards = set.acquire().unwrap();
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn entries_survive_while_another_set_holds_them() {
        let locks = RecordLocks::new();
        let outer = locks.lock_set(["alice", "bob"]).unwrap();
        drop(locks.lock_one("alice").unwrap());
        assert_eq!(locks.tracked(), 2);

        let again = locks.lock_one("alice").unwrap();
        assert!(Arc::ptr_eq(&outer.handles[0].1, &again.handles[0].1));
        drop(outer);
        assert_eq!(locks.tracked(), 1);
        drop(again);
        assert_eq!(locks.tracked(), 0);
    }
}

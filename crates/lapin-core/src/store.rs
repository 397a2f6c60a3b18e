//! Persistence collaborator.
//!
//! The engine only needs to create, load and atomically replace whole
//! records. [`PlayerStore`] is that narrow interface; [`MemoryStore`] is the
//! in-process implementation used by tests and the simulation harness.
//!
//! Commits are optimistic: every record carries the `version` it was loaded
//! at, and a commit fails with [`StoreError::Conflict`] if any stored version
//! has moved since.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::record::PlayerRecord;

/// Errors reported by a [`PlayerStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record with this username already exists.
    #[error("player '{0}' already exists")]
    Exists(String),

    /// No record with this username.
    #[error("player '{0}' does not exist")]
    Missing(String),

    /// The stored version moved since the record was loaded.
    #[error("player '{username}' changed concurrently (expected version {expected}, found {found})")]
    Conflict {
        /// Record that changed
        username: String,
        /// Version the caller loaded
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// The backend failed.
    #[error("store backend: {0}")]
    Backend(String),
}

/// Narrow persistence interface for player records.
pub trait PlayerStore: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Exists`] if the username is taken.
    fn insert(&self, record: PlayerRecord) -> Result<(), StoreError>;

    /// Loads a record by username.
    ///
    /// # Errors
    ///
    /// [`StoreError::Missing`] for unknown usernames.
    fn load(&self, username: &str) -> Result<PlayerRecord, StoreError>;

    /// Returns true if a record exists for `username`.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn contains(&self, username: &str) -> Result<bool, StoreError> {
        match self.load(username) {
            Ok(_) => Ok(true),
            Err(StoreError::Missing(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Replaces every record in `records` at once, or none of them.
    ///
    /// Each record's `version` must equal the stored one; on success the
    /// stored copies carry `version + 1`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] on a version mismatch, [`StoreError::Missing`]
    /// if a record was never inserted.
    fn commit(&self, records: &[PlayerRecord]) -> Result<(), StoreError>;

    /// Every stored username, sorted.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn usernames(&self) -> Result<Vec<String>, StoreError>;
}

/// A [`PlayerStore`] kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, PlayerRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().map_or(0, |r| r.len())
    }

    /// Returns true if no record is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

impl PlayerStore for MemoryStore {
    fn insert(&self, record: PlayerRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.username) {
            return Err(StoreError::Exists(record.username));
        }
        records.insert(record.username.clone(), record);
        Ok(())
    }

    fn load(&self, username: &str) -> Result<PlayerRecord, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::Missing(username.to_string()))
    }

    fn contains(&self, username: &str) -> Result<bool, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.contains_key(username))
    }

    fn commit(&self, records: &[PlayerRecord]) -> Result<(), StoreError> {
        let mut stored = self.records.write().map_err(poisoned)?;

        for record in records {
            let current = stored
                .get(&record.username)
                .ok_or_else(|| StoreError::Missing(record.username.clone()))?;
            if current.version != record.version {
                return Err(StoreError::Conflict {
                    username: record.username.clone(),
                    expected: record.version,
                    found: current.version,
                });
            }
        }

        for record in records {
            let mut next = record.clone();
            next.version += 1;
            stored.insert(next.username.clone(), next);
        }
        Ok(())
    }

    fn usernames(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut names: Vec<String> = records.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use chrono::Utc;
    use lapin_catalog::Catalog;

    fn store_with(names: &[&str]) -> MemoryStore {
        let catalog = Catalog::load_embedded().unwrap();
        let store = MemoryStore::new();
        for name in names {
            let record = PlayerRecord::new(name, &catalog, &EngineConfig::default(), Utc::now());
            store.insert(record).unwrap();
        }
        store
    }

    #[test]
    fn insert_rejects_duplicates() {
        let store = store_with(&["alice"]);
        let again = store.load("alice").unwrap();
        assert_eq!(store.insert(again), Err(StoreError::Exists("alice".into())));
    }

    #[test]
    fn commit_bumps_versions() {
        let store = store_with(&["alice", "bob"]);
        let mut alice = store.load("alice").unwrap();
        alice.energy = 40;
        let bob = store.load("bob").unwrap();
        store.commit(&[alice, bob]).unwrap();

        let alice = store.load("alice").unwrap();
        assert_eq!(alice.version, 1);
        assert_eq!(alice.energy, 40);
        assert_eq!(store.load("bob").unwrap().version, 1);
    }

    #[test]
    fn stale_commit_changes_nothing() {
        let store = store_with(&["alice", "bob"]);
        let stale_bob = store.load("bob").unwrap();
        store.commit(&[store.load("bob").unwrap()]).unwrap();

        let mut alice = store.load("alice").unwrap();
        alice.energy = 0;
        let err = store.commit(&[alice, stale_bob]).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { found: 1, .. }));
        assert_eq!(store.load("alice").unwrap().energy, 100);
        assert_eq!(store.load("alice").unwrap().version, 0);
    }

    #[test]
    fn usernames_are_sorted() {
        let store = store_with(&["carol", "alice", "bob"]);
        assert_eq!(store.usernames().unwrap(), vec!["alice", "bob", "carol"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn contains_reports_membership() {
        let store = store_with(&["alice"]);
        assert_eq!(store.contains("alice"), Ok(true));
        assert_eq!(store.contains("bob"), Ok(false));
    }
}

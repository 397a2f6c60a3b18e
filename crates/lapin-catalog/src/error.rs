//! Catalog errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::attack::AttackId;
use crate::defense::DefenseId;

/// Errors raised by catalog lookups and catalog loading.
///
/// Lookup errors (`Unknown*`) are ordinary runtime results. Every other
/// variant comes from loading and is fatal at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No attack with this id.
    #[error("unknown attack {0}")]
    UnknownAttack(AttackId),

    /// No defense with this id.
    #[error("unknown defense {0}")]
    UnknownDefense(DefenseId),

    /// No title with this name.
    #[error("unknown title '{0}'")]
    UnknownTitle(String),

    /// A table could not be parsed.
    #[error("failed to parse {table} table: {source}")]
    Parse {
        /// Table name
        table: &'static str,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// A table file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// Two rows share an id.
    #[error("duplicate id {id} in {table} table")]
    DuplicateId {
        /// Table name
        table: &'static str,
        /// Offending id
        id: String,
    },

    /// A table does not hold the expected number of rows.
    #[error("{table} table holds {found} rows, expected {expected}")]
    WrongCount {
        /// Table name
        table: &'static str,
        /// Expected rows
        expected: usize,
        /// Actual rows
        found: usize,
    },

    /// A row breaks a table invariant.
    #[error("invalid row {id} in {table} table: {reason}")]
    Invalid {
        /// Table name
        table: &'static str,
        /// Offending id
        id: String,
        /// What is wrong
        reason: String,
    },
}

impl CatalogError {
    /// Returns true for lookup misses, false for load failures.
    #[must_use]
    pub const fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            Self::UnknownAttack(_) | Self::UnknownDefense(_) | Self::UnknownTitle(_)
        )
    }
}

//! Durable record of processed feed items.
//!
//! Every item the engine finishes with, liked or given up on, lands
//! here before the next one is touched. [`JournalLedger`] appends one
//! JSON line per item and replays the file on open, which is what makes
//! restarts idempotent. [`MemoryLedger`] backs dry runs and tests.

pub mod journal;
pub mod memory;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use anilike_core_types::ItemId;

pub use journal::JournalLedger;
pub use memory::MemoryLedger;
pub use stats::{read_snapshot, write_atomic, write_snapshot};

/// How an item left the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The like was clicked and acknowledged.
    Liked,
    /// The affordance was already active when we got there.
    AlreadyLiked,
    /// Retries ran out; the item will not be attempted again.
    Skipped,
}

/// One journal line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: ItemId,
    pub disposition: Disposition,
    pub position: u64,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LedgerEntry {
    pub fn liked(id: ItemId, position: u64) -> Self {
        Self {
            id,
            disposition: Disposition::Liked,
            position,
            recorded_at: Utc::now(),
            note: None,
        }
    }

    pub fn already_liked(id: ItemId, position: u64) -> Self {
        Self {
            id,
            disposition: Disposition::AlreadyLiked,
            position,
            recorded_at: Utc::now(),
            note: None,
        }
    }

    pub fn skipped(id: ItemId, position: u64, note: impl Into<String>) -> Self {
        Self {
            id,
            disposition: Disposition::Skipped,
            position,
            recorded_at: Utc::now(),
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The processed set.
///
/// `record` must not return until the entry is safe against a process
/// restart, whatever that means for the backing store. Recording the
/// same item twice is a no-op.
pub trait LikeLedger: Send {
    fn contains(&self, id: &ItemId) -> bool;
    fn record(&mut self, entry: LedgerEntry) -> Result<(), LedgerError>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_constructors_set_disposition() {
        let liked = LedgerEntry::liked(ItemId::from("11"), 11);
        assert_eq!(liked.disposition, Disposition::Liked);
        assert!(liked.note.is_none());

        let skipped = LedgerEntry::skipped(ItemId::from("12"), 12, "retries exhausted");
        assert_eq!(skipped.disposition, Disposition::Skipped);
        assert_eq!(skipped.note.as_deref(), Some("retries exhausted"));
    }

    #[test]
    fn entry_serde_is_flat_snake_case() {
        let entry = LedgerEntry::liked(ItemId::from("99"), 99);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"disposition\":\"liked\""));
        assert!(!json.contains("note"));

        let back: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}

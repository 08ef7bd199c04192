//! In-memory ledger for dry runs and tests.

use std::collections::HashMap;

use anilike_core_types::ItemId;

use crate::{LedgerEntry, LedgerError, LikeLedger};

/// Forgets everything when dropped, which is exactly what a dry run wants.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: HashMap<ItemId, LedgerEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far, in no particular order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.seen.values().cloned().collect()
    }
}

impl LikeLedger for MemoryLedger {
    fn contains(&self, id: &ItemId) -> bool {
        self.seen.contains_key(id)
    }

    fn record(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.seen.entry(entry.id.clone()).or_insert(entry);
        Ok(())
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Disposition;

    #[test]
    fn records_and_answers_contains() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.is_empty());

        ledger.record(LedgerEntry::liked(ItemId::from("7"), 7)).unwrap();
        assert!(ledger.contains(&ItemId::from("7")));
        assert!(!ledger.contains(&ItemId::from("8")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn second_record_for_same_item_is_a_no_op() {
        let mut ledger = MemoryLedger::new();
        ledger.record(LedgerEntry::liked(ItemId::from("7"), 7)).unwrap();
        ledger
            .record(LedgerEntry::skipped(ItemId::from("7"), 7, "late skip"))
            .unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].disposition, Disposition::Liked);
    }
}

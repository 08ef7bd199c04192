//! Append-only JSON-lines journal.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use anilike_core_types::ItemId;

use crate::{Disposition, LedgerEntry, LedgerError, LikeLedger};

/// Ledger backed by one journal file.
///
/// Open replays the whole file into memory; record appends a line and
/// syncs it before returning. Malformed lines (a crash mid-append
/// leaves at most one) are counted and ignored.
pub struct JournalLedger {
    path: PathBuf,
    seen: HashMap<ItemId, Disposition>,
    writer: BufWriter<File>,
}

impl JournalLedger {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut seen = HashMap::new();
        let mut malformed = 0usize;
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LedgerEntry>(&line) {
                    Ok(entry) => {
                        seen.insert(entry.id, entry.disposition);
                    }
                    Err(_) => malformed += 1,
                }
            }
        }
        if malformed > 0 {
            warn!(
                target: "ledger",
                path = %path.display(),
                malformed,
                "ignored malformed journal lines"
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(
            target: "ledger",
            path = %path.display(),
            entries = seen.len(),
            "journal open"
        );
        Ok(Self {
            path,
            seen,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl LikeLedger for JournalLedger {
    fn contains(&self, id: &ItemId) -> bool {
        self.seen.contains_key(id)
    }

    fn record(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.seen.contains_key(&entry.id) {
            return Ok(());
        }
        let line = serde_json::to_vec(&entry)?;
        self.writer.write_all(&line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.seen.insert(entry.id, entry.disposition);
        Ok(())
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

//! Run summary snapshots.
//!
//! The previous run's counters are kept in one small JSON file beside
//! the journal. Written atomically so a crash can only ever leave the
//! old snapshot in place, never half of the new one.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use anilike_core_types::RunStats;

use crate::LedgerError;

/// Write `bytes` to `path` through a temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

pub fn write_snapshot(path: &Path, stats: &RunStats) -> Result<(), LedgerError> {
    let body = serde_json::to_vec_pretty(stats)?;
    write_atomic(path, &body)?;
    debug!(target: "ledger", path = %path.display(), "run snapshot written");
    Ok(())
}

/// Read the previous run's snapshot. Absent or unreadable files both
/// come back as `None`; a stale snapshot is informational only.
pub fn read_snapshot(path: &Path) -> Result<Option<RunStats>, LedgerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw).ok())
}

//! Durable daily spend ledger with a hard ceiling.
//!
//! The canonical state is a single JSON file holding one
//! [`SpendRecord`]. Every mutation serializes the updated record to a
//! temporary file in the same directory and atomically renames it over
//! the canonical path, so a reader (including this process restarting
//! after a crash) only ever observes the pre- or post-commit state.
//!
//! A colocated lock file, held exclusively for the ledger's lifetime,
//! rejects a second process instance against the same state path.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use fs2::FileExt;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::SpendRecord;

/// Errors the ledger can produce.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The state file exists but cannot be trusted. Fatal at startup:
    /// the ledger refuses to guess a safe balance.
    #[error("spend state at {path} is corrupt: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    /// Another process already holds the ledger lock.
    #[error("another instance holds the ledger lock at {0}")]
    AlreadyLocked(PathBuf),

    #[error("ledger IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a pre-call reservation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Granted,
    Denied,
}

/// Outcome of committing an actual cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Commit {
    /// New total is still under the ceiling
    Ok(f64),

    /// The committing call pushed the total to or past the ceiling.
    /// The cost is already durably recorded; the caller must finish the
    /// triggering file and then trip the circuit.
    CeilingExceeded(f64),
}

/// Daily spend ledger. Single writer per filesystem path, enforced by
/// an exclusive lock file; single in-flight commit per process,
/// enforced by an internal mutex.
#[derive(Debug)]
pub struct SpendLedger {
    path: PathBuf,
    limit: f64,
    // Held for the ledger's lifetime; dropping releases the lock.
    _lock_file: File,
    record: Mutex<SpendRecord>,
}

impl SpendLedger {
    /// Open the ledger at `path`, creating a fresh record for today if
    /// no state exists. Fails fast on a held lock or corrupt state.
    pub fn open(path: &Path, limit: f64) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(LedgerError::AlreadyLocked(lock_path));
        }

        let today = Local::now().date_naive();
        let record = Self::load_or_init(path, today, limit)?;

        let ledger = Self {
            path: path.to_path_buf(),
            limit,
            _lock_file: lock_file,
            record: Mutex::new(record),
        };

        // Make the (possibly fresh or rolled-over) record durable so a
        // crash right after boot still finds consistent state.
        {
            let record = ledger.record.lock().unwrap_or_else(|e| e.into_inner());
            ledger.persist(&record)?;
        }

        Ok(ledger)
    }

    fn load_or_init(path: &Path, today: NaiveDate, limit: f64) -> Result<SpendRecord, LedgerError> {
        if !path.exists() {
            info!(date = %today, limit_usd = limit, "No spend state found, starting fresh record");
            return Ok(SpendRecord::fresh(today, limit));
        }

        let content = std::fs::read_to_string(path)?;
        let mut record: SpendRecord =
            serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        if !record.is_valid() {
            return Err(LedgerError::Corrupt {
                path: path.to_path_buf(),
                detail: format!(
                    "structural check failed: cost={} limit={}",
                    record.accumulated_cost, record.limit
                ),
            });
        }

        if record.date != today {
            info!(
                stale = %record.date,
                today = %today,
                dropped_usd = record.accumulated_cost,
                "New calendar day, resetting spend record"
            );
            return Ok(SpendRecord::fresh(today, limit));
        }

        // Configured limit always wins over the stored one.
        if (record.limit - limit).abs() > f64::EPSILON {
            warn!(
                stored = record.limit,
                configured = limit,
                "Stored limit differs from configuration, using configured value"
            );
            record.limit = limit;
        }

        info!(
            date = %record.date,
            spent_usd = record.accumulated_cost,
            limit_usd = record.limit,
            "Resuming spend record"
        );
        Ok(record)
    }

    /// Snapshot of today's record, with day rollover applied.
    pub fn current(&self) -> Result<SpendRecord, LedgerError> {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        self.roll_over_if_needed(&mut record)?;
        Ok(record.clone())
    }

    /// Pre-check before an expensive call: would `estimate` fit under
    /// the ceiling on top of what is already committed?
    pub fn reserve(&self, estimate: f64) -> Result<Reservation, LedgerError> {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        self.roll_over_if_needed(&mut record)?;

        if record.accumulated_cost + estimate > record.limit {
            Ok(Reservation::Denied)
        } else {
            Ok(Reservation::Granted)
        }
    }

    /// The only state-mutating operation: durably add an actual cost.
    ///
    /// Either the new total is fully persisted or the prior state stays
    /// intact; the canonical file is never mutated in place.
    pub fn commit(&self, actual_cost: f64) -> Result<Commit, LedgerError> {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        self.roll_over_if_needed(&mut record)?;

        let mut updated = record.clone();
        updated.accumulated_cost += actual_cost.max(0.0);
        updated.sequence += 1;

        self.persist(&updated)?;
        *record = updated.clone();

        info!(
            cost_usd = actual_cost,
            total_usd = updated.accumulated_cost,
            limit_usd = updated.limit,
            sequence = updated.sequence,
            "Committed spend"
        );

        if updated.at_ceiling() {
            Ok(Commit::CeilingExceeded(updated.accumulated_cost))
        } else {
            Ok(Commit::Ok(updated.accumulated_cost))
        }
    }

    /// Replace the in-memory record with a fresh one when the calendar
    /// day has changed, persisting before any further accounting.
    fn roll_over_if_needed(&self, record: &mut SpendRecord) -> Result<(), LedgerError> {
        let today = Local::now().date_naive();
        if record.date != today {
            info!(
                stale = %record.date,
                today = %today,
                "Day rollover, starting zero-balance record"
            );
            let fresh = SpendRecord::fresh(today, self.limit);
            self.persist(&fresh)?;
            *record = fresh;
        }
        Ok(())
    }

    /// Write the record to a temp file in the state directory and
    /// atomically rename it over the canonical path.
    fn persist(&self, record: &SpendRecord) -> Result<(), LedgerError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| LedgerError::Corrupt {
                path: self.path.clone(),
                detail: "state path has no parent directory".to_string(),
            })?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, record).map_err(|e| LedgerError::Corrupt {
            path: self.path.clone(),
            detail: format!("serialize failed: {e}"),
        })?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger_in(dir: &TempDir, limit: f64) -> SpendLedger {
        SpendLedger::open(&dir.path().join("daily_spend.json"), limit).unwrap()
    }

    #[test]
    fn test_fresh_ledger_starts_at_zero() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger_in(&temp, 3.0);
        let record = ledger.current().unwrap();
        assert_eq!(record.accumulated_cost, 0.0);
        assert_eq!(record.limit, 3.0);
    }

    #[test]
    fn test_commit_accumulates_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        {
            let ledger = SpendLedger::open(&path, 3.0).unwrap();
            assert_eq!(ledger.commit(0.5).unwrap(), Commit::Ok(0.5));
            assert_eq!(ledger.commit(0.25).unwrap(), Commit::Ok(0.75));
        }

        // A new instance (restart) resumes the same balance
        let ledger = SpendLedger::open(&path, 3.0).unwrap();
        let record = ledger.current().unwrap();
        assert!((record.accumulated_cost - 0.75).abs() < 1e-9);
        assert_eq!(record.sequence, 2);
    }

    #[test]
    fn test_reserve_denied_at_ceiling() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger_in(&temp, 1.0);
        assert_eq!(ledger.reserve(0.9).unwrap(), Reservation::Granted);

        ledger.commit(0.9).unwrap();
        assert_eq!(ledger.reserve(0.2).unwrap(), Reservation::Denied);
        // A smaller estimate that still fits is granted
        assert_eq!(ledger.reserve(0.1).unwrap(), Reservation::Granted);
    }

    #[test]
    fn test_commit_reports_ceiling_breach() {
        let temp = TempDir::new().unwrap();
        let ledger = ledger_in(&temp, 1.0);
        assert_eq!(ledger.commit(0.6).unwrap(), Commit::Ok(0.6));
        match ledger.commit(0.6).unwrap() {
            Commit::CeilingExceeded(total) => assert!((total - 1.2).abs() < 1e-9),
            other => panic!("expected ceiling breach, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_state_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        std::fs::write(&path, "{not json at all").unwrap();

        match SpendLedger::open(&path, 3.0) {
            Err(LedgerError::Corrupt { .. }) => {}
            other => panic!("expected corrupt-state failure, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_record_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        let today = Local::now().date_naive();
        std::fs::write(
            &path,
            format!(r#"{{"date":"{today}","accumulated_cost":-5.0,"limit":3.0,"sequence":1}}"#),
        )
        .unwrap();

        assert!(matches!(
            SpendLedger::open(&path, 3.0),
            Err(LedgerError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_stale_record_resets_on_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        std::fs::write(
            &path,
            r#"{"date":"2020-01-01","accumulated_cost":2.5,"limit":3.0,"sequence":9}"#,
        )
        .unwrap();

        let ledger = SpendLedger::open(&path, 3.0).unwrap();
        let record = ledger.current().unwrap();
        assert_eq!(record.accumulated_cost, 0.0);
        assert_eq!(record.sequence, 0);
        assert_eq!(record.date, Local::now().date_naive());
    }

    #[test]
    fn test_second_instance_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        let _first = SpendLedger::open(&path, 3.0).unwrap();

        assert!(matches!(
            SpendLedger::open(&path, 3.0),
            Err(LedgerError::AlreadyLocked(_))
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        {
            let _ledger = SpendLedger::open(&path, 3.0).unwrap();
        }
        assert!(SpendLedger::open(&path, 3.0).is_ok());
    }

    #[test]
    fn test_stray_temp_files_do_not_corrupt_state() {
        // A crash between temp write and rename leaves a stray temp
        // file; the canonical state must still load cleanly.
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        {
            let ledger = SpendLedger::open(&path, 3.0).unwrap();
            ledger.commit(0.3).unwrap();
        }
        std::fs::write(temp.path().join(".tmpXYZ123"), "torn half-writ").unwrap();

        let ledger = SpendLedger::open(&path, 3.0).unwrap();
        assert!((ledger.current().unwrap().accumulated_cost - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_configured_limit_wins_over_stored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily_spend.json");
        {
            let ledger = SpendLedger::open(&path, 3.0).unwrap();
            ledger.commit(0.5).unwrap();
        }

        let ledger = SpendLedger::open(&path, 10.0).unwrap();
        assert_eq!(ledger.current().unwrap().limit, 10.0);
    }
}

//! Spend Ledger Integration Tests
//!
//! Crash consistency, monotonicity and the ceiling arithmetic the
//! circuit breaker depends on.

use airscribe::core::{Commit, LedgerError, Reservation, SpendLedger};
use airscribe::domain::SpendRecord;
use tempfile::TempDir;

fn state_path(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("state").join("daily_spend.json")
}

fn read_record(path: &std::path::Path) -> SpendRecord {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_balance_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = state_path(&temp);

    {
        let ledger = SpendLedger::open(&path, 3.0).unwrap();
        ledger.commit(0.12).unwrap();
        ledger.commit(0.34).unwrap();
    }

    // The canonical file on disk is always complete, parseable JSON
    let on_disk = read_record(&path);
    assert!((on_disk.accumulated_cost - 0.46).abs() < 1e-9);
    assert_eq!(on_disk.sequence, 2);

    // A restarted process resumes exactly that balance
    let ledger = SpendLedger::open(&path, 3.0).unwrap();
    let record = ledger.current().unwrap();
    assert!((record.accumulated_cost - 0.46).abs() < 1e-9);
}

#[test]
fn test_monotonicity_across_commits() {
    let temp = TempDir::new().unwrap();
    let ledger = SpendLedger::open(&state_path(&temp), 1.0).unwrap();

    let costs = [0.10, 0.25, 0.05, 0.40, 0.30];
    let mut previous = 0.0;
    let mut breached = false;

    for cost in costs {
        let total = match ledger.commit(cost).unwrap() {
            Commit::Ok(total) => total,
            Commit::CeilingExceeded(total) => {
                breached = true;
                total
            }
        };
        assert!(total >= previous, "total went backwards");
        // Any breach is bounded by the single committing call
        assert!(total <= 1.0 + cost + 1e-9);
        previous = total;
    }
    assert!(breached);
}

#[test]
fn test_three_calls_fit_then_fourth_reserve_denied() {
    // limit = 100, estimate = 30, three files costing 30 each
    let temp = TempDir::new().unwrap();
    let ledger = SpendLedger::open(&state_path(&temp), 100.0).unwrap();

    for expected_total in [30.0, 60.0, 90.0] {
        assert_eq!(ledger.reserve(30.0).unwrap(), Reservation::Granted);
        match ledger.commit(30.0).unwrap() {
            Commit::Ok(total) => assert!((total - expected_total).abs() < 1e-9),
            other => panic!("unexpected ceiling breach: {other:?}"),
        }
    }

    // Fourth file: 90 + 30 = 120 > 100
    assert_eq!(ledger.reserve(30.0).unwrap(), Reservation::Denied);
}

#[test]
fn test_every_commit_is_durable_immediately() {
    let temp = TempDir::new().unwrap();
    let path = state_path(&temp);
    let ledger = SpendLedger::open(&path, 5.0).unwrap();

    for i in 1..=5u64 {
        ledger.commit(0.5).unwrap();
        // Disk state matches in-memory state after every single commit,
        // so a kill at any point loses nothing
        let on_disk = read_record(&path);
        assert_eq!(on_disk.sequence, i);
        assert!((on_disk.accumulated_cost - 0.5 * i as f64).abs() < 1e-9);
    }
}

#[test]
fn test_corrupt_state_refuses_to_start() {
    let temp = TempDir::new().unwrap();
    let path = state_path(&temp);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    // Torn write: half a JSON object
    std::fs::write(&path, r#"{"date":"2024-06-01","accumulated"#).unwrap();
    assert!(matches!(
        SpendLedger::open(&path, 3.0),
        Err(LedgerError::Corrupt { .. })
    ));

    // Parseable but structurally invalid
    std::fs::write(
        &path,
        r#"{"date":"2024-06-01","accumulated_cost":"NaN","limit":3.0,"sequence":0}"#,
    )
    .unwrap();
    assert!(matches!(
        SpendLedger::open(&path, 3.0),
        Err(LedgerError::Corrupt { .. })
    ));
}

#[test]
fn test_yesterday_record_resets_without_carryover() {
    let temp = TempDir::new().unwrap();
    let path = state_path(&temp);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{"date":"2021-12-31","accumulated_cost":99.0,"limit":100.0,"sequence":77}"#,
    )
    .unwrap();

    let ledger = SpendLedger::open(&path, 100.0).unwrap();
    let record = ledger.current().unwrap();
    assert_eq!(record.accumulated_cost, 0.0);
    assert_eq!(record.limit, 100.0);
    assert_eq!(record.sequence, 0);

    // The reset is already durable
    let on_disk = read_record(&path);
    assert_eq!(on_disk.accumulated_cost, 0.0);
}

#[test]
fn test_concurrent_instance_rejected_then_allowed() {
    let temp = TempDir::new().unwrap();
    let path = state_path(&temp);

    let first = SpendLedger::open(&path, 3.0).unwrap();
    assert!(matches!(
        SpendLedger::open(&path, 3.0),
        Err(LedgerError::AlreadyLocked(_))
    ));

    drop(first);
    assert!(SpendLedger::open(&path, 3.0).is_ok());
}

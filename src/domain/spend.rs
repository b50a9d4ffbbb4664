//! The persisted daily spend record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Durable daily ledger state, keyed by calendar day.
///
/// Exactly one record is current at any instant. `accumulated_cost` is
/// monotonically non-decreasing within a day and only ever changes
/// through the ledger's atomic commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    /// Calendar day this record covers (operating timezone)
    pub date: NaiveDate,

    /// Total committed spend for the day, in USD
    pub accumulated_cost: f64,

    /// Daily ceiling in USD, as configured when the record was written
    pub limit: f64,

    /// Commit counter, bumped on every durable write
    pub sequence: u64,
}

impl SpendRecord {
    /// Fresh zero-balance record for a day.
    pub fn fresh(date: NaiveDate, limit: f64) -> Self {
        Self {
            date,
            accumulated_cost: 0.0,
            limit,
            sequence: 0,
        }
    }

    /// Structural validity check applied after deserialization.
    ///
    /// A record failing this check means the state file was tampered
    /// with or torn, and the ledger must refuse to guess a balance.
    pub fn is_valid(&self) -> bool {
        self.accumulated_cost.is_finite()
            && self.accumulated_cost >= 0.0
            && self.limit.is_finite()
            && self.limit > 0.0
    }

    /// True when the day's spend has reached or passed the ceiling.
    pub fn at_ceiling(&self) -> bool {
        self.accumulated_cost >= self.limit
    }

    /// Remaining headroom before the ceiling, never negative.
    pub fn headroom(&self) -> f64 {
        (self.limit - self.accumulated_cost).max(0.0)
    }
}

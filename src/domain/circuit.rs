//! Process-wide circuit breaker state.

use std::fmt;

/// Why the circuit breaker tripped.
#[derive(Debug, Clone, PartialEq)]
pub enum TripReason {
    /// A commit pushed the day's total to or past the ceiling
    CeilingReached { total: f64, limit: f64 },

    /// A reserve check would have exceeded the ceiling
    ReserveDenied {
        total: f64,
        estimate: f64,
        limit: f64,
    },

    /// The ledger was already at the ceiling when the process started
    AlreadyAtCeiling { total: f64, limit: f64 },

    /// The transcription provider refused quota or credentials
    ProviderRefused(String),
}

impl fmt::Display for TripReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CeilingReached { total, limit } => write!(
                f,
                "daily spend ceiling reached: ${total:.4} committed against ${limit:.2} limit"
            ),
            Self::ReserveDenied {
                total,
                estimate,
                limit,
            } => write!(
                f,
                "reserve denied: ${total:.4} committed + ${estimate:.2} estimate exceeds ${limit:.2} limit"
            ),
            Self::AlreadyAtCeiling { total, limit } => write!(
                f,
                "ledger already at ceiling on startup: ${total:.4} against ${limit:.2} limit"
            ),
            Self::ProviderRefused(detail) => {
                write!(f, "transcription provider refused: {detail}")
            }
        }
    }
}

/// In-memory breaker state. The transition to `Tripped` is one-way for
/// the process lifetime; the durable side lives in the spend record and
/// is re-derived at boot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CircuitState {
    #[default]
    Open,
    Tripped(TripReason),
}

impl CircuitState {
    pub fn is_tripped(&self) -> bool {
        matches!(self, Self::Tripped(_))
    }

    /// Trip the breaker. A second trip keeps the first reason.
    pub fn trip(&mut self, reason: TripReason) {
        if let Self::Open = self {
            *self = Self::Tripped(reason);
        }
    }
}

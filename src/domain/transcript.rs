//! Normalized transcription results.

use chrono::{DateTime, Utc};

/// What the gateway returns for one successfully transcribed unit.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Transcript text, possibly empty
    pub text: String,

    /// Final billed cost for this call, in USD (worst-case rounded)
    pub cost: f64,

    /// True when the text matched an emergency marker
    pub emergency: bool,

    /// When the call completed
    pub completed_at: DateTime<Utc>,
}

impl Transcription {
    /// True when the provider produced nothing worth storing.
    ///
    /// The original capture is still charged for; this only suppresses
    /// the transcript append.
    pub fn is_unintelligible(&self) -> bool {
        let compact: String = self
            .text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        compact.is_empty() || compact.eq_ignore_ascii_case("unintelligible")
    }
}

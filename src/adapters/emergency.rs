//! Emergency content detection over transcript text.
//!
//! Pure, deterministic string matching against a fixed marker set:
//! the distress call words, the guard frequency, and the emergency
//! squawk code. Never touches the network and never fails.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Case-insensitive substring markers.
const MARKERS: &[&str] = &["mayday", "pan-pan", "pan pan", "121.5"];

fn squawk_pattern() -> &'static Regex {
    static SQUAWK: OnceLock<Regex> = OnceLock::new();
    // "squawk 7700", "squawking 7700", "squawk7700"
    SQUAWK.get_or_init(|| Regex::new(r"(?i)squawk(?:ing)?\s*7700").unwrap())
}

/// True when the transcript contains a distress marker.
pub fn contains_emergency(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    squawk_pattern().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distress_call_words() {
        assert!(contains_emergency("MAYDAY MAYDAY MAYDAY, engine failure"));
        assert!(contains_emergency("pan-pan, pan-pan, request priority"));
        assert!(contains_emergency("Pan Pan, fuel minimum"));
    }

    #[test]
    fn test_guard_frequency_reference() {
        assert!(contains_emergency("contact approach on 121.5"));
    }

    #[test]
    fn test_squawk_code_pattern() {
        assert!(contains_emergency("squawk 7700 and ident"));
        assert!(contains_emergency("Squawking 7700"));
        assert!(contains_emergency("SQUAWK7700"));
        // Other codes are routine
        assert!(!contains_emergency("squawk 4521"));
        assert!(!contains_emergency("squawk 7000 VFR"));
    }

    #[test]
    fn test_routine_traffic_is_clean() {
        assert!(!contains_emergency(
            "Tower, JA801A, cleared to land runway 34L, wind 330 at 8"
        ));
        assert!(!contains_emergency(""));
    }

    #[test]
    fn test_deterministic() {
        let text = "mayday relay for a light aircraft";
        assert_eq!(contains_emergency(text), contains_emergency(text));
    }
}

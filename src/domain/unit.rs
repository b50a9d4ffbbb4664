//! Input recordings produced by the external capture process.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;

/// One recording awaiting classification and possibly transcription.
///
/// Created from a directory scan; read-only until it is relocated
/// exactly once after terminal handling.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    /// Absolute path in the input directory
    pub path: PathBuf,

    /// File name only (used for channel key extraction and logging)
    pub file_name: String,

    /// File size in bytes
    pub size: u64,

    /// Capture timestamp (file modification time)
    pub captured_at: DateTime<Utc>,

    /// Channel key derived from the file name, e.g. `124.400MHz`
    pub channel: String,
}

impl AudioUnit {
    /// Build a unit from a scanned path and its metadata.
    pub fn new(path: PathBuf, size: u64, captured_at: DateTime<Utc>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let channel = channel_key(&file_name);

        Self {
            path,
            file_name,
            size,
            captured_at,
            channel,
        }
    }
}

fn freq_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            // 123.456 style MHz value embedded in the file name
            Regex::new(r"(\d{3}\.\d{1,6})").unwrap(),
            // Raw 9-digit Hz value (e.g. 124400000)
            Regex::new(r"(\d{9})").unwrap(),
        )
    })
}

/// Extract the capture frequency from a file name, in MHz.
///
/// The capture process encodes the tuned frequency either as a decimal
/// MHz value (`124.400`) or as a 9-digit Hz value (`124400000`).
pub fn extract_frequency_mhz(file_name: &str) -> Option<f64> {
    let (mhz_re, hz_re) = freq_patterns();

    if let Some(cap) = mhz_re.captures(file_name) {
        if let Ok(mhz) = cap[1].parse::<f64>() {
            return Some(mhz);
        }
    }
    if let Some(cap) = hz_re.captures(file_name) {
        if let Ok(hz) = cap[1].parse::<u64>() {
            return Some(hz as f64 / 1_000_000.0);
        }
    }
    None
}

/// Channel key used to partition transcript storage.
///
/// `124.400MHz` when a frequency can be extracted, `unknown` otherwise.
pub fn channel_key(file_name: &str) -> String {
    match extract_frequency_mhz(file_name) {
        Some(mhz) => format!("{mhz:.3}MHz"),
        None => "unknown".to_string(),
    }
}

/// True when the path carries one of the accepted audio extensions.
pub fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_key_from_mhz_name() {
        assert_eq!(channel_key("2024-06-01_124.400_0001.wav"), "124.400MHz");
        assert_eq!(channel_key("tower_118.2.wav"), "118.200MHz");
    }

    #[test]
    fn test_channel_key_from_hz_name() {
        assert_eq!(channel_key("sdr_124400000_a.wav"), "124.400MHz");
    }

    #[test]
    fn test_channel_key_unknown() {
        assert_eq!(channel_key("recording_42.wav"), "unknown");
        assert_eq!(channel_key("noise.wav"), "unknown");
    }

    #[test]
    fn test_audio_extension_filter() {
        let exts = vec!["wav".to_string(), "mp3".to_string()];
        assert!(has_audio_extension(Path::new("a/b.wav"), &exts));
        assert!(has_audio_extension(Path::new("a/b.WAV"), &exts));
        assert!(!has_audio_extension(Path::new("a/b.txt"), &exts));
        assert!(!has_audio_extension(Path::new("a/noext"), &exts));
    }
}

//! Energy-based voice activity classification.
//!
//! Pure decision over file bytes + configuration: decode, window into
//! short frames, measure per-frame RMS level, keep the recording when
//! enough frames sit above the energy threshold. Deterministic by
//! construction; no model, no randomness, no I/O beyond the read.
//!
//! The policy is conservative on purpose: a discarded transmission is
//! gone for good, an extra forwarded noise burst only costs one small
//! API call.

use std::io::Cursor;
use std::path::Path;

use serde::Serialize;

/// Frame length for RMS analysis (30 ms at the source rate)
const FRAME_MS: u32 = 30;

/// Hop between frames (15 ms, 50% overlap)
const HOP_MS: u32 = 15;

/// Floor reported for silent frames, in dBFS
const SILENCE_FLOOR_DB: f32 = -100.0;

/// Classifier thresholds, taken from the operator configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Frames with RMS at or above this level (dBFS) count as speech
    pub threshold_db: f32,

    /// Minimum fraction of speech frames required to keep a recording
    pub min_speech_ratio: f32,

    /// Recordings shorter than this are discarded outright (seconds)
    pub min_duration_secs: f64,
}

/// Keep/discard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Keep,
    Discard,
}

/// Verdict plus the measurements behind it, for diagnostics only.
#[derive(Debug, Clone)]
pub struct Classification {
    pub verdict: Verdict,

    /// Fraction of analysis frames that crossed the energy threshold
    pub speech_ratio: f32,

    /// Decoded duration in seconds (0.0 when the file is undecodable)
    pub duration_secs: f64,

    /// Human-readable reason for a discard
    pub reason: Option<String>,
}

impl Classification {
    fn discard(reason: impl Into<String>, speech_ratio: f32, duration_secs: f64) -> Self {
        Self {
            verdict: Verdict::Discard,
            speech_ratio,
            duration_secs,
            reason: Some(reason.into()),
        }
    }
}

/// Classify a recording on disk.
///
/// A corrupt or undecodable file yields `Discard` with a reason, never
/// an error: one bad file must not stop the pipeline.
pub fn classify_file(path: &Path, config: &ClassifierConfig) -> Classification {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return Classification::discard(format!("unreadable file: {e}"), 0.0, 0.0),
    };
    classify_bytes(&bytes, config)
}

/// Classify raw WAV bytes. Split out from [`classify_file`] so tests can
/// run on in-memory buffers.
pub fn classify_bytes(bytes: &[u8], config: &ClassifierConfig) -> Classification {
    let (samples, sample_rate) = match decode_wav(bytes) {
        Ok(decoded) => decoded,
        Err(reason) => return Classification::discard(reason, 0.0, 0.0),
    };

    if samples.is_empty() || sample_rate == 0 {
        return Classification::discard("no audio samples", 0.0, 0.0);
    }

    let duration_secs = samples.len() as f64 / sample_rate as f64;
    if duration_secs < config.min_duration_secs {
        return Classification::discard(
            format!("too short: {duration_secs:.1}s"),
            0.0,
            duration_secs,
        );
    }

    let speech_ratio = speech_frame_ratio(&samples, sample_rate, config.threshold_db);
    if speech_ratio >= config.min_speech_ratio {
        Classification {
            verdict: Verdict::Keep,
            speech_ratio,
            duration_secs,
            reason: None,
        }
    } else {
        Classification::discard(
            format!(
                "speech ratio {speech_ratio:.3} below {:.3}",
                config.min_speech_ratio
            ),
            speech_ratio,
            duration_secs,
        )
    }
}

/// Decode a WAV buffer into normalized mono f32 samples.
fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32), String> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| format!("not a valid WAV: {e}"))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| format!("corrupt WAV data: {e}"))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("corrupt WAV data: {e}"))?,
    };

    let channels = spec.channels.max(1) as usize;
    if channels == 1 {
        return Ok((interleaved, spec.sample_rate));
    }

    // Downmix by averaging channels
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

/// Fraction of short-time frames whose RMS level meets the threshold.
fn speech_frame_ratio(samples: &[f32], sample_rate: u32, threshold_db: f32) -> f32 {
    let frame_size = (sample_rate * FRAME_MS / 1000) as usize;
    let hop_size = (sample_rate * HOP_MS / 1000) as usize;

    if frame_size == 0 || hop_size == 0 || samples.len() < frame_size {
        return 0.0;
    }

    let num_frames = 1 + (samples.len() - frame_size) / hop_size;
    let mut speech_frames = 0usize;

    for i in 0..num_frames {
        let start = i * hop_size;
        let frame = &samples[start..start + frame_size];
        if frame_rms_db(frame) >= threshold_db {
            speech_frames += 1;
        }
    }

    speech_frames as f32 / num_frames as f32
}

/// RMS of one frame in dBFS.
fn frame_rms_db(frame: &[f32]) -> f32 {
    let mean_square: f64 = frame
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum::<f64>()
        / frame.len() as f64;

    let rms = mean_square.sqrt() as f32;
    if rms <= 0.0 {
        SILENCE_FLOOR_DB
    } else {
        20.0 * rms.log10()
    }
}

//! Input directory scanning.
//!
//! The capture process is the sole writer of the input directory; this
//! system is the sole remover. One scan picks up audio files that have
//! settled (mtime older than the settle delay, so half-written captures
//! are never read), oldest first, capped at the batch size.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{has_audio_extension, AudioUnit};

/// Scanner settings, lifted from the operator configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub input_dir: PathBuf,
    pub extensions: Vec<String>,
    pub settle: Duration,
    pub max_batch: usize,
}

/// One-shot scanner over the input directory.
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Collect the current batch of settled audio files, oldest first.
    pub async fn scan(&self) -> Result<Vec<AudioUnit>> {
        let mut entries = tokio::fs::read_dir(&self.config.input_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to read input directory: {}",
                    self.config.input_dir.display()
                )
            })?;

        let now = SystemTime::now();
        let mut units = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !has_audio_extension(&path, &self.config.extensions) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                // File may have vanished between listing and stat
                Err(_) => continue,
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(now);
            match now.duration_since(modified) {
                Ok(age) if age >= self.config.settle => {}
                _ => {
                    debug!(path = %path.display(), "File not settled yet, skipping");
                    continue;
                }
            }

            units.push(AudioUnit::new(
                path,
                metadata.len(),
                DateTime::<Utc>::from(modified),
            ));
        }

        units.sort_by_key(|u| u.captured_at);
        units.truncate(self.config.max_batch);
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn backdate(path: &std::path::Path, secs_ago: i64) {
        let then = FileTime::from_unix_time(
            FileTime::now().unix_seconds() - secs_ago,
            0,
        );
        set_file_mtime(path, then).unwrap();
    }

    fn scanner_for(dir: &TempDir, max_batch: usize) -> Scanner {
        Scanner::new(ScannerConfig {
            input_dir: dir.path().to_path_buf(),
            extensions: vec!["wav".to_string()],
            settle: Duration::from_secs(2),
            max_batch,
        })
    }

    #[tokio::test]
    async fn test_scan_filters_extensions_and_settle() {
        let temp = TempDir::new().unwrap();

        let settled = temp.path().join("old_124.400.wav");
        let fresh = temp.path().join("fresh.wav");
        let other = temp.path().join("notes.txt");
        std::fs::write(&settled, b"audio").unwrap();
        std::fs::write(&fresh, b"audio").unwrap();
        std::fs::write(&other, b"text").unwrap();
        backdate(&settled, 60);
        backdate(&other, 60);

        let units = scanner_for(&temp, 10).scan().await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].file_name, "old_124.400.wav");
        assert_eq!(units[0].channel, "124.400MHz");
    }

    #[tokio::test]
    async fn test_scan_orders_oldest_first_and_caps_batch() {
        let temp = TempDir::new().unwrap();

        for (name, age) in [("c.wav", 10), ("a.wav", 300), ("b.wav", 100)] {
            let path = temp.path().join(name);
            std::fs::write(&path, b"audio").unwrap();
            backdate(&path, age);
        }

        let units = scanner_for(&temp, 2).scan().await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].file_name, "a.wav");
        assert_eq!(units[1].file_name, "b.wav");
    }

    #[tokio::test]
    async fn test_empty_directory_yields_empty_batch() {
        let temp = TempDir::new().unwrap();
        let units = scanner_for(&temp, 10).scan().await.unwrap();
        assert!(units.is_empty());
    }
}

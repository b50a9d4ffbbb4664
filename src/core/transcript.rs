//! Append-only transcript storage, partitioned by date and channel.
//!
//! One text file per calendar day per channel key, e.g.
//! `transcripts/2024-06-01/124.400MHz.txt`. Blocks are only ever
//! appended; nothing here rewrites existing content.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::{AudioUnit, Transcription};

/// Date/channel-partitioned transcript writer.
pub struct TranscriptStore {
    base_dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Append one transcription block under its date partition.
    /// Returns the file the block was written to.
    pub async fn append(
        &self,
        unit: &AudioUnit,
        transcription: &Transcription,
        duration_secs: f64,
    ) -> Result<PathBuf> {
        let local_time = transcription.completed_at.with_timezone(&Local);
        let day_dir = self.base_dir.join(local_time.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&day_dir)
            .await
            .with_context(|| format!("Failed to create transcript dir: {}", day_dir.display()))?;

        let out_path = day_dir.join(format!("{}.txt", unit.channel));

        let mut block = String::new();
        block.push_str(&format!("==== {} ====\n", local_time.format("%H:%M:%S")));
        block.push_str(&format!("[file] {}\n", unit.file_name));
        block.push_str(&format!("[len]  {duration_secs:.1}s\n"));
        block.push_str(&format!("[cost] ${:.4}\n", transcription.cost));
        if transcription.emergency {
            block.push_str("[flag] EMERGENCY\n");
        }
        block.push_str(transcription.text.trim());
        block.push_str("\n\n");
        block.push_str(&"-".repeat(40));
        block.push_str("\n\n");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&out_path)
            .await
            .with_context(|| format!("Failed to open transcript file: {}", out_path.display()))?;
        file.write_all(block.as_bytes())
            .await
            .context("Failed to append transcript block")?;
        file.flush().await.context("Failed to flush transcript")?;

        Ok(out_path)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn unit(name: &str) -> AudioUnit {
        AudioUnit::new(PathBuf::from(format!("/tmp/in/{name}")), 4096, Utc::now())
    }

    fn transcription(text: &str, emergency: bool) -> Transcription {
        Transcription {
            text: text.to_string(),
            cost: 0.0123,
            emergency,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_partitions_by_date_and_channel() {
        let temp = TempDir::new().unwrap();
        let store = TranscriptStore::new(temp.path());

        let path = store
            .append(
                &unit("2024_124.400_0001.wav"),
                &transcription("cleared for takeoff", false),
                7.5,
            )
            .await
            .unwrap();

        let today = Local::now().format("%Y-%m-%d").to_string();
        assert!(path.ends_with(format!("{today}/124.400MHz.txt")));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[file] 2024_124.400_0001.wav"));
        assert!(content.contains("[len]  7.5s"));
        assert!(content.contains("cleared for takeoff"));
        assert!(!content.contains("EMERGENCY"));
    }

    #[tokio::test]
    async fn test_append_is_append_only() {
        let temp = TempDir::new().unwrap();
        let store = TranscriptStore::new(temp.path());
        let u = unit("ch_121.500_a.wav");

        store
            .append(&u, &transcription("first call", false), 5.0)
            .await
            .unwrap();
        let path = store
            .append(&u, &transcription("second call", true), 6.0)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let first = content.find("first call").unwrap();
        let second = content.find("second call").unwrap();
        assert!(first < second);
        assert!(content.contains("[flag] EMERGENCY"));
    }
}

//! Failure log: durable spill for batches that could not be synced.
//!
//! One JSON array of field maps per line. A crash mid-write leaves at most
//! one unterminated line; the next append starts on a fresh line so the
//! damage stays confined to that entry.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use airtable_client::Fields;

pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one batch as a single line.
    pub fn append(&self, batch: &[Fields]) -> Result<()> {
        let mut line = serde_json::to_string(batch).context("Failed to serialize failed batch")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open failure log: {}", self.path.display()))?;

        if ends_mid_line(&mut file)? {
            line.insert(0, '\n');
        }

        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write failure log: {}", self.path.display()))?;
        file.flush()?;

        info!(
            path = %self.path.display(),
            records = batch.len(),
            "Saved failed batch to failure log"
        );
        Ok(())
    }

    /// Every intact entry in the log. Unparseable lines are skipped.
    pub fn entries(&self) -> Result<Vec<Vec<Fields>>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read failure log: {}", self.path.display()))?;

        let mut entries = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Vec<Fields>>(line) {
                Ok(batch) => entries.push(batch),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping corrupt failure log entry"),
            }
        }
        Ok(entries)
    }
}

/// True when the file is non-empty and its last byte is not a newline.
fn ends_mid_line(file: &mut std::fs::File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(names: &[&str]) -> Vec<Fields> {
        names
            .iter()
            .map(|name| {
                let mut fields = Fields::new();
                fields.insert("Channel Name".into(), json!(name));
                fields
            })
            .collect()
    }

    #[test]
    fn appends_one_line_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("failed_batches.json"));

        log.append(&batch(&["@a", "@b"])).unwrap();
        log.append(&batch(&["@c"])).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].len(), 2);
        assert_eq!(entries[1][0]["Channel Name"], "@c");
    }

    #[test]
    fn partial_write_does_not_corrupt_next_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_batches.json");
        std::fs::write(&path, "[{\"Channel Name\":\"@trunc").unwrap();

        let log = FailureLog::new(&path);
        log.append(&batch(&["@whole"])).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0][0]["Channel Name"], "@whole");
    }

    #[test]
    fn missing_log_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("none.json"));
        assert!(log.entries().unwrap().is_empty());
    }
}

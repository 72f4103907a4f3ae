//! Deferred-review queue.
//!
//! Classifier-accepted but low-confidence candidates land here for manual
//! disposition. The file is an append-only JSON array; nothing in the scanner
//! ever promotes or removes entries.

use anyhow::{Context, Result};
use shared_types::ReviewEntry;
use std::fs;
use std::path::PathBuf;

use crate::scan_state::write_atomic;

pub struct ReviewQueue {
    path: PathBuf,
}

impl ReviewQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<ReviewEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read review queue {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse review queue {}", self.path.display()))
    }

    pub fn append(&self, entries: &[ReviewEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut existing = self.load()?;
        existing.extend(entries.iter().cloned());
        let json = serde_json::to_string_pretty(&existing)?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Category;

    fn entry(email: &str) -> ReviewEntry {
        ReviewEntry {
            sender_email: email.to_string(),
            sender_name: "Someone".to_string(),
            subject: "Hello".to_string(),
            classification: Category::GeneralInterest,
            reason: "not sure".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let queue = ReviewQueue::new(dir.path().join("manual_review.json"));
        assert!(queue.load().expect("load").is_empty());
    }

    #[test]
    fn test_append_accumulates_across_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let queue = ReviewQueue::new(dir.path().join("manual_review.json"));
        queue.append(&[entry("a@x.com")]).expect("append");
        queue
            .append(&[entry("b@x.com"), entry("c@x.com")])
            .expect("append");

        let entries = queue.load().expect("load");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sender_email, "a@x.com");
        assert_eq!(entries[2].sender_email, "c@x.com");
    }

    #[test]
    fn test_append_empty_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("manual_review.json");
        ReviewQueue::new(&path).append(&[]).expect("append");
        assert!(!path.exists());
    }
}

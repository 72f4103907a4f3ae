//! Scan watermark and processed-ID bookkeeping.
//!
//! The persisted record is `{ "lastScan": date-or-null, "processedIds": [..] }`.
//! The watermark has day granularity because the Gmail `after:` term does;
//! the processed-ID set exists to avoid double-processing inside the overlap
//! window that granularity introduces.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    pub last_scan: Option<NaiveDate>,
    #[serde(default)]
    pub processed_ids: Vec<String>,
}

impl ScanState {
    pub fn processed_set(&self) -> HashSet<&str> {
        self.processed_ids.iter().map(String::as_str).collect()
    }
}

/// A message id observed during a pass, with the message's own date when the
/// source provided one.
#[derive(Debug, Clone)]
pub struct ObservedMessage {
    pub id: String,
    pub date: Option<NaiveDate>,
}

/// Build the state to persist after a successful pass.
///
/// The watermark only moves forward. The processed-ID set is pruned to the
/// overlap window the day-granular query introduces: an `after:<watermark>`
/// search can only re-return messages dated on or after the watermark, so
/// anything older than one day before it can never be seen again. IDs with an
/// unknown date are kept; the previous set is carried over only when the
/// previous watermark still falls inside the window.
pub fn commit_state(
    previous: &ScanState,
    watermark: NaiveDate,
    observed: &[ObservedMessage],
) -> ScanState {
    let last_scan = match previous.last_scan {
        Some(prev) if prev > watermark => Some(prev),
        _ => Some(watermark),
    };

    let cutoff = watermark
        .checked_sub_days(Days::new(1))
        .unwrap_or(watermark);

    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    let keep_previous = previous
        .last_scan
        .map(|prev| prev >= cutoff)
        .unwrap_or(false);
    if keep_previous {
        for id in &previous.processed_ids {
            if seen.insert(id.clone()) {
                ids.push(id.clone());
            }
        }
    }

    for msg in observed {
        let in_window = msg.date.map(|d| d >= cutoff).unwrap_or(true);
        if in_window && seen.insert(msg.id.clone()) {
            ids.push(msg.id.clone());
        }
    }

    ScanState {
        last_scan,
        processed_ids: ids,
    }
}

/// File-backed store for the singleton [`ScanState`].
pub struct ScanStateStore {
    path: PathBuf,
}

impl ScanStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the zero-value state when nothing has been persisted yet.
    pub fn load(&self) -> Result<ScanState> {
        if !self.path.exists() {
            return Ok(ScanState::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read scan state {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scan state {}", self.path.display()))
    }

    /// Overwrites the persisted state atomically (write temp, then rename) so
    /// a crash mid-write cannot leave a corrupt file behind.
    pub fn save(&self, state: &ScanState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, &json)
    }
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn observed(id: &str, d: Option<&str>) -> ObservedMessage {
        ObservedMessage {
            id: id.to_string(),
            date: d.map(date),
        }
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScanStateStore::new(dir.path().join("last_scan.json"));
        let state = store.load().expect("load should succeed");
        assert_eq!(state, ScanState::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScanStateStore::new(dir.path().join("last_scan.json"));
        let state = ScanState {
            last_scan: Some(date("2026-08-06")),
            processed_ids: vec!["a".to_string(), "b".to_string()],
        };
        store.save(&state).expect("save should succeed");
        assert_eq!(store.load().expect("load should succeed"), state);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("last_scan.json");
        let store = ScanStateStore::new(&path);
        store.save(&ScanState::default()).expect("save");
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/dir/last_scan.json");
        ScanStateStore::new(&path)
            .save(&ScanState::default())
            .expect("save");
        assert!(path.exists());
    }

    #[test]
    fn test_persisted_shape_uses_camel_case_keys() {
        let state = ScanState {
            last_scan: Some(date("2026-08-06")),
            processed_ids: vec!["m1".to_string()],
        };
        let json = serde_json::to_value(&state).expect("serialize");
        assert!(json.get("lastScan").is_some());
        assert_eq!(json["processedIds"][0], "m1");
    }

    #[test]
    fn test_commit_watermark_only_moves_forward() {
        let previous = ScanState {
            last_scan: Some(date("2026-08-10")),
            processed_ids: vec![],
        };
        let next = commit_state(&previous, date("2026-08-06"), &[]);
        assert_eq!(next.last_scan, Some(date("2026-08-10")));
    }

    #[test]
    fn test_commit_merges_previous_ids_on_same_day_rerun() {
        let previous = ScanState {
            last_scan: Some(date("2026-08-06")),
            processed_ids: vec!["old".to_string()],
        };
        let next = commit_state(
            &previous,
            date("2026-08-06"),
            &[observed("new", Some("2026-08-06"))],
        );
        assert_eq!(next.processed_ids, vec!["old", "new"]);
    }

    #[test]
    fn test_commit_drops_previous_ids_outside_window() {
        let previous = ScanState {
            last_scan: Some(date("2026-08-01")),
            processed_ids: vec!["stale".to_string()],
        };
        let next = commit_state(
            &previous,
            date("2026-08-06"),
            &[observed("fresh", Some("2026-08-06"))],
        );
        assert_eq!(next.processed_ids, vec!["fresh"]);
    }

    #[test]
    fn test_commit_prunes_observed_ids_older_than_window() {
        let next = commit_state(
            &ScanState::default(),
            date("2026-08-06"),
            &[
                observed("ancient", Some("2026-07-01")),
                observed("yesterday", Some("2026-08-05")),
                observed("undated", None),
            ],
        );
        assert_eq!(next.processed_ids, vec!["yesterday", "undated"]);
    }

    #[test]
    fn test_commit_deduplicates_ids() {
        let previous = ScanState {
            last_scan: Some(date("2026-08-06")),
            processed_ids: vec!["m1".to_string()],
        };
        let next = commit_state(
            &previous,
            date("2026-08-06"),
            &[observed("m1", Some("2026-08-06"))],
        );
        assert_eq!(next.processed_ids, vec!["m1"]);
    }
}

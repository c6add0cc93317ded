// SPDX-License-Identifier: PMPL-1.0-or-later

//! Append-only score history under `.slophound/`. Entries are lenient
//! on read: a malformed entry is skipped and optional fields degrade to
//! absent instead of failing the log.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::ScanSummary;

const HISTORY_VERSION: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub score: u32,
    pub files_scanned: usize,
    pub violations: usize,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clustering: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_head: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryDocument<'a> {
    version: u64,
    entries: &'a [HistoryEntry],
}

pub fn entry_from_summary(summary: &ScanSummary, git_head: Option<String>) -> HistoryEntry {
    HistoryEntry {
        timestamp: Utc::now().to_rfc3339(),
        score: summary.score,
        files_scanned: summary.files_scanned,
        violations: summary.violations.len(),
        breakdown: summary.breakdown.clone(),
        ai_confidence: Some(summary.ai_confidence.as_str().to_string()),
        density: Some(summary.density),
        clustering: Some(summary.clustering),
        git_head,
    }
}

/// Short HEAD commit of the scanned tree, when it is a git checkout.
pub fn git_head(project_root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(project_root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Loads the log, skipping entries that do not deserialize. A corrupt
/// or wrong-version file reads as an empty log.
pub fn load(path: &Path) -> Vec<HistoryEntry> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(doc) = serde_json::from_str::<Value>(&text) else {
        tracing::debug!(path = %path.display(), "unreadable history; starting empty");
        return Vec::new();
    };
    if doc.get("version").and_then(Value::as_u64) != Some(HISTORY_VERSION) {
        tracing::debug!(path = %path.display(), "history schema mismatch; starting empty");
        return Vec::new();
    }
    let Some(entries) = doc.get("entries").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

/// Appends one entry and trims the log to `max_entries`, keeping the
/// newest.
pub fn record(path: &Path, entry: HistoryEntry, max_entries: usize) -> anyhow::Result<()> {
    let mut entries = load(path);
    entries.push(entry);
    if entries.len() > max_entries {
        let excess = entries.len() - max_entries;
        entries.drain(..excess);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating history directory {}", parent.display()))?;
    }
    let doc = HistoryDocument {
        version: HISTORY_VERSION,
        entries: &entries,
    };
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json).with_context(|| format!("writing history {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(score: u32) -> HistoryEntry {
        HistoryEntry {
            timestamp: format!("2026-08-29T00:00:{score:02}Z"),
            score,
            files_scanned: 3,
            violations: 1,
            breakdown: BTreeMap::new(),
            ai_confidence: None,
            density: None,
            clustering: None,
            git_head: None,
        }
    }

    #[test]
    fn append_and_trim() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        for score in 0..5 {
            record(&path, entry(score), 3).expect("record");
        }
        let entries = load(&path);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].score, 2);
        assert_eq!(entries[2].score, 4);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"version": 1, "entries": [{"timestamp": "t", "score": 90, "files_scanned": 1, "violations": 0}, "garbage", {"score": "not a number"}]}"#,
        )
        .expect("write");
        let entries = load(&path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, 90);
    }

    #[test]
    fn corrupt_log_reads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "][").expect("write");
        assert!(load(&path).is_empty());
    }
}

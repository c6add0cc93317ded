// SPDX-License-Identifier: PMPL-1.0-or-later

//! Baseline ("grandfathering") support. A baseline stores accepted
//! findings keyed by a content-stable fingerprint: rule id plus a
//! normalized window of source around the violating line, hashed. The
//! fingerprint survives unrelated edits elsewhere in the file but
//! changes when the flagged code itself moves or changes.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::Violation;

pub const DEFAULT_BASELINE_PATH: &str = ".slophound/baseline.json";
const BASELINE_VERSION: u64 = 2;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("failed to read baseline {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("baseline {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("baseline {path} has unsupported or missing version (expected {BASELINE_VERSION})")]
    BadVersion { path: String },
    #[error("baseline {path} has a malformed top-level shape")]
    MalformedShape { path: String },
}

/// Per-run cache of file line arrays, so fingerprinting N violations in
/// one file reads it once.
#[derive(Default)]
pub struct LineCache {
    files: HashMap<String, Option<Vec<String>>>,
}

impl LineCache {
    fn lines(&mut self, project_root: &Path, relative_path: &str) -> Option<&[String]> {
        let entry = self
            .files
            .entry(relative_path.to_string())
            .or_insert_with(|| {
                fs::read_to_string(project_root.join(relative_path))
                    .ok()
                    .map(|text| text.lines().map(str::to_string).collect())
            });
        entry.as_deref()
    }
}

/// Whitespace-collapsed window of the line and its two neighbors.
fn normalized_window(lines: &[String], line: u32) -> Option<String> {
    let idx = line.checked_sub(1)? as usize;
    if idx >= lines.len() {
        return None;
    }
    let start = idx.saturating_sub(1);
    let end = (idx + 1).min(lines.len() - 1);
    let window: Vec<String> = lines[start..=end]
        .iter()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    Some(window.join("\n"))
}

// Field order matches the sorted-key JSON the fingerprint is defined
// over; serde_json emits struct fields in declaration order.
#[derive(Serialize)]
struct FingerprintDoc<'a> {
    path: &'a str,
    rule_id: &'a str,
    snippet: &'a str,
}

/// Content-stable fingerprint for a located violation. `None` for
/// repo-level violations, missing files, or out-of-range lines.
pub fn fingerprint(
    violation: &Violation,
    project_root: &Path,
    cache: &mut LineCache,
) -> Option<String> {
    let path = violation.path.as_deref()?;
    let line = violation.line?;
    let lines = cache.lines(project_root, path)?;
    let snippet = normalized_window(lines, line)?;
    let doc = FingerprintDoc {
        path,
        rule_id: &violation.rule_id,
        snippet: &snippet,
    };
    let json = serde_json::to_string(&doc).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Accepted findings loaded from disk.
#[derive(Debug, Default)]
pub struct Baseline {
    fingerprints: HashSet<String>,
    /// Entries saved without a fingerprint match on (rule, path, line).
    positional: HashSet<(String, String, u32)>,
    repo_entries: HashSet<(String, String)>,
}

impl Baseline {
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty() && self.positional.is_empty() && self.repo_entries.is_empty()
    }

    pub fn load(path: &Path) -> Result<Baseline, BaselineError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| BaselineError::Io {
            path: display.clone(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| BaselineError::Parse {
            path: display.clone(),
            source,
        })?;
        let Some(root) = doc.as_object() else {
            return Err(BaselineError::MalformedShape { path: display });
        };
        if root.get("version").and_then(Value::as_u64) != Some(BASELINE_VERSION) {
            return Err(BaselineError::BadVersion { path: display });
        }
        let Some(entries) = root.get("entries").and_then(Value::as_array) else {
            return Err(BaselineError::MalformedShape { path: display });
        };

        let mut baseline = Baseline::default();
        for entry in entries {
            let Some(obj) = entry.as_object() else {
                continue;
            };
            let Some(rule_id) = obj.get("rule_id").and_then(Value::as_str) else {
                continue;
            };
            match obj.get("path").and_then(Value::as_str) {
                Some(path) => {
                    let fingerprint = obj.get("fingerprint").and_then(Value::as_str);
                    match fingerprint {
                        Some(fp) if !fp.is_empty() => {
                            baseline.fingerprints.insert(fp.to_string());
                        }
                        _ => {
                            let Some(line) = obj.get("line").and_then(Value::as_u64) else {
                                continue;
                            };
                            baseline.positional.insert((
                                rule_id.to_string(),
                                path.to_string(),
                                line as u32,
                            ));
                        }
                    }
                }
                None => {
                    let Some(message) = obj.get("message").and_then(Value::as_str) else {
                        continue;
                    };
                    baseline
                        .repo_entries
                        .insert((rule_id.to_string(), message.to_string()));
                }
            }
        }
        Ok(baseline)
    }
}

/// Drops violations that the baseline has accepted.
pub fn filter_violations(
    violations: Vec<Violation>,
    baseline: &Baseline,
    project_root: &Path,
) -> Vec<Violation> {
    if baseline.is_empty() {
        return violations;
    }
    let mut cache = LineCache::default();
    violations
        .into_iter()
        .filter(|violation| match &violation.path {
            None => !baseline
                .repo_entries
                .contains(&(violation.rule_id.clone(), violation.message.clone())),
            Some(path) => {
                if let Some(fp) = fingerprint(violation, project_root, &mut cache) {
                    if baseline.fingerprints.contains(&fp) {
                        return false;
                    }
                }
                match violation.line {
                    Some(line) => !baseline.positional.contains(&(
                        violation.rule_id.clone(),
                        path.clone(),
                        line,
                    )),
                    // file-whole findings are saved as message entries
                    None => !baseline
                        .repo_entries
                        .contains(&(violation.rule_id.clone(), violation.message.clone())),
                }
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BaselineEntry {
    File {
        rule_id: String,
        path: String,
        line: u32,
        fingerprint: String,
    },
    Repo {
        rule_id: String,
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BaselineDocument {
    version: u64,
    generated_at: String,
    entries: Vec<BaselineEntry>,
}

/// Converts a scan's violations into the accepted-findings document.
/// Located violations that cannot be fingerprinted (file vanished
/// mid-run) keep a positional entry with an empty fingerprint.
pub fn build_baseline(violations: &[Violation], project_root: &Path) -> BaselineDocument {
    let mut cache = LineCache::default();
    let mut entries = Vec::with_capacity(violations.len());
    for violation in violations {
        match (&violation.path, violation.line) {
            (Some(path), Some(line)) => {
                let fp = fingerprint(violation, project_root, &mut cache).unwrap_or_default();
                entries.push(BaselineEntry::File {
                    rule_id: violation.rule_id.clone(),
                    path: path.clone(),
                    line,
                    fingerprint: fp,
                });
            }
            _ => entries.push(BaselineEntry::Repo {
                rule_id: violation.rule_id.clone(),
                message: violation.message.clone(),
            }),
        }
    }
    entries.sort_by(|a, b| entry_key(a).cmp(&entry_key(b)));
    BaselineDocument {
        version: BASELINE_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        entries,
    }
}

fn entry_key(entry: &BaselineEntry) -> (String, String, u32) {
    match entry {
        BaselineEntry::File {
            rule_id,
            path,
            line,
            ..
        } => (rule_id.clone(), path.clone(), *line),
        BaselineEntry::Repo { rule_id, message } => (rule_id.clone(), message.clone(), 0),
    }
}

pub fn save_baseline(document: &BaselineDocument, path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating baseline directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("writing baseline {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dimension, RuleMeta, Severity};
    use tempfile::TempDir;

    fn meta() -> RuleMeta {
        RuleMeta::new("A03", "narration", Severity::Warn, Dimension::Fingerprint, Some("claude"))
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, text).expect("write fixture");
    }

    #[test]
    fn fingerprint_survives_unrelated_edits() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/app.py", "x = 1\n# We need to check\ny = 2\n");
        let violation = Violation::in_file(&meta(), "src/app.py", 2, "msg");

        let before =
            fingerprint(&violation, dir.path(), &mut LineCache::default()).expect("fingerprint");

        // unrelated tail edit moves nothing around line 2
        write(
            dir.path(),
            "src/app.py",
            "x = 1\n# We need to check\ny = 2\nz = 3\nw = 4\n",
        );
        let after =
            fingerprint(&violation, dir.path(), &mut LineCache::default()).expect("fingerprint");
        assert_eq!(before, after);
    }

    #[test]
    fn fingerprint_changes_when_context_changes() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/app.py", "a = 1\n# We need to check\nb = 2\n");
        let violation = Violation::in_file(&meta(), "src/app.py", 2, "msg");
        let before =
            fingerprint(&violation, dir.path(), &mut LineCache::default()).expect("fingerprint");

        write(dir.path(), "src/app.py", "a = 9\n# We need to check\nb = 2\n");
        let after =
            fingerprint(&violation, dir.path(), &mut LineCache::default()).expect("fingerprint");
        assert_ne!(before, after);
    }

    #[test]
    fn fingerprint_none_for_missing_file_or_line() {
        let dir = TempDir::new().expect("tempdir");
        let gone = Violation::in_file(&meta(), "src/gone.py", 1, "msg");
        assert!(fingerprint(&gone, dir.path(), &mut LineCache::default()).is_none());

        write(dir.path(), "src/app.py", "x = 1\n");
        let out_of_range = Violation::in_file(&meta(), "src/app.py", 99, "msg");
        assert!(fingerprint(&out_of_range, dir.path(), &mut LineCache::default()).is_none());
    }

    #[test]
    fn roundtrip_filters_everything() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/app.py", "# We need to check\nx = 1\n");
        let violations = vec![
            Violation::in_file(&meta(), "src/app.py", 1, "msg"),
            Violation::repo_wide(&meta(), "repo finding"),
        ];

        let document = build_baseline(&violations, dir.path());
        let baseline_path = dir.path().join(".slophound/baseline.json");
        save_baseline(&document, &baseline_path).expect("save");

        let baseline = Baseline::load(&baseline_path).expect("load");
        let remaining = filter_violations(violations, &baseline, dir.path());
        assert!(remaining.is_empty());
    }

    #[test]
    fn file_whole_findings_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/outlier.py", "x = 1\n");
        let violations = vec![Violation::in_file_whole(
            &meta(),
            "src/outlier.py",
            "File-level finding without a line",
        )];

        let document = build_baseline(&violations, dir.path());
        let baseline_path = dir.path().join(".slophound/baseline.json");
        save_baseline(&document, &baseline_path).expect("save");

        let baseline = Baseline::load(&baseline_path).expect("load");
        let remaining = filter_violations(violations, &baseline, dir.path());
        assert!(remaining.is_empty());

        // a different message on the same file is not grandfathered
        let fresh = vec![Violation::in_file_whole(
            &meta(),
            "src/outlier.py",
            "A different finding",
        )];
        assert_eq!(filter_violations(fresh, &baseline, dir.path()).len(), 1);
    }

    #[test]
    fn wrong_version_is_a_hard_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("baseline.json");
        fs::write(&path, r#"{"version": 1, "entries": []}"#).expect("write");
        assert!(matches!(
            Baseline::load(&path),
            Err(BaselineError::BadVersion { .. })
        ));
    }

    #[test]
    fn malformed_entries_are_dropped_silently() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("baseline.json");
        fs::write(
            &path,
            r#"{"version": 2, "entries": [42, {"no_rule": true}, {"rule_id": "A03", "message": "kept"}]}"#,
        )
        .expect("write");
        let baseline = Baseline::load(&path).expect("load tolerates bad entries");
        assert!(!baseline.is_empty());
        assert!(baseline
            .repo_entries
            .contains(&("A03".to_string(), "kept".to_string())));
    }

    #[test]
    fn positional_fallback_matches_empty_fingerprint() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("baseline.json");
        fs::write(
            &path,
            r#"{"version": 2, "entries": [{"rule_id": "A03", "path": "src/app.py", "line": 1, "fingerprint": ""}]}"#,
        )
        .expect("write");
        let baseline = Baseline::load(&path).expect("load");
        let violations = vec![Violation::in_file(&meta(), "src/app.py", 1, "msg")];
        let remaining = filter_violations(violations, &baseline, dir.path());
        assert!(remaining.is_empty());
    }
}

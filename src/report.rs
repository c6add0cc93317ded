// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report rendering: the colored terminal report, the stable JSON
//! document, the rule catalog listing, and the score trend view.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use colored::Colorize;
use serde_json::json;

use crate::history::HistoryEntry;
use crate::scoring::ScanSummary;
use crate::types::{RuleMeta, Severity, Violation};

/// Bumped whenever the shape of the JSON report changes.
pub const JSON_SCHEMA_VERSION: u64 = 2;

fn severity_tag(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warn => "warn".yellow(),
        Severity::Info => "info".cyan(),
    }
}

fn score_tag(score: u32, threshold: u32) -> colored::ColoredString {
    let text = format!("{score}/100");
    if score < threshold {
        text.red().bold()
    } else if score < threshold.saturating_add(15) {
        text.yellow()
    } else {
        text.green().bold()
    }
}

/// Source line for a located violation, re-read from disk. Absent when
/// the file changed length or vanished since the scan.
fn source_line<'a>(
    cache: &'a mut BTreeMap<String, Option<Vec<String>>>,
    project_root: &Path,
    path: &str,
    line: u32,
) -> Option<&'a str> {
    let lines = cache
        .entry(path.to_string())
        .or_insert_with(|| {
            fs::read_to_string(project_root.join(path))
                .ok()
                .map(|text| text.lines().map(str::to_string).collect())
        })
        .as_ref()?;
    lines.get(line.checked_sub(1)? as usize).map(String::as_str)
}

/// Human-facing scan report. Violations are grouped per file in their
/// already-sorted order, repo-level findings come last, and the summary
/// block closes the report.
pub fn render_terminal(summary: &ScanSummary, project_root: &Path, threshold: u32) -> String {
    let mut out = String::new();
    let header = format!(
        "{} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    out.push_str(&format!("{}\n\n", header.bold()));

    let mut source_cache = BTreeMap::new();
    let mut current_file: Option<&str> = None;
    let mut repo_level: Vec<&Violation> = Vec::new();

    for violation in &summary.violations {
        let Some(path) = violation.path.as_deref() else {
            repo_level.push(violation);
            continue;
        };
        if current_file != Some(path) {
            if current_file.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}\n", path.bold().underline()));
            current_file = Some(path);
        }
        let location = match violation.line {
            Some(line) => format!("{line}"),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "  {:>5} {} [{}] {}\n",
            location,
            severity_tag(violation.severity),
            violation.rule_id.bold(),
            violation.message
        ));
        if let Some(line) = violation.line {
            if let Some(source) = source_line(&mut source_cache, project_root, path, line) {
                out.push_str(&format!("        {}\n", source.trim_end().dimmed()));
            }
        }
        if let Some(suggestion) = &violation.suggestion {
            out.push_str(&format!("        {} {}\n", "hint:".green(), suggestion));
        }
    }

    if !repo_level.is_empty() {
        if current_file.is_some() {
            out.push('\n');
        }
        out.push_str(&format!("{}\n", "project".bold().underline()));
        for violation in repo_level {
            out.push_str(&format!(
                "      - {} [{}] {}\n",
                severity_tag(violation.severity),
                violation.rule_id.bold(),
                violation.message
            ));
            if let Some(suggestion) = &violation.suggestion {
                out.push_str(&format!("        {} {}\n", "hint:".green(), suggestion));
            }
        }
    }

    let (mut errors, mut warns, mut infos) = (0usize, 0usize, 0usize);
    for violation in &summary.violations {
        match violation.severity {
            Severity::Error => errors += 1,
            Severity::Warn => warns += 1,
            Severity::Info => infos += 1,
        }
    }

    if !summary.violations.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!(
        "files scanned: {}    violations: {} ({} error, {} warn, {} info)\n",
        summary.files_scanned,
        summary.violations.len(),
        errors,
        warns,
        infos
    ));
    out.push_str(&format!(
        "score: {} (profile: {})\n",
        score_tag(summary.score, threshold),
        summary.profile
    ));
    for (dimension, remaining) in &summary.breakdown {
        out.push_str(&format!("  {dimension:<16} {remaining:>6.1}\n"));
    }
    out.push_str(&format!(
        "ai confidence: {} (density {:.3}, clustering {:.3})\n",
        summary.ai_confidence.as_str(),
        summary.density,
        summary.clustering
    ));
    if !summary.dominant_models.is_empty() {
        out.push_str(&format!(
            "dominant models: {}\n",
            summary.dominant_models.join(", ")
        ));
    }
    out
}

/// Machine-facing scan report.
pub fn render_json(summary: &ScanSummary) -> anyhow::Result<String> {
    let doc = json!({
        "schema_version": JSON_SCHEMA_VERSION,
        "tool": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "files_scanned": summary.files_scanned,
        "score": summary.score,
        "profile": summary.profile,
        "breakdown": summary.breakdown,
        "ai_confidence": summary.ai_confidence,
        "signals": {
            "density": summary.density,
            "clustering": summary.clustering,
        },
        "dominant_models": summary.dominant_models,
        "violations": summary.violations,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Rule catalog listing, grouped visually by id prefix.
pub fn render_rules_terminal(metas: &[&RuleMeta]) -> String {
    let mut sorted: Vec<&&RuleMeta> = metas.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = String::new();
    let mut last_prefix = None;
    for meta in sorted {
        let prefix = meta.id.chars().next();
        if last_prefix.is_some() && last_prefix != prefix {
            out.push('\n');
        }
        last_prefix = prefix;
        let model = meta.model.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{}  {:<5} {:<15} {:<8} {}\n",
            meta.id.bold(),
            severity_tag(meta.severity),
            meta.dimension.as_str(),
            model,
            meta.title
        ));
    }
    out
}

pub fn render_rules_json(metas: &[&RuleMeta]) -> anyhow::Result<String> {
    let mut sorted: Vec<&&RuleMeta> = metas.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let rules: Vec<_> = sorted
        .iter()
        .map(|meta| {
            json!({
                "id": meta.id,
                "title": meta.title,
                "severity": meta.severity,
                "dimension": meta.dimension,
                "model": meta.model,
            })
        })
        .collect();
    let doc = json!({
        "schema_version": JSON_SCHEMA_VERSION,
        "rules": rules,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Score trend over the newest history entries, oldest first, with the
/// net change over the shown window.
pub fn render_trend_terminal(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "no history recorded yet\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let head = entry
            .git_head
            .as_deref()
            .map(|h| format!(" [{h}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}  score {:>3}  files {:>4}  violations {:>4}{}\n",
            entry.timestamp, entry.score, entry.files_scanned, entry.violations, head
        ));
    }
    if entries.len() >= 2 {
        let first = entries[0].score as i64;
        let last = entries[entries.len() - 1].score as i64;
        let delta = last - first;
        let rendered = format!("{delta:+}");
        let colored = if delta >= 0 {
            rendered.green()
        } else {
            rendered.red()
        };
        out.push_str(&format!("net change over window: {colored}\n"));
    }
    out
}

pub fn render_trend_json(entries: &[HistoryEntry]) -> anyhow::Result<String> {
    let doc = json!({
        "schema_version": JSON_SCHEMA_VERSION,
        "entries": entries,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::scoring;
    use crate::types::{Dimension, Violation};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn summary(violations: Vec<Violation>) -> ScanSummary {
        scoring::summarize(
            3,
            violations,
            &ScoringConfig {
                profile: "default".to_string(),
                penalties: BTreeMap::new(),
            },
        )
    }

    fn warn(path: &str, line: u32) -> Violation {
        let meta = RuleMeta::new(
            "A03",
            "Narration comments",
            Severity::Warn,
            Dimension::Fingerprint,
            Some("claude"),
        );
        Violation::in_file(&meta, path, line, "Overly polite/narrative comment detected.")
    }

    #[test]
    fn terminal_report_groups_by_file_and_shows_source() {
        colored::control::set_override(false);
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        fs::write(
            dir.path().join("src/app.py"),
            "# We need to ensure this works\nx = 1\n",
        )
        .expect("write");

        let summary = summary(vec![warn("src/app.py", 1)]);
        let report = render_terminal(&summary, dir.path(), 60);
        assert!(report.contains("src/app.py"));
        assert!(report.contains("[A03]"));
        assert!(report.contains("# We need to ensure this works"));
        assert!(report.contains("score:"));
    }

    #[test]
    fn terminal_report_separates_repo_level_findings() {
        colored::control::set_override(false);
        let dir = TempDir::new().expect("tempdir");
        let meta = RuleMeta::new(
            "X04",
            "Import cycles",
            Severity::Warn,
            Dimension::Quality,
            None,
        );
        let summary = summary(vec![Violation::repo_wide(&meta, "a -> b -> a")]);
        let report = render_terminal(&summary, dir.path(), 60);
        assert!(report.contains("project"));
        assert!(report.contains("a -> b -> a"));
    }

    #[test]
    fn json_report_has_stable_envelope() {
        let summary = summary(vec![warn("src/app.py", 1)]);
        let text = render_json(&summary).expect("render");
        let doc: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(doc["schema_version"], 2);
        assert_eq!(doc["tool"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(doc["violations"].as_array().map(Vec::len), Some(1));
        assert!(doc["signals"]["density"].is_number());
    }

    #[test]
    fn rules_listing_sorts_by_id() {
        colored::control::set_override(false);
        let a = RuleMeta::new("B01", "b", Severity::Info, Dimension::Fingerprint, None);
        let b = RuleMeta::new("A03", "a", Severity::Warn, Dimension::Fingerprint, None);
        let listing = render_rules_terminal(&[&a, &b]);
        let a_pos = listing.find("A03").expect("A03 listed");
        let b_pos = listing.find("B01").expect("B01 listed");
        assert!(a_pos < b_pos);
    }

    #[test]
    fn trend_reports_net_change() {
        colored::control::set_override(false);
        let entry = |score| HistoryEntry {
            timestamp: "2026-08-29T00:00:00Z".to_string(),
            score,
            files_scanned: 1,
            violations: 0,
            breakdown: BTreeMap::new(),
            ai_confidence: None,
            density: None,
            clustering: None,
            git_head: None,
        };
        let report = render_trend_terminal(&[entry(80), entry(92)]);
        assert!(report.contains("+12"));
        assert!(render_trend_terminal(&[]).contains("no history"));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core data model shared across the audit pipeline: severities, score
//! dimensions, and the violation record every rule produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding. Ordering matters for report sorting: errors
/// first, then warnings, then informational notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warn => 1,
            Severity::Info => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }

    /// Parses a severity name as it appears in config overrides.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warn" | "warning" => Some(Severity::Warn),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score dimension a rule charges against. Each dimension has a fixed
/// budget; the five budgets sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Fingerprint,
    Quality,
    Hallucination,
    Maintainability,
    Security,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Fingerprint,
        Dimension::Quality,
        Dimension::Hallucination,
        Dimension::Maintainability,
        Dimension::Security,
    ];

    pub fn budget(self) -> f64 {
        match self {
            Dimension::Fingerprint => 35.0,
            Dimension::Quality => 25.0,
            Dimension::Hallucination => 20.0,
            Dimension::Maintainability => 15.0,
            Dimension::Security => 5.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Fingerprint => "fingerprint",
            Dimension::Quality => "quality",
            Dimension::Hallucination => "hallucination",
            Dimension::Maintainability => "maintainability",
            Dimension::Security => "security",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a rule: identity plus the scoring metadata
/// every violation it emits inherits.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub dimension: Dimension,
    /// Assistant whose output this rule fingerprints, if any.
    pub model: Option<String>,
}

impl RuleMeta {
    pub fn new(
        id: &str,
        title: &str,
        severity: Severity,
        dimension: Dimension,
        model: Option<&str>,
    ) -> Self {
        RuleMeta {
            id: id.to_string(),
            title: title.to_string(),
            severity,
            dimension,
            model: model.map(str::to_string),
        }
    }
}

/// A single finding. `path` and `line` are absent for repo-level
/// findings produced by cross-file rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub dimension: Dimension,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Violation {
    /// A finding anchored to a line in one file.
    pub fn in_file(meta: &RuleMeta, path: &str, line: u32, message: impl Into<String>) -> Self {
        Violation {
            rule_id: meta.id.clone(),
            severity: meta.severity,
            dimension: meta.dimension,
            message: message.into(),
            path: Some(path.to_string()),
            line: Some(line),
            model: meta.model.clone(),
            suggestion: None,
        }
    }

    /// A finding anchored to a file as a whole.
    pub fn in_file_whole(meta: &RuleMeta, path: &str, message: impl Into<String>) -> Self {
        Violation {
            rule_id: meta.id.clone(),
            severity: meta.severity,
            dimension: meta.dimension,
            message: message.into(),
            path: Some(path.to_string()),
            line: None,
            model: meta.model.clone(),
            suggestion: None,
        }
    }

    /// A repo-level finding with no single location.
    pub fn repo_wide(meta: &RuleMeta, message: impl Into<String>) -> Self {
        Violation {
            rule_id: meta.id.clone(),
            severity: meta.severity,
            dimension: meta.dimension,
            message: message.into(),
            path: None,
            line: None,
            model: meta.model.clone(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Deterministic report order: severity, then path, then line, then id.
/// Every scan ends with this sort so worker count never changes output.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        (
            a.severity.rank(),
            a.path.as_deref().unwrap_or(""),
            a.line.unwrap_or(0),
            a.rule_id.as_str(),
        )
            .cmp(&(
                b.severity.rank(),
                b.path.as_deref().unwrap_or(""),
                b.line.unwrap_or(0),
                b.rule_id.as_str(),
            ))
    });
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! slophound — audit engine for AI-generated code smell.
//!
//! The crate scans a source tree with a registry of detection rules,
//! applies suppressions, directory-scoped configuration, and an
//! accepted-findings baseline, then condenses the surviving violations
//! into a 0-100 quality score with an AI-confidence signal.
//!
//! ENGINE PILLARS:
//! 1. **Rules**: per-file and cross-file detectors grouped by the
//!    assistant whose output they fingerprint.
//! 2. **Detection**: scope resolution, suppression directives, and
//!    severity overrides, with deterministic output ordering.
//! 3. **Scoring**: penalties charged against five fixed dimension
//!    budgets, shaped by density and clustering signals.

pub mod baseline;
pub mod cache;
pub mod config;
pub mod context;
pub mod detect;
pub mod history;
pub mod languages;
pub mod pyast;
pub mod report;
pub mod rules;
pub mod scan;
pub mod scoring;
pub mod suppress;
pub mod treesitter;
pub mod types;

use std::path::Path;

pub use config::Config;
pub use context::{FileContext, ProjectContext};
pub use detect::{detect, ChangedLines};
pub use rules::{Registry, Rule};
pub use scan::{scan, ScanOptions, ScanOutcome};
pub use scoring::{summarize, AiConfidence, ScanSummary};
pub use types::{Dimension, RuleMeta, Severity, Violation};

/// One-call audit of a directory tree with the built-in rule set.
pub fn audit(path: &Path, options: &ScanOptions) -> anyhow::Result<ScanOutcome> {
    let registry = Registry::with_builtins()?;
    scan::scan(&registry, path, options)
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scoring model: violations charge penalties against five fixed
//! dimension budgets summing to 100. Profiles pick the penalty table;
//! config can override individual cells. Density and clustering feed a
//! structure penalty on the quality dimension and the AI-confidence
//! label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::types::{Dimension, Severity, Violation};

/// Coarse likelihood that the scanned tree is substantially
/// AI-generated, from fingerprint-rule hit counts and shape signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiConfidence {
    Low,
    Medium,
    High,
}

impl AiConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            AiConfidence::Low => "low",
            AiConfidence::Medium => "medium",
            AiConfidence::High => "high",
        }
    }
}

/// One scan's aggregate result.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub score: u32,
    pub breakdown: BTreeMap<String, f64>,
    pub ai_confidence: AiConfidence,
    pub dominant_models: Vec<String>,
    pub density: f64,
    pub clustering: f64,
    pub profile: String,
    pub violations: Vec<Violation>,
}

fn base_penalty(profile: &str, dimension: Dimension, severity: Severity) -> f64 {
    use Dimension::*;
    let (info, warn, error) = match (profile, dimension) {
        ("strict", Fingerprint) => (1, 3, 5),
        ("strict", Quality) => (1, 4, 7),
        ("strict", Hallucination) => (5, 12, 20),
        ("strict", Maintainability) => (1, 4, 7),
        ("strict", Security) => (2, 5, 10),
        ("lenient", Fingerprint) => (0, 1, 2),
        ("lenient", Quality) => (0, 2, 4),
        ("lenient", Hallucination) => (2, 6, 12),
        ("lenient", Maintainability) => (0, 2, 4),
        ("lenient", Security) => (0, 2, 4),
        (_, Fingerprint) => (1, 2, 3),
        (_, Quality) => (1, 3, 5),
        (_, Hallucination) => (4, 10, 20),
        (_, Maintainability) => (1, 3, 5),
        (_, Security) => (1, 3, 5),
    };
    match severity {
        Severity::Info => info as f64,
        Severity::Warn => warn as f64,
        Severity::Error => error as f64,
    }
}

fn penalty(scoring: &ScoringConfig, dimension: Dimension, severity: Severity) -> f64 {
    if let Some(cell) = scoring
        .penalties
        .get(dimension.as_str())
        .and_then(|row| row.get(&severity))
    {
        return *cell as f64;
    }
    base_penalty(&scoring.profile, dimension, severity)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn structure_penalty(density: f64, clustering: f64, total: usize) -> f64 {
    let mut penalty = 0.0;
    if density > 2.0 {
        penalty += (density - 2.0) * 3.0;
        penalty = penalty.min(6.0);
    }
    if clustering > 0.6 && total >= 10 {
        penalty += ((clustering - 0.6) * 10.0).min(4.0);
    }
    penalty.min(10.0)
}

fn confidence(
    model_hits: usize,
    distinct_models: usize,
    density: f64,
    clustering: f64,
) -> AiConfidence {
    if model_hits >= 8 || (model_hits >= 4 && distinct_models >= 2) {
        return AiConfidence::High;
    }
    if model_hits >= 3 {
        return AiConfidence::Medium;
    }
    if model_hits >= 2 && distinct_models >= 2 && (density >= 2.0 || clustering >= 0.6) {
        return AiConfidence::Medium;
    }
    AiConfidence::Low
}

/// Aggregates a sorted violation list into the run summary.
pub fn summarize(
    files_scanned: usize,
    violations: Vec<Violation>,
    scoring: &ScoringConfig,
) -> ScanSummary {
    let mut spent: BTreeMap<&'static str, f64> = BTreeMap::new();
    let mut per_file: BTreeMap<&str, usize> = BTreeMap::new();
    let mut model_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut located = 0usize;

    for violation in &violations {
        *spent.entry(violation.dimension.as_str()).or_default() +=
            penalty(scoring, violation.dimension, violation.severity);
        if let Some(path) = &violation.path {
            located += 1;
            *per_file.entry(path.as_str()).or_default() += 1;
        }
        if let Some(model) = &violation.model {
            *model_counts.entry(model.as_str()).or_default() += 1;
        }
    }

    let density = if files_scanned == 0 {
        0.0
    } else {
        round3(violations.len() as f64 / files_scanned as f64)
    };
    let worst_file = per_file.values().copied().max().unwrap_or(0);
    let clustering = if located == 0 {
        0.0
    } else {
        round3(worst_file as f64 / located as f64)
    };

    let structure = structure_penalty(density, clustering, violations.len());

    let mut breakdown = BTreeMap::new();
    let mut score = 0.0;
    for dimension in Dimension::ALL {
        let budget = dimension.budget();
        let mut charged = spent.get(dimension.as_str()).copied().unwrap_or(0.0);
        if dimension == Dimension::Quality {
            charged += structure;
        }
        let value = budget - charged.min(budget);
        breakdown.insert(dimension.as_str().to_string(), round3(value));
        score += value;
    }

    let model_hits: usize = model_counts.values().sum();
    let distinct_models = model_counts.len();
    let ai_confidence = confidence(model_hits, distinct_models, density, clustering);

    let mut dominant: Vec<(&str, usize)> = model_counts.into_iter().collect();
    dominant.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let dominant_models = dominant
        .into_iter()
        .take(2)
        .map(|(model, _)| model.to_string())
        .collect();

    ScanSummary {
        files_scanned,
        score: score.round().max(0.0) as u32,
        breakdown,
        ai_confidence,
        dominant_models,
        density,
        clustering,
        profile: scoring.profile.clone(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleMeta;

    fn meta(id: &str, severity: Severity, dimension: Dimension, model: Option<&str>) -> RuleMeta {
        RuleMeta::new(id, "test", severity, dimension, model)
    }

    fn profile(name: &str) -> ScoringConfig {
        ScoringConfig {
            profile: name.to_string(),
            penalties: BTreeMap::new(),
        }
    }

    fn warn_fp(id: &str, path: &str, line: u32) -> Violation {
        Violation::in_file(
            &meta(id, Severity::Warn, Dimension::Fingerprint, Some("claude")),
            path,
            line,
            "msg",
        )
    }

    #[test]
    fn clean_scan_scores_hundred() {
        let summary = summarize(10, Vec::new(), &profile("default"));
        assert_eq!(summary.score, 100);
        assert_eq!(summary.density, 0.0);
        assert_eq!(summary.clustering, 0.0);
        assert_eq!(summary.ai_confidence, AiConfidence::Low);
        assert!(summary.dominant_models.is_empty());
    }

    #[test]
    fn penalties_subtract_from_the_right_dimension() {
        let violations = vec![warn_fp("A03", "a.py", 1), warn_fp("A03", "a.py", 2)];
        let summary = summarize(10, violations, &profile("default"));
        assert_eq!(summary.breakdown["fingerprint"], 31.0);
        assert_eq!(summary.breakdown["quality"], 25.0);
        assert_eq!(summary.score, 96);
    }

    #[test]
    fn profiles_order_scores() {
        let violations: Vec<Violation> = (1..=6).map(|i| warn_fp("A03", "a.py", i)).collect();
        let strict = summarize(10, violations.clone(), &profile("strict")).score;
        let default = summarize(10, violations.clone(), &profile("default")).score;
        let lenient = summarize(10, violations, &profile("lenient")).score;
        assert!(strict <= default);
        assert!(default <= lenient);
    }

    #[test]
    fn dimension_saturation_caps_its_budget() {
        let violations: Vec<Violation> = (1..=30)
            .map(|i| {
                Violation::in_file(
                    &meta("E01", Severity::Error, Dimension::Hallucination, None),
                    "a.py",
                    i,
                    "msg",
                )
            })
            .collect();
        let summary = summarize(100, violations, &profile("default"));
        assert_eq!(summary.breakdown["hallucination"], 0.0);
        assert!(summary.score >= 70);
    }

    #[test]
    fn penalty_overrides_merge_over_profile() {
        let mut penalties = BTreeMap::new();
        penalties.insert(
            "fingerprint".to_string(),
            BTreeMap::from([(Severity::Warn, 10u32)]),
        );
        let scoring = ScoringConfig {
            profile: "default".to_string(),
            penalties,
        };
        let summary = summarize(10, vec![warn_fp("A03", "a.py", 1)], &scoring);
        assert_eq!(summary.breakdown["fingerprint"], 25.0);
    }

    #[test]
    fn clustering_measures_worst_file_share() {
        let mut violations: Vec<Violation> =
            (1..=9).map(|i| warn_fp("A03", "hot.py", i)).collect();
        violations.push(warn_fp("A03", "cold.py", 1));
        let summary = summarize(2, violations, &profile("default"));
        assert_eq!(summary.clustering, 0.9);
        assert_eq!(summary.density, 5.0);
    }

    #[test]
    fn confidence_tiers() {
        let many: Vec<Violation> = (1..=8).map(|i| warn_fp("A03", "a.py", i)).collect();
        assert_eq!(
            summarize(100, many, &profile("default")).ai_confidence,
            AiConfidence::High
        );

        let some: Vec<Violation> = (1..=3).map(|i| warn_fp("A03", "a.py", i)).collect();
        assert_eq!(
            summarize(100, some, &profile("default")).ai_confidence,
            AiConfidence::Medium
        );

        let few = vec![warn_fp("A03", "a.py", 1)];
        assert_eq!(
            summarize(100, few, &profile("default")).ai_confidence,
            AiConfidence::Low
        );
    }

    #[test]
    fn dominant_models_top_two() {
        let mut violations: Vec<Violation> = (1..=3).map(|i| warn_fp("A03", "a.py", i)).collect();
        violations.push(Violation::in_file(
            &meta("B02", Severity::Warn, Dimension::Fingerprint, Some("cursor")),
            "a.py",
            9,
            "msg",
        ));
        violations.push(Violation::in_file(
            &meta("D01", Severity::Warn, Dimension::Fingerprint, Some("gemini")),
            "a.py",
            10,
            "msg",
        ));
        let summary = summarize(10, violations, &profile("default"));
        assert_eq!(summary.dominant_models, vec!["claude", "cursor"]);
    }
}

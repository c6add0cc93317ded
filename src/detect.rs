// SPDX-License-Identifier: PMPL-1.0-or-later

//! Detection pipeline: resolves the effective rule set per file scope,
//! dispatches rules, applies suppressions and severity overrides, and
//! filters to changed lines on diff-scoped scans. Output ordering is
//! fixed here so callers never depend on dispatch order.

use std::collections::{HashMap, HashSet};

use crate::config::{enabled_rule_ids, Config};
use crate::context::{FileContext, ProjectContext};
use crate::rules::Registry;
use crate::types::{sort_violations, Violation};

/// Changed lines per project-relative path, for diff-scoped scans.
pub type ChangedLines = HashMap<String, HashSet<u32>>;

/// Runs every enabled file-level rule against one file and resolves
/// suppressions and severity overrides for its scope.
pub fn detect_file(registry: &Registry, config: &Config, ctx: &FileContext) -> Vec<Violation> {
    let scope_rules = config.rules_for(&ctx.relative_path);
    let enabled = enabled_rule_ids(scope_rules, &registry.ids());

    let mut out = Vec::new();
    for rule in registry.rules() {
        if !enabled.contains(&rule.meta().id) {
            continue;
        }
        for mut violation in rule.check_file(ctx) {
            if ctx
                .suppressions
                .is_suppressed(&violation.rule_id, violation.line)
            {
                continue;
            }
            if let Some(severity) = scope_rules.severity_overrides.get(&violation.rule_id) {
                violation.severity = *severity;
            }
            out.push(violation);
        }
    }
    out
}

/// Runs every enabled project-level rule once over the whole file set.
/// Enablement follows the project-wide table; violations that land in a
/// file still honor that file's suppressions and scope severity.
pub fn project_violations(registry: &Registry, project: &ProjectContext) -> Vec<Violation> {
    let enabled = enabled_rule_ids(&project.config.rules, &registry.ids());
    let by_path: HashMap<&str, &FileContext> = project
        .files
        .iter()
        .map(|ctx| (ctx.relative_path.as_str(), ctx))
        .collect();

    let mut out = Vec::new();
    for rule in registry.rules() {
        if !enabled.contains(&rule.meta().id) {
            continue;
        }
        for mut violation in rule.check_project(project) {
            match violation.path.as_deref() {
                Some(path) => {
                    if let Some(ctx) = by_path.get(path) {
                        if ctx
                            .suppressions
                            .is_suppressed(&violation.rule_id, violation.line)
                        {
                            continue;
                        }
                    }
                    let scope_rules = project.config.rules_for(path);
                    if let Some(severity) =
                        scope_rules.severity_overrides.get(&violation.rule_id)
                    {
                        violation.severity = *severity;
                    }
                }
                None => {
                    if let Some(severity) = project
                        .config
                        .rules
                        .severity_overrides
                        .get(&violation.rule_id)
                    {
                        violation.severity = *severity;
                    }
                }
            }
            out.push(violation);
        }
    }
    out
}

/// Full detection pass over an assembled project context. A changed-line
/// set makes this a diff scan: file violations outside the set are
/// dropped, repo-level violations are kept, and project rules are
/// skipped entirely.
pub fn detect(
    registry: &Registry,
    project: &ProjectContext,
    changed: Option<&ChangedLines>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for ctx in &project.files {
        violations.extend(detect_file(registry, &project.config, ctx));
    }
    match changed {
        Some(changed) => {
            violations.retain(|v| match (&v.path, v.line) {
                (Some(path), Some(line)) => changed
                    .get(path.as_str())
                    .is_some_and(|lines| lines.contains(&line)),
                (Some(path), None) => changed.contains_key(path.as_str()),
                _ => true,
            });
        }
        None => violations.extend(project_violations(registry, project)),
    }
    sort_violations(&mut violations);
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;
    use crate::types::Severity;
    use std::path::PathBuf;

    fn registry() -> Registry {
        Registry::with_builtins().expect("builtins load")
    }

    fn project(yaml: &str, files: Vec<(&str, &str)>) -> ProjectContext {
        ProjectContext {
            root: PathBuf::from("/nonexistent"),
            config: Config::from_yaml(yaml, "test").expect("valid config"),
            files: files
                .into_iter()
                .map(|(path, text)| {
                    FileContext::from_text(path, Language::Python, text.to_string())
                })
                .collect(),
        }
    }

    #[test]
    fn narration_comment_end_to_end() {
        let project = project(
            "{}",
            vec![("src/app.py", "# We need to ensure this is safe\nx = 1\n")],
        );
        let violations = detect(&registry(), &project, None);
        let narration: Vec<_> = violations.iter().filter(|v| v.rule_id == "A03").collect();
        assert_eq!(narration.len(), 1);
        assert_eq!(narration[0].line, Some(1));
        assert_eq!(narration[0].severity, Severity::Warn);
    }

    #[test]
    fn same_line_directive_suppresses() {
        let project = project(
            "{}",
            vec![(
                "src/app.py",
                "# We need to ensure this is safe  # slop: disable=A03\nx = 1\n",
            )],
        );
        let violations = detect(&registry(), &project, None);
        assert!(violations.iter().all(|v| v.rule_id != "A03"));
    }

    #[test]
    fn severity_override_applies_per_scope() {
        let yaml = "\
rules:
  severity_overrides:
    A03: info
overrides:
  - path: legacy/
    rules:
      severity_overrides:
        A03: error
";
        let project = project(
            yaml,
            vec![
                ("src/app.py", "# We need to ensure this is safe\nx = 1\n"),
                ("legacy/old.py", "# We need to ensure this is safe\nx = 1\n"),
            ],
        );
        let violations = detect(&registry(), &project, None);
        let by_path = |p: &str| {
            violations
                .iter()
                .find(|v| v.rule_id == "A03" && v.path.as_deref() == Some(p))
                .map(|v| v.severity)
        };
        assert_eq!(by_path("src/app.py"), Some(Severity::Info));
        assert_eq!(by_path("legacy/old.py"), Some(Severity::Error));
    }

    #[test]
    fn disabled_scope_silences_rule() {
        let yaml = "\
overrides:
  - path: tests/
    rules:
      disable: [A03]
";
        let project = project(
            yaml,
            vec![
                ("src/app.py", "# Note that this matters\nx = 1\n"),
                ("tests/test_app.py", "# Note that this matters\nx = 1\n"),
            ],
        );
        let violations = detect(&registry(), &project, None);
        assert!(violations
            .iter()
            .any(|v| v.rule_id == "A03" && v.path.as_deref() == Some("src/app.py")));
        assert!(!violations
            .iter()
            .any(|v| v.rule_id == "A03" && v.path.as_deref() == Some("tests/test_app.py")));
    }

    #[test]
    fn diff_scan_filters_files_and_skips_project_rules() {
        let text = "# Note that one\nx = 1\n# Note that two\ny = 2\n";
        let project = project("{}", vec![("src/app.py", text)]);

        let mut changed = ChangedLines::new();
        changed.insert("src/app.py".to_string(), HashSet::from([3]));
        let violations = detect(&registry(), &project, Some(&changed));
        let narration: Vec<_> = violations.iter().filter(|v| v.rule_id == "A03").collect();
        assert_eq!(narration.len(), 1);
        assert_eq!(narration[0].line, Some(3));
        // project-level rules (X05 would otherwise fire) stay out
        assert!(violations.iter().all(|v| !v.rule_id.starts_with('X')));
    }

    #[test]
    fn output_is_sorted() {
        let project = project(
            "{}",
            vec![
                ("src/b.py", "# Note that this matters\nx = 1\n"),
                ("src/a.py", "# <thinking>leak</thinking>\nx = 1\n"),
            ],
        );
        let violations = detect(&registry(), &project, None);
        let ranks: Vec<u8> = violations.iter().map(|v| v.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }
}

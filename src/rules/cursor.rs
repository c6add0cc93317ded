// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fingerprint rules for Cursor-style output: rules files, stacked TODO
//! comments, and near-duplicate code runs.

use std::sync::Arc;

use strsim::normalized_levenshtein;

use crate::context::{FileContext, ProjectContext};
use crate::rules::util::{code_lines, comment_lines};
use crate::rules::Rule;
use crate::static_regex;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(CursorRulesExists::new()),
        Arc::new(StackedTodos::new()),
        Arc::new(NearDuplicateRun::new()),
    ]
}

/// B01: `.cursorrules` file in the repository root.
struct CursorRulesExists {
    meta: RuleMeta,
}

impl CursorRulesExists {
    fn new() -> Self {
        CursorRulesExists {
            meta: RuleMeta::new(
                "B01",
                ".cursorrules exists",
                Severity::Info,
                Dimension::Fingerprint,
                Some("cursor"),
            ),
        }
    }
}

impl Rule for CursorRulesExists {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        if project.root.join(".cursorrules").exists() {
            return vec![Violation::repo_wide(
                &self.meta,
                "Found `.cursorrules` in repository root.",
            )];
        }
        Vec::new()
    }
}

/// B02: three or more consecutive TODO comments without ticket
/// references. `slop: allow-todo` anywhere in the file opts out.
struct StackedTodos {
    meta: RuleMeta,
}

impl StackedTodos {
    fn new() -> Self {
        StackedTodos {
            meta: RuleMeta::new(
                "B02",
                "Stacked TODO comments",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("cursor"),
            ),
        }
    }
}

impl Rule for StackedTodos {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx
            .lines
            .iter()
            .any(|line| line.to_ascii_lowercase().contains("slop: allow-todo"))
        {
            return Vec::new();
        }
        let ticket_re = static_regex!(r"(?i)\btodo\s*\(\s*#?[a-z0-9][a-z0-9-]*\s*\)\s*:");

        let mut violations = Vec::new();
        let mut run_start: Option<u32> = None;
        let mut run_len = 0u32;
        let mut prev_line = 0u32;
        for (lineno, line) in comment_lines(ctx) {
            let lowered = line.to_ascii_lowercase();
            let is_todo = lowered.contains("todo") && !ticket_re.is_match(line);
            if is_todo && run_start.is_some() && lineno == prev_line + 1 {
                run_len += 1;
            } else if is_todo {
                run_start = Some(lineno);
                run_len = 1;
            } else {
                run_start = None;
                run_len = 0;
            }
            if run_len == 3 {
                if let Some(start) = run_start {
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            start,
                            "Three or more consecutive TODO comments.",
                        )
                        .with_suggestion(
                            "File tickets for the work and reference them: `TODO(#123):`.",
                        ),
                    );
                }
            }
            prev_line = lineno;
        }
        violations
    }
}

const DUP_MIN_LEN: usize = 20;
const DUP_SIMILARITY: f64 = 0.7;

/// B08: three consecutive substantial code lines that are pairwise
/// near-identical, the shape left by accepted repeated completions.
struct NearDuplicateRun {
    meta: RuleMeta,
}

impl NearDuplicateRun {
    fn new() -> Self {
        NearDuplicateRun {
            meta: RuleMeta::new(
                "B08",
                "Near-duplicate code run",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("cursor"),
            ),
        }
    }
}

impl Rule for NearDuplicateRun {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let candidates: Vec<(u32, &str)> = code_lines(ctx)
            .into_iter()
            .map(|(n, line)| (n, line.trim()))
            .filter(|(_, line)| line.len() >= DUP_MIN_LEN)
            .collect();

        let mut violations = Vec::new();
        let mut idx = 0;
        while idx + 2 < candidates.len() {
            let window = &candidates[idx..idx + 3];
            let consecutive =
                window[1].0 == window[0].0 + 1 && window[2].0 == window[1].0 + 1;
            if consecutive && pairwise_similar(window) {
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        window[0].0,
                        "Run of near-duplicate code lines.",
                    )
                    .with_suggestion("Extract the repetition into a loop or helper."),
                );
                idx += 3;
            } else {
                idx += 1;
            }
        }
        violations
    }
}

fn pairwise_similar(window: &[(u32, &str)]) -> bool {
    for i in 0..window.len() {
        for j in i + 1..window.len() {
            if normalized_levenshtein(window[i].1, window[j].1) < DUP_SIMILARITY {
                return false;
            }
        }
    }
    true
}

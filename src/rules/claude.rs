// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fingerprint rules for Claude-style output: narrative comments,
//! leaked chain-of-thought tags, over-structured exception handling,
//! and repository markers.

use std::process::Command;
use std::sync::Arc;

use regex::Regex;
use rustpython_parser::ast::{self, Stmt};

use crate::context::{FileContext, ProjectContext};
use crate::pyast::{self, PyNode};
use crate::rules::util::{comment_lines, first_line_containing, normalize_words};
use crate::rules::Rule;
use crate::static_regex;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

fn polite_re() -> &'static Regex {
    static_regex!(
        r"(?i)\b(?:we\s+need\s+to|let['\u{2019}]s|we\s+should|as\s+you\s+can\s+see|note\s+that|it['\u{2019}]s\s+worth\s+noting|it\s+is\s+worth\s+noting|keep\s+in\s+mind|feel\s+free\s+to|don['\u{2019}]t\s+hesitate\s+to|please\s+note)\b"
    )
}

fn thinking_re() -> &'static Regex {
    static_regex!(r"(?i)</?thinking>")
}

fn banner_re() -> &'static Regex {
    static_regex!(r"^\s*(#|//)\s*(?:[=\-]{10,}|[=\-]{3,}\s*\S.*\s*[=\-]{3,})\s*$")
}

fn defensive_re() -> &'static Regex {
    static_regex!(r"(?i)\bat this point\b")
}

fn apology_re() -> &'static Regex {
    static_regex!(r"(?i)(simplified.*production|in production.*would|todo:.*production)")
}

const ROBUST_WORDS: [&str; 3] = ["robust", "comprehensive", "elegant"];

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(CoAuthoredTrailer::new()),
        Arc::new(MemoryFileExists::new()),
        Arc::new(PoliteComment::new()),
        Arc::new(AdjectiveFrequency::new()),
        Arc::new(ThinkingTagLeak::new()),
        Arc::new(ManyExceptHandlers::new()),
        Arc::new(DefensiveNarration::new()),
        Arc::new(BannerComment::new()),
        Arc::new(NarrativeControlFlow::new()),
        Arc::new(ProductionDisclaimer::new()),
    ]
}

/// A01: `Co-Authored-By: Claude` trailer in recent git history.
struct CoAuthoredTrailer {
    meta: RuleMeta,
}

impl CoAuthoredTrailer {
    fn new() -> Self {
        CoAuthoredTrailer {
            meta: RuleMeta::new(
                "A01",
                "Co-Authored-By: Claude trailer",
                Severity::Info,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for CoAuthoredTrailer {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let output = Command::new("git")
            .args(["log", "-n", "50", "--pretty=%B"])
            .current_dir(&project.root)
            .output();
        let Ok(output) = output else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }
        let log = String::from_utf8_lossy(&output.stdout);
        if log.contains("Co-Authored-By: Claude") || log.contains("Co-authored-by: Claude") {
            return vec![Violation::repo_wide(
                &self.meta,
                "Found `Co-Authored-By: Claude` in git history.",
            )
            .with_suggestion(
                "Review recent PRs for AI slop patterns; consider requiring human review for AI-assisted commits.",
            )];
        }
        Vec::new()
    }
}

/// A02: CLAUDE.md memory file in the repository root.
struct MemoryFileExists {
    meta: RuleMeta,
}

impl MemoryFileExists {
    fn new() -> Self {
        MemoryFileExists {
            meta: RuleMeta::new(
                "A02",
                "CLAUDE.md exists",
                Severity::Info,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for MemoryFileExists {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        if project.root.join("CLAUDE.md").exists() {
            return vec![Violation::repo_wide(
                &self.meta,
                "Found `CLAUDE.md` in repository root.",
            )
            .with_suggestion(
                "If this repo is not meant to be AI-assisted, consider removing or documenting its purpose.",
            )];
        }
        Vec::new()
    }
}

/// A03: narrative/polite phrasing inside comments.
struct PoliteComment {
    meta: RuleMeta,
}

impl PoliteComment {
    fn new() -> Self {
        PoliteComment {
            meta: RuleMeta::new(
                "A03",
                "Overly polite comment",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for PoliteComment {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        comment_lines(ctx)
            .into_iter()
            .filter(|(_, line)| polite_re().is_match(line))
            .map(|(lineno, _)| {
                Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Overly polite/narrative comment detected.",
                )
                .with_suggestion("Rewrite as a concise, factual comment (or remove if redundant).")
            })
            .collect()
    }
}

/// A05: "robust/comprehensive/elegant" appearing three or more times in
/// comments and docstrings.
struct AdjectiveFrequency {
    meta: RuleMeta,
}

impl AdjectiveFrequency {
    fn new() -> Self {
        AdjectiveFrequency {
            meta: RuleMeta::new(
                "A05",
                "High-frequency 'robust/comprehensive/elegant'",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for AdjectiveFrequency {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let mut haystack: Vec<&str> = comment_lines(ctx).into_iter().map(|(_, l)| l).collect();
        if let Some(tree) = &ctx.py_ast {
            if let Some(doc) = pyast::docstring(&tree.suite) {
                haystack.push(doc);
            }
            pyast::walk(&tree.suite, &mut |node| {
                let body = match node {
                    PyNode::Stmt(Stmt::FunctionDef(ast::StmtFunctionDef { body, .. })) => body,
                    PyNode::Stmt(Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef {
                        body, ..
                    })) => body,
                    PyNode::Stmt(Stmt::ClassDef(ast::StmtClassDef { body, .. })) => body,
                    _ => return,
                };
                if let Some(doc) = pyast::docstring(body) {
                    haystack.push(doc);
                }
            });
        }

        let words = normalize_words(&haystack.join("\n"));
        let mut violations = Vec::new();
        for target in ROBUST_WORDS {
            let count = words.iter().filter(|w| w.as_str() == target).count();
            if count >= 3 {
                let lineno = first_line_containing(&ctx.lines, target).unwrap_or(1);
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        lineno,
                        format!("High frequency of '{target}' ({count} occurrences)."),
                    )
                    .with_suggestion(
                        "Reduce subjective adjectives in comments; prefer concrete, verifiable statements.",
                    ),
                );
            }
        }
        violations
    }
}

/// A06: leaked `<thinking>` tags anywhere in the file.
struct ThinkingTagLeak {
    meta: RuleMeta,
}

impl ThinkingTagLeak {
    fn new() -> Self {
        ThinkingTagLeak {
            meta: RuleMeta::new(
                "A06",
                "<thinking> tag leak",
                Severity::Error,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for ThinkingTagLeak {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        ctx.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| thinking_re().is_match(line))
            .map(|(idx, _)| {
                Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    idx as u32 + 1,
                    "Found leaked `<thinking>` tag.",
                )
                .with_suggestion("Remove the tag content from source control.")
            })
            .collect()
    }
}

/// A07: try statements with more than three except handlers.
struct ManyExceptHandlers {
    meta: RuleMeta,
}

impl ManyExceptHandlers {
    fn new() -> Self {
        ManyExceptHandlers {
            meta: RuleMeta::new(
                "A07",
                "Over-structured exception handling",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for ManyExceptHandlers {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            if let PyNode::Stmt(stmt @ Stmt::Try(ast::StmtTry { handlers, .. })) = node {
                if handlers.len() > 3 {
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            tree.line_of(stmt),
                            format!("Try statement has {} except handlers.", handlers.len()),
                        )
                        .with_suggestion(
                            "Collapse similar handlers and keep exception handling minimal and precise.",
                        ),
                    );
                }
            }
        });
        violations
    }
}

/// A09: defensive "at this point" narration.
struct DefensiveNarration {
    meta: RuleMeta,
}

impl DefensiveNarration {
    fn new() -> Self {
        DefensiveNarration {
            meta: RuleMeta::new(
                "A09",
                "Defensive 'at this point' comment",
                Severity::Info,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for DefensiveNarration {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        comment_lines(ctx)
            .into_iter()
            .filter(|(_, line)| defensive_re().is_match(line))
            .map(|(lineno, _)| {
                Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Defensive narrative comment detected ('at this point').",
                )
                .with_suggestion("Remove or rewrite as a concrete invariant only if it adds value.")
            })
            .collect()
    }
}

/// A10: banner/separator comments.
struct BannerComment {
    meta: RuleMeta,
}

impl BannerComment {
    fn new() -> Self {
        BannerComment {
            meta: RuleMeta::new(
                "A10",
                "Banner/separator comment",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for BannerComment {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        ctx.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| banner_re().is_match(line))
            .map(|(idx, _)| {
                Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    idx as u32 + 1,
                    "Banner/separator comment detected.",
                )
                .with_suggestion("Prefer minimal sectioning; remove banners unless they carry meaning.")
            })
            .collect()
    }
}

/// A11: an ordered First -> Next -> Finally triple within a 50-line
/// window of comment lines.
struct NarrativeControlFlow {
    meta: RuleMeta,
}

impl NarrativeControlFlow {
    fn new() -> Self {
        NarrativeControlFlow {
            meta: RuleMeta::new(
                "A11",
                "Narrative control-flow comment",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for NarrativeControlFlow {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let first_re = static_regex!(r"(?i)\bfirst\b");
        let next_re = static_regex!(r"(?i)\bnext\b");
        let finally_re = static_regex!(r"(?i)\bfinally\b");

        let mut firsts = Vec::new();
        let mut nexts = Vec::new();
        let mut finallys = Vec::new();
        for (lineno, line) in comment_lines(ctx) {
            if first_re.is_match(line) {
                firsts.push(lineno);
            }
            if next_re.is_match(line) {
                nexts.push(lineno);
            }
            if finally_re.is_match(line) {
                finallys.push(lineno);
            }
        }
        if firsts.is_empty() || nexts.is_empty() || finallys.is_empty() {
            return Vec::new();
        }

        for &first in &firsts {
            for &next in nexts.iter().filter(|&&n| first < n && n <= first + 50) {
                if finallys.iter().any(|&f| next < f && f <= first + 50) {
                    return vec![Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        first,
                        "Narrative control-flow comments detected (First/Next/Finally).",
                    )
                    .with_suggestion(
                        "Replace with concise comments only where logic is non-obvious.",
                    )];
                }
            }
        }
        Vec::new()
    }
}

/// A12: "in production..." placeholder disclaimers.
struct ProductionDisclaimer {
    meta: RuleMeta,
}

impl ProductionDisclaimer {
    fn new() -> Self {
        ProductionDisclaimer {
            meta: RuleMeta::new(
                "A12",
                "Placeholder apology/prod disclaimer",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("claude"),
            ),
        }
    }
}

impl Rule for ProductionDisclaimer {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        comment_lines(ctx)
            .into_iter()
            .filter(|(_, line)| apology_re().is_match(line))
            .map(|(lineno, _)| {
                Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Placeholder 'in production' disclaimer detected.",
                )
                .with_suggestion(
                    "Replace with an actionable TODO linked to an issue, or implement the missing behavior.",
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;

    fn py(text: &str) -> FileContext {
        FileContext::from_text("src/app.py", Language::Python, text.to_string())
    }

    #[test]
    fn polite_comment_flags_narration() {
        let ctx = py("# We need to ensure this is safe\nx = 1\n");
        let violations = PoliteComment::new().check_file(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(1));
        assert_eq!(violations[0].severity, Severity::Warn);
    }

    #[test]
    fn polite_comment_ignores_code() {
        let ctx = py("note_that = 'we need to'\n");
        assert!(PoliteComment::new().check_file(&ctx).is_empty());
    }

    #[test]
    fn thinking_tag_is_error() {
        let ctx = py("x = 1\n# <thinking>hmm</thinking>\n");
        let violations = ThinkingTagLeak::new().check_file(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
    }

    #[test]
    fn many_except_handlers() {
        let src = "\
try:
    work()
except ValueError:
    pass
except KeyError:
    pass
except TypeError:
    pass
except OSError:
    pass
";
        let violations = ManyExceptHandlers::new().check_file(&py(src));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn adjective_frequency_counts_docstrings() {
        let src = "\
\"\"\"A robust module. Very robust. Extremely robust.\"\"\"
x = 1
";
        let violations = AdjectiveFrequency::new().check_file(&py(src));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("robust"));
    }

    #[test]
    fn banner_comment_matches_separators() {
        let ctx = py("# ----------------------\nx = 1\n# === Section ===\n");
        let violations = BannerComment::new().check_file(&ctx);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn narrative_triple_must_be_ordered_within_window() {
        let hit = py("# First, load\nx = 1\n# Next, parse\ny = 2\n# Finally, emit\n");
        assert_eq!(NarrativeControlFlow::new().check_file(&hit).len(), 1);

        let unordered = py("# Finally, emit\n# Next, parse\n# First, load\n");
        assert!(NarrativeControlFlow::new().check_file(&unordered).is_empty());
    }
}

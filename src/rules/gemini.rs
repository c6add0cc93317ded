// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fingerprint rules for Gemini-style output: preamble comments,
//! print-heavy scripts, ternary pileups, awaitless async, globals, and
//! dynamic code execution.

use std::sync::Arc;

use rustpython_parser::ast::{self, Expr, Stmt};

use crate::context::FileContext;
use crate::pyast::{self, PyNode};
use crate::rules::util::comment_lines;
use crate::rules::Rule;
use crate::static_regex;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

const PER_FILE_CAP: usize = 10;

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(ComprehensivePreamble::new()),
        Arc::new(PrintHeavyFile::new()),
        Arc::new(NestedTernary::new()),
        Arc::new(AwaitlessAsync::new()),
        Arc::new(GlobalStatement::new()),
        Arc::new(DynamicExecution::new()),
    ]
}

/// D01: "here's a comprehensive ..." preamble comments.
struct ComprehensivePreamble {
    meta: RuleMeta,
}

impl ComprehensivePreamble {
    fn new() -> Self {
        ComprehensivePreamble {
            meta: RuleMeta::new(
                "D01",
                "'Here's a comprehensive' preamble",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("gemini"),
            ),
        }
    }
}

impl Rule for ComprehensivePreamble {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let preamble_re = static_regex!(r"(?i)here['\u{2019}]s a comprehensive");
        for (lineno, line) in comment_lines(ctx) {
            if preamble_re.is_match(line) {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Chat-style preamble comment detected.",
                )
                .with_suggestion("Delete the preamble; keep only comments that explain the code.")];
            }
        }
        Vec::new()
    }
}

/// D02: five or more print() calls in one non-test Python file.
struct PrintHeavyFile {
    meta: RuleMeta,
}

impl PrintHeavyFile {
    fn new() -> Self {
        PrintHeavyFile {
            meta: RuleMeta::new(
                "D02",
                "Print-heavy file",
                Severity::Warn,
                Dimension::Quality,
                Some("gemini"),
            ),
        }
    }
}

impl Rule for PrintHeavyFile {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx.is_test_file() {
            return Vec::new();
        }
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut count = 0usize;
        let mut first_line = None;
        pyast::walk(&tree.suite, &mut |node| {
            let PyNode::Expr(expr @ Expr::Call(ast::ExprCall { func, .. })) = node else {
                return;
            };
            if matches!(
                func.as_ref(),
                Expr::Name(ast::ExprName { id, .. }) if id.as_str() == "print"
            ) {
                count += 1;
                if first_line.is_none() {
                    first_line = Some(tree.line_of(expr));
                }
            }
        });
        if count >= 5 {
            if let Some(line) = first_line {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    line,
                    format!("Found {count} print() calls in one file."),
                )
                .with_suggestion("Use the logging module with appropriate levels.")];
            }
        }
        Vec::new()
    }
}

/// D03: conditional expressions nested more than two levels deep.
struct NestedTernary {
    meta: RuleMeta,
}

impl NestedTernary {
    fn new() -> Self {
        NestedTernary {
            meta: RuleMeta::new(
                "D03",
                "Deeply nested ternary",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("gemini"),
            ),
        }
    }
}

fn ifexp_depth(expr: &Expr) -> usize {
    match expr {
        Expr::IfExp(ast::ExprIfExp { body, orelse, .. }) => {
            1 + ifexp_depth(body).max(ifexp_depth(orelse))
        }
        _ => 0,
    }
}

impl Rule for NestedTernary {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut hit: Option<u32> = None;
        pyast::walk(&tree.suite, &mut |node| {
            if hit.is_some() {
                return;
            }
            if let PyNode::Expr(expr @ Expr::IfExp(_)) = node {
                if ifexp_depth(expr) > 2 {
                    hit = Some(tree.line_of(expr));
                }
            }
        });
        match hit {
            Some(line) => vec![Violation::in_file(
                &self.meta,
                &ctx.relative_path,
                line,
                "Conditional expression nested more than two levels deep.",
            )
            .with_suggestion("Rewrite as an if/elif chain or a lookup table.")],
            None => Vec::new(),
        }
    }
}

/// D04: async functions that never await.
struct AwaitlessAsync {
    meta: RuleMeta,
}

impl AwaitlessAsync {
    fn new() -> Self {
        AwaitlessAsync {
            meta: RuleMeta::new(
                "D04",
                "Async function without await",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("gemini"),
            ),
        }
    }
}

impl Rule for AwaitlessAsync {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violation = None;
        pyast::walk(&tree.suite, &mut |node| {
            if violation.is_some() {
                return;
            }
            if let PyNode::Stmt(stmt @ Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef {
                name,
                body,
                ..
            })) = node
            {
                if !pyast::contains_await(body) {
                    violation = Some(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            tree.line_of(stmt),
                            format!("Async function `{name}` contains no await."),
                        )
                        .with_suggestion("Drop `async` or await the underlying operation."),
                    );
                }
            }
        });
        violation.into_iter().collect()
    }
}

/// D05: `global` statements.
struct GlobalStatement {
    meta: RuleMeta,
}

impl GlobalStatement {
    fn new() -> Self {
        GlobalStatement {
            meta: RuleMeta::new(
                "D05",
                "global statement",
                Severity::Warn,
                Dimension::Maintainability,
                Some("gemini"),
            ),
        }
    }
}

impl Rule for GlobalStatement {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            if violations.len() >= PER_FILE_CAP {
                return;
            }
            if let PyNode::Stmt(stmt @ Stmt::Global(_)) = node {
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        tree.line_of(stmt),
                        "Found `global` statement.",
                    )
                    .with_suggestion("Pass state explicitly or encapsulate it in a class."),
                );
            }
        });
        violations
    }
}

/// D06: exec()/eval() calls.
struct DynamicExecution {
    meta: RuleMeta,
}

impl DynamicExecution {
    fn new() -> Self {
        DynamicExecution {
            meta: RuleMeta::new(
                "D06",
                "exec()/eval() usage",
                Severity::Error,
                Dimension::Security,
                Some("gemini"),
            ),
        }
    }
}

impl Rule for DynamicExecution {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            if violations.len() >= PER_FILE_CAP {
                return;
            }
            let PyNode::Expr(expr @ Expr::Call(ast::ExprCall { func, .. })) = node else {
                return;
            };
            if let Expr::Name(ast::ExprName { id, .. }) = func.as_ref() {
                if matches!(id.as_str(), "exec" | "eval") {
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            tree.line_of(expr),
                            format!("Found `{id}(...)` usage."),
                        )
                        .with_suggestion(
                            "Replace dynamic execution with explicit dispatch or ast.literal_eval.",
                        ),
                    );
                }
            }
        });
        violations
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
    fn preamble_comment_first_hit_only() {
        let src = "# Here's a comprehensive solution\n# here's a comprehensive retry\n";
        assert_eq!(ComprehensivePreamble::new().check_file(&py(src)).len(), 1);
    }

    #[test]
    fn print_heavy_needs_five_calls() {
        let four = "print(1)\nprint(2)\nprint(3)\nprint(4)\n";
        assert!(PrintHeavyFile::new().check_file(&py(four)).is_empty());

        let five = "print(1)\nprint(2)\nprint(3)\nprint(4)\nprint(5)\n";
        let violations = PrintHeavyFile::new().check_file(&py(five));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("5 print() calls"));
    }

    #[test]
    fn print_heavy_exempts_tests() {
        let five = "print(1)\nprint(2)\nprint(3)\nprint(4)\nprint(5)\n";
        let ctx = FileContext::from_text("tests/test_app.py", Language::Python, five.to_string());
        assert!(PrintHeavyFile::new().check_file(&ctx).is_empty());
    }

    #[test]
    fn nested_ternary_depth_threshold() {
        let two = "x = 1 if a else (2 if b else 3)\n";
        assert!(NestedTernary::new().check_file(&py(two)).is_empty());

        let three = "x = 1 if a else (2 if b else (3 if c else 4))\n";
        assert_eq!(NestedTernary::new().check_file(&py(three)).len(), 1);
    }

    #[test]
    fn awaitless_async_flagged_by_name() {
        let src = "async def fetch():\n    return cached\n";
        let violations = AwaitlessAsync::new().check_file(&py(src));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`fetch`"));

        let ok = "async def fetch():\n    return await load()\n";
        assert!(AwaitlessAsync::new().check_file(&py(ok)).is_empty());
    }

    #[test]
    fn exec_and_eval_are_errors() {
        let src = "def f(code):\n    exec(code)\n    return eval('1+1')\n";
        let violations = DynamicExecution::new().check_file(&py(src));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Error));
    }

    #[test]
    fn global_statements_each_reported() {
        let src = "def f():\n    global a\n    global b\n";
        assert_eq!(GlobalStatement::new().check_file(&py(src)).len(), 2);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! Model-agnostic quality rules: comment density, swallowed exceptions,
//! deep nesting, hardcoded credentials, and oversized functions.

use std::collections::HashSet;
use std::sync::Arc;

use rustpython_parser::ast::{self, Expr, Stmt};

use crate::context::FileContext;
use crate::languages::Language;
use crate::pyast::{self, PyNode};
use crate::rules::util::{code_lines, comment_lines, looks_like_credential};
use crate::rules::Rule;
use crate::static_regex;
use crate::treesitter;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(CommentDensity::new()),
        Arc::new(SwallowedException::new()),
        Arc::new(DeepNesting::new()),
        Arc::new(HardcodedCredential::new()),
        Arc::new(OversizedFunction::new()),
    ]
}

/// E01: more comment lines than half the code lines.
struct CommentDensity {
    meta: RuleMeta,
}

impl CommentDensity {
    fn new() -> Self {
        CommentDensity {
            meta: RuleMeta::new(
                "E01",
                "Excessive comment density",
                Severity::Warn,
                Dimension::Hallucination,
                None,
            ),
        }
    }
}

impl Rule for CommentDensity {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let comments = comment_lines(ctx).len();
        let code = code_lines(ctx).len();
        if comments + code < 10 {
            return Vec::new();
        }
        let ratio = comments as f64 / code.max(1) as f64;
        if ratio > 0.5 {
            return vec![Violation::in_file(
                &self.meta,
                &ctx.relative_path,
                1,
                format!(
                    "{comments} comment lines vs {code} code lines (ratio {ratio:.2})."
                ),
            )
            .with_suggestion("Trim comments that narrate the obvious.")];
        }
        Vec::new()
    }
}

/// E04: broad except handlers whose entire body is pass/continue/return
/// None.
struct SwallowedException {
    meta: RuleMeta,
}

impl SwallowedException {
    fn new() -> Self {
        SwallowedException {
            meta: RuleMeta::new(
                "E04",
                "Swallowed exception",
                Severity::Error,
                Dimension::Quality,
                None,
            ),
        }
    }
}

fn is_broad_type(expr: &Expr) -> bool {
    match expr {
        Expr::Name(ast::ExprName { id, .. }) => {
            matches!(id.as_str(), "Exception" | "BaseException")
        }
        Expr::Tuple(ast::ExprTuple { elts, .. }) => elts.iter().any(is_broad_type),
        _ => false,
    }
}

fn body_swallows(body: &[Stmt]) -> bool {
    if body.len() != 1 {
        return false;
    }
    match &body[0] {
        Stmt::Pass(_) | Stmt::Continue(_) => true,
        Stmt::Return(ast::StmtReturn { value, .. }) => match value {
            None => true,
            Some(expr) => matches!(
                expr.as_ref(),
                Expr::Constant(ast::ExprConstant {
                    value: ast::Constant::None,
                    ..
                })
            ),
        },
        _ => false,
    }
}

impl Rule for SwallowedException {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            let PyNode::Stmt(Stmt::Try(ast::StmtTry { handlers, .. })) = node else {
                return;
            };
            for handler in handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                let broad = match &h.type_ {
                    None => true,
                    Some(type_) => is_broad_type(type_),
                };
                if broad && body_swallows(&h.body) {
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            tree.line_of(h),
                            "Broad exception handler silently swallows the error.",
                        )
                        .with_suggestion("Catch specific exceptions, or at least log before bailing."),
                    );
                }
            }
        });
        violations
    }
}

/// E07: indentation deeper than five levels (four columns per level).
struct DeepNesting {
    meta: RuleMeta,
}

impl DeepNesting {
    fn new() -> Self {
        DeepNesting {
            meta: RuleMeta::new(
                "E07",
                "Deep nesting",
                Severity::Warn,
                Dimension::Maintainability,
                None,
            ),
        }
    }
}

impl Rule for DeepNesting {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let mut max_level = 0usize;
        let mut max_line = 0u32;
        for (lineno, line) in code_lines(ctx) {
            let indent: usize = line
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .map(|c| if c == '\t' { 4 } else { 1 })
                .sum();
            let level = indent / 4;
            if level > max_level {
                max_level = level;
                max_line = lineno;
            }
        }
        if max_level > 5 {
            return vec![Violation::in_file(
                &self.meta,
                &ctx.relative_path,
                max_line,
                format!("Nesting reaches {max_level} levels."),
            )
            .with_suggestion("Flatten with early returns or extracted helpers.")];
        }
        Vec::new()
    }
}

/// E09: string literals assigned to credential-named variables.
struct HardcodedCredential {
    meta: RuleMeta,
}

impl HardcodedCredential {
    fn new() -> Self {
        HardcodedCredential {
            meta: RuleMeta::new(
                "E09",
                "Hardcoded credential",
                Severity::Error,
                Dimension::Security,
                None,
            ),
        }
    }

    fn check_python(&self, ctx: &FileContext, tree: &pyast::PythonAst) -> Vec<Violation> {
        let mut violations = Vec::new();
        let flag = |name: &str, value: &Expr, line: u32, out: &mut Vec<Violation>| {
            let non_empty_str = matches!(
                value,
                Expr::Constant(ast::ExprConstant {
                    value: ast::Constant::Str(text),
                    ..
                }) if !text.is_empty()
            );
            if non_empty_str && looks_like_credential(name) {
                out.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        line,
                        format!("Variable `{name}` is assigned a string literal."),
                    )
                    .with_suggestion("Load secrets from the environment or a secret store."),
                );
            }
        };
        pyast::walk(&tree.suite, &mut |node| match node {
            PyNode::Stmt(stmt @ Stmt::Assign(ast::StmtAssign { targets, value, .. })) => {
                for target in targets {
                    if let Expr::Name(ast::ExprName { id, .. }) = target {
                        flag(id.as_str(), value, tree.line_of(stmt), &mut violations);
                    }
                }
            }
            PyNode::Stmt(stmt @ Stmt::AnnAssign(ast::StmtAnnAssign {
                target,
                value: Some(value),
                ..
            })) => {
                if let Expr::Name(ast::ExprName { id, .. }) = target.as_ref() {
                    flag(id.as_str(), value, tree.line_of(stmt), &mut violations);
                }
            }
            PyNode::Expr(expr @ Expr::NamedExpr(ast::ExprNamedExpr { target, value, .. })) => {
                if let Expr::Name(ast::ExprName { id, .. }) = target.as_ref() {
                    flag(id.as_str(), value, tree.line_of(expr), &mut violations);
                }
            }
            _ => {}
        });
        violations
    }

    fn check_lines(&self, ctx: &FileContext) -> Vec<Violation> {
        let assign_re = static_regex!(
            r#"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*[A-Za-z_][A-Za-z0-9_<>\[\]]*\s*)?=\s*["'][^"']+["']"#
        );
        let mut violations = Vec::new();
        for (lineno, line) in code_lines(ctx) {
            for caps in assign_re.captures_iter(line) {
                if looks_like_credential(&caps[1]) {
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            lineno,
                            format!("Variable `{}` is assigned a string literal.", &caps[1]),
                        )
                        .with_suggestion("Load secrets from the environment or a secret store."),
                    );
                }
            }
        }
        violations
    }
}

impl Rule for HardcodedCredential {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx.is_test_file() {
            return Vec::new();
        }
        match &ctx.py_ast {
            Some(tree) => self.check_python(ctx, tree),
            None if ctx.language != Language::Python => self.check_lines(ctx),
            None => Vec::new(),
        }
    }
}

/// E12: function bodies over 80 code lines, docstrings and comments
/// excluded.
struct OversizedFunction {
    meta: RuleMeta,
}

const MAX_BODY_LINES: usize = 80;

impl OversizedFunction {
    fn new() -> Self {
        OversizedFunction {
            meta: RuleMeta::new(
                "E12",
                "Oversized function",
                Severity::Warn,
                Dimension::Maintainability,
                None,
            ),
        }
    }

    fn check_python(&self, ctx: &FileContext, tree: &pyast::PythonAst) -> Vec<Violation> {
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            let (stmt, name, body): (&Stmt, &str, &[Stmt]) = match node {
                PyNode::Stmt(stmt @ Stmt::FunctionDef(ast::StmtFunctionDef {
                    name, body, ..
                })) => (stmt, name.as_str(), body),
                PyNode::Stmt(stmt @ Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef {
                    name,
                    body,
                    ..
                })) => (stmt, name.as_str(), body),
                _ => return,
            };
            let Some(first) = body.first() else {
                return;
            };
            let Some(last) = body.last() else {
                return;
            };
            let start = tree.line_of(first);
            let end = tree.end_line_of(last);

            // Docstring statements do not count against the budget.
            let mut doc_lines: HashSet<u32> = HashSet::new();
            for stmt in body {
                if let Stmt::Expr(ast::StmtExpr { value, .. }) = stmt {
                    if matches!(
                        value.as_ref(),
                        Expr::Constant(ast::ExprConstant {
                            value: ast::Constant::Str(_),
                            ..
                        })
                    ) {
                        for line in tree.line_of(stmt)..=tree.end_line_of(stmt) {
                            doc_lines.insert(line);
                        }
                    }
                }
            }

            let count = (start..=end)
                .filter(|lineno| !doc_lines.contains(lineno))
                .filter(|lineno| {
                    let Some(line) = ctx.lines.get(*lineno as usize - 1) else {
                        return false;
                    };
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with('#')
                })
                .count();
            if count > MAX_BODY_LINES {
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        tree.line_of(stmt),
                        format!("Function `{name}` body is {count} code lines long (>{MAX_BODY_LINES})."),
                    )
                    .with_suggestion("Split it into focused helpers."),
                );
            }
        });
        violations
    }

    fn check_tree(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some((grammar, tree)) = &ctx.tree else {
            return Vec::new();
        };
        let kinds = grammar.function_kinds();
        let mut violations = Vec::new();
        treesitter::visit(tree.root_node(), &mut |node| {
            if !kinds.contains(&node.kind()) {
                return;
            }
            let start = node.start_position().row as u32 + 1;
            let end = node.end_position().row as u32 + 1;
            let count = (start..=end)
                .filter(|lineno| {
                    let Some(line) = ctx.lines.get(*lineno as usize - 1) else {
                        return false;
                    };
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.starts_with("//")
                })
                .count();
            if count > MAX_BODY_LINES {
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        start,
                        format!("Function body is {count} code lines long (>{MAX_BODY_LINES})."),
                    )
                    .with_suggestion("Split it into focused helpers."),
                );
            }
        });
        violations
    }
}

impl Rule for OversizedFunction {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        match (&ctx.py_ast, ctx.language) {
            (Some(tree), _) => self.check_python(ctx, tree),
            (None, Language::Go | Language::Rust | Language::Ruby) => self.check_tree(ctx),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(text: &str) -> FileContext {
        FileContext::from_text("src/app.py", Language::Python, text.to_string())
    }

    #[test]
    fn comment_density_ratio() {
        let mut src = String::new();
        for i in 0..8 {
            src.push_str(&format!("# comment {i}\n"));
        }
        for i in 0..8 {
            src.push_str(&format!("x{i} = {i}\n"));
        }
        let violations = CommentDensity::new().check_file(&py(&src));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("ratio 1.00"));
    }

    #[test]
    fn comment_density_skips_tiny_files() {
        let src = "# a\n# b\n# c\nx = 1\n";
        assert!(CommentDensity::new().check_file(&py(src)).is_empty());
    }

    #[test]
    fn swallowed_exception_variants() {
        let src = "\
try:
    work()
except Exception:
    pass
try:
    work()
except (ValueError, Exception):
    return None
try:
    work()
except ValueError:
    pass
try:
    work()
except Exception:
    log.error('boom')
    raise
";
        let violations = SwallowedException::new().check_file(&py(src));
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn bare_except_pass_is_flagged() {
        let src = "try:\n    work()\nexcept:\n    pass\n";
        assert_eq!(SwallowedException::new().check_file(&py(src)).len(), 1);
    }

    #[test]
    fn deep_nesting_threshold() {
        let mut src = String::from("def f():\n");
        let mut indent = 4;
        for i in 0..6 {
            src.push_str(&format!("{}if c{i}:\n", " ".repeat(indent)));
            indent += 4;
        }
        src.push_str(&format!("{}x = 1\n", " ".repeat(indent)));
        let violations = DeepNesting::new().check_file(&py(&src));
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn hardcoded_credentials_python() {
        let src = "API_KEY = 'sk-123'\npassword = ''\nname = 'alice'\ndb_token: str = 'abc'\n";
        let violations = HardcodedCredential::new().check_file(&py(src));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Error));
    }

    #[test]
    fn hardcoded_credentials_exempt_in_tests() {
        let ctx = FileContext::from_text(
            "tests/test_auth.py",
            Language::Python,
            "password = 'hunter2'\n".to_string(),
        );
        assert!(HardcodedCredential::new().check_file(&ctx).is_empty());
    }

    #[test]
    fn hardcoded_credentials_line_fallback() {
        let ctx = FileContext::from_text(
            "src/config.kt",
            Language::Kotlin,
            "val apiKey = \"sk-123\"\n".to_string(),
        );
        assert_eq!(HardcodedCredential::new().check_file(&ctx).len(), 1);
    }

    #[test]
    fn oversized_python_function() {
        let mut src = String::from("def big():\n");
        for i in 0..85 {
            src.push_str(&format!("    x{i} = {i}\n"));
        }
        let violations = OversizedFunction::new().check_file(&py(&src));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("`big`"));
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn docstring_does_not_count_toward_body() {
        let mut src = String::from("def doc():\n    \"\"\"\n");
        for _ in 0..100 {
            src.push_str("    docs only\n");
        }
        src.push_str("    \"\"\"\n    return 1\n");
        assert!(OversizedFunction::new().check_file(&py(&src)).is_empty());
    }

    #[test]
    fn oversized_rust_function_via_tree() {
        let mut src = String::from("fn big() {\n");
        for i in 0..85 {
            src.push_str(&format!("    let x{i} = {i};\n"));
        }
        src.push_str("}\n");
        let ctx = FileContext::from_text("src/main.rs", Language::Rust, src);
        assert_eq!(OversizedFunction::new().check_file(&ctx).len(), 1);
    }
}

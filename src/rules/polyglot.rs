// SPDX-License-Identifier: PMPL-1.0-or-later

//! Language-specific smells outside Python: leftover debug output in
//! Go and Ruby, panicky Rust, Kotlin force-unwraps, and PHP eval.

use std::sync::Arc;

use regex::Regex;

use crate::context::FileContext;
use crate::languages::Language;
use crate::rules::util::code_lines;
use crate::rules::Rule;
use crate::static_regex;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(GoDebugPrint::new()),
        Arc::new(GoContextTodo::new()),
        Arc::new(RustUnwrapHeavy::new()),
        Arc::new(RustTodoMacro::new()),
        Arc::new(RustPanicMacro::new()),
        Arc::new(KotlinForceUnwrap::new()),
        Arc::new(RubyDebugPrint::new()),
        Arc::new(PhpEval::new()),
    ]
}

fn debug_literal_re() -> &'static Regex {
    static_regex!(r#"(?i)"[^"]*(debug|todo|fixme)[^"]*""#)
}

/// Scans code lines of `language`, skipping test files, and reports the
/// first line where `hit` matches.
fn first_code_hit(
    meta: &RuleMeta,
    ctx: &FileContext,
    language: Language,
    message: &str,
    suggestion: &str,
    hit: impl Fn(&str) -> bool,
) -> Vec<Violation> {
    if ctx.language != language || ctx.is_test_file() {
        return Vec::new();
    }
    for (lineno, line) in code_lines(ctx) {
        if hit(line) {
            return vec![
                Violation::in_file(meta, &ctx.relative_path, lineno, message)
                    .with_suggestion(suggestion),
            ];
        }
    }
    Vec::new()
}

/// G03: fmt/log print calls carrying debug/todo/fixme string literals.
struct GoDebugPrint {
    meta: RuleMeta,
}

impl GoDebugPrint {
    fn new() -> Self {
        GoDebugPrint {
            meta: RuleMeta::new(
                "G03",
                "Go debug print",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

impl Rule for GoDebugPrint {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let print_re = static_regex!(r"\b(?:fmt|log)\.(?:Println|Printf|Print)\s*\(");
        first_code_hit(
            &self.meta,
            ctx,
            Language::Go,
            "Debug print statement left in source.",
            "Remove it or use a leveled logger.",
            |line| print_re.is_match(line) && debug_literal_re().is_match(line),
        )
    }
}

/// G04: context.TODO() in non-test code.
struct GoContextTodo {
    meta: RuleMeta,
}

impl GoContextTodo {
    fn new() -> Self {
        GoContextTodo {
            meta: RuleMeta::new(
                "G04",
                "context.TODO() usage",
                Severity::Warn,
                Dimension::Maintainability,
                None,
            ),
        }
    }
}

impl Rule for GoContextTodo {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let todo_re = static_regex!(r"\bcontext\.TODO\s*\(\s*\)");
        first_code_hit(
            &self.meta,
            ctx,
            Language::Go,
            "Found `context.TODO()` outside tests.",
            "Thread a real context from the caller.",
            |line| todo_re.is_match(line),
        )
    }
}

/// R02: three or more unwrap()/expect() calls in one file.
struct RustUnwrapHeavy {
    meta: RuleMeta,
}

impl RustUnwrapHeavy {
    fn new() -> Self {
        RustUnwrapHeavy {
            meta: RuleMeta::new(
                "R02",
                "unwrap()-heavy Rust file",
                Severity::Warn,
                Dimension::Security,
                None,
            ),
        }
    }
}

impl Rule for RustUnwrapHeavy {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx.language != Language::Rust || ctx.is_test_file() {
            return Vec::new();
        }
        let unwrap_re = static_regex!(r"\.\s*unwrap\s*\(\s*\)|\.\s*expect\s*\(");
        let mut count = 0usize;
        let mut first = None;
        for (lineno, line) in code_lines(ctx) {
            let hits = unwrap_re.find_iter(line).count();
            if hits > 0 && first.is_none() {
                first = Some(lineno);
            }
            count += hits;
        }
        if count >= 3 {
            if let Some(lineno) = first {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    format!("{count} unwrap()/expect() calls in one file."),
                )
                .with_suggestion("Propagate errors with `?` or handle them explicitly.")];
            }
        }
        Vec::new()
    }
}

/// R03: todo!/unimplemented! macros, tests included.
struct RustTodoMacro {
    meta: RuleMeta,
}

impl RustTodoMacro {
    fn new() -> Self {
        RustTodoMacro {
            meta: RuleMeta::new(
                "R03",
                "todo!/unimplemented! macro",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

impl Rule for RustTodoMacro {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx.language != Language::Rust {
            return Vec::new();
        }
        let todo_re = static_regex!(r"\b(?:todo|unimplemented)!\s*\(");
        for (lineno, line) in code_lines(ctx) {
            if todo_re.is_match(line) {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Found `todo!`/`unimplemented!` placeholder.",
                )
                .with_suggestion("Implement the path or return a proper error.")];
            }
        }
        Vec::new()
    }
}

/// R07: panic! in non-test code.
struct RustPanicMacro {
    meta: RuleMeta,
}

impl RustPanicMacro {
    fn new() -> Self {
        RustPanicMacro {
            meta: RuleMeta::new(
                "R07",
                "panic! macro",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

impl Rule for RustPanicMacro {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let panic_re = static_regex!(r"\bpanic!\s*\(");
        first_code_hit(
            &self.meta,
            ctx,
            Language::Rust,
            "Found `panic!` outside tests.",
            "Return a Result and let the caller decide.",
            |line| panic_re.is_match(line),
        )
    }
}

/// K02: Kotlin `!!` force-unwrap.
struct KotlinForceUnwrap {
    meta: RuleMeta,
}

impl KotlinForceUnwrap {
    fn new() -> Self {
        KotlinForceUnwrap {
            meta: RuleMeta::new(
                "K02",
                "Kotlin !! force-unwrap",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

impl Rule for KotlinForceUnwrap {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        first_code_hit(
            &self.meta,
            ctx,
            Language::Kotlin,
            "Found `!!` force-unwrap.",
            "Prefer `?.` with a fallback or an explicit null check.",
            |line| line.contains("!!"),
        )
    }
}

/// Y02: puts/p calls carrying debug/todo/fixme string literals.
struct RubyDebugPrint {
    meta: RuleMeta,
}

impl RubyDebugPrint {
    fn new() -> Self {
        RubyDebugPrint {
            meta: RuleMeta::new(
                "Y02",
                "Ruby debug print",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

impl Rule for RubyDebugPrint {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let puts_re = static_regex!(r"^\s*(?:puts|p)\b");
        let literal_re = static_regex!(r#"(?i)["'][^"']*(debug|todo|fixme)[^"']*["']"#);
        first_code_hit(
            &self.meta,
            ctx,
            Language::Ruby,
            "Debug print statement left in source.",
            "Remove it or use a logger.",
            |line| puts_re.is_match(line) && literal_re.is_match(line),
        )
    }
}

/// P03: PHP eval().
struct PhpEval {
    meta: RuleMeta,
}

impl PhpEval {
    fn new() -> Self {
        PhpEval {
            meta: RuleMeta::new(
                "P03",
                "PHP eval() usage",
                Severity::Warn,
                Dimension::Security,
                None,
            ),
        }
    }
}

impl Rule for PhpEval {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let eval_re = static_regex!(r"\beval\s*\(");
        first_code_hit(
            &self.meta,
            ctx,
            Language::Php,
            "Found `eval(...)` usage.",
            "Replace dynamic evaluation with explicit dispatch.",
            |line| eval_re.is_match(line),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str, language: Language, text: &str) -> FileContext {
        FileContext::from_text(path, language, text.to_string())
    }

    #[test]
    fn go_debug_print_needs_debug_literal() {
        let hit = ctx("main.go", Language::Go, "fmt.Println(\"DEBUG state\")\n");
        assert_eq!(GoDebugPrint::new().check_file(&hit).len(), 1);

        let plain = ctx("main.go", Language::Go, "fmt.Println(\"hello\")\n");
        assert!(GoDebugPrint::new().check_file(&plain).is_empty());
    }

    #[test]
    fn go_context_todo_exempts_tests() {
        let src = "ctx := context.TODO()\n";
        assert_eq!(
            GoContextTodo::new()
                .check_file(&ctx("server.go", Language::Go, src))
                .len(),
            1
        );
        assert!(GoContextTodo::new()
            .check_file(&ctx("server_test.go", Language::Go, src))
            .is_empty());
    }

    #[test]
    fn rust_unwrap_needs_three_hits() {
        let two = "let a = x.unwrap();\nlet b = y.unwrap();\n";
        assert!(RustUnwrapHeavy::new()
            .check_file(&ctx("src/main.rs", Language::Rust, two))
            .is_empty());

        let three = "let a = x.unwrap();\nlet b = y.expect(\"b\");\nlet c = z.unwrap();\n";
        let violations =
            RustUnwrapHeavy::new().check_file(&ctx("src/main.rs", Language::Rust, three));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn rust_todo_macro_applies_in_tests_too() {
        let src = "fn f() { todo!() }\n";
        assert_eq!(
            RustTodoMacro::new()
                .check_file(&ctx("tests/api_test.rs", Language::Rust, src))
                .len(),
            1
        );
    }

    #[test]
    fn rust_panic_first_hit_only() {
        let src = "panic!(\"a\");\npanic!(\"b\");\n";
        assert_eq!(
            RustPanicMacro::new()
                .check_file(&ctx("src/lib.rs", Language::Rust, src))
                .len(),
            1
        );
    }

    #[test]
    fn kotlin_force_unwrap_skips_comments() {
        let hit = ctx("App.kt", Language::Kotlin, "val n = value!!.length\n");
        assert_eq!(KotlinForceUnwrap::new().check_file(&hit).len(), 1);

        let comment = ctx("App.kt", Language::Kotlin, "// beware of !! here\n");
        assert!(KotlinForceUnwrap::new().check_file(&comment).is_empty());
    }

    #[test]
    fn ruby_debug_print() {
        let hit = ctx("app.rb", Language::Ruby, "puts \"DEBUG: #{x}\"\n");
        assert_eq!(RubyDebugPrint::new().check_file(&hit).len(), 1);

        let plain = ctx("app.rb", Language::Ruby, "puts \"hello\"\n");
        assert!(RubyDebugPrint::new().check_file(&plain).is_empty());
    }

    #[test]
    fn php_eval_is_security_dimension() {
        let hit = ctx("index.php", Language::Php, "eval($code);\n");
        let violations = PhpEval::new().check_file(&hit);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].dimension, Dimension::Security);
    }
}

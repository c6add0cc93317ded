// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fingerprint rules for Copilot-style output: imports of modules that
//! do not exist anywhere, leftover DEBUG logging, and stale
//! knowledge-cutoff phrasing.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustpython_parser::ast::{self, Expr, Stmt};

use crate::context::{FileContext, ProjectContext};
use crate::languages::Language;
use crate::pyast::{self, PyNode};
use crate::rules::util::{code_lines, comment_lines};
use crate::rules::Rule;
use crate::static_regex;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(HallucinatedImport::new()),
        Arc::new(DebugLogging::new()),
        Arc::new(KnowledgeCutoff::new()),
    ]
}

/// Python standard library top-level modules, plus the packaging tools
/// present in effectively every environment.
const PYTHON_STDLIB: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asyncio", "atexit",
    "audioop", "base64", "bdb", "binascii", "bisect", "builtins", "bz2", "calendar", "cgi",
    "cgitb", "chunk", "cmath", "cmd", "code", "codecs", "codeop", "collections", "colorsys",
    "compileall", "concurrent", "configparser", "contextlib", "contextvars", "copy", "copyreg",
    "cProfile", "crypt", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
    "difflib", "dis", "doctest", "email", "encodings", "ensurepip", "enum", "errno",
    "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions", "ftplib",
    "functools", "gc", "getopt", "getpass", "gettext", "glob", "graphlib", "grp", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "imaplib", "imghdr", "imp", "importlib",
    "inspect", "io", "ipaddress", "itertools", "json", "keyword", "linecache", "locale",
    "logging", "lzma", "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap",
    "modulefinder", "msvcrt", "multiprocessing", "netrc", "nntplib", "numbers", "operator",
    "optparse", "os", "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil", "platform",
    "plistlib", "poplib", "posix", "posixpath", "pprint", "profile", "pstats", "pty", "pwd",
    "py_compile", "pyclbr", "pydoc", "queue", "quopri", "random", "re", "readline", "reprlib",
    "resource", "rlcompleter", "runpy", "sched", "secrets", "select", "selectors", "shelve",
    "shlex", "shutil", "signal", "site", "smtplib", "sndhdr", "socket", "socketserver",
    "sqlite3", "ssl", "stat", "statistics", "string", "stringprep", "struct", "subprocess",
    "sunau", "symtable", "sys", "sysconfig", "syslog", "tabnanny", "tarfile", "telnetlib",
    "tempfile", "termios", "test", "textwrap", "threading", "time", "timeit", "tkinter",
    "token", "tokenize", "tomllib", "trace", "traceback", "tracemalloc", "tty", "turtle",
    "types", "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
    // packaging tools
    "pip", "pkg_resources", "setuptools", "wheel",
];

fn stdlib_modules() -> &'static HashSet<&'static str> {
    static SET: std::sync::OnceLock<HashSet<&'static str>> = std::sync::OnceLock::new();
    SET.get_or_init(|| PYTHON_STDLIB.iter().copied().collect())
}

/// C03: imports of modules that exist neither in the stdlib, nor in the
/// project's declared dependencies, nor as local top-level modules.
struct HallucinatedImport {
    meta: RuleMeta,
}

impl HallucinatedImport {
    fn new() -> Self {
        HallucinatedImport {
            meta: RuleMeta::new(
                "C03",
                "Hallucinated import",
                Severity::Error,
                Dimension::Hallucination,
                Some("copilot"),
            ),
        }
    }
}

impl Rule for HallucinatedImport {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let declared = declared_dependency_modules(&project.root);
        let local = local_top_level_modules(&project.files);
        let known = |top: &str| {
            stdlib_modules().contains(top) || declared.contains(top) || local.contains(top)
        };

        let mut violations = Vec::new();
        for ctx in &project.files {
            if ctx.language != Language::Python {
                continue;
            }
            let Some(tree) = &ctx.py_ast else {
                continue;
            };
            let guarded = guarded_import_lines(tree);
            pyast::walk(&tree.suite, &mut |node| {
                let PyNode::Stmt(stmt) = node else {
                    return;
                };
                let mut tops: Vec<&str> = Vec::new();
                match stmt {
                    Stmt::Import(ast::StmtImport { names, .. }) => {
                        for alias in names {
                            if let Some(top) = alias.name.as_str().split('.').next() {
                                tops.push(top);
                            }
                        }
                    }
                    Stmt::ImportFrom(ast::StmtImportFrom { module, level, .. }) => {
                        // relative imports resolve inside the package
                        if level.map(|l| l.to_u32()).unwrap_or(0) > 0 {
                            return;
                        }
                        let Some(module) = module else {
                            return;
                        };
                        if let Some(top) = module.as_str().split('.').next() {
                            tops.push(top);
                        }
                    }
                    _ => return,
                }
                let line = tree.line_of(stmt);
                if guarded.contains(&line) {
                    return;
                }
                for top in tops {
                    if top.is_empty() || known(top) {
                        continue;
                    }
                    violations.push(
                        Violation::in_file(
                            &self.meta,
                            &ctx.relative_path,
                            line,
                            format!(
                                "Imported module `{top}` not found in the stdlib, \
                                 declared dependencies, or local modules."
                            ),
                        )
                        .with_suggestion("Remove the import or add the correct dependency/module."),
                    );
                }
            });
        }
        violations
    }
}

/// Lines of imports wrapped in a `try` whose handlers catch a missing
/// module (bare except, ImportError, or ModuleNotFoundError). Those are
/// deliberate optional imports.
fn guarded_import_lines(tree: &pyast::PythonAst) -> HashSet<u32> {
    let mut lines = HashSet::new();
    pyast::walk(&tree.suite, &mut |node| {
        let PyNode::Stmt(stmt) = node else {
            return;
        };
        let (body, handlers) = match stmt {
            Stmt::Try(ast::StmtTry { body, handlers, .. }) => (body, handlers),
            Stmt::TryStar(ast::StmtTryStar { body, handlers, .. }) => (body, handlers),
            _ => return,
        };
        if !handlers.iter().any(catches_missing_module) {
            return;
        }
        pyast::walk(body, &mut |inner| {
            if let PyNode::Stmt(import @ (Stmt::Import(_) | Stmt::ImportFrom(_))) = inner {
                lines.insert(tree.line_of(import));
            }
        });
    });
    lines
}

fn catches_missing_module(handler: &ast::ExceptHandler) -> bool {
    let ast::ExceptHandler::ExceptHandler(h) = handler;
    match &h.type_ {
        None => true,
        Some(expr) => names_import_error(expr),
    }
}

fn names_import_error(expr: &Expr) -> bool {
    match expr {
        Expr::Name(ast::ExprName { id, .. }) => {
            matches!(id.as_str(), "ImportError" | "ModuleNotFoundError")
        }
        Expr::Tuple(ast::ExprTuple { elts, .. }) => elts.iter().any(names_import_error),
        _ => false,
    }
}

/// Importable names declared in requirements files and pyproject.toml.
/// Each distribution name contributes itself, its underscore form, and
/// its first dash-separated segment, all lowercased.
fn declared_dependency_modules(root: &Path) -> HashSet<String> {
    let mut modules = HashSet::new();
    let manifests = [
        "requirements.txt",
        "requirements-dev.txt",
        "requirements.in",
        "requirements-dev.in",
    ];
    for name in manifests {
        let Ok(text) = fs::read_to_string(root.join(name)) else {
            continue;
        };
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() || line.starts_with('-') {
                continue;
            }
            add_requirement(line, &mut modules);
        }
    }
    if let Ok(text) = fs::read_to_string(root.join("pyproject.toml")) {
        if let Ok(doc) = text.parse::<toml::Value>() {
            collect_pyproject_dists(&doc, &mut modules);
        }
    }
    modules
}

fn add_requirement(spec: &str, modules: &mut HashSet<String>) {
    if let Some(name) = static_regex!(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*").find(spec) {
        add_dist_modules(name.as_str(), modules);
    }
}

fn add_dist_modules(dist: &str, modules: &mut HashSet<String>) {
    let base = dist.to_ascii_lowercase();
    modules.insert(base.replace('-', "_"));
    if let Some(first) = base.split('-').next() {
        modules.insert(first.to_string());
    }
    modules.insert(base);
}

fn collect_pyproject_dists(doc: &toml::Value, modules: &mut HashSet<String>) {
    if let Some(project) = doc.get("project") {
        if let Some(deps) = project.get("dependencies").and_then(toml::Value::as_array) {
            for dep in deps.iter().filter_map(toml::Value::as_str) {
                add_requirement(dep, modules);
            }
        }
        if let Some(groups) = project
            .get("optional-dependencies")
            .and_then(toml::Value::as_table)
        {
            for deps in groups.values().filter_map(toml::Value::as_array) {
                for dep in deps.iter().filter_map(toml::Value::as_str) {
                    add_requirement(dep, modules);
                }
            }
        }
    }
    let Some(poetry) = doc.get("tool").and_then(|tool| tool.get("poetry")) else {
        return;
    };
    let mut dist_tables: Vec<&toml::value::Table> = Vec::new();
    for key in ["dependencies", "dev-dependencies"] {
        if let Some(table) = poetry.get(key).and_then(toml::Value::as_table) {
            dist_tables.push(table);
        }
    }
    if let Some(groups) = poetry.get("group").and_then(toml::Value::as_table) {
        for group in groups.values() {
            if let Some(table) = group.get("dependencies").and_then(toml::Value::as_table) {
                dist_tables.push(table);
            }
        }
    }
    for table in dist_tables {
        for dist in table.keys() {
            if !dist.eq_ignore_ascii_case("python") {
                add_dist_modules(dist, modules);
            }
        }
    }
}

/// Top-level module names the project itself provides: `src/` layouts
/// collapse onto the package under `src/`.
fn local_top_level_modules(files: &[FileContext]) -> HashSet<String> {
    let mut modules = HashSet::new();
    for ctx in files {
        if ctx.language != Language::Python {
            continue;
        }
        let mut segments: Vec<&str> = ctx.relative_path.split('/').collect();
        if segments.len() > 1 && segments[0] == "src" {
            segments.remove(0);
        }
        match segments.as_slice() {
            [file] => {
                if let Some(stem) = file.strip_suffix(".py") {
                    if !stem.is_empty() && stem != "__init__" {
                        modules.insert(stem.to_string());
                    }
                }
            }
            [dir, ..] => {
                modules.insert((*dir).to_string());
            }
            [] => {}
        }
    }
    modules
}

/// C07: committed DEBUG-prefixed print/log calls.
struct DebugLogging {
    meta: RuleMeta,
}

impl DebugLogging {
    fn new() -> Self {
        DebugLogging {
            meta: RuleMeta::new(
                "C07",
                "Leftover DEBUG logging",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("copilot"),
            ),
        }
    }

    fn check_python(&self, ctx: &FileContext) -> Vec<Violation> {
        let Some(tree) = &ctx.py_ast else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        pyast::walk(&tree.suite, &mut |node| {
            let PyNode::Expr(expr @ Expr::Call(ast::ExprCall { func, args, .. })) = node else {
                return;
            };
            if !is_debug_sink(func) {
                return;
            }
            let Some(first) = args.first() else {
                return;
            };
            if first_arg_is_debug_string(first) {
                violations.push(
                    Violation::in_file(
                        &self.meta,
                        &ctx.relative_path,
                        tree.line_of(expr),
                        "DEBUG-prefixed output call left in source.",
                    )
                    .with_suggestion("Remove it or route it through a leveled logger."),
                );
            }
        });
        violations
    }

    fn check_javascript(&self, ctx: &FileContext) -> Vec<Violation> {
        if ctx.is_test_file() {
            return Vec::new();
        }
        let debug_call = static_regex!(r"\bconsole\.debug\s*\(");
        let warn_debug =
            static_regex!(r#"(?i)\bconsole\.warn\s*\(\s*['"`]DEBUG(?:[:\s]|$)"#);
        for (lineno, line) in code_lines(ctx) {
            if debug_call.is_match(line) || warn_debug.is_match(line) {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "DEBUG-prefixed console output left in source.",
                )
                .with_suggestion("Remove it or route it through a leveled logger.")];
            }
        }
        Vec::new()
    }
}

impl Rule for DebugLogging {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        match ctx.language {
            Language::Python => self.check_python(ctx),
            Language::JavaScript | Language::TypeScript => self.check_javascript(ctx),
            _ => Vec::new(),
        }
    }
}

fn is_debug_sink(func: &Expr) -> bool {
    match func {
        Expr::Name(ast::ExprName { id, .. }) => id.as_str() == "print",
        Expr::Attribute(ast::ExprAttribute { value, attr, .. }) => {
            attr.as_str() == "debug"
                && matches!(
                    value.as_ref(),
                    Expr::Name(ast::ExprName { id, .. })
                        if matches!(id.as_str(), "logging" | "logger")
                )
        }
        _ => false,
    }
}

fn str_starts_with_debug(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("DEBUG") else {
        return false;
    };
    rest.is_empty() || rest.starts_with([':', ' ', '\t'])
}

fn first_arg_is_debug_string(arg: &Expr) -> bool {
    match arg {
        Expr::Constant(ast::ExprConstant {
            value: ast::Constant::Str(text),
            ..
        }) => str_starts_with_debug(text),
        // f-strings: only a leading literal segment can carry the prefix.
        Expr::JoinedStr(ast::ExprJoinedStr { values, .. }) => matches!(
            values.first(),
            Some(Expr::Constant(ast::ExprConstant {
                value: ast::Constant::Str(text),
                ..
            })) if str_starts_with_debug(text)
        ),
        _ => false,
    }
}

/// C09: "as of my last update" comments.
struct KnowledgeCutoff {
    meta: RuleMeta,
}

impl KnowledgeCutoff {
    fn new() -> Self {
        KnowledgeCutoff {
            meta: RuleMeta::new(
                "C09",
                "Knowledge-cutoff phrasing",
                Severity::Warn,
                Dimension::Fingerprint,
                Some("copilot"),
            ),
        }
    }
}

impl Rule for KnowledgeCutoff {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_file(&self, ctx: &FileContext) -> Vec<Violation> {
        let cutoff_re = static_regex!(r"(?i)\bas of my last update\b");
        for (lineno, line) in comment_lines(ctx) {
            if cutoff_re.is_match(line) {
                return vec![Violation::in_file(
                    &self.meta,
                    &ctx.relative_path,
                    lineno,
                    "Knowledge-cutoff phrasing detected ('as of my last update').",
                )
                .with_suggestion("Verify the claim against current docs and drop the phrasing.")];
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn py(text: &str) -> FileContext {
        FileContext::from_text("src/app.py", Language::Python, text.to_string())
    }

    fn ts(path: &str, text: &str) -> FileContext {
        FileContext::from_text(path, Language::TypeScript, text.to_string())
    }

    fn project(root: &Path, files: Vec<(&str, &str)>) -> ProjectContext {
        let files = files
            .into_iter()
            .map(|(path, text)| {
                FileContext::from_text(path, Language::Python, text.to_string())
            })
            .collect();
        ProjectContext {
            root: root.to_path_buf(),
            config: Config::from_yaml("{}", "test").expect("default config"),
            files,
        }
    }

    #[test]
    fn unknown_import_is_flagged() {
        let dir = TempDir::new().expect("tempdir");
        let project = project(
            dir.path(),
            vec![("src/app.py", "import os\nimport totally_made_up\n")],
        );
        let violations = HallucinatedImport::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "C03");
        assert_eq!(violations[0].line, Some(2));
        assert!(violations[0].message.contains("totally_made_up"));
    }

    #[test]
    fn stdlib_local_and_declared_imports_pass() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("requirements.txt"),
            "requests>=2.28  # http client\n-r other.txt\n\n",
        )
        .expect("write requirements");
        let project = project(
            dir.path(),
            vec![
                (
                    "src/app.py",
                    "import json\nimport requests\nfrom helpers import run\n",
                ),
                ("src/helpers.py", "def run():\n    pass\n"),
            ],
        );
        assert!(HallucinatedImport::new().check_project(&project).is_empty());
    }

    #[test]
    fn pyproject_dependencies_are_recognized() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("pyproject.toml"),
            "\
[project]
dependencies = [\"typing-extensions>=4.0\"]

[tool.poetry.dependencies]
python = \"^3.11\"
my-lib = \"^1.0\"

[tool.poetry.group.dev.dependencies]
pytest = \"^8.0\"
",
        )
        .expect("write pyproject");
        let project = project(
            dir.path(),
            vec![(
                "src/app.py",
                "import typing_extensions\nimport my_lib\nimport pytest\n",
            )],
        );
        assert!(HallucinatedImport::new().check_project(&project).is_empty());
    }

    #[test]
    fn guarded_optional_imports_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let src = "\
try:
    import maybe_missing
except ImportError:
    maybe_missing = None
try:
    import also_optional
except (ValueError, ModuleNotFoundError):
    also_optional = None
";
        let project = project(dir.path(), vec![("src/app.py", src)]);
        assert!(HallucinatedImport::new().check_project(&project).is_empty());
    }

    #[test]
    fn unguarded_try_still_flags() {
        let dir = TempDir::new().expect("tempdir");
        let src = "\
try:
    import not_a_module
except ValueError:
    pass
";
        let project = project(dir.path(), vec![("src/app.py", src)]);
        assert_eq!(HallucinatedImport::new().check_project(&project).len(), 1);
    }

    #[test]
    fn relative_imports_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let project = project(
            dir.path(),
            vec![(
                "pkg/app.py",
                "from . import sibling\nfrom .nested import thing\n",
            )],
        );
        assert!(HallucinatedImport::new().check_project(&project).is_empty());
    }

    #[test]
    fn python_debug_prints_flagged() {
        let src = "\
print('DEBUG: here')
print(f'DEBUG value={x}')
logger.debug('DEBUG state')
print('debug lowercase ok')
print('DEBUGGING is fine')
";
        let violations = DebugLogging::new().check_file(&py(src));
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn javascript_first_hit_only_and_tests_exempt() {
        let src = "console.debug('x');\nconsole.debug('y');\n";
        let violations = DebugLogging::new().check_file(&ts("src/app.ts", src));
        assert_eq!(violations.len(), 1);

        assert!(DebugLogging::new()
            .check_file(&ts("src/app.test.ts", src))
            .is_empty());
    }

    #[test]
    fn console_warn_needs_debug_prefix() {
        let hit = ts("src/a.ts", "console.warn('DEBUG: x');\n");
        assert_eq!(DebugLogging::new().check_file(&hit).len(), 1);

        let miss = ts("src/a.ts", "console.warn('something else');\n");
        assert!(DebugLogging::new().check_file(&miss).is_empty());
    }

    #[test]
    fn knowledge_cutoff_first_hit_only() {
        let src = "# As of my last update, v2 is latest\n# as of my last update again\n";
        let violations = KnowledgeCutoff::new().check_file(&py(src));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(1));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! Repository-level analyzers: duplicated code blocks, filename style
//! drift, structurally cloned modules, import cycles, and missing test
//! counterparts. All five run over the complete project context and
//! emit deterministic, capped result sets.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use rustpython_parser::ast::{self, Stmt};

use crate::context::{FileContext, ProjectContext};
use crate::pyast;
use crate::rules::util::code_lines;
use crate::rules::Rule;
use crate::types::{Dimension, RuleMeta, Severity, Violation};

const RESULT_CAP: usize = 10;

pub fn rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(DuplicateBlocks::new()),
        Arc::new(NamingDrift::new()),
        Arc::new(StructuralClones::new()),
        Arc::new(ImportCycles::new()),
        Arc::new(MissingTests::new()),
    ]
}

/// X01: the same window of normalized code lines appearing in two files.
struct DuplicateBlocks {
    meta: RuleMeta,
}

impl DuplicateBlocks {
    fn new() -> Self {
        DuplicateBlocks {
            meta: RuleMeta::new(
                "X01",
                "Duplicated code block across files",
                Severity::Warn,
                Dimension::Maintainability,
                None,
            ),
        }
    }
}

fn normalized_code(ctx: &FileContext) -> Vec<(u32, String)> {
    code_lines(ctx)
        .into_iter()
        .map(|(lineno, line)| {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            (lineno, collapsed)
        })
        .collect()
}

impl Rule for DuplicateBlocks {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let window = project.config.crossfile.duplicate_window.max(2);
        let min_lines = project.config.crossfile.min_normalized_lines;

        // window hash -> first (file, line) seen per file
        let mut windows: HashMap<blake3::Hash, Vec<(usize, u32)>> = HashMap::new();
        for (file_idx, ctx) in project.files.iter().enumerate() {
            let lines = normalized_code(ctx);
            if lines.len() < min_lines || lines.len() < window {
                continue;
            }
            let mut seen_here: HashSet<blake3::Hash> = HashSet::new();
            for chunk in lines.windows(window) {
                let mut hasher = blake3::Hasher::new();
                for (_, text) in chunk {
                    hasher.update(text.as_bytes());
                    hasher.update(b"\n");
                }
                let hash = hasher.finalize();
                if seen_here.insert(hash) {
                    windows.entry(hash).or_default().push((file_idx, chunk[0].0));
                }
            }
        }

        // one violation per file pair, anchored at the first shared window
        let mut pairs: BTreeMap<(String, String), (u32, String)> = BTreeMap::new();
        for occurrences in windows.values() {
            if occurrences.len() < 2 {
                continue;
            }
            for i in 0..occurrences.len() {
                for j in i + 1..occurrences.len() {
                    let (a_idx, a_line) = occurrences[i];
                    let (b_idx, _) = occurrences[j];
                    let a = project.files[a_idx].relative_path.clone();
                    let b = project.files[b_idx].relative_path.clone();
                    let (key, line, other) = if a <= b {
                        ((a.clone(), b.clone()), a_line, b)
                    } else {
                        ((b.clone(), a.clone()), occurrences[j].1, a)
                    };
                    let entry = pairs.entry(key).or_insert((line, other));
                    if line < entry.0 {
                        entry.0 = line;
                    }
                }
            }
        }

        pairs
            .into_iter()
            .take(RESULT_CAP)
            .map(|((path, _), (line, other))| {
                Violation::in_file(
                    &self.meta,
                    &path,
                    line,
                    format!("Shares a {window}-line duplicated block with `{other}`."),
                )
                .with_suggestion("Extract the shared logic into one module.")
            })
            .collect()
    }
}

/// X02: filenames departing from the dominant naming style.
struct NamingDrift {
    meta: RuleMeta,
}

impl NamingDrift {
    fn new() -> Self {
        NamingDrift {
            meta: RuleMeta::new(
                "X02",
                "Inconsistent file naming",
                Severity::Info,
                Dimension::Maintainability,
                None,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum NameStyle {
    Snake,
    Kebab,
    Camel,
    Pascal,
}

impl NameStyle {
    fn as_str(self) -> &'static str {
        match self {
            NameStyle::Snake => "snake_case",
            NameStyle::Kebab => "kebab-case",
            NameStyle::Camel => "camelCase",
            NameStyle::Pascal => "PascalCase",
        }
    }
}

fn classify_stem(stem: &str) -> Option<NameStyle> {
    if stem.is_empty() {
        return None;
    }
    let lower_alnum =
        |s: &str| s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let alnum = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric());
    let first = stem.chars().next()?;

    if stem.contains('_') {
        if first.is_ascii_lowercase() && stem.split('_').all(lower_alnum) {
            return Some(NameStyle::Snake);
        }
        return None;
    }
    if stem.contains('-') {
        if first.is_ascii_lowercase() && stem.split('-').all(lower_alnum) {
            return Some(NameStyle::Kebab);
        }
        return None;
    }
    if !alnum(stem) {
        return None;
    }
    if first.is_ascii_uppercase() {
        return Some(NameStyle::Pascal);
    }
    if first.is_ascii_lowercase() {
        if stem.chars().any(|c| c.is_ascii_uppercase()) {
            return Some(NameStyle::Camel);
        }
        // all-lowercase single words fit every lowercase convention
        return Some(NameStyle::Snake);
    }
    None
}

impl Rule for NamingDrift {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let mut classified: Vec<(&str, NameStyle)> = Vec::new();
        for ctx in &project.files {
            let stem = ctx
                .relative_path
                .rsplit('/')
                .next()
                .and_then(|name| name.split('.').next())
                .unwrap_or("");
            if let Some(style) = classify_stem(stem) {
                classified.push((ctx.relative_path.as_str(), style));
            }
        }
        if classified.len() < 5 {
            return Vec::new();
        }
        let mut counts: BTreeMap<NameStyle, usize> = BTreeMap::new();
        for (_, style) in &classified {
            *counts.entry(*style).or_default() += 1;
        }
        let Some((&dominant, &count)) = counts.iter().max_by_key(|(style, count)| (**count, std::cmp::Reverse(**style))) else {
            return Vec::new();
        };
        if count * 10 < classified.len() * 7 {
            return Vec::new();
        }

        classified
            .iter()
            .filter(|(_, style)| *style != dominant)
            .take(RESULT_CAP)
            .map(|(path, style)| {
                Violation::in_file_whole(
                    &self.meta,
                    path,
                    format!(
                        "File is {} while {}% of files use {}.",
                        style.as_str(),
                        count * 100 / classified.len(),
                        dominant.as_str()
                    ),
                )
                .with_suggestion("Rename to match the dominant convention.")
            })
            .collect()
    }
}

/// X03: groups of modules with identical control-flow skeletons.
struct StructuralClones {
    meta: RuleMeta,
}

const MIN_SKELETON_STMTS: usize = 10;

impl StructuralClones {
    fn new() -> Self {
        StructuralClones {
            meta: RuleMeta::new(
                "X03",
                "Structurally cloned modules",
                Severity::Warn,
                Dimension::Fingerprint,
                None,
            ),
        }
    }
}

impl Rule for StructuralClones {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let min_cluster = project.config.crossfile.min_cluster_size.max(2);
        let mut clusters: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for ctx in &project.files {
            if ctx.is_test_file() {
                continue;
            }
            let Some(tree) = &ctx.py_ast else {
                continue;
            };
            let (shape, stmts) = pyast::skeleton(&tree.suite);
            if stmts < MIN_SKELETON_STMTS {
                continue;
            }
            clusters.entry(shape).or_default().push(&ctx.relative_path);
        }

        let mut violations = Vec::new();
        for members in clusters.values_mut() {
            if members.len() < min_cluster {
                continue;
            }
            members.sort_unstable();
            let lead = members[0];
            let rest = members[1..].join("`, `");
            violations.push(
                Violation::in_file_whole(
                    &self.meta,
                    lead,
                    format!(
                        "Module shares its exact structure with {} others: `{rest}`.",
                        members.len() - 1
                    ),
                )
                .with_suggestion("Template-like clones usually want a shared abstraction."),
            );
            if violations.len() >= RESULT_CAP {
                break;
            }
        }
        violations
    }
}

/// X04: import cycles between project modules.
struct ImportCycles {
    meta: RuleMeta,
}

impl ImportCycles {
    fn new() -> Self {
        ImportCycles {
            meta: RuleMeta::new(
                "X04",
                "Import cycle",
                Severity::Warn,
                Dimension::Quality,
                None,
            ),
        }
    }
}

fn module_name(path: &str) -> Option<String> {
    let trimmed = path.strip_suffix(".py")?;
    let mut parts: Vec<&str> = trimmed.split('/').collect();
    if parts.last() == Some(&"__init__") {
        parts.pop();
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

/// Targets an import statement can reach, as absolute module names.
fn import_targets(stmt: &Stmt, own_module: &str) -> Vec<String> {
    match stmt {
        Stmt::Import(ast::StmtImport { names, .. }) => names
            .iter()
            .map(|alias| alias.name.as_str().to_string())
            .collect(),
        Stmt::ImportFrom(ast::StmtImportFrom {
            module,
            names,
            level,
            ..
        }) => {
            let level = level.map(|l| l.to_u32() as usize).unwrap_or(0);
            let base = if level == 0 {
                module.as_ref().map(|m| m.as_str().to_string()).unwrap_or_default()
            } else {
                // relative import: climb `level` packages from this module
                let mut parts: Vec<&str> = own_module.split('.').collect();
                for _ in 0..level {
                    if parts.pop().is_none() {
                        return Vec::new();
                    }
                }
                match module {
                    Some(m) => {
                        parts.push(m.as_str());
                        parts.join(".")
                    }
                    None => parts.join("."),
                }
            };
            if base.is_empty() {
                return names
                    .iter()
                    .map(|alias| alias.name.as_str().to_string())
                    .collect();
            }
            let mut targets = vec![base.clone()];
            for alias in names {
                targets.push(format!("{base}.{}", alias.name));
            }
            targets
        }
        _ => Vec::new(),
    }
}

struct TarjanState {
    index: usize,
    indices: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

fn tarjan(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut state = TarjanState {
        index: 0,
        indices: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        components: Vec::new(),
    };
    for v in 0..n {
        if state.indices[v].is_none() {
            strongconnect(v, adjacency, &mut state);
        }
    }
    state.components
}

fn strongconnect(v: usize, adjacency: &[Vec<usize>], state: &mut TarjanState) {
    state.indices[v] = Some(state.index);
    state.lowlink[v] = state.index;
    state.index += 1;
    state.stack.push(v);
    state.on_stack[v] = true;

    for &w in &adjacency[v] {
        match state.indices[w] {
            None => {
                strongconnect(w, adjacency, state);
                state.lowlink[v] = state.lowlink[v].min(state.lowlink[w]);
            }
            Some(w_index) if state.on_stack[w] => {
                state.lowlink[v] = state.lowlink[v].min(w_index);
            }
            _ => {}
        }
    }

    if state.lowlink[v] == state.indices[v].unwrap_or(0) {
        let mut component = Vec::new();
        while let Some(w) = state.stack.pop() {
            state.on_stack[w] = false;
            component.push(w);
            if w == v {
                break;
            }
        }
        state.components.push(component);
    }
}

/// One concrete cycle path inside a strongly connected component,
/// starting from its lexicographically smallest module. Every
/// consecutive pair in the returned path, including the implied
/// closing edge back to `start`, is an edge in `adjacency`.
fn cycle_path(start: usize, component: &BTreeSet<usize>, adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut path = vec![start];
    let mut on_path = HashSet::new();
    on_path.insert(start);
    extend_cycle(start, start, component, adjacency, &mut path, &mut on_path);
    path
}

fn extend_cycle(
    current: usize,
    start: usize,
    component: &BTreeSet<usize>,
    adjacency: &[Vec<usize>],
    path: &mut Vec<usize>,
    on_path: &mut HashSet<usize>,
) -> bool {
    let mut successors: Vec<usize> = adjacency[current]
        .iter()
        .copied()
        .filter(|next| component.contains(next))
        .collect();
    successors.sort_unstable();
    if path.len() > 1 && successors.contains(&start) {
        return true;
    }
    for next in successors {
        if on_path.contains(&next) {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        if extend_cycle(next, start, component, adjacency, path, on_path) {
            return true;
        }
        path.pop();
        on_path.remove(&next);
    }
    false
}

impl Rule for ImportCycles {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let mut modules: Vec<String> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut trees: Vec<Option<&pyast::PythonAst>> = Vec::new();
        for ctx in &project.files {
            let Some(name) = module_name(&ctx.relative_path) else {
                continue;
            };
            by_name.insert(name.clone(), modules.len());
            modules.push(name);
            trees.push(ctx.py_ast.as_ref());
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];
        for (idx, tree) in trees.iter().enumerate() {
            let Some(tree) = tree else { continue };
            let mut edges = BTreeSet::new();
            pyast::walk(&tree.suite, &mut |node| {
                let pyast::PyNode::Stmt(stmt) = node else {
                    return;
                };
                for target in import_targets(stmt, &modules[idx]) {
                    if let Some(&to) = by_name.get(&target) {
                        if to != idx {
                            edges.insert(to);
                        }
                    }
                }
            });
            adjacency[idx] = edges.into_iter().collect();
        }

        let mut cycles: Vec<String> = Vec::new();
        for component in tarjan(&adjacency) {
            if component.len() < 2 {
                continue;
            }
            let members: BTreeSet<usize> = component.into_iter().collect();
            let start = *members
                .iter()
                .min_by_key(|idx| &modules[**idx])
                .unwrap_or(members.iter().next().unwrap_or(&0));
            let path = cycle_path(start, &members, &adjacency);
            let mut rendered: Vec<&str> = path.iter().map(|idx| modules[*idx].as_str()).collect();
            rendered.push(modules[start].as_str());
            cycles.push(rendered.join(" -> "));
        }
        cycles.sort_unstable();
        cycles.dedup();

        cycles
            .into_iter()
            .take(RESULT_CAP)
            .map(|cycle| {
                Violation::repo_wide(&self.meta, format!("Import cycle: {cycle}."))
                    .with_suggestion("Break the cycle with an interface module or deferred import.")
            })
            .collect()
    }
}

/// X05: Python modules without a test counterpart.
struct MissingTests {
    meta: RuleMeta,
}

const EXEMPT_DIRS: [&str; 5] = ["vendor", "third_party", "migrations", "generated", "gen"];
const MISSING_TESTS_SHOWN: usize = 8;

impl MissingTests {
    fn new() -> Self {
        MissingTests {
            meta: RuleMeta::new(
                "X05",
                "Modules without tests",
                Severity::Info,
                Dimension::Maintainability,
                None,
            ),
        }
    }
}

fn needs_test(ctx: &FileContext) -> bool {
    let path = &ctx.relative_path;
    if !path.ends_with(".py") || ctx.is_test_file() {
        return false;
    }
    if path
        .split('/')
        .any(|part| EXEMPT_DIRS.contains(&part))
    {
        return false;
    }
    let stem = path
        .rsplit('/')
        .next()
        .and_then(|name| name.strip_suffix(".py"))
        .unwrap_or("");
    if stem == "__init__" || stem == "__main__" || stem.starts_with('_') {
        return false;
    }
    if stem.ends_with("_pb2") {
        return false;
    }
    true
}

impl Rule for MissingTests {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_project(&self, project: &ProjectContext) -> Vec<Violation> {
        let test_names: HashSet<&str> = project
            .files
            .iter()
            .filter(|ctx| ctx.is_test_file())
            .filter_map(|ctx| ctx.relative_path.rsplit('/').next())
            .collect();
        let paths: HashSet<&str> = project
            .files
            .iter()
            .map(|ctx| ctx.relative_path.as_str())
            .collect();

        let mut missing: Vec<&str> = Vec::new();
        for ctx in &project.files {
            if !needs_test(ctx) {
                continue;
            }
            let flattened = ctx
                .relative_path
                .strip_suffix(".py")
                .unwrap_or(&ctx.relative_path)
                .replace('/', "_");
            let expected = format!("tests/test_{flattened}.py");
            let stem = ctx
                .relative_path
                .rsplit('/')
                .next()
                .and_then(|name| name.strip_suffix(".py"))
                .unwrap_or("");
            let by_stem = format!("test_{stem}.py");
            if !paths.contains(expected.as_str()) && !test_names.contains(by_stem.as_str()) {
                missing.push(&ctx.relative_path);
            }
        }
        if missing.is_empty() {
            return Vec::new();
        }
        missing.sort_unstable();

        let shown = missing
            .iter()
            .take(MISSING_TESTS_SHOWN)
            .map(|path| format!("`{path}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let message = if missing.len() > MISSING_TESTS_SHOWN {
            format!(
                "{} modules have no test counterpart: {shown}, and {} more.",
                missing.len(),
                missing.len() - MISSING_TESTS_SHOWN
            )
        } else {
            format!(
                "{} modules have no test counterpart: {shown}.",
                missing.len()
            )
        };
        vec![Violation::repo_wide(&self.meta, message)
            .with_suggestion("Add tests/test_<module>.py files for the listed modules.")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::languages::Language;
    use std::path::{Path, PathBuf};

    fn project(files: Vec<(&str, &str)>) -> ProjectContext {
        let files = files
            .into_iter()
            .map(|(path, text)| {
                let language =
                    Language::from_path(Path::new(path)).unwrap_or(Language::Python);
                FileContext::from_text(path, language, text.to_string())
            })
            .collect();
        ProjectContext {
            root: PathBuf::from("/nonexistent"),
            config: Config::from_yaml("{}", "test").expect("default config"),
            files,
        }
    }

    fn py_block(label: &str) -> String {
        let mut out = String::new();
        for i in 0..25 {
            out.push_str(&format!("value_{i} = compute_{label}({i})\n"));
        }
        out
    }

    #[test]
    fn duplicate_blocks_pair_once() {
        let shared = py_block("shared");
        let project = project(vec![
            ("src/a.py", shared.as_str()),
            ("src/b.py", shared.as_str()),
        ]);
        let violations = DuplicateBlocks::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.as_deref(), Some("src/a.py"));
        assert!(violations[0].message.contains("src/b.py"));
    }

    #[test]
    fn short_files_never_pair() {
        let project = project(vec![
            ("src/a.py", "x = 1\ny = 2\n"),
            ("src/b.py", "x = 1\ny = 2\n"),
        ]);
        assert!(DuplicateBlocks::new().check_project(&project).is_empty());
    }

    #[test]
    fn naming_drift_flags_outliers() {
        let project = project(vec![
            ("src/user_model.py", ""),
            ("src/order_model.py", ""),
            ("src/cart_model.py", ""),
            ("src/payment_flow.py", ""),
            ("src/shipping_flow.py", ""),
            ("src/LegacyHelper.py", ""),
        ]);
        let violations = NamingDrift::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.as_deref(), Some("src/LegacyHelper.py"));
    }

    #[test]
    fn naming_drift_needs_dominance() {
        let project = project(vec![
            ("src/user_model.py", ""),
            ("src/order_model.py", ""),
            ("src/CartModel.py", ""),
            ("src/PaymentFlow.py", ""),
            ("src/ShippingFlow.py", ""),
            ("src/legacy_helper.py", ""),
        ]);
        assert!(NamingDrift::new().check_project(&project).is_empty());
    }

    #[test]
    fn structural_clones_cluster() {
        let module = "\
def handler(event):
    if event:
        value = transform(event)
        emit(value)
        return value
    return None

def transform(data):
    result = normalize(data)
    emit(result)
    return result
";
        let project = project(vec![
            ("src/a.py", module),
            ("src/b.py", module),
            ("src/c.py", module),
        ]);
        let violations = StructuralClones::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.as_deref(), Some("src/a.py"));
        assert!(violations[0].message.contains("src/b.py"));
    }

    #[test]
    fn import_cycle_rendered_once() {
        let project = project(vec![
            ("pkg/__init__.py", ""),
            ("pkg/a.py", "from pkg import b\n"),
            ("pkg/b.py", "import pkg.c\n"),
            ("pkg/c.py", "from . import a\n"),
        ]);
        let violations = ImportCycles::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("pkg.a -> pkg.b -> pkg.c -> pkg.a"));
    }

    #[test]
    fn disjoint_cycles_reported_separately() {
        let project = project(vec![
            ("pkg/__init__.py", ""),
            ("pkg/a.py", "from pkg import b\n"),
            ("pkg/b.py", "from pkg import a\n"),
            ("pkg/d.py", "from pkg import e\n"),
            ("pkg/e.py", "from pkg import d\n"),
        ]);
        let violations = ImportCycles::new().check_project(&project);
        assert_eq!(violations.len(), 2, "each disjoint cycle gets one finding");
    }

    #[test]
    fn rendered_cycle_uses_only_real_edges() {
        // pkg.c reaches pkg.b but never pkg.a; a walk that dead-ends in
        // pkg.c must back out instead of inventing a closing edge.
        let project = project(vec![
            ("pkg/__init__.py", ""),
            ("pkg/a.py", "from pkg import b\n"),
            ("pkg/b.py", "from pkg import c\nfrom pkg import d\n"),
            ("pkg/c.py", "from pkg import b\n"),
            ("pkg/d.py", "from pkg import a\n"),
        ]);
        let violations = ImportCycles::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert!(
            violations[0].message.contains("pkg.a -> pkg.b -> pkg.d -> pkg.a"),
            "unexpected cycle rendering: {}",
            violations[0].message
        );
    }

    #[test]
    fn no_cycle_for_acyclic_imports() {
        let project = project(vec![
            ("pkg/__init__.py", ""),
            ("pkg/a.py", "from pkg import b\n"),
            ("pkg/b.py", "x = 1\n"),
        ]);
        assert!(ImportCycles::new().check_project(&project).is_empty());
    }

    #[test]
    fn missing_tests_aggregate() {
        let project = project(vec![
            ("src/core.py", "x = 1\n"),
            ("src/util.py", "y = 2\n"),
            ("src/__init__.py", ""),
            ("vendor/dep.py", "z = 3\n"),
            ("tests/test_util.py", "def test_y():\n    pass\n"),
        ]);
        let violations = MissingTests::new().check_project(&project);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("src/core.py"));
        assert!(!violations[0].message.contains("src/util.py"));
        assert!(!violations[0].message.contains("vendor"));
    }
}

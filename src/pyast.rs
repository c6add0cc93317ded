// SPDX-License-Identifier: PMPL-1.0-or-later

//! Python parsing support built on rustpython-parser. The parser hands
//! back byte offsets, so a line index is kept alongside the tree to map
//! nodes to 1-based line numbers. Structural rules walk the tree through
//! [`walk`]; [`skeleton`] serializes a name-free shape fingerprint used
//! by cross-file clustering.

use rustpython_parser::ast::{self, Expr, Ranged, Stmt};
use rustpython_parser::Parse;

/// Byte offsets of each line start, for offset-to-line translation.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> LineIndex {
        let mut starts = vec![0usize];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                starts.push(idx + 1);
            }
        }
        LineIndex { starts }
    }

    /// 1-based line containing the byte offset.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.starts.partition_point(|start| *start <= offset) as u32
    }
}

/// A parsed Python module plus the line index for its source text.
pub struct PythonAst {
    pub suite: ast::Suite,
    index: LineIndex,
}

impl PythonAst {
    /// Parse failures are recoverable: the file simply loses AST-backed
    /// rules and falls back to line heuristics.
    pub fn parse(text: &str, path: &str) -> Option<PythonAst> {
        match ast::Suite::parse(text, path) {
            Ok(suite) => Some(PythonAst {
                suite,
                index: LineIndex::new(text),
            }),
            Err(err) => {
                tracing::debug!(path, error = %err, "python parse failed");
                None
            }
        }
    }

    pub fn line_of<N: Ranged>(&self, node: &N) -> u32 {
        let offset: usize = node.start().into();
        self.index.line_at(offset)
    }

    pub fn end_line_of<N: Ranged>(&self, node: &N) -> u32 {
        let offset: usize = node.end().into();
        self.index.line_at(offset.saturating_sub(1))
    }
}

/// One node handed to a [`walk`] visitor.
#[derive(Clone, Copy)]
pub enum PyNode<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Depth-first traversal over statements and expressions. Visits a node
/// before its children.
pub fn walk<'a>(suite: &'a [Stmt], visit: &mut dyn FnMut(PyNode<'a>)) {
    for stmt in suite {
        walk_stmt(stmt, visit);
    }
}

pub fn walk_stmt<'a>(stmt: &'a Stmt, visit: &mut dyn FnMut(PyNode<'a>)) {
    visit(PyNode::Stmt(stmt));
    match stmt {
        Stmt::FunctionDef(ast::StmtFunctionDef {
            body,
            decorator_list,
            ..
        })
        | Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef {
            body,
            decorator_list,
            ..
        }) => {
            for expr in decorator_list {
                walk_expr(expr, visit);
            }
            walk(body, visit);
        }
        Stmt::ClassDef(ast::StmtClassDef {
            bases,
            keywords,
            body,
            decorator_list,
            ..
        }) => {
            for expr in bases.iter().chain(decorator_list) {
                walk_expr(expr, visit);
            }
            for kw in keywords {
                walk_expr(&kw.value, visit);
            }
            walk(body, visit);
        }
        Stmt::Return(ast::StmtReturn { value, .. }) => {
            if let Some(value) = value {
                walk_expr(value, visit);
            }
        }
        Stmt::Delete(ast::StmtDelete { targets, .. }) => {
            for expr in targets {
                walk_expr(expr, visit);
            }
        }
        Stmt::Assign(ast::StmtAssign { targets, value, .. }) => {
            for expr in targets {
                walk_expr(expr, visit);
            }
            walk_expr(value, visit);
        }
        Stmt::AugAssign(ast::StmtAugAssign { target, value, .. }) => {
            walk_expr(target, visit);
            walk_expr(value, visit);
        }
        Stmt::AnnAssign(ast::StmtAnnAssign {
            target,
            annotation,
            value,
            ..
        }) => {
            walk_expr(target, visit);
            walk_expr(annotation, visit);
            if let Some(value) = value {
                walk_expr(value, visit);
            }
        }
        Stmt::For(ast::StmtFor {
            target,
            iter,
            body,
            orelse,
            ..
        })
        | Stmt::AsyncFor(ast::StmtAsyncFor {
            target,
            iter,
            body,
            orelse,
            ..
        }) => {
            walk_expr(target, visit);
            walk_expr(iter, visit);
            walk(body, visit);
            walk(orelse, visit);
        }
        Stmt::While(ast::StmtWhile {
            test, body, orelse, ..
        }) => {
            walk_expr(test, visit);
            walk(body, visit);
            walk(orelse, visit);
        }
        Stmt::If(ast::StmtIf {
            test, body, orelse, ..
        }) => {
            walk_expr(test, visit);
            walk(body, visit);
            walk(orelse, visit);
        }
        Stmt::With(ast::StmtWith { items, body, .. })
        | Stmt::AsyncWith(ast::StmtAsyncWith { items, body, .. }) => {
            for item in items {
                walk_expr(&item.context_expr, visit);
                if let Some(vars) = &item.optional_vars {
                    walk_expr(vars, visit);
                }
            }
            walk(body, visit);
        }
        Stmt::Match(ast::StmtMatch { subject, cases, .. }) => {
            walk_expr(subject, visit);
            for case in cases {
                if let Some(guard) = &case.guard {
                    walk_expr(guard, visit);
                }
                walk(&case.body, visit);
            }
        }
        Stmt::Raise(ast::StmtRaise { exc, cause, .. }) => {
            if let Some(exc) = exc {
                walk_expr(exc, visit);
            }
            if let Some(cause) = cause {
                walk_expr(cause, visit);
            }
        }
        Stmt::Try(ast::StmtTry {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        })
        | Stmt::TryStar(ast::StmtTryStar {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        }) => {
            walk(body, visit);
            for handler in handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                if let Some(type_) = &h.type_ {
                    walk_expr(type_, visit);
                }
                walk(&h.body, visit);
            }
            walk(orelse, visit);
            walk(finalbody, visit);
        }
        Stmt::Assert(ast::StmtAssert { test, msg, .. }) => {
            walk_expr(test, visit);
            if let Some(msg) = msg {
                walk_expr(msg, visit);
            }
        }
        Stmt::Expr(ast::StmtExpr { value, .. }) => walk_expr(value, visit),
        // Import, Global, Nonlocal, Pass, Break, Continue: no children to
        // descend into beyond what rules read off the statement itself.
        _ => {}
    }
}

pub fn walk_expr<'a>(expr: &'a Expr, visit: &mut dyn FnMut(PyNode<'a>)) {
    visit(PyNode::Expr(expr));
    match expr {
        Expr::BoolOp(ast::ExprBoolOp { values, .. }) => {
            for value in values {
                walk_expr(value, visit);
            }
        }
        Expr::NamedExpr(ast::ExprNamedExpr { target, value, .. }) => {
            walk_expr(target, visit);
            walk_expr(value, visit);
        }
        Expr::BinOp(ast::ExprBinOp { left, right, .. }) => {
            walk_expr(left, visit);
            walk_expr(right, visit);
        }
        Expr::UnaryOp(ast::ExprUnaryOp { operand, .. }) => walk_expr(operand, visit),
        Expr::Lambda(ast::ExprLambda { body, .. }) => walk_expr(body, visit),
        Expr::IfExp(ast::ExprIfExp {
            test, body, orelse, ..
        }) => {
            walk_expr(test, visit);
            walk_expr(body, visit);
            walk_expr(orelse, visit);
        }
        Expr::Dict(ast::ExprDict { keys, values, .. }) => {
            for key in keys.iter().flatten() {
                walk_expr(key, visit);
            }
            for value in values {
                walk_expr(value, visit);
            }
        }
        Expr::Set(ast::ExprSet { elts, .. })
        | Expr::List(ast::ExprList { elts, .. })
        | Expr::Tuple(ast::ExprTuple { elts, .. }) => {
            for elt in elts {
                walk_expr(elt, visit);
            }
        }
        Expr::ListComp(ast::ExprListComp {
            elt, generators, ..
        })
        | Expr::SetComp(ast::ExprSetComp {
            elt, generators, ..
        })
        | Expr::GeneratorExp(ast::ExprGeneratorExp {
            elt, generators, ..
        }) => {
            walk_expr(elt, visit);
            for gen in generators {
                walk_expr(&gen.target, visit);
                walk_expr(&gen.iter, visit);
                for cond in &gen.ifs {
                    walk_expr(cond, visit);
                }
            }
        }
        Expr::DictComp(ast::ExprDictComp {
            key,
            value,
            generators,
            ..
        }) => {
            walk_expr(key, visit);
            walk_expr(value, visit);
            for gen in generators {
                walk_expr(&gen.target, visit);
                walk_expr(&gen.iter, visit);
                for cond in &gen.ifs {
                    walk_expr(cond, visit);
                }
            }
        }
        Expr::Await(ast::ExprAwait { value, .. })
        | Expr::YieldFrom(ast::ExprYieldFrom { value, .. })
        | Expr::Starred(ast::ExprStarred { value, .. })
        | Expr::Attribute(ast::ExprAttribute { value, .. }) => walk_expr(value, visit),
        Expr::Yield(ast::ExprYield { value, .. }) => {
            if let Some(value) = value {
                walk_expr(value, visit);
            }
        }
        Expr::Compare(ast::ExprCompare {
            left, comparators, ..
        }) => {
            walk_expr(left, visit);
            for comparator in comparators {
                walk_expr(comparator, visit);
            }
        }
        Expr::Call(ast::ExprCall {
            func,
            args,
            keywords,
            ..
        }) => {
            walk_expr(func, visit);
            for arg in args {
                walk_expr(arg, visit);
            }
            for kw in keywords {
                walk_expr(&kw.value, visit);
            }
        }
        Expr::FormattedValue(ast::ExprFormattedValue { value, .. }) => walk_expr(value, visit),
        Expr::JoinedStr(ast::ExprJoinedStr { values, .. }) => {
            for value in values {
                walk_expr(value, visit);
            }
        }
        Expr::Subscript(ast::ExprSubscript { value, slice, .. }) => {
            walk_expr(value, visit);
            walk_expr(slice, visit);
        }
        Expr::Slice(ast::ExprSlice {
            lower, upper, step, ..
        }) => {
            for part in [lower, upper, step].into_iter().flatten() {
                walk_expr(part, visit);
            }
        }
        // Constant, Name: leaves.
        _ => {}
    }
}

/// The leading string-literal statement of a suite, if any.
pub fn docstring(body: &[Stmt]) -> Option<&str> {
    match body.first()? {
        Stmt::Expr(ast::StmtExpr { value, .. }) => match value.as_ref() {
            Expr::Constant(ast::ExprConstant {
                value: ast::Constant::Str(text),
                ..
            }) => Some(text.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// True if any expression under `body` is an `await`.
pub fn contains_await(body: &[Stmt]) -> bool {
    let mut found = false;
    walk(body, &mut |node| {
        if let PyNode::Expr(Expr::Await(_)) = node {
            found = true;
        }
    });
    found
}

/// Name-free structural fingerprint of a module: the shape of its
/// definitions and control flow with identifiers and literals erased.
/// Returns the serialized shape plus the number of statements it covers.
pub fn skeleton(suite: &[Stmt]) -> (String, usize) {
    let mut out = String::new();
    let mut count = 0usize;
    for stmt in suite {
        skeleton_stmt(stmt, &mut out, &mut count);
    }
    (out, count)
}

fn skeleton_block(body: &[Stmt], out: &mut String, count: &mut usize) {
    out.push('{');
    for stmt in body {
        skeleton_stmt(stmt, out, count);
    }
    out.push('}');
}

fn skeleton_stmt(stmt: &Stmt, out: &mut String, count: &mut usize) {
    *count += 1;
    match stmt {
        Stmt::FunctionDef(ast::StmtFunctionDef { body, .. }) => {
            out.push_str("fn");
            skeleton_block(body, out, count);
        }
        Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef { body, .. }) => {
            out.push_str("afn");
            skeleton_block(body, out, count);
        }
        Stmt::ClassDef(ast::StmtClassDef { body, .. }) => {
            out.push_str("cls");
            skeleton_block(body, out, count);
        }
        Stmt::If(ast::StmtIf { body, orelse, .. }) => {
            out.push_str("if");
            skeleton_block(body, out, count);
            if !orelse.is_empty() {
                out.push_str("el");
                skeleton_block(orelse, out, count);
            }
        }
        Stmt::For(ast::StmtFor { body, orelse, .. })
        | Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. }) => {
            out.push_str("for");
            skeleton_block(body, out, count);
            if !orelse.is_empty() {
                out.push_str("el");
                skeleton_block(orelse, out, count);
            }
        }
        Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
            out.push_str("wh");
            skeleton_block(body, out, count);
            if !orelse.is_empty() {
                out.push_str("el");
                skeleton_block(orelse, out, count);
            }
        }
        Stmt::Try(ast::StmtTry {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        })
        | Stmt::TryStar(ast::StmtTryStar {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        }) => {
            out.push_str("try");
            skeleton_block(body, out, count);
            for handler in handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                out.push_str("ex");
                skeleton_block(&h.body, out, count);
            }
            if !orelse.is_empty() {
                out.push_str("el");
                skeleton_block(orelse, out, count);
            }
            if !finalbody.is_empty() {
                out.push_str("fin");
                skeleton_block(finalbody, out, count);
            }
        }
        Stmt::With(ast::StmtWith { body, .. })
        | Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => {
            out.push_str("with");
            skeleton_block(body, out, count);
        }
        Stmt::Match(ast::StmtMatch { cases, .. }) => {
            out.push_str("mt");
            out.push('{');
            for case in cases {
                out.push_str("cs");
                skeleton_block(&case.body, out, count);
            }
            out.push('}');
        }
        Stmt::Return(_) => out.push_str("ret;"),
        Stmt::Raise(_) => out.push_str("rz;"),
        Stmt::Assign(_) | Stmt::AugAssign(_) | Stmt::AnnAssign(_) => out.push_str("as;"),
        Stmt::Import(_) | Stmt::ImportFrom(_) => out.push_str("im;"),
        Stmt::Expr(ast::StmtExpr { value, .. }) => {
            if matches!(value.as_ref(), Expr::Call(_)) {
                out.push_str("call;");
            } else {
                out.push_str("ex;");
            }
        }
        Stmt::Assert(_) => out.push_str("at;"),
        Stmt::Delete(_) => out.push_str("dl;"),
        Stmt::Global(_) | Stmt::Nonlocal(_) => out.push_str("gl;"),
        Stmt::Pass(_) => out.push_str("p;"),
        Stmt::Break(_) | Stmt::Continue(_) => out.push_str("br;"),
        _ => out.push_str("s;"),
    }
}

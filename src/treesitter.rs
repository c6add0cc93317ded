// SPDX-License-Identifier: PMPL-1.0-or-later

//! Generic syntax trees via tree-sitter. Parser instances are not
//! shareable across threads, so each worker thread keeps its own pool,
//! lazily initialized per grammar and reused for every file that thread
//! handles.

use std::cell::RefCell;
use std::collections::HashMap;

use tree_sitter::{Parser, Tree};

use crate::languages::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Python,
    Go,
    Rust,
    Ruby,
}

impl Grammar {
    pub fn for_language(lang: Language) -> Option<Grammar> {
        match lang {
            Language::Python => Some(Grammar::Python),
            Language::Go => Some(Grammar::Go),
            Language::Rust => Some(Grammar::Rust),
            Language::Ruby => Some(Grammar::Ruby),
            _ => None,
        }
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        }
    }

    /// Node kinds that delimit a function body in this grammar.
    pub fn function_kinds(self) -> &'static [&'static str] {
        match self {
            Grammar::Python => &["function_definition"],
            Grammar::Go => &["function_declaration", "method_declaration"],
            Grammar::Rust => &["function_item"],
            Grammar::Ruby => &["method", "singleton_method"],
        }
    }
}

thread_local! {
    static PARSERS: RefCell<HashMap<Grammar, Option<Parser>>> = RefCell::new(HashMap::new());
}

fn new_parser(grammar: Grammar) -> Option<Parser> {
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&grammar.language()) {
        tracing::warn!(?grammar, error = %err, "tree-sitter grammar failed to load");
        return None;
    }
    Some(parser)
}

/// Parse with this thread's cached parser for the grammar. Returns None
/// when the grammar is unavailable or parsing fails outright.
pub fn parse(grammar: Grammar, text: &str) -> Option<Tree> {
    PARSERS.with(|cell| {
        let mut pool = cell.borrow_mut();
        let slot = pool.entry(grammar).or_insert_with(|| new_parser(grammar));
        slot.as_mut().and_then(|parser| parser.parse(text, None))
    })
}

/// Depth-first pre-order visit of every node under `node`.
pub fn visit<'t>(node: tree_sitter::Node<'t>, f: &mut dyn FnMut(tree_sitter::Node<'t>)) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        f(current);
        for idx in (0..current.child_count()).rev() {
            if let Some(child) = current.child(idx as u32) {
                stack.push(child);
            }
        }
    }
}

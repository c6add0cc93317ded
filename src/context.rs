// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-file and per-project scan contexts. A `FileContext` is built
//! once per file per run and shared read-only with every rule that
//! evaluates the file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::languages::{self, Language};
use crate::pyast::PythonAst;
use crate::suppress::Suppressions;
use crate::treesitter::{self, Grammar};

pub struct FileContext {
    /// Project-relative path with forward slashes.
    pub relative_path: String,
    pub language: Language,
    pub text: String,
    pub lines: Vec<String>,
    pub suppressions: Suppressions,
    /// Native tree for Python sources that parse cleanly.
    pub py_ast: Option<PythonAst>,
    /// Generic syntax tree for languages with a loaded grammar.
    pub tree: Option<(Grammar, tree_sitter::Tree)>,
}

impl FileContext {
    /// Reads and parses one file. Returns None for unreadable or
    /// binary content; parse failures only drop the affected tree.
    pub fn build(project_root: &Path, relative_path: &str, language: Language) -> Option<FileContext> {
        let absolute = project_root.join(relative_path);
        let bytes = match fs::read(&absolute) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = relative_path, error = %err, "unreadable file skipped");
                return None;
            }
        };
        let text = decode(bytes)?;
        Some(FileContext::from_text(relative_path, language, text))
    }

    /// Builds a context from in-memory text. Used by tests and diff
    /// scans where content does not come straight from disk.
    pub fn from_text(relative_path: &str, language: Language, text: String) -> FileContext {
        let relative_path = relative_path.replace('\\', "/");
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let suppressions = Suppressions::parse(&lines);
        let py_ast = match language {
            Language::Python => PythonAst::parse(&text, &relative_path),
            _ => None,
        };
        let tree = Grammar::for_language(language)
            .and_then(|grammar| treesitter::parse(grammar, &text).map(|tree| (grammar, tree)));
        FileContext {
            relative_path,
            language,
            text,
            lines,
            suppressions,
            py_ast,
            tree,
        }
    }

    pub fn is_test_file(&self) -> bool {
        languages::is_test_path(&self.relative_path)
    }
}

/// UTF-8 with a Windows-1252 fallback for legacy files. NUL bytes mean
/// binary content, which is skipped outright.
fn decode(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            let bytes = err.into_bytes();
            if bytes.contains(&0) {
                return None;
            }
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Some(text.into_owned())
        }
    }
}

/// Everything project-level rules see: the scan root, the effective
/// configuration, and the complete file-context set. Immutable once
/// constructed for a run.
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: Config,
    pub files: Vec<FileContext>,
}

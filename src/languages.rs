// SPDX-License-Identifier: PMPL-1.0-or-later

//! Language identification by file extension, plus the per-language
//! facts rules keep asking for: comment syntax and test-file layout.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    Kotlin,
    Ruby,
    Php,
    CSharp,
    Swift,
    Shell,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let lang = match ext.as_str() {
            "py" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "rb" | "rake" => Language::Ruby,
            "php" => Language::Php,
            "cs" => Language::CSharp,
            "swift" => Language::Swift,
            "sh" | "bash" => Language::Shell,
            _ => return None,
        };
        Some(lang)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::CSharp => "csharp",
            Language::Swift => "swift",
            Language::Shell => "shell",
        }
    }

    /// Line-comment markers recognised when scanning for commentary.
    pub fn comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Python | Language::Ruby | Language::Shell => &["#"],
            Language::Php => &["//", "#"],
            _ => &["//"],
        }
    }

    /// Languages with a loaded tree-sitter grammar get structural
    /// analysis beyond line heuristics.
    pub fn has_grammar(self) -> bool {
        matches!(
            self,
            Language::Python | Language::Go | Language::Rust | Language::Ruby
        )
    }
}

/// Whether a relative path lives in test code. Several rules relax or
/// skip themselves inside tests.
pub fn is_test_path(relative_path: &str) -> bool {
    let normalized = relative_path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').collect();
    let dir_hit = parts[..parts.len().saturating_sub(1)]
        .iter()
        .any(|p| matches!(*p, "test" | "tests" | "__tests__" | "spec" | "specs"));
    if dir_hit {
        return true;
    }
    let name = parts.last().copied().unwrap_or("");
    let stem = name.split('.').next().unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || name.contains(".test.")
        || name.contains(".spec.")
}

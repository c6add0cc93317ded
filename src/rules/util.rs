// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared helpers for line-oriented rules: comment/code line scanning
//! with basic block-comment support, and identifier heuristics.

use crate::context::FileContext;

/// Compile a pattern once and reuse the compiled regex.
#[macro_export]
macro_rules! static_regex {
    ($pattern:expr) => {{
        static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
        RE.get_or_init(|| ::regex::Regex::new($pattern).unwrap())
    }};
}

const LINE_COMMENT_PREFIXES: [&str; 2] = ["#", "//"];
const BLOCK_START: &str = "/*";
const BLOCK_END: &str = "*/";

/// 1-indexed comment lines. Only lines whose first non-whitespace text
/// is a comment delimiter count; this is a low-noise heuristic, not a
/// lexer.
pub fn comment_lines(ctx: &FileContext) -> Vec<(u32, &str)> {
    let mut out = Vec::new();
    let mut in_block = false;
    for (idx, line) in ctx.lines.iter().enumerate() {
        let lineno = idx as u32 + 1;
        let stripped = line.trim_start();
        if stripped.is_empty() {
            continue;
        }
        if in_block {
            out.push((lineno, line.as_str()));
            if stripped.contains(BLOCK_END) {
                in_block = false;
            }
            continue;
        }
        if LINE_COMMENT_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
            out.push((lineno, line.as_str()));
            continue;
        }
        if stripped.starts_with(BLOCK_START) {
            out.push((lineno, line.as_str()));
            if !stripped.contains(BLOCK_END) {
                in_block = true;
            }
        }
    }
    out
}

/// 1-indexed non-empty, non-comment lines.
pub fn code_lines(ctx: &FileContext) -> Vec<(u32, &str)> {
    let mut out = Vec::new();
    let mut in_block = false;
    for (idx, line) in ctx.lines.iter().enumerate() {
        let lineno = idx as u32 + 1;
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        let lstripped = line.trim_start();
        if in_block {
            if lstripped.contains(BLOCK_END) {
                in_block = false;
            }
            continue;
        }
        if LINE_COMMENT_PREFIXES.iter().any(|p| lstripped.starts_with(p)) {
            continue;
        }
        if lstripped.starts_with(BLOCK_START) {
            if !lstripped.contains(BLOCK_END) {
                in_block = true;
            }
            continue;
        }
        out.push((lineno, line.as_str()));
    }
    out
}

/// Lowercased alphabetic words of three letters or more.
pub fn normalize_words(text: &str) -> Vec<String> {
    static_regex!(r"[A-Za-z]{3,}")
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

/// Splits snake_case and camelCase identifiers into lowercase words.
fn split_identifier_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in name.split(['_', '-', '.']) {
        let mut current = String::new();
        for ch in chunk.chars() {
            if ch.is_ascii_uppercase() && !current.is_empty() {
                words.push(current.to_ascii_lowercase());
                current = String::new();
            }
            current.push(ch);
        }
        if !current.is_empty() {
            words.push(current.to_ascii_lowercase());
        }
    }
    words.retain(|w| !w.is_empty());
    words
}

/// Credential-ish variable names: password/secret/token/apikey, or the
/// adjacent word pair "api key" in any casing convention.
pub fn looks_like_credential(name: &str) -> bool {
    let words = split_identifier_words(name);
    if words.is_empty() {
        return false;
    }
    if words
        .iter()
        .any(|w| matches!(w.as_str(), "password" | "secret" | "token" | "apikey"))
    {
        return true;
    }
    words
        .windows(2)
        .any(|pair| pair[0] == "api" && pair[1] == "key")
}

/// 1-based line of the first case-insensitive occurrence of `needle`.
pub fn first_line_containing(lines: &[String], needle: &str) -> Option<u32> {
    let lowered = needle.to_ascii_lowercase();
    lines
        .iter()
        .position(|line| line.to_ascii_lowercase().contains(&lowered))
        .map(|idx| idx as u32 + 1)
}

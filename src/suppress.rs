// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-source suppression directives. Three forms, case-insensitive,
//! valid inside any comment:
//!
//! - `slop: disable-file=A03,B01` disables rules for the whole file
//! - `slop: disable=A03` disables rules on the directive's own line
//! - `slop: disable-next-line=A03` disables rules on the line below
//!
//! `all` is a wildcard matching every rule id.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)slop:\s*disable[-_]?file\s*=\s*([A-Za-z0-9_,\-\s]+)")
            .unwrap()
    })
}

fn next_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)slop:\s*disable-next-line\s*=\s*([A-Za-z0-9_,\-\s]+)")
            .unwrap()
    })
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)slop:\s*disable\s*=\s*([A-Za-z0-9_,\-\s]+)")
            .unwrap()
    })
}

#[derive(Debug, Clone, Default)]
struct IdSet {
    all: bool,
    ids: HashSet<String>,
}

impl IdSet {
    fn insert_tokens(&mut self, raw: &str) {
        for token in raw.split([',', ' ', '\t']).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("all") {
                self.all = true;
            } else {
                self.ids.insert(token.to_ascii_uppercase());
            }
        }
    }

    fn matches(&self, rule_id: &str) -> bool {
        self.all || self.ids.contains(rule_id)
    }

    fn is_empty(&self) -> bool {
        !self.all && self.ids.is_empty()
    }
}

/// Parsed suppression table for one file.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    file_wide: IdSet,
    by_line: HashMap<u32, IdSet>,
}

impl Suppressions {
    /// Scans every line for directives. Lines are 1-indexed;
    /// `disable-next-line` materializes on `line + 1`.
    pub fn parse(lines: &[String]) -> Suppressions {
        let mut out = Suppressions::default();
        for (idx, line) in lines.iter().enumerate() {
            let lineno = idx as u32 + 1;
            if let Some(caps) = file_re().captures(line) {
                out.file_wide.insert_tokens(&caps[1]);
            }
            if let Some(caps) = next_line_re().captures(line) {
                out.by_line
                    .entry(lineno + 1)
                    .or_default()
                    .insert_tokens(&caps[1]);
            } else if let Some(caps) = line_re().captures(line) {
                // `disable-file` also matches the bare `disable=` pattern
                // in its `disable_file` spelling only; the hyphen form
                // cannot, so only the underscore variant needs excluding.
                if !file_re().is_match(line) {
                    out.by_line
                        .entry(lineno)
                        .or_default()
                        .insert_tokens(&caps[1]);
                }
            }
        }
        out
    }

    /// File-wide suppressions ignore the line entirely, including lines
    /// before the directive.
    pub fn is_suppressed(&self, rule_id: &str, line: Option<u32>) -> bool {
        if self.file_wide.matches(rule_id) {
            return true;
        }
        match line {
            Some(n) => self
                .by_line
                .get(&n)
                .is_some_and(|set| set.matches(rule_id)),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_wide.is_empty() && self.by_line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Suppressions {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Suppressions::parse(&lines)
    }

    #[test]
    fn disable_file_covers_preceding_lines() {
        let s = parse("x = 1\ny = 2\n# slop: disable-file=A03,B01\n");
        assert!(s.is_suppressed("A03", Some(1)));
        assert!(s.is_suppressed("B01", Some(2)));
        assert!(s.is_suppressed("A03", None));
        assert!(!s.is_suppressed("E01", Some(1)));
    }

    #[test]
    fn disable_applies_to_its_own_line_only() {
        let s = parse("bad()  # slop: disable=E04\nbad()\n");
        assert!(s.is_suppressed("E04", Some(1)));
        assert!(!s.is_suppressed("E04", Some(2)));
        assert!(!s.is_suppressed("E04", None));
    }

    #[test]
    fn disable_next_line_materializes_one_below() {
        let s = parse("# slop: disable-next-line=A05\nelegant()\n");
        assert!(!s.is_suppressed("A05", Some(1)));
        assert!(s.is_suppressed("A05", Some(2)));
        assert!(!s.is_suppressed("A05", Some(3)));
    }

    #[test]
    fn wildcard_all_matches_any_rule() {
        let s = parse("# slop: disable-file=all\n");
        assert!(s.is_suppressed("A01", Some(7)));
        assert!(s.is_suppressed("X04", None));
    }

    #[test]
    fn ids_are_case_normalized() {
        let s = parse("# SLOP: Disable=a03, b01\n");
        assert!(s.is_suppressed("A03", Some(1)));
        assert!(s.is_suppressed("B01", Some(1)));
    }

    #[test]
    fn underscore_file_spelling_is_not_a_line_directive() {
        let s = parse("# slop: disable_file=A03\n");
        assert!(s.is_suppressed("A03", Some(99)));
    }

    #[test]
    fn empty_table_for_plain_source() {
        let s = parse("def f():\n    return 1\n");
        assert!(s.is_empty());
        assert!(!s.is_suppressed("A03", Some(1)));
    }
}

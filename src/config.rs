// SPDX-License-Identifier: PMPL-1.0-or-later

//! Project configuration loaded from `slophound.yml` at the scan root.
//! A missing file means defaults. Malformed configuration is fatal at
//! startup; unknown rule ids referenced by enable/disable/severity
//! tables only warn.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::Severity;

pub const CONFIG_FILE: &str = "slophound.yml";
pub const DEFAULT_CACHE_PATH: &str = ".slophound/cache.json";
pub const DEFAULT_HISTORY_PATH: &str = ".slophound/history.json";

const KNOWN_GROUPS: &[&str] = &[
    "claude",
    "cursor",
    "copilot",
    "gemini",
    "generic",
    "go",
    "rust",
    "java",
    "kotlin",
    "ruby",
    "php",
    "crossfile",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("`threshold` must be between 0 and 100, got {0}")]
    ThresholdOutOfRange(u32),
    #[error("`scoring.profile` must be one of: default, strict, lenient (got {0:?})")]
    UnknownProfile(String),
    #[error("override prefix {0:?} must be a relative path with no '..' segments")]
    BadOverridePrefix(String),
    #[error("override prefix {0:?} duplicates another prefix after normalization")]
    DuplicateOverridePrefix(String),
    #[error("unknown rule group or malformed rule id {0:?} (groups: claude, cursor, copilot, gemini, generic, go, rust, java, kotlin, ruby, php, crossfile; ids look like A03)")]
    BadRuleToken(String),
    #[error("severity override key {0:?} is not a rule id like A03")]
    BadSeverityKey(String),
    #[error("`history.max_entries` must be greater than zero")]
    BadHistoryLimit,
}

/// The rule group a canonical rule id belongs to, derived from its
/// letter prefix.
pub fn group_of(rule_id: &str) -> Option<&'static str> {
    match rule_id.chars().next()? {
        'A' => Some("claude"),
        'B' => Some("cursor"),
        'C' => Some("copilot"),
        'D' => Some("gemini"),
        'E' => Some("generic"),
        'G' => Some("go"),
        'R' => Some("rust"),
        'J' => Some("java"),
        'K' => Some("kotlin"),
        'Y' => Some("ruby"),
        'P' => Some("php"),
        'X' => Some("crossfile"),
        _ => None,
    }
}

fn is_rule_id(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && token.len() >= 3
        && chars.all(|c| c.is_ascii_digit())
}

fn normalize_group(token: &str) -> String {
    token.trim().to_ascii_lowercase().replace('-', "_")
}

/// `enable` accepts either a single token or a list of tokens.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnableSpec {
    One(String),
    Many(Vec<String>),
}

impl Default for EnableSpec {
    fn default() -> Self {
        EnableSpec::One("all".to_string())
    }
}

impl EnableSpec {
    fn tokens(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            EnableSpec::One(value) => vec![value.as_str()],
            EnableSpec::Many(values) => values.iter().map(String::as_str).collect(),
        };
        raw.iter()
            .flat_map(|v| v.split([',', ';']))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub enable: EnableSpec,
    pub disable: Vec<String>,
    pub severity_overrides: BTreeMap<String, Severity>,
}

/// Partial rules configuration for a directory scope. Absent fields
/// inherit from the project-wide table.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RulesPatch {
    pub enable: Option<EnableSpec>,
    pub disable: Option<Vec<String>>,
    pub severity_overrides: Option<BTreeMap<String, Severity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryOverride {
    pub path: String,
    #[serde(default)]
    pub rules: RulesPatch,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IgnoreConfig {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: false,
            path: DEFAULT_CACHE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: String,
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            enabled: false,
            path: DEFAULT_HISTORY_PATH.to_string(),
            max_entries: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub profile: String,
    pub penalties: BTreeMap<String, BTreeMap<Severity, u32>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            profile: "default".to_string(),
            penalties: BTreeMap::new(),
        }
    }
}

/// Tuning knobs for the cross-file analyzers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrossfileConfig {
    pub duplicate_window: usize,
    pub min_normalized_lines: usize,
    pub min_cluster_size: usize,
}

impl Default for CrossfileConfig {
    fn default() -> Self {
        CrossfileConfig {
            duplicate_window: 20,
            min_normalized_lines: 20,
            min_cluster_size: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threshold: u32,
    pub fail_on_slop: bool,
    pub rules: RulesConfig,
    pub overrides: Vec<DirectoryOverride>,
    pub ignore: IgnoreConfig,
    pub baseline: Option<String>,
    pub cache: CacheConfig,
    pub history: HistoryConfig,
    pub scoring: ScoringConfig,
    pub crossfile: CrossfileConfig,

    /// Normalized (prefix, merged rules) pairs in declaration order,
    /// built during validation.
    #[serde(skip)]
    resolved_overrides: Vec<(String, RulesConfig)>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threshold: 60,
            fail_on_slop: false,
            rules: RulesConfig::default(),
            overrides: Vec::new(),
            ignore: IgnoreConfig::default(),
            baseline: None,
            cache: CacheConfig::default(),
            history: HistoryConfig::default(),
            scoring: ScoringConfig::default(),
            crossfile: CrossfileConfig::default(),
            resolved_overrides: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `slophound.yml` from the project root, or defaults if the
    /// file does not exist.
    pub fn load(project_root: &Path) -> Result<Config, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            let mut config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Config::from_yaml(&text, &path.display().to_string())
    }

    pub fn from_yaml(text: &str, origin: &str) -> Result<Config, ConfigError> {
        let mut config: Config =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.threshold > 100 {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        match self.scoring.profile.trim().to_ascii_lowercase().as_str() {
            "default" | "strict" | "lenient" => {}
            other => return Err(ConfigError::UnknownProfile(other.to_string())),
        }
        self.scoring.profile = self.scoring.profile.trim().to_ascii_lowercase();
        if self.history.max_entries == 0 {
            return Err(ConfigError::BadHistoryLimit);
        }

        validate_rules(&mut self.rules)?;

        let mut resolved = Vec::with_capacity(self.overrides.len());
        let mut seen = BTreeSet::new();
        for entry in &self.overrides {
            let prefix = normalize_prefix(&entry.path)?;
            if !seen.insert(prefix.clone()) {
                return Err(ConfigError::DuplicateOverridePrefix(entry.path.clone()));
            }
            let mut merged = apply_patch(&self.rules, &entry.rules);
            validate_rules(&mut merged)?;
            resolved.push((prefix, merged));
        }
        self.resolved_overrides = resolved;
        Ok(())
    }

    /// Effective rules table for a project-relative path: the longest
    /// matching override prefix wins, with the base table as fallback.
    /// Equal-length prefixes are identical after normalization, so the
    /// declaration order of `overrides` only matters for readability.
    pub fn rules_for(&self, relative_path: &str) -> &RulesConfig {
        let normalized = relative_path.replace('\\', "/");
        let mut best: Option<&(String, RulesConfig)> = None;
        for entry in &self.resolved_overrides {
            if normalized.starts_with(entry.0.as_str()) {
                match best {
                    Some((prefix, _)) if prefix.len() >= entry.0.len() => {}
                    _ => best = Some(entry),
                }
            }
        }
        best.map(|(_, rules)| rules).unwrap_or(&self.rules)
    }

    /// The override scope key a path resolves to, for cache keying.
    /// The empty string denotes the project-wide table.
    pub fn scope_of(&self, relative_path: &str) -> &str {
        let normalized = relative_path.replace('\\', "/");
        let mut best: &str = "";
        for (prefix, _) in &self.resolved_overrides {
            if normalized.starts_with(prefix.as_str()) && prefix.len() > best.len() {
                best = prefix.as_str();
            }
        }
        best
    }
}

fn validate_rules(rules: &mut RulesConfig) -> Result<(), ConfigError> {
    for token in rules.enable.tokens().iter().chain(rules.disable.iter()) {
        let group = normalize_group(token);
        if group == "all" || KNOWN_GROUPS.contains(&group.as_str()) {
            continue;
        }
        if !is_rule_id(&token.trim().to_ascii_uppercase()) {
            return Err(ConfigError::BadRuleToken(token.clone()));
        }
    }
    let normalized: BTreeMap<String, Severity> = rules
        .severity_overrides
        .iter()
        .map(|(key, sev)| (key.trim().to_ascii_uppercase(), *sev))
        .collect();
    for key in normalized.keys() {
        if !is_rule_id(key) {
            return Err(ConfigError::BadSeverityKey(key.clone()));
        }
    }
    rules.severity_overrides = normalized;
    Ok(())
}

fn apply_patch(base: &RulesConfig, patch: &RulesPatch) -> RulesConfig {
    let mut severity_overrides = base.severity_overrides.clone();
    if let Some(extra) = &patch.severity_overrides {
        for (key, sev) in extra {
            severity_overrides.insert(key.clone(), *sev);
        }
    }
    RulesConfig {
        enable: patch.enable.clone().unwrap_or_else(|| base.enable.clone()),
        disable: patch.disable.clone().unwrap_or_else(|| base.disable.clone()),
        severity_overrides,
    }
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let mut prefix = raw.trim().replace('\\', "/");
    if let Some(stripped) = prefix.strip_prefix("./") {
        prefix = stripped.to_string();
    }
    if prefix.is_empty() || prefix.starts_with('/') || prefix.split('/').any(|part| part == "..") {
        return Err(ConfigError::BadOverridePrefix(raw.to_string()));
    }
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    Ok(prefix)
}

/// Resolves `enable` minus `disable` into the concrete rule-id set,
/// intersected with the registered ids. Unknown explicit ids warn and
/// are skipped.
pub fn enabled_rule_ids(rules: &RulesConfig, available: &BTreeSet<String>) -> BTreeSet<String> {
    let mut enabled = BTreeSet::new();

    for token in rules.enable.tokens() {
        let group = normalize_group(&token);
        if group == "all" {
            enabled.extend(available.iter().cloned());
        } else if KNOWN_GROUPS.contains(&group.as_str()) {
            enabled.extend(
                available
                    .iter()
                    .filter(|id| group_of(id) == Some(group.as_str()))
                    .cloned(),
            );
        } else {
            let id = token.trim().to_ascii_uppercase();
            if available.contains(&id) {
                enabled.insert(id);
            } else {
                tracing::warn!(rule_id = %id, "enable references unknown rule id; ignoring");
            }
        }
    }

    for token in &rules.disable {
        let group = normalize_group(token);
        if group == "all" {
            enabled.clear();
        } else if KNOWN_GROUPS.contains(&group.as_str()) {
            enabled.retain(|id| group_of(id) != Some(group.as_str()));
        } else {
            let id = token.trim().to_ascii_uppercase();
            if !available.contains(&id) {
                tracing::warn!(rule_id = %id, "disable references unknown rule id; ignoring");
            }
            enabled.remove(&id);
        }
    }

    enabled
}

/// Stable fingerprint of the rule configuration that applies to a scope.
/// Incorporated into cache keys so a config edit invalidates entries
/// without touching file content.
pub fn rules_fingerprint(rules: &RulesConfig, enabled: &BTreeSet<String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    for id in enabled {
        hasher.update(id.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|");
    for (id, sev) in &rules.severity_overrides {
        hasher.update(id.as_bytes());
        hasher.update(b"=");
        hasher.update(sev.as_str().as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

/// Ignore-pattern matching over project-relative POSIX paths.
/// Trailing-slash patterns are directory prefixes; slash-less globs
/// match basenames; globs with slashes match the full relative path.
pub fn path_is_ignored(relative_path: &str, patterns: &[String]) -> bool {
    let rel = relative_path.replace('\\', "/");
    let basename = rel.rsplit('/').next().unwrap_or(rel.as_str());

    for raw in patterns {
        let mut pattern = raw.trim().replace('\\', "/");
        if pattern.is_empty() {
            continue;
        }
        if let Some(stripped) = pattern.strip_prefix("./") {
            pattern = stripped.to_string();
        }
        if pattern.ends_with('/') {
            if rel.starts_with(&pattern) {
                return true;
            }
            continue;
        }
        let Ok(compiled) = glob::Pattern::new(&pattern) else {
            tracing::warn!(pattern = %raw, "invalid ignore pattern; skipping");
            continue;
        };
        if pattern.contains('/') {
            if compiled.matches(&rel) {
                return true;
            }
        } else if compiled.matches(basename) || compiled.matches(&rel) {
            return true;
        }
    }
    false
}

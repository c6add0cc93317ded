// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scan orchestration: file discovery, parallel context building and
//! per-file detection on a bounded rayon pool, the serial project-rule
//! pass, then baseline filtering, scoring, and cache/history writes.
//! Worker count never changes the output, only the wall clock.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::baseline::{self, Baseline};
use crate::cache::{self, Cache};
use crate::config::{self, Config};
use crate::context::{FileContext, ProjectContext};
use crate::detect;
use crate::history;
use crate::languages::Language;
use crate::rules::Registry;
use crate::scoring::{self, ScanSummary};
use crate::types::{sort_violations, Violation};

/// Directories never descended into.
pub const DEFAULT_SKIP_DIRS: [&str; 11] = [
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".venv",
    "venv",
    "node_modules",
    "dist",
    "build",
    "__pycache__",
];

pub const WORKERS_ENV: &str = "SLOPHOUND_WORKERS";
const MAX_WORKERS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Explicit worker count; beats the environment and the default.
    pub workers: Option<usize>,
    /// Cache on/off; `None` follows the config.
    pub use_cache: Option<bool>,
    /// Scoring profile override.
    pub profile: Option<String>,
    /// Set false when generating a baseline, so existing accepted
    /// findings do not hide themselves.
    pub skip_baseline: bool,
}

pub struct ScanOutcome {
    pub summary: ScanSummary,
    pub config: Config,
}

/// Worker pool size: explicit override, else `SLOPHOUND_WORKERS`, else
/// twice the logical cores, clamped to 1..=32.
pub fn resolve_workers(explicit: Option<usize>) -> usize {
    let requested = explicit
        .or_else(|| {
            std::env::var(WORKERS_ENV)
                .ok()
                .and_then(|value| value.parse().ok())
        })
        .unwrap_or_else(|| num_cpus::get() * 2);
    requested.clamp(1, MAX_WORKERS)
}

/// Candidate files under the root: known language, not in a skipped
/// directory, not matching an ignore pattern. Sorted for determinism.
pub fn discover_files(project_root: &Path, config: &Config) -> Vec<(String, Language)> {
    let mut out = Vec::new();
    let walker = WalkDir::new(project_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && DEFAULT_SKIP_DIRS.contains(&entry.file_name().to_str().unwrap_or("")))
        });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(language) = Language::from_path(entry.path()) else {
            continue;
        };
        let Ok(rel) = entry.path().strip_prefix(project_root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if config::path_is_ignored(&rel, &config.ignore.paths) {
            continue;
        }
        out.push((rel, language));
    }
    out.sort();
    out
}

struct FileResult {
    ctx: FileContext,
    violations: Vec<Violation>,
    /// Cache key when this result was computed rather than replayed.
    fresh_key: Option<String>,
}

/// Full audit of a tree. Returns the scored summary plus the effective
/// configuration the run used.
pub fn scan(
    registry: &Registry,
    project_root: &Path,
    options: &ScanOptions,
) -> anyhow::Result<ScanOutcome> {
    let mut config = Config::load(project_root)?;
    if let Some(profile) = &options.profile {
        let profile = profile.trim().to_ascii_lowercase();
        anyhow::ensure!(
            matches!(profile.as_str(), "default" | "strict" | "lenient"),
            "unknown scoring profile {profile:?} (expected default, strict, or lenient)"
        );
        config.scoring.profile = profile;
    }
    let config = config;

    let discovered = discover_files(project_root, &config);
    tracing::debug!(files = discovered.len(), "discovery complete");

    let use_cache = options.use_cache.unwrap_or(config.cache.enabled);
    let cache_path = project_root.join(&config.cache.path);
    let mut cache = if use_cache {
        Cache::load(&cache_path)
    } else {
        Cache::default()
    };

    // One config fingerprint per override scope; files in the same
    // scope share it.
    let available = registry.ids();
    let mut scope_fingerprints: HashMap<String, String> = HashMap::new();
    for (rel, _) in &discovered {
        let scope = config.scope_of(rel);
        if !scope_fingerprints.contains_key(scope) {
            let rules = config.rules_for(rel);
            let enabled = config::enabled_rule_ids(rules, &available);
            scope_fingerprints.insert(scope.to_string(), config::rules_fingerprint(rules, &enabled));
        }
    }

    let workers = resolve_workers(options.workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building scan thread pool")?;

    let results: Vec<Option<FileResult>> = pool.install(|| {
        discovered
            .par_iter()
            .map(|(rel, language)| {
                let ctx = FileContext::build(project_root, rel, *language)?;
                let key = if use_cache {
                    cache::content_hash(&project_root.join(rel)).map(|hash| {
                        cache::entry_key(&hash, &scope_fingerprints[config.scope_of(rel)])
                    })
                } else {
                    None
                };
                if let Some(key) = &key {
                    if let Some(stored) = cache.get(rel, key) {
                        return Some(FileResult {
                            ctx,
                            violations: stored.to_vec(),
                            fresh_key: None,
                        });
                    }
                }
                let violations = detect::detect_file(registry, &config, &ctx);
                Some(FileResult {
                    ctx,
                    violations,
                    fresh_key: key,
                })
            })
            .collect()
    });

    let mut files = Vec::new();
    let mut violations = Vec::new();
    let mut fresh: Vec<(String, String, Vec<Violation>)> = Vec::new();
    for result in results.into_iter().flatten() {
        if let Some(key) = result.fresh_key {
            fresh.push((
                result.ctx.relative_path.clone(),
                key,
                result.violations.clone(),
            ));
        }
        violations.extend(result.violations);
        files.push(result.ctx);
    }

    let project = ProjectContext {
        root: project_root.to_path_buf(),
        config,
        files,
    };
    violations.extend(detect::project_violations(registry, &project));
    sort_violations(&mut violations);

    if !options.skip_baseline {
        let baseline_path = match project.config.baseline.as_deref() {
            Some(custom) => project_root.join(custom),
            None => project_root.join(baseline::DEFAULT_BASELINE_PATH),
        };
        if baseline_path.exists() {
            let accepted = Baseline::load(&baseline_path)?;
            violations = baseline::filter_violations(violations, &accepted, project_root);
        }
    }

    let summary = scoring::summarize(project.files.len(), violations, &project.config.scoring);

    if use_cache {
        let live: HashSet<&str> = project
            .files
            .iter()
            .map(|ctx| ctx.relative_path.as_str())
            .collect();
        cache.retain_paths(&|path| live.contains(path));
        for (rel, key, stored) in &fresh {
            cache.store(rel, key, stored);
        }
        if let Err(err) = cache.save(&cache_path) {
            tracing::warn!(error = %err, "failed to persist cache");
        }
    }

    if project.config.history.enabled {
        let entry = history::entry_from_summary(&summary, history::git_head(project_root));
        let history_path = project_root.join(&project.config.history.path);
        if let Err(err) = history::record(&history_path, entry, project.config.history.max_entries)
        {
            tracing::warn!(error = %err, "failed to persist history");
        }
    }

    Ok(ScanOutcome {
        summary,
        config: project.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> Registry {
        Registry::with_builtins().expect("builtins load")
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, text).expect("write fixture");
    }

    #[test]
    fn discovery_skips_vendored_trees_and_unknown_extensions() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/app.py", "x = 1\n");
        write(dir.path(), "node_modules/dep/index.js", "var x = 1;\n");
        write(dir.path(), ".git/HEAD", "ref: refs/heads/main\n");
        write(dir.path(), "README.md", "# readme\n");

        let config = Config::from_yaml("{}", "test").expect("valid");
        let found = discover_files(dir.path(), &config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "src/app.py");
    }

    #[test]
    fn discovery_honors_ignore_patterns() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/app.py", "x = 1\n");
        write(dir.path(), "src/schema.generated.py", "x = 1\n");

        let config =
            Config::from_yaml("ignore:\n  paths: ['*.generated.py']\n", "test").expect("valid");
        let found = discover_files(dir.path(), &config);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "src/app.py");
    }

    #[test]
    fn discovery_output_is_path_sorted() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/zeta.py", "x = 1\n");
        write(dir.path(), "src/alpha.go", "package alpha\n");
        write(dir.path(), "lib/mid.rs", "fn mid() {}\n");

        let config = Config::from_yaml("{}", "test").expect("valid");
        let found = discover_files(dir.path(), &config);
        let paths: Vec<&str> = found.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(paths, vec!["lib/mid.rs", "src/alpha.go", "src/zeta.py"]);
    }

    #[test]
    fn worker_count_clamps() {
        assert_eq!(resolve_workers(Some(0)), 1);
        assert_eq!(resolve_workers(Some(4)), 4);
        assert_eq!(resolve_workers(Some(500)), 32);
    }

    #[test]
    fn summaries_are_worker_count_invariant() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/a.py", "# Note that this matters\nx = 1\n");
        write(dir.path(), "src/b.py", "# <thinking>oops</thinking>\ny = 2\n");
        write(dir.path(), "src/c.py", "password = 'hunter2'\n");

        let registry = registry();
        let single = scan(
            &registry,
            dir.path(),
            &ScanOptions {
                workers: Some(1),
                ..ScanOptions::default()
            },
        )
        .expect("single-worker scan");
        let many = scan(
            &registry,
            dir.path(),
            &ScanOptions {
                workers: Some(8),
                ..ScanOptions::default()
            },
        )
        .expect("multi-worker scan");

        let a = serde_json::to_string(&single.summary).expect("serialize");
        let b = serde_json::to_string(&many.summary).expect("serialize");
        assert_eq!(a, b);
    }

    #[test]
    fn cached_rescan_matches_cold_scan() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/a.py", "# Note that this matters\nx = 1\n");
        write(dir.path(), "slophound.yml", "cache:\n  enabled: true\n");

        let registry = registry();
        let options = ScanOptions {
            workers: Some(2),
            ..ScanOptions::default()
        };
        let cold = scan(&registry, dir.path(), &options).expect("cold scan");
        assert!(dir.path().join(".slophound/cache.json").exists());
        let warm = scan(&registry, dir.path(), &options).expect("warm scan");

        assert_eq!(cold.summary.score, warm.summary.score);
        assert_eq!(
            cold.summary.violations.len(),
            warm.summary.violations.len()
        );
    }

    #[test]
    fn baseline_roundtrip_silences_scan() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "src/a.py", "# Note that this matters\nx = 1\n");

        let registry = registry();
        let generate = ScanOptions {
            workers: Some(1),
            skip_baseline: true,
            ..ScanOptions::default()
        };
        let first = scan(&registry, dir.path(), &generate).expect("scan");
        let document = baseline::build_baseline(&first.summary.violations, dir.path());
        baseline::save_baseline(
            &document,
            &dir.path().join(baseline::DEFAULT_BASELINE_PATH),
        )
        .expect("save baseline");

        let second = scan(
            &registry,
            dir.path(),
            &ScanOptions {
                workers: Some(1),
                ..ScanOptions::default()
            },
        )
        .expect("rescan");
        assert!(second.summary.violations.is_empty());
        assert_eq!(second.summary.score, 100);
    }
}

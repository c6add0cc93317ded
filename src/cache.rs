// SPDX-License-Identifier: PMPL-1.0-or-later

//! Violation cache keyed by file content and effective configuration.
//! The cache is advisory: anything missing, corrupt, or from another
//! schema version degrades to a cold cache, never an error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::Violation;

const CACHE_VERSION: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// Combined content + configuration key for the stored result.
    hash: String,
    violations: Vec<Violation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u64,
    files: HashMap<String, CacheEntry>,
}

#[derive(Debug, Default)]
pub struct Cache {
    files: HashMap<String, CacheEntry>,
}

/// blake3 over the file content; `None` when unreadable.
pub fn content_hash(path: &Path) -> Option<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(path).ok()?;
    Some(hasher.finalize().to_hex().to_string())
}

/// Cache key for one file: content hash joined with the fingerprint of
/// the rule configuration in effect for its scope. Either changing
/// invalidates the entry.
pub fn entry_key(content_hash: &str, config_fingerprint: &str) -> String {
    format!("{content_hash}:{config_fingerprint}")
}

impl Cache {
    pub fn load(path: &Path) -> Cache {
        let Ok(text) = fs::read_to_string(path) else {
            return Cache::default();
        };
        match serde_json::from_str::<CacheDocument>(&text) {
            Ok(doc) if doc.version == CACHE_VERSION => Cache { files: doc.files },
            Ok(doc) => {
                tracing::debug!(version = doc.version, "cache schema mismatch; starting cold");
                Cache::default()
            }
            Err(err) => {
                tracing::debug!(error = %err, "unreadable cache; starting cold");
                Cache::default()
            }
        }
    }

    /// Stored violations for a path, only when the combined key still
    /// matches. Immutable so parallel workers can consult it freely.
    pub fn get(&self, relative_path: &str, key: &str) -> Option<&[Violation]> {
        let entry = self.files.get(relative_path)?;
        if entry.hash != key {
            return None;
        }
        tracing::debug!(path = relative_path, "cache hit");
        Some(&entry.violations)
    }

    pub fn store(&mut self, relative_path: &str, key: &str, violations: &[Violation]) {
        self.files.insert(
            relative_path.to_string(),
            CacheEntry {
                hash: key.to_string(),
                violations: violations.to_vec(),
            },
        );
    }

    /// Drops entries for paths that no longer exist in the scanned set.
    pub fn retain_paths(&mut self, live: &dyn Fn(&str) -> bool) {
        self.files.retain(|path, _| live(path));
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }
        let doc = CacheDocument {
            version: CACHE_VERSION,
            files: self.files.clone(),
        };
        let json = serde_json::to_string(&doc)?;
        fs::write(path, json).with_context(|| format!("writing cache {}", path.display()))?;
        Ok(())
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rule capability interface and the registry that owns every loaded
//! rule. Built-ins are validated once at construction; externally
//! registered rules live in a separate overlay whose changes bump a
//! generation counter so derived lookup caches can be invalidated
//! without re-validating built-ins.

pub mod claude;
pub mod copilot;
pub mod crossfile;
pub mod cursor;
pub mod gemini;
pub mod generic;
pub mod polyglot;
pub mod util;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::context::{FileContext, ProjectContext};
use crate::types::{RuleMeta, Violation};

/// A rule may inspect single files, the whole project, or both; the
/// defaults report nothing.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn check_file(&self, _ctx: &FileContext) -> Vec<Violation> {
        Vec::new()
    }

    fn check_project(&self, _project: &ProjectContext) -> Vec<Violation> {
        Vec::new()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("rule id {0:?} is malformed; expected an uppercase letter followed by two or more digits")]
    MalformedId(String),
    #[error("rule id {0:?} collides with an already registered rule")]
    DuplicateId(String),
}

fn valid_rule_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && id.len() >= 3
        && chars.all(|c| c.is_ascii_digit())
}

pub struct Registry {
    builtins: Vec<Arc<dyn Rule>>,
    plugins: Vec<Arc<dyn Rule>>,
    by_id: HashMap<String, Arc<dyn Rule>>,
    generation: u64,
}

impl Registry {
    /// A registry holding every built-in rule. Identifier validation
    /// failures here are configuration errors, fatal before any scan.
    pub fn with_builtins() -> Result<Registry, RegistryError> {
        let mut registry = Registry {
            builtins: Vec::new(),
            plugins: Vec::new(),
            by_id: HashMap::new(),
            generation: 0,
        };
        for rule in builtin_rules() {
            registry.insert(rule, true)?;
        }
        Ok(registry)
    }

    /// Registers an external rule into the plugin overlay. Bumps the
    /// generation so derived caches know to rebuild.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        self.insert(rule, false)?;
        self.generation += 1;
        Ok(())
    }

    fn insert(&mut self, rule: Arc<dyn Rule>, builtin: bool) -> Result<(), RegistryError> {
        let id = rule.meta().id.clone();
        if !valid_rule_id(&id) || id != id.trim() {
            return Err(RegistryError::MalformedId(id));
        }
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.by_id.insert(id, Arc::clone(&rule));
        if builtin {
            self.builtins.push(rule);
        } else {
            self.plugins.push(rule);
        }
        Ok(())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.builtins.iter().chain(self.plugins.iter())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.by_id.get(id)
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.by_id.keys().cloned().collect()
    }

    pub fn metas(&self) -> Vec<&RuleMeta> {
        self.rules().map(|rule| rule.meta()).collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    let mut rules: Vec<Arc<dyn Rule>> = Vec::new();
    rules.extend(claude::rules());
    rules.extend(cursor::rules());
    rules.extend(copilot::rules());
    rules.extend(gemini::rules());
    rules.extend(generic::rules());
    rules.extend(polyglot::rules());
    rules.extend(crossfile::rules());
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dimension, Severity};

    struct FakeRule {
        meta: RuleMeta,
    }

    impl FakeRule {
        fn with_id(id: &str) -> Arc<dyn Rule> {
            Arc::new(FakeRule {
                meta: RuleMeta::new(id, "fake", Severity::Info, Dimension::Quality, None),
            })
        }
    }

    impl Rule for FakeRule {
        fn meta(&self) -> &RuleMeta {
            &self.meta
        }
    }

    #[test]
    fn builtins_load_and_ids_are_unique() {
        let registry = Registry::with_builtins().expect("builtins are valid");
        let ids = registry.ids();
        assert_eq!(ids.len(), registry.rules().count());
        for id in &ids {
            assert!(valid_rule_id(id), "builtin id {id} is malformed");
        }
        assert!(ids.contains("A03"));
        assert!(ids.contains("C03"));
        assert!(ids.contains("X04"));
    }

    #[test]
    fn plugin_registration_bumps_generation() {
        let mut registry = Registry::with_builtins().expect("builtins are valid");
        let before = registry.generation();
        registry
            .register(FakeRule::with_id("Z01"))
            .expect("fresh id registers");
        assert_eq!(registry.generation(), before + 1);
        assert!(registry.get("Z01").is_some());
    }

    #[test]
    fn collisions_and_malformed_ids_are_fatal() {
        let mut registry = Registry::with_builtins().expect("builtins are valid");
        assert!(matches!(
            registry.register(FakeRule::with_id("A03")),
            Err(RegistryError::DuplicateId(_))
        ));
        for bad in ["a03", "A3", "AB3", " A03", "A03 "] {
            assert!(matches!(
                registry.register(FakeRule::with_id(bad)),
                Err(RegistryError::MalformedId(_))
            ));
        }
    }
}

//! Network-filtering layer abstraction
//!
//! The host owns the installed ruleset. We only ever read the installed ids
//! and replace everything in one atomic update.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use ax_core::types::Rule;

/// Error type for rule installation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("Declarative filtering is not available in this environment")]
    Unavailable,
    #[error("{0}")]
    Rejected(String),
    #[error("Filtering backend error: {0}")]
    Backend(String),
}

/// The host's declarative filtering engine.
#[async_trait(?Send)]
pub trait RuleInstaller {
    /// Whether the host exposes dynamic rule updates at all.
    fn is_available(&self) -> bool;

    async fn installed_rule_ids(&self) -> Result<Vec<i64>, InstallError>;

    /// Remove `remove_ids` and add `add_rules` as one atomic update. On error
    /// nothing changes.
    async fn replace_rules(&self, remove_ids: &[i64], add_rules: &[Rule]) -> Result<(), InstallError>;
}

/// In-process filtering engine used by tests and the CLI.
#[derive(Debug)]
pub struct MemoryRuleInstaller {
    available: bool,
    max_rules: Option<usize>,
    rules: RefCell<BTreeMap<i64, Rule>>,
    updates: Cell<usize>,
}

impl Default for MemoryRuleInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRuleInstaller {
    pub fn new() -> Self {
        Self {
            available: true,
            max_rules: None,
            rules: RefCell::new(BTreeMap::new()),
            updates: Cell::new(0),
        }
    }

    /// An environment without dynamic rules.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Reject updates that would leave more than `max_rules` installed.
    pub fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = Some(max_rules);
        self
    }

    /// Install `rules` directly, bypassing validation.
    pub fn seed(&self, rules: impl IntoIterator<Item = Rule>) {
        let mut installed = self.rules.borrow_mut();
        for rule in rules {
            installed.insert(rule.id, rule);
        }
    }

    pub fn installed_ids(&self) -> Vec<i64> {
        self.rules.borrow().keys().copied().collect()
    }

    pub fn installed_rules(&self) -> Vec<Rule> {
        self.rules.borrow().values().cloned().collect()
    }

    /// Number of successful `replace_rules` calls.
    pub fn update_count(&self) -> usize {
        self.updates.get()
    }
}

#[async_trait(?Send)]
impl RuleInstaller for MemoryRuleInstaller {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn installed_rule_ids(&self) -> Result<Vec<i64>, InstallError> {
        if !self.available {
            return Err(InstallError::Unavailable);
        }
        Ok(self.installed_ids())
    }

    async fn replace_rules(&self, remove_ids: &[i64], add_rules: &[Rule]) -> Result<(), InstallError> {
        if !self.available {
            return Err(InstallError::Unavailable);
        }

        let mut next = self.rules.borrow().clone();
        for id in remove_ids {
            next.remove(id);
        }

        let mut seen = HashSet::with_capacity(add_rules.len());
        for rule in add_rules {
            if !seen.insert(rule.id) || next.contains_key(&rule.id) {
                return Err(InstallError::Rejected(format!(
                    "Rule with id {} does not have a unique ID.",
                    rule.id
                )));
            }
        }
        next.extend(add_rules.iter().map(|rule| (rule.id, rule.clone())));

        if let Some(max) = self.max_rules {
            if next.len() > max {
                return Err(InstallError::Rejected(format!(
                    "Dynamic rule count exceeded: {} > {}",
                    next.len(),
                    max
                )));
            }
        }

        *self.rules.borrow_mut() = next;
        self.updates.set(self.updates.get() + 1);
        Ok(())
    }
}

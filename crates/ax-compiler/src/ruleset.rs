//! Full ruleset compilation
//!
//! The installed ruleset is the user's custom rules followed by the generated
//! allow rules while blocking is enabled, and nothing at all while it is
//! disabled. Compilation is pure: the same inputs always give the same rules.

use ax_core::types::{Rule, RuleAction, RuleActionType, RuleCondition};

use crate::allowlist::build_allowlist_rules;
use crate::optimizer::sanitize_custom_rules;

/// Priority given to block rules created from a URL filter.
pub const CUSTOM_RULE_PRIORITY: i64 = 1;

/// A user block rule for `url_filter`.
pub fn custom_block_rule(id: i64, url_filter: &str) -> Rule {
    Rule {
        id,
        priority: CUSTOM_RULE_PRIORITY,
        action: RuleAction::new(RuleActionType::Block),
        condition: RuleCondition {
            url_filter: Some(url_filter.to_string()),
            ..RuleCondition::default()
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileStats {
    pub blocking_enabled: bool,
    pub custom_rules: usize,
    pub allow_rules: usize,
    /// Custom rules dropped for id conflicts
    pub dropped_rules: usize,
}

impl CompileStats {
    pub fn total(&self) -> usize {
        self.custom_rules + self.allow_rules
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRuleset {
    pub rules: Vec<Rule>,
    pub stats: CompileStats,
}

impl CompiledRuleset {
    pub fn rule_ids(&self) -> Vec<i64> {
        self.rules.iter().map(|rule| rule.id).collect()
    }
}

/// Compile the ruleset to install for one configuration snapshot.
pub fn compile_ruleset<S: AsRef<str>>(
    blocking_enabled: bool,
    custom_rules: &[Rule],
    whitelist: &[S],
) -> CompiledRuleset {
    if !blocking_enabled {
        return CompiledRuleset {
            rules: Vec::new(),
            stats: CompileStats::default(),
        };
    }

    let allow_rules = build_allowlist_rules(whitelist);

    let mut custom = custom_rules.to_vec();
    let sanitize = sanitize_custom_rules(&mut custom, allow_rules.len());

    let stats = CompileStats {
        blocking_enabled,
        custom_rules: sanitize.after,
        allow_rules: allow_rules.len(),
        dropped_rules: sanitize.before - sanitize.after,
    };

    let mut rules = custom;
    rules.extend(allow_rules);

    CompiledRuleset { rules, stats }
}

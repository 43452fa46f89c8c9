//! Allowlist rule generation
//!
//! Every allowlisted domain becomes one `allowAllRequests` rule scoped to that
//! initiator and covering every resource type, so an allowlisted site is
//! exempt from blocking as a whole and not just for top-level navigation.

use ax_core::domain::normalize_domains;
use ax_core::types::{ResourceType, Rule, RuleAction, RuleActionType, RuleCondition};

/// First id of the reserved range used by generated allow rules.
pub const ALLOW_RULE_ID_OFFSET: i64 = 200_000;

/// Priority of generated allow rules; above ordinary block rules.
pub const ALLOW_RULE_PRIORITY: i64 = 1000;

/// Resource types every allow rule covers.
pub const ALLOW_RULE_RESOURCE_TYPES: &[ResourceType] = &[
    ResourceType::MainFrame,
    ResourceType::SubFrame,
    ResourceType::Xmlhttprequest,
    ResourceType::Script,
    ResourceType::Image,
    ResourceType::Media,
    ResourceType::Font,
    ResourceType::Stylesheet,
    ResourceType::Ping,
    ResourceType::Other,
];

/// Id assigned to the allow rule for the `index`-th allowlisted domain.
#[inline]
pub fn allow_rule_id(index: usize) -> i64 {
    ALLOW_RULE_ID_OFFSET + index as i64
}

/// Is `id` inside the range generated for an allowlist of `len` domains?
#[inline]
pub fn is_generated_allow_id(id: i64, len: usize) -> bool {
    id >= ALLOW_RULE_ID_OFFSET && id < allow_rule_id(len)
}

/// Build one allow rule per distinct allowlisted domain.
///
/// Entries are normalized first; empties and duplicates are dropped, and ids
/// follow first-occurrence order.
pub fn build_allowlist_rules<S: AsRef<str>>(whitelist: &[S]) -> Vec<Rule> {
    normalize_domains(whitelist)
        .into_iter()
        .enumerate()
        .map(|(index, domain)| allow_rule(index, domain))
        .collect()
}

fn allow_rule(index: usize, domain: String) -> Rule {
    Rule {
        id: allow_rule_id(index),
        priority: ALLOW_RULE_PRIORITY,
        action: RuleAction::new(RuleActionType::AllowAllRequests),
        condition: RuleCondition {
            initiator_domains: Some(vec![domain]),
            resource_types: Some(ALLOW_RULE_RESOURCE_TYPES.to_vec()),
            ..RuleCondition::default()
        },
    }
}

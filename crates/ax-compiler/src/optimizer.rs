use std::collections::HashSet;

use ax_core::types::Rule;

use crate::allowlist::is_generated_allow_id;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub before: usize,
    pub after: usize,
    pub duplicate_ids: usize,
    pub reserved_ids: usize,
}

/// Drop custom rules the network layer would reject as a batch: ids taken by
/// the generated allow rules, and repeats of an earlier custom rule's id.
pub fn sanitize_custom_rules(rules: &mut Vec<Rule>, allow_rule_count: usize) -> SanitizeStats {
    let before = rules.len();

    let mut reserved_ids = 0usize;
    rules.retain(|rule| {
        if is_generated_allow_id(rule.id, allow_rule_count) {
            log::warn!("Dropping custom rule {}: id is reserved for allowlist rules", rule.id);
            reserved_ids += 1;
            false
        } else {
            true
        }
    });

    let mut seen: HashSet<i64> = HashSet::new();
    let mut duplicate_ids = 0usize;
    rules.retain(|rule| {
        if seen.insert(rule.id) {
            true
        } else {
            log::warn!("Dropping custom rule {}: duplicate id", rule.id);
            duplicate_ids += 1;
            false
        }
    });

    let after = rules.len();

    SanitizeStats {
        before,
        after,
        duplicate_ids,
        reserved_ids,
    }
}

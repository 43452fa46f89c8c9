//! AdShield-X Ruleset Compiler
//!
//! This crate turns a configuration snapshot (enabled flag, custom rules,
//! allowlist) into the declarative ruleset installed in the browser.

pub mod allowlist;
pub mod optimizer;
pub mod ruleset;

pub use allowlist::{build_allowlist_rules, ALLOW_RULE_ID_OFFSET, ALLOW_RULE_PRIORITY};
pub use optimizer::{sanitize_custom_rules, SanitizeStats};
pub use ruleset::{compile_ruleset, custom_block_rule, CompileStats, CompiledRuleset};

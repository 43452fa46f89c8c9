//! AdShield-X Core Library
//!
//! This crate holds the I/O-free pieces of the AdShield-X content blocker:
//! the shared rule and log types, domain normalization, allowlist matching and
//! the page engine run by the content script.
//!
//! # Modules
//!
//! - `types`: Declarative rule and blocked-log types
//! - `domain`: Domain normalization for allowlist entries
//! - `url`: Hostname extraction
//! - `allowlist`: Exact/subdomain allowlist matching
//! - `blocked_log`: Bounded newest-first log of blocked requests
//! - `page`: Page Mutation Engine and its DOM capability traits

pub mod allowlist;
pub mod blocked_log;
pub mod domain;
pub mod page;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use allowlist::{hostname_matches_allowlist, Allowlist};
pub use blocked_log::{BlockedLog, BLOCKED_LOG_CAPACITY};
pub use domain::{normalize_domain, normalize_domains};
pub use types::{BlockedLogEntry, ResourceType, Rule, RuleAction, RuleActionType, RuleCondition};
pub use url::hostname;

//! Core type definitions for AdShield-X
//!
//! These types mirror the declarative network request rule layout handed to the
//! browser and the records kept in extension storage. Unknown rule fields are
//! carried through untouched so user rules reach the network layer as written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Resource Types
// =============================================================================

/// Resource type a declarative rule condition can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Object,
    Xmlhttprequest,
    Ping,
    CspReport,
    Media,
    Websocket,
    Webtransport,
    Webbundle,
    Other,
}

impl ResourceType {
    /// Browser-facing name of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainFrame => "main_frame",
            Self::SubFrame => "sub_frame",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Image => "image",
            Self::Font => "font",
            Self::Object => "object",
            Self::Xmlhttprequest => "xmlhttprequest",
            Self::Ping => "ping",
            Self::CspReport => "csp_report",
            Self::Media => "media",
            Self::Websocket => "websocket",
            Self::Webtransport => "webtransport",
            Self::Webbundle => "webbundle",
            Self::Other => "other",
        }
    }

    /// Parse from the browser resource type string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main_frame" => Some(Self::MainFrame),
            "sub_frame" => Some(Self::SubFrame),
            "stylesheet" => Some(Self::Stylesheet),
            "script" => Some(Self::Script),
            "image" => Some(Self::Image),
            "font" => Some(Self::Font),
            "object" => Some(Self::Object),
            "xmlhttprequest" => Some(Self::Xmlhttprequest),
            "ping" => Some(Self::Ping),
            "csp_report" => Some(Self::CspReport),
            "media" => Some(Self::Media),
            "websocket" => Some(Self::Websocket),
            "webtransport" => Some(Self::Webtransport),
            "webbundle" => Some(Self::Webbundle),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

// =============================================================================
// Rule Actions
// =============================================================================

/// Action type of a declarative rule.
///
/// Types this crate does not know about are kept verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleActionType {
    /// Cancels the request
    Block,
    /// Lets the request through, overriding lower-priority block rules
    Allow,
    /// Allows the document and every request it initiates
    AllowAllRequests,
    Redirect,
    UpgradeScheme,
    ModifyHeaders,
    Custom(String),
}

impl RuleActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Block => "block",
            Self::Allow => "allow",
            Self::AllowAllRequests => "allowAllRequests",
            Self::Redirect => "redirect",
            Self::UpgradeScheme => "upgradeScheme",
            Self::ModifyHeaders => "modifyHeaders",
            Self::Custom(other) => other,
        }
    }
}

impl From<String> for RuleActionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "block" => Self::Block,
            "allow" => Self::Allow,
            "allowAllRequests" => Self::AllowAllRequests,
            "redirect" => Self::Redirect,
            "upgradeScheme" => Self::UpgradeScheme,
            "modifyHeaders" => Self::ModifyHeaders,
            _ => Self::Custom(value),
        }
    }
}

impl From<RuleActionType> for String {
    fn from(value: RuleActionType) -> Self {
        match value {
            RuleActionType::Custom(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Action half of a declarative rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: RuleActionType,
    /// Action payload this crate does not interpret (redirect targets, headers)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RuleAction {
    pub fn new(action_type: RuleActionType) -> Self {
        Self {
            action_type,
            extra: Map::new(),
        }
    }
}

// =============================================================================
// Rule Conditions
// =============================================================================

/// Condition half of a declarative rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<ResourceType>>,
    /// Condition keys this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Rules
// =============================================================================

/// Priority the browser assumes when a rule omits it.
pub const DEFAULT_RULE_PRIORITY: i64 = 1;

fn default_priority() -> i64 {
    DEFAULT_RULE_PRIORITY
}

/// A declarative network filtering rule. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub action: RuleAction,
    #[serde(default)]
    pub condition: RuleCondition,
}

// =============================================================================
// Blocked Log
// =============================================================================

/// One suppressed request, as recorded in the local blocked log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct BlockedLogEntry {
    /// ISO-8601 timestamp of the match
    pub time: String,
    pub url: String,
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub rule_id: i64,
    pub tab_id: i32,
}

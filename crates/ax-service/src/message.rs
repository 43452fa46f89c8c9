//! Messaging protocol
//!
//! Requests are JSON objects tagged by `type`. Responses carry no tag; their
//! shape depends on the request they answer.

use ax_core::types::BlockedLogEntry;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const STATUS_BLOCKING_ENABLED: &str = "Blocking enabled";
pub const STATUS_BLOCKING_DISABLED: &str = "Blocking disabled";
pub const STATUS_RULES_ADDED: &str = "Rules synced after addition";
pub const STATUS_RULES_REMOVED: &str = "Rules synced after removal";
pub const STATUS_RULES_SYNCHRONIZED: &str = "Rules synchronized";
pub const STATUS_ALIVE: &str = "Service worker active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum Request {
    GetBlockingStatus,
    ShouldBlockPage {
        #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    GetBlockedLog,
    ToggleBlocking {
        enabled: bool,
    },
    AddDnrRules {
        rules: Vec<Value>,
    },
    RemoveDnrRules {
        #[serde(rename = "ruleIds")]
        rule_ids: Vec<Value>,
    },
    SyncDynamicRules,
    Ping,
}

impl Request {
    /// Parse an incoming message. Unknown types and missing required fields
    /// give `None`; such messages get no reply.
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(request) => Some(request),
            Err(e) => {
                log::debug!("Ignoring message {}: {}", value, e);
                None
            }
        }
    }

    /// The wire name of this request type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetBlockingStatus => "GET_BLOCKING_STATUS",
            Self::ShouldBlockPage { .. } => "SHOULD_BLOCK_PAGE",
            Self::GetBlockedLog => "GET_BLOCKED_LOG",
            Self::ToggleBlocking { .. } => "TOGGLE_BLOCKING",
            Self::AddDnrRules { .. } => "ADD_DNR_RULES",
            Self::RemoveDnrRules { .. } => "REMOVE_DNR_RULES",
            Self::SyncDynamicRules => "SYNC_DYNAMIC_RULES",
            Self::Ping => "PING",
        }
    }
}

/// Non-string urls read as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum Response {
    BlockingStatus {
        enabled: bool,
    },
    ShouldBlock {
        #[serde(rename = "shouldBlock")]
        should_block: bool,
    },
    BlockedLog {
        log: Vec<BlockedLogEntry>,
    },
    RulesSynced {
        status: String,
        rules: Vec<Value>,
    },
    RuleIdsSynced {
        status: String,
        #[serde(rename = "ruleIds")]
        rule_ids: Vec<Value>,
    },
    Status {
        status: String,
    },
}

impl Response {
    pub fn status(status: &str) -> Self {
        Self::Status {
            status: status.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

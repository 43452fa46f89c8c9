//! Blocked-request recorder
//!
//! Observes rule-match debug events from the filtering layer and appends the
//! ones on non-allowlisted hosts to the blocked log.

use ax_core::types::BlockedLogEntry;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::config::ConfigRepository;
use crate::log_store::BlockedLogStore;
use crate::storage::Storage;

/// Tab id reported for requests not tied to a tab.
pub const NO_TAB_ID: i32 = -1;

/// One matched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub url: String,
    pub rule_id: i64,
    pub tab_id: i32,
}

impl RuleMatch {
    /// Read the host's debug event: `{request: {url, tabId}, rule: {ruleId}}`.
    /// Events without a url or rule id give `None`.
    pub fn from_debug_event(event: &Value) -> Option<Self> {
        let request = event.get("request")?;
        let url = request.get("url")?.as_str()?.to_string();
        let rule_id = event.get("rule")?.get("ruleId")?.as_i64()?;
        let tab_id = request
            .get("tabId")
            .or_else(|| event.get("tabId"))
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .unwrap_or(NO_TAB_ID);

        Some(Self { url, rule_id, tab_id })
    }

    pub fn into_entry(self, time: String) -> BlockedLogEntry {
        BlockedLogEntry {
            time,
            url: self.url,
            rule_id: self.rule_id,
            tab_id: self.tab_id,
        }
    }
}

pub struct MatchRecorder<S> {
    config: ConfigRepository<S>,
    log: BlockedLogStore<S>,
}

impl<S> Clone for MatchRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            log: self.log.clone(),
        }
    }
}

impl<S: Storage> MatchRecorder<S> {
    pub fn new(config: ConfigRepository<S>, log: BlockedLogStore<S>) -> Self {
        Self { config, log }
    }

    /// Log `matched` unless its host is allowlisted. Returns whether an entry
    /// was written.
    pub async fn record(&self, matched: RuleMatch) -> bool {
        let whitelist = match self.config.whitelist().await {
            Ok(whitelist) => whitelist,
            Err(e) => {
                log::warn!("Failed to read allowlist, not logging match: {}", e);
                return false;
            }
        };
        if whitelist.matches_url(&matched.url) {
            return false;
        }

        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match self.log.append(matched.into_entry(time)).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Failed to store blocked request: {}", e);
                false
            }
        }
    }

    pub async fn record_event(&self, event: &Value) -> bool {
        match RuleMatch::from_debug_event(event) {
            Some(matched) => self.record(matched).await,
            None => {
                log::debug!("Ignoring malformed rule match event {}", event);
                false
            }
        }
    }
}

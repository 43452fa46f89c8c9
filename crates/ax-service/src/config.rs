//! Configuration repository
//!
//! The configuration lives in the synced store under three keys. Reads are
//! lenient: anything malformed falls back to the default for that key so a
//! bad write from another device can never stop the blocker.

use std::rc::Rc;

use ax_compiler::{compile_ruleset, custom_block_rule, CompiledRuleset};
use ax_core::allowlist::Allowlist;
use ax_core::domain::normalize_domain;
use ax_core::types::Rule;
use futures::channel::mpsc::UnboundedReceiver;
use futures::lock::Mutex;
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::storage::{Storage, StorageArea, StorageChange, StorageError};

pub const BLOCKING_ENABLED_KEY: &str = "blockingEnabled";
pub const CUSTOM_RULES_KEY: &str = "customRules";
pub const WHITELIST_KEY: &str = "whitelist";

/// Synced keys that make up the configuration.
pub const CONFIG_KEYS: &[&str] = &[BLOCKING_ENABLED_KEY, CUSTOM_RULES_KEY, WHITELIST_KEY];

/// One snapshot of the user configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub blocking_enabled: bool,
    pub custom_rules: Vec<Rule>,
    pub whitelist: Allowlist,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            custom_rules: Vec::new(),
            whitelist: Allowlist::default(),
        }
    }
}

impl Config {
    /// Parse the stored layout. Blocking stays enabled unless the flag is
    /// literally `false`; non-array lists read as empty.
    pub fn from_items(items: &Map<String, Value>) -> Self {
        Self {
            blocking_enabled: parse_enabled(items.get(BLOCKING_ENABLED_KEY)),
            custom_rules: parse_custom_rules(items.get(CUSTOM_RULES_KEY)),
            whitelist: Allowlist::new(string_entries(items.get(WHITELIST_KEY))),
        }
    }

    /// The stored layout for this snapshot.
    pub fn to_items(&self) -> Map<String, Value> {
        let mut items = Map::new();
        items.insert(BLOCKING_ENABLED_KEY.to_string(), Value::Bool(self.blocking_enabled));
        items.insert(
            CUSTOM_RULES_KEY.to_string(),
            serde_json::to_value(&self.custom_rules).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        items.insert(
            WHITELIST_KEY.to_string(),
            Value::Array(self.whitelist.domains().iter().cloned().map(Value::String).collect()),
        );
        items
    }

    /// Ruleset to install for this snapshot.
    pub fn compile(&self) -> CompiledRuleset {
        compile_ruleset(self.blocking_enabled, &self.custom_rules, self.whitelist.domains())
    }

    /// `enabled AND NOT allowlisted(hostname(url))`.
    pub fn should_block_url(&self, url: &str) -> bool {
        self.blocking_enabled && !self.whitelist.matches_url(url)
    }
}

fn parse_enabled(value: Option<&Value>) -> bool {
    !matches!(value, Some(Value::Bool(false)))
}

fn parse_custom_rules(value: Option<&Value>) -> Vec<Rule> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Rule>(entry.clone()) {
            Ok(rule) => Some(rule),
            Err(e) => {
                log::warn!("Skipping malformed custom rule {}: {}", entry, e);
                None
            }
        })
        .collect()
}

fn string_entries(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn array_entries(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Typed access to the configuration keys of a `Storage`. The list edits
/// (`add_*`/`remove_*`) are read-modify-write and run one at a time across
/// clones.
pub struct ConfigRepository<S> {
    storage: Rc<S>,
    editing: Rc<Mutex<()>>,
}

impl<S> Clone for ConfigRepository<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Rc::clone(&self.storage),
            editing: Rc::clone(&self.editing),
        }
    }
}

impl<S: Storage> ConfigRepository<S> {
    pub fn new(storage: Rc<S>) -> Self {
        Self {
            storage,
            editing: Rc::new(Mutex::new(())),
        }
    }

    pub fn storage(&self) -> &Rc<S> {
        &self.storage
    }

    pub async fn load(&self) -> Result<Config, StorageError> {
        let items = self.storage.get(StorageArea::Sync, CONFIG_KEYS).await?;
        Ok(Config::from_items(&items))
    }

    /// Load, falling back to the defaults (blocking enabled, empty lists).
    pub async fn load_or_default(&self) -> Config {
        match self.load().await {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to read configuration, using defaults: {}", e);
                Config::default()
            }
        }
    }

    pub async fn whitelist(&self) -> Result<Allowlist, StorageError> {
        let items = self.storage.get(StorageArea::Sync, &[WHITELIST_KEY]).await?;
        Ok(Allowlist::new(string_entries(items.get(WHITELIST_KEY))))
    }

    pub async fn set_blocking_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.write(BLOCKING_ENABLED_KEY, Value::Bool(enabled)).await
    }

    pub async fn set_custom_rules(&self, rules: &[Rule]) -> Result<(), StorageError> {
        let value = serde_json::to_value(rules).map_err(|e| StorageError::Malformed {
            key: CUSTOM_RULES_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.write(CUSTOM_RULES_KEY, value).await
    }

    pub async fn set_whitelist(&self, domains: &[String]) -> Result<(), StorageError> {
        let value = Value::Array(domains.iter().cloned().map(Value::String).collect());
        self.write(WHITELIST_KEY, value).await
    }

    /// Append a block rule for `url_filter` with a fresh timestamp id.
    /// Blank filters are ignored.
    pub async fn add_custom_rule(&self, url_filter: &str) -> Result<Option<Rule>, StorageError> {
        let url_filter = url_filter.trim();
        if url_filter.is_empty() {
            return Ok(None);
        }

        let _editing = self.editing.lock().await;
        let items = self.storage.get(StorageArea::Sync, &[CUSTOM_RULES_KEY]).await?;
        let mut entries = array_entries(items.get(CUSTOM_RULES_KEY));

        let max_id = entries.iter().filter_map(|e| e.get("id").and_then(Value::as_i64)).max();
        let now = chrono::Utc::now().timestamp_millis();
        let id = match max_id {
            Some(max) if max >= now => max.checked_add(1).ok_or_else(|| StorageError::Malformed {
                key: CUSTOM_RULES_KEY.to_string(),
                reason: format!("no rule id left after {}", max),
            })?,
            _ => now,
        };

        let rule = custom_block_rule(id, url_filter);
        let value = serde_json::to_value(&rule).map_err(|e| StorageError::Malformed {
            key: CUSTOM_RULES_KEY.to_string(),
            reason: e.to_string(),
        })?;
        entries.push(value);

        self.write(CUSTOM_RULES_KEY, Value::Array(entries)).await?;
        Ok(Some(rule))
    }

    /// Remove every custom rule with `id`. Returns whether anything was removed.
    pub async fn remove_custom_rule(&self, id: i64) -> Result<bool, StorageError> {
        let _editing = self.editing.lock().await;
        let items = self.storage.get(StorageArea::Sync, &[CUSTOM_RULES_KEY]).await?;
        let mut entries = array_entries(items.get(CUSTOM_RULES_KEY));

        let before = entries.len();
        entries.retain(|entry| entry.get("id").and_then(Value::as_i64) != Some(id));
        if entries.len() == before {
            return Ok(false);
        }

        self.write(CUSTOM_RULES_KEY, Value::Array(entries)).await?;
        Ok(true)
    }

    /// Normalize `raw` and append it to the allowlist unless it is empty or
    /// already present. Returns the stored domain when one was added.
    pub async fn add_whitelist_domain(&self, raw: &str) -> Result<Option<String>, StorageError> {
        let domain = normalize_domain(raw);
        if domain.is_empty() {
            return Ok(None);
        }

        let _editing = self.editing.lock().await;
        let items = self.storage.get(StorageArea::Sync, &[WHITELIST_KEY]).await?;
        let mut entries = array_entries(items.get(WHITELIST_KEY));
        if entries.iter().any(|entry| entry.as_str() == Some(domain.as_str())) {
            return Ok(None);
        }

        entries.push(Value::String(domain.clone()));
        self.write(WHITELIST_KEY, Value::Array(entries)).await?;
        Ok(Some(domain))
    }

    /// Remove `domain` from the allowlist. Returns whether it was present.
    pub async fn remove_whitelist_domain(&self, domain: &str) -> Result<bool, StorageError> {
        let _editing = self.editing.lock().await;
        let items = self.storage.get(StorageArea::Sync, &[WHITELIST_KEY]).await?;
        let mut entries = array_entries(items.get(WHITELIST_KEY));

        let before = entries.len();
        entries.retain(|entry| entry.as_str() != Some(domain));
        if entries.len() == before {
            return Ok(false);
        }

        self.write(WHITELIST_KEY, Value::Array(entries)).await?;
        Ok(true)
    }

    /// Configuration changes made after this call.
    pub fn subscribe(&self) -> ConfigChanges {
        ConfigChanges {
            rx: self.storage.subscribe(),
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        self.storage.set(StorageArea::Sync, items).await
    }
}

// =============================================================================
// Change Subscription
// =============================================================================

/// Stream of storage changes that touch the configuration keys.
pub struct ConfigChanges {
    rx: UnboundedReceiver<StorageChange>,
}

impl ConfigChanges {
    fn is_config_change(change: &StorageChange) -> bool {
        change.touches(StorageArea::Sync, CONFIG_KEYS)
    }

    /// Wait for the next configuration change. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<StorageChange> {
        while let Some(change) = self.rx.next().await {
            if Self::is_config_change(&change) {
                return Some(change);
            }
        }
        None
    }

    /// Consume every configuration change already queued, returning how many
    /// there were.
    pub fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(Some(change)) = self.rx.try_next() {
            if Self::is_config_change(&change) {
                drained += 1;
            }
        }
        drained
    }
}

//! Key-value storage abstraction
//!
//! The browser offers two areas: `sync` (shared across the user's devices,
//! holds the configuration) and `local` (this device only, holds the blocked
//! log). Values are JSON. Writers are notified of changed keys through
//! `subscribe`, mirroring the host's storage change event.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use serde_json::{Map, Value};

/// Storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Sync,
    Local,
}

impl StorageArea {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sync" => Some(Self::Sync),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Keys whose values changed in one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub area: StorageArea,
    pub keys: Vec<String>,
}

impl StorageChange {
    /// Did this change touch any of `keys` in `area`?
    pub fn touches(&self, area: StorageArea, keys: &[&str]) -> bool {
        self.area == area && self.keys.iter().any(|k| keys.contains(&k.as_str()))
    }
}

/// Error type for storage access.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage is not available in this environment")]
    Unavailable,
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Malformed value for '{key}': {reason}")]
    Malformed { key: String, reason: String },
}

/// Asynchronous key-value store with change notifications.
#[async_trait(?Send)]
pub trait Storage {
    /// Read `keys` from `area`. Missing keys are absent from the result.
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StorageError>;

    /// Write `items` into `area`.
    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StorageError>;

    /// Receive every change made after this call.
    fn subscribe(&self) -> UnboundedReceiver<StorageChange>;
}

/// In-process store used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    areas: RefCell<HashMap<StorageArea, Map<String, Value>>>,
    subscribers: RefCell<Vec<UnboundedSender<StorageChange>>>,
    fail_writes: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` without notifying subscribers.
    pub fn insert(&self, area: StorageArea, key: &str, value: Value) {
        self.areas
            .borrow_mut()
            .entry(area)
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn value(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.areas.borrow().get(&area).and_then(|items| items.get(key).cloned())
    }

    /// Make every subsequent `set` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn notify(&self, change: StorageChange) {
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(change.clone()).is_ok());
    }
}

#[async_trait(?Send)]
impl Storage for MemoryStorage {
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let areas = self.areas.borrow();
        let mut result = Map::new();
        if let Some(items) = areas.get(&area) {
            for key in keys {
                if let Some(value) = items.get(*key) {
                    result.insert((*key).to_string(), value.clone());
                }
            }
        }
        Ok(result)
    }

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Backend(format!("write to {} refused", area.as_str())));
        }

        let mut changed = Vec::new();
        {
            let mut areas = self.areas.borrow_mut();
            let stored = areas.entry(area).or_default();
            for (key, value) in items {
                if stored.get(&key) != Some(&value) {
                    changed.push(key.clone());
                    stored.insert(key, value);
                }
            }
        }

        if !changed.is_empty() {
            self.notify(StorageChange { area, keys: changed });
        }
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<StorageChange> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx
    }
}

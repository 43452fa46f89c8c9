//! Test doubles that suspend between reading and writing the way the
//! browser's storage and declarative filtering APIs do. A read returns the
//! state at call time; a write lands only after the caller yields.

use async_trait::async_trait;
use ax_core::types::Rule;
use futures::channel::mpsc::UnboundedReceiver;
use serde_json::{Map, Value};

use crate::network::{InstallError, MemoryRuleInstaller, RuleInstaller};
use crate::storage::{MemoryStorage, Storage, StorageArea, StorageChange, StorageError};

#[derive(Default)]
pub struct YieldingStorage {
    inner: MemoryStorage,
}

impl YieldingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }
}

#[async_trait(?Send)]
impl Storage for YieldingStorage {
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let items = self.inner.get(area, keys).await;
        tokio::task::yield_now().await;
        items
    }

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.set(area, items).await
    }

    fn subscribe(&self) -> UnboundedReceiver<StorageChange> {
        self.inner.subscribe()
    }
}

#[derive(Default)]
pub struct YieldingInstaller {
    inner: MemoryRuleInstaller,
}

impl YieldingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryRuleInstaller {
        &self.inner
    }
}

#[async_trait(?Send)]
impl RuleInstaller for YieldingInstaller {
    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn installed_rule_ids(&self) -> Result<Vec<i64>, InstallError> {
        let ids = self.inner.installed_rule_ids().await;
        tokio::task::yield_now().await;
        ids
    }

    /// Duplicate ids are checked against the rules installed when the update
    /// lands, not when it was requested.
    async fn replace_rules(&self, remove_ids: &[i64], add_rules: &[Rule]) -> Result<(), InstallError> {
        tokio::task::yield_now().await;
        self.inner.replace_rules(remove_ids, add_rules).await
    }
}

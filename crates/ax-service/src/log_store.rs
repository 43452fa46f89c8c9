//! Persisted blocked-request log
//!
//! Lives in the local store under `blockedLog`, newest first, capped at
//! `BLOCKED_LOG_CAPACITY` entries. Appends are read-modify-write on the
//! store, so clones of one `BlockedLogStore` take turns.

use std::rc::Rc;

use ax_core::blocked_log::BlockedLog;
use ax_core::types::BlockedLogEntry;
use futures::lock::Mutex;
use serde_json::{Map, Value};

use crate::storage::{Storage, StorageArea, StorageError};

pub const BLOCKED_LOG_KEY: &str = "blockedLog";

pub struct BlockedLogStore<S> {
    storage: Rc<S>,
    appending: Rc<Mutex<()>>,
}

impl<S> Clone for BlockedLogStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Rc::clone(&self.storage),
            appending: Rc::clone(&self.appending),
        }
    }
}

impl<S: Storage> BlockedLogStore<S> {
    pub fn new(storage: Rc<S>) -> Self {
        Self {
            storage,
            appending: Rc::new(Mutex::new(())),
        }
    }

    /// The stored log. Entries that fail to parse are skipped.
    pub async fn load(&self) -> Result<BlockedLog, StorageError> {
        let items = self.storage.get(StorageArea::Local, &[BLOCKED_LOG_KEY]).await?;
        let entries = match items.get(BLOCKED_LOG_KEY) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|value| serde_json::from_value::<BlockedLogEntry>(value.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(BlockedLog::from_entries(entries))
    }

    /// Prepend `entry`, dropping the oldest entries past capacity.
    pub async fn append(&self, entry: BlockedLogEntry) -> Result<BlockedLog, StorageError> {
        let _appending = self.appending.lock().await;
        let mut log = self.load().await?;
        log.push(entry);

        let value = serde_json::to_value(&log).map_err(|e| StorageError::Malformed {
            key: BLOCKED_LOG_KEY.to_string(),
            reason: e.to_string(),
        })?;
        let mut items = Map::new();
        items.insert(BLOCKED_LOG_KEY.to_string(), value);
        self.storage.set(StorageArea::Local, items).await?;
        Ok(log)
    }
}

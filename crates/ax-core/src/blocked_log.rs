//! Bounded, newest-first record of suppressed requests.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::BlockedLogEntry;

/// Maximum number of entries kept in the blocked log.
pub const BLOCKED_LOG_CAPACITY: usize = 100;

/// Ring of blocked requests, newest first. Serializes as a plain array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedLog(VecDeque<BlockedLogEntry>);

impl BlockedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored entries (newest first), dropping anything past capacity.
    pub fn from_entries(entries: Vec<BlockedLogEntry>) -> Self {
        let mut log = Self(entries.into());
        log.0.truncate(BLOCKED_LOG_CAPACITY);
        log
    }

    /// Record a new entry at the front, evicting the oldest past capacity.
    pub fn push(&mut self, entry: BlockedLogEntry) {
        self.0.push_front(entry);
        self.0.truncate(BLOCKED_LOG_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn newest(&self) -> Option<&BlockedLogEntry> {
        self.0.front()
    }

    pub fn oldest(&self) -> Option<&BlockedLogEntry> {
        self.0.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockedLogEntry> {
        self.0.iter()
    }

    pub fn into_entries(self) -> Vec<BlockedLogEntry> {
        self.0.into()
    }
}

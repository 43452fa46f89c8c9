//! AdShield-X Background Service
//!
//! Host-independent core of the background process: the configuration
//! repository, the ruleset synchronizer, the messaging endpoint and the
//! blocked-request recorder. Host capabilities (storage, declarative
//! filtering) are reached only through the `Storage` and `RuleInstaller`
//! traits so the same logic runs in the browser and in tests.

pub mod background;
pub mod config;
pub mod endpoint;
pub mod log_store;
pub mod message;
pub mod network;
pub mod recorder;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod testing;

pub use background::{Background, ConfigWatcher};
pub use config::{Config, ConfigChanges, ConfigRepository};
pub use endpoint::{Dispatch, Endpoint};
pub use log_store::{BlockedLogStore, BLOCKED_LOG_KEY};
pub use message::{Request, Response};
pub use network::{InstallError, MemoryRuleInstaller, RuleInstaller};
pub use recorder::{MatchRecorder, RuleMatch};
pub use storage::{MemoryStorage, Storage, StorageArea, StorageChange, StorageError};
pub use sync::{RulesetSynchronizer, SyncOutcome};

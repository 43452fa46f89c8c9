//! Ruleset synchronization
//!
//! One pass reads the configuration, reads the installed ids, compiles the
//! ruleset and replaces everything installed with it in a single update.
//! Passes run one at a time; a pass started while another is in flight waits
//! for it and then reads the configuration afresh. A pass never fails from
//! the caller's point of view: problems are logged and reported in the
//! returned `SyncOutcome`.

use std::cell::Cell;
use std::rc::Rc;

use futures::lock::Mutex;

use crate::config::ConfigRepository;
use crate::network::{InstallError, RuleInstaller};
use crate::storage::Storage;

/// Result of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The installed ruleset now equals the compiled one.
    Applied { removed: usize, added: usize },
    /// The host has no dynamic rules; nothing was done.
    Unavailable,
    /// The configuration could not be read; nothing was changed.
    StorageFailed(String),
    /// The host refused the update; the previous ruleset stays installed.
    Rejected(String),
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct RulesetSynchronizer<S, N> {
    config: ConfigRepository<S>,
    installer: Rc<N>,
    warned_unavailable: Cell<bool>,
    running: Mutex<()>,
}

impl<S: Storage, N: RuleInstaller> RulesetSynchronizer<S, N> {
    pub fn new(config: ConfigRepository<S>, installer: Rc<N>) -> Self {
        Self {
            config,
            installer,
            warned_unavailable: Cell::new(false),
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConfigRepository<S> {
        &self.config
    }

    /// Make the installed ruleset match the stored configuration.
    pub async fn sync(&self) -> SyncOutcome {
        if !self.installer.is_available() {
            return self.unavailable();
        }

        // The installed ids read below must still be installed when the
        // replace lands.
        let _running = self.running.lock().await;

        let config = match self.config.load().await {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to sync dynamic rules: {}", e);
                return SyncOutcome::StorageFailed(e.to_string());
            }
        };

        let remove_ids = match self.installer.installed_rule_ids().await {
            Ok(ids) => ids,
            Err(e) => return self.failed(e),
        };

        let compiled = config.compile();
        log::debug!(
            "Replacing {} installed rules with {} ({} custom, {} allow)",
            remove_ids.len(),
            compiled.stats.total(),
            compiled.stats.custom_rules,
            compiled.stats.allow_rules
        );

        match self.installer.replace_rules(&remove_ids, &compiled.rules).await {
            Ok(()) => SyncOutcome::Applied {
                removed: remove_ids.len(),
                added: compiled.rules.len(),
            },
            Err(e) => self.failed(e),
        }
    }

    fn failed(&self, error: InstallError) -> SyncOutcome {
        match error {
            InstallError::Unavailable => self.unavailable(),
            other => {
                log::warn!("Failed to sync dynamic rules: {}", other);
                SyncOutcome::Rejected(other.to_string())
            }
        }
    }

    fn unavailable(&self) -> SyncOutcome {
        if !self.warned_unavailable.replace(true) {
            log::warn!("Dynamic rules are not available; skipping ruleset sync");
        }
        SyncOutcome::Unavailable
    }
}

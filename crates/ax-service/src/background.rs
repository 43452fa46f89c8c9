//! Background process wiring
//!
//! Owns the shared synchronizer, endpoint and recorder, and runs the passes
//! triggered by install, startup and configuration changes.

use std::rc::Rc;

use crate::config::{ConfigChanges, ConfigRepository};
use crate::endpoint::Endpoint;
use crate::log_store::BlockedLogStore;
use crate::network::RuleInstaller;
use crate::recorder::MatchRecorder;
use crate::storage::Storage;
use crate::sync::{RulesetSynchronizer, SyncOutcome};

pub struct Background<S, N> {
    sync: Rc<RulesetSynchronizer<S, N>>,
    endpoint: Endpoint<S, N>,
    recorder: MatchRecorder<S>,
}

impl<S: Storage + 'static, N: RuleInstaller + 'static> Background<S, N> {
    pub fn new(storage: Rc<S>, installer: Rc<N>) -> Self {
        let log = BlockedLogStore::new(Rc::clone(&storage));
        let config = ConfigRepository::new(storage);
        let sync = Rc::new(RulesetSynchronizer::new(config.clone(), installer));
        let endpoint = Endpoint::new(Rc::clone(&sync), log.clone());
        let recorder = MatchRecorder::new(config, log);
        Self {
            sync,
            endpoint,
            recorder,
        }
    }

    pub fn endpoint(&self) -> &Endpoint<S, N> {
        &self.endpoint
    }

    pub fn recorder(&self) -> &MatchRecorder<S> {
        &self.recorder
    }

    pub fn config(&self) -> &ConfigRepository<S> {
        self.sync.config()
    }

    pub async fn sync(&self) -> SyncOutcome {
        self.sync.sync().await
    }

    pub async fn on_installed(&self) -> SyncOutcome {
        log::info!("ADSHIELD-X background service worker installed.");
        self.sync().await
    }

    pub async fn on_startup(&self) -> SyncOutcome {
        log::info!("ADSHIELD-X background service worker started.");
        self.sync().await
    }

    /// Watch the configuration keys. Subscribe before the first sync so no
    /// change is missed.
    pub fn watch_config(&self) -> ConfigWatcher<S, N> {
        ConfigWatcher {
            changes: self.sync.config().subscribe(),
            sync: Rc::clone(&self.sync),
        }
    }
}

/// Re-syncs the ruleset whenever the configuration changes.
pub struct ConfigWatcher<S, N> {
    changes: ConfigChanges,
    sync: Rc<RulesetSynchronizer<S, N>>,
}

impl<S: Storage, N: RuleInstaller> ConfigWatcher<S, N> {
    /// Wait for a change and run one pass for it and every change queued
    /// behind it. `None` once the store is gone.
    pub async fn next_pass(&mut self) -> Option<SyncOutcome> {
        self.changes.next().await?;
        let coalesced = self.changes.drain_pending();
        if coalesced > 0 {
            log::debug!("Coalesced {} queued configuration changes", coalesced);
        }
        Some(self.sync.sync().await)
    }

    pub async fn run(mut self) {
        while self.next_pass().await.is_some() {}
        log::debug!("Configuration watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Request, Response, STATUS_BLOCKING_ENABLED};
    use crate::network::MemoryRuleInstaller;
    use crate::storage::MemoryStorage;
    use crate::testing::{YieldingInstaller, YieldingStorage};
    use ax_compiler::ALLOW_RULE_ID_OFFSET;

    #[tokio::test]
    async fn test_startup_enforces_configuration() {
        let storage = Rc::new(MemoryStorage::new());
        let installer = Rc::new(MemoryRuleInstaller::new());
        let background = Background::new(storage, installer.clone());
        background.config().set_whitelist(&["a.com".into()]).await.unwrap();

        assert!(background.on_installed().await.is_applied());
        assert_eq!(installer.installed_ids().len(), 1);
        assert!(background.on_startup().await.is_applied());
        assert_eq!(installer.update_count(), 2);
    }

    #[tokio::test]
    async fn test_watcher_coalesces_queued_changes() {
        let storage = Rc::new(MemoryStorage::new());
        let installer = Rc::new(MemoryRuleInstaller::new());
        let background = Background::new(storage, installer.clone());
        let mut watcher = background.watch_config();

        let config = background.config();
        config.set_whitelist(&["a.com".into()]).await.unwrap();
        config.add_custom_rule("ads").await.unwrap();
        config.set_blocking_enabled(true).await.unwrap();

        let outcome = watcher.next_pass().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Applied { removed: 0, added: 2 });
        assert_eq!(installer.update_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_and_watcher_passes_do_not_collide() {
        let storage = Rc::new(YieldingStorage::new());
        let installer = Rc::new(YieldingInstaller::new());
        let background = Background::new(storage, installer.clone());
        background.config().set_whitelist(&["a.com".into()]).await.unwrap();
        background.config().set_blocking_enabled(false).await.unwrap();
        assert!(background.on_startup().await.is_applied());
        let mut watcher = background.watch_config();

        let toggle = background
            .endpoint()
            .dispatch(Request::ToggleBlocking { enabled: true })
            .into_response();
        let (reply, pass) = futures::join!(toggle, watcher.next_pass());

        assert_eq!(reply, Some(Response::status(STATUS_BLOCKING_ENABLED)));
        assert_eq!(pass, Some(SyncOutcome::Applied { removed: 1, added: 1 }));
        assert_eq!(installer.inner().installed_ids(), vec![ALLOW_RULE_ID_OFFSET]);
    }
}

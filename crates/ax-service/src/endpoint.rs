//! Decision and messaging endpoint
//!
//! Every request except `PING` touches storage or the filtering layer, so its
//! reply is deferred: `dispatch` hands back a future and the transport keeps
//! the channel open until it resolves.

use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use crate::config::ConfigRepository;
use crate::log_store::BlockedLogStore;
use crate::message::{
    Request, Response, STATUS_ALIVE, STATUS_BLOCKING_DISABLED, STATUS_BLOCKING_ENABLED,
    STATUS_RULES_ADDED, STATUS_RULES_REMOVED, STATUS_RULES_SYNCHRONIZED,
};
use crate::network::RuleInstaller;
use crate::storage::Storage;
use crate::sync::RulesetSynchronizer;

/// How a message will be answered.
pub enum Dispatch {
    /// The reply is ready now.
    Immediate(Response),
    /// The reply arrives when the future resolves.
    Deferred(LocalBoxFuture<'static, Response>),
    /// The message is not understood and gets no reply.
    Ignored,
}

impl Dispatch {
    /// Whether the transport must keep the reply channel open.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub async fn into_response(self) -> Option<Response> {
        match self {
            Self::Immediate(response) => Some(response),
            Self::Deferred(reply) => Some(reply.await),
            Self::Ignored => None,
        }
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(response) => f.debug_tuple("Immediate").field(response).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
            Self::Ignored => f.write_str("Ignored"),
        }
    }
}

pub struct Endpoint<S, N> {
    config: ConfigRepository<S>,
    log: BlockedLogStore<S>,
    sync: Rc<RulesetSynchronizer<S, N>>,
}

impl<S, N> Clone for Endpoint<S, N> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            log: self.log.clone(),
            sync: Rc::clone(&self.sync),
        }
    }
}

impl<S: Storage + 'static, N: RuleInstaller + 'static> Endpoint<S, N> {
    pub fn new(sync: Rc<RulesetSynchronizer<S, N>>, log: BlockedLogStore<S>) -> Self {
        let config = sync.config().clone();
        Self { config, log, sync }
    }

    /// Dispatch a raw message from the transport.
    pub fn dispatch_value(&self, message: &Value) -> Dispatch {
        match Request::from_value(message) {
            Some(request) => self.dispatch(request),
            None => Dispatch::Ignored,
        }
    }

    pub fn dispatch(&self, request: Request) -> Dispatch {
        log::debug!("Dispatching {}", request.kind());
        match request {
            Request::Ping => Dispatch::Immediate(Response::status(STATUS_ALIVE)),
            request => {
                let endpoint = self.clone();
                Dispatch::Deferred(async move { endpoint.handle(request).await }.boxed_local())
            }
        }
    }

    /// Answer `request`. Storage failures degrade to defaults; this never fails.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetBlockingStatus => {
                let config = self.config.load_or_default().await;
                Response::BlockingStatus {
                    enabled: config.blocking_enabled,
                }
            }
            Request::ShouldBlockPage { url } => Response::ShouldBlock {
                should_block: self.should_block_page(url.as_deref().unwrap_or_default()).await,
            },
            Request::GetBlockedLog => {
                let log = self.log.load().await.unwrap_or_else(|e| {
                    log::warn!("Failed to read blocked log: {}", e);
                    Default::default()
                });
                Response::BlockedLog {
                    log: log.into_entries(),
                }
            }
            Request::ToggleBlocking { enabled } => {
                if let Err(e) = self.config.set_blocking_enabled(enabled).await {
                    log::warn!("Failed to store blocking state: {}", e);
                }
                self.sync.sync().await;
                Response::status(if enabled {
                    STATUS_BLOCKING_ENABLED
                } else {
                    STATUS_BLOCKING_DISABLED
                })
            }
            Request::AddDnrRules { rules } => {
                self.sync.sync().await;
                Response::RulesSynced {
                    status: STATUS_RULES_ADDED.to_string(),
                    rules,
                }
            }
            Request::RemoveDnrRules { rule_ids } => {
                self.sync.sync().await;
                Response::RuleIdsSynced {
                    status: STATUS_RULES_REMOVED.to_string(),
                    rule_ids,
                }
            }
            Request::SyncDynamicRules => {
                self.sync.sync().await;
                Response::status(STATUS_RULES_SYNCHRONIZED)
            }
            Request::Ping => Response::status(STATUS_ALIVE),
        }
    }

    /// `enabled AND NOT allowlisted(hostname(url))`.
    pub async fn should_block_page(&self, url: &str) -> bool {
        self.config.load_or_default().await.should_block_url(url)
    }
}

//! End-to-end message protocol scenarios against in-memory host capabilities.

use std::rc::Rc;

use ax_compiler::ALLOW_RULE_ID_OFFSET;
use ax_core::blocked_log::BLOCKED_LOG_CAPACITY;
use ax_service::{
    Background, Dispatch, MemoryRuleInstaller, MemoryStorage, Response, Storage, StorageArea,
    SyncOutcome, BLOCKED_LOG_KEY,
};
use serde_json::{json, Map, Value};

struct Harness {
    storage: Rc<MemoryStorage>,
    installer: Rc<MemoryRuleInstaller>,
    background: Background<MemoryStorage, MemoryRuleInstaller>,
}

impl Harness {
    fn new() -> Self {
        Self::with_installer(MemoryRuleInstaller::new())
    }

    fn with_installer(installer: MemoryRuleInstaller) -> Self {
        let storage = Rc::new(MemoryStorage::new());
        let installer = Rc::new(installer);
        let background = Background::new(storage.clone(), installer.clone());
        Self {
            storage,
            installer,
            background,
        }
    }

    fn seed(&self, key: &str, value: Value) {
        self.storage.insert(StorageArea::Sync, key, value);
    }

    async fn send(&self, message: Value) -> Option<Value> {
        self.background
            .endpoint()
            .dispatch_value(&message)
            .into_response()
            .await
            .map(|response| response.to_value())
    }
}

#[tokio::test]
async fn should_block_page_respects_allowlist() {
    let h = Harness::new();
    h.seed("whitelist", json!(["site.com"]));
    h.seed("customRules", json!([]));
    h.seed("blockingEnabled", json!(true));

    let reply = h
        .send(json!({ "type": "SHOULD_BLOCK_PAGE", "url": "https://site.com/article" }))
        .await;
    assert_eq!(reply, Some(json!({ "shouldBlock": false })));

    let reply = h
        .send(json!({ "type": "SHOULD_BLOCK_PAGE", "url": "https://www.site.com/" }))
        .await;
    assert_eq!(reply, Some(json!({ "shouldBlock": false })));

    let reply = h
        .send(json!({ "type": "SHOULD_BLOCK_PAGE", "url": "https://other.com/" }))
        .await;
    assert_eq!(reply, Some(json!({ "shouldBlock": true })));

    let reply = h.send(json!({ "type": "SHOULD_BLOCK_PAGE" })).await;
    assert_eq!(reply, Some(json!({ "shouldBlock": true })));
}

#[tokio::test]
async fn toggle_off_then_status_and_empty_ruleset() {
    let h = Harness::new();
    h.seed("whitelist", json!(["site.com"]));
    h.seed(
        "customRules",
        json!([{ "id": 1700000000000_i64, "priority": 1, "action": { "type": "block" }, "condition": { "urlFilter": "ads" } }]),
    );
    assert!(h.background.on_startup().await.is_applied());
    assert_eq!(h.installer.installed_ids().len(), 2);

    let reply = h.send(json!({ "type": "TOGGLE_BLOCKING", "enabled": false })).await;
    assert_eq!(reply, Some(json!({ "status": "Blocking disabled" })));
    assert!(h.installer.installed_ids().is_empty());

    let reply = h.send(json!({ "type": "GET_BLOCKING_STATUS" })).await;
    assert_eq!(reply, Some(json!({ "enabled": false })));

    let reply = h.send(json!({ "type": "SHOULD_BLOCK_PAGE", "url": "https://other.com/" })).await;
    assert_eq!(reply, Some(json!({ "shouldBlock": false })));

    assert_eq!(h.background.sync().await, SyncOutcome::Applied { removed: 0, added: 0 });
    assert!(h.installer.installed_ids().is_empty());

    let reply = h.send(json!({ "type": "TOGGLE_BLOCKING", "enabled": true })).await;
    assert_eq!(reply, Some(json!({ "status": "Blocking enabled" })));
    assert_eq!(h.installer.installed_ids(), vec![ALLOW_RULE_ID_OFFSET, 1_700_000_000_000]);
}

#[tokio::test]
async fn sync_replaces_every_installed_rule() {
    let h = Harness::new();
    h.installer.seed([ax_compiler::custom_block_rule(99, "stale")]);
    h.seed("whitelist", json!(["a.com", "b.com"]));

    let reply = h.send(json!({ "type": "SYNC_DYNAMIC_RULES" })).await;
    assert_eq!(reply, Some(json!({ "status": "Rules synchronized" })));
    assert_eq!(
        h.installer.installed_ids(),
        vec![ALLOW_RULE_ID_OFFSET, ALLOW_RULE_ID_OFFSET + 1]
    );

    h.seed("whitelist", json!(["b.com"]));
    h.send(json!({ "type": "SYNC_DYNAMIC_RULES" })).await;
    assert_eq!(h.installer.installed_ids(), vec![ALLOW_RULE_ID_OFFSET]);
}

#[tokio::test]
async fn rule_messages_echo_their_payload() {
    let h = Harness::new();
    let rule = h.background.config().add_custom_rule("tracker.example").await.unwrap().unwrap();

    let reply = h
        .send(json!({ "type": "ADD_DNR_RULES", "rules": [serde_json::to_value(&rule).unwrap()] }))
        .await
        .unwrap();
    assert_eq!(reply["status"], json!("Rules synced after addition"));
    assert_eq!(reply["rules"][0]["id"], json!(rule.id));
    assert_eq!(h.installer.installed_ids(), vec![rule.id]);

    h.background.config().remove_custom_rule(rule.id).await.unwrap();
    let reply = h
        .send(json!({ "type": "REMOVE_DNR_RULES", "ruleIds": [rule.id] }))
        .await;
    assert_eq!(
        reply,
        Some(json!({ "status": "Rules synced after removal", "ruleIds": [rule.id] }))
    );
    assert!(h.installer.installed_ids().is_empty());
}

#[tokio::test]
async fn blocked_log_capped_and_skips_allowlisted() {
    let h = Harness::new();
    h.seed("whitelist", json!(["site.com"]));
    let recorder = h.background.recorder();

    for n in 0..(BLOCKED_LOG_CAPACITY + 1) {
        let event = json!({
            "request": { "url": format!("https://ads.example/{n}"), "tabId": 7 },
            "rule": { "ruleId": n }
        });
        assert!(recorder.record_event(&event).await);
    }
    let allowlisted = json!({
        "request": { "url": "https://static.site.com/ad.js", "tabId": 7 },
        "rule": { "ruleId": 1 }
    });
    assert!(!recorder.record_event(&allowlisted).await);

    let reply = h.send(json!({ "type": "GET_BLOCKED_LOG" })).await.unwrap();
    let log = reply["log"].as_array().unwrap();
    assert_eq!(log.len(), BLOCKED_LOG_CAPACITY);
    assert_eq!(log[0]["url"], json!(format!("https://ads.example/{BLOCKED_LOG_CAPACITY}")));
    assert_eq!(log[0]["tabId"], json!(7));
    assert_eq!(log[BLOCKED_LOG_CAPACITY - 1]["ruleId"], json!(1));
    assert!(log.iter().all(|entry| entry["url"] != json!("https://static.site.com/ad.js")));

    let stored = h.storage.value(StorageArea::Local, BLOCKED_LOG_KEY).unwrap();
    assert_eq!(stored.as_array().map(Vec::len), Some(BLOCKED_LOG_CAPACITY));
}

#[tokio::test]
async fn replies_even_without_filtering_layer() {
    let h = Harness::with_installer(MemoryRuleInstaller::unavailable());

    assert_eq!(h.background.on_installed().await, SyncOutcome::Unavailable);
    let reply = h.send(json!({ "type": "SYNC_DYNAMIC_RULES" })).await;
    assert_eq!(reply, Some(json!({ "status": "Rules synchronized" })));
    let reply = h.send(json!({ "type": "TOGGLE_BLOCKING", "enabled": true })).await;
    assert_eq!(reply, Some(json!({ "status": "Blocking enabled" })));
}

#[tokio::test]
async fn replies_when_filtering_layer_rejects() {
    let h = Harness::with_installer(MemoryRuleInstaller::new().with_max_rules(1));
    h.seed("whitelist", json!(["a.com", "b.com", "c.com"]));

    assert!(matches!(h.background.sync().await, SyncOutcome::Rejected(_)));
    let reply = h.send(json!({ "type": "SYNC_DYNAMIC_RULES" })).await;
    assert_eq!(reply, Some(json!({ "status": "Rules synchronized" })));
    assert!(h.installer.installed_ids().is_empty());
}

#[tokio::test]
async fn colliding_custom_rules_do_not_block_install() {
    let h = Harness::new();
    h.seed("whitelist", json!(["a.com"]));
    h.seed(
        "customRules",
        json!([
            { "id": 5, "action": { "type": "block" }, "condition": { "urlFilter": "x" } },
            { "id": 5, "action": { "type": "block" }, "condition": { "urlFilter": "y" } },
            { "id": 200000, "action": { "type": "block" }, "condition": { "urlFilter": "z" } }
        ]),
    );

    assert_eq!(h.background.sync().await, SyncOutcome::Applied { removed: 0, added: 2 });
    assert_eq!(h.installer.installed_ids(), vec![5, ALLOW_RULE_ID_OFFSET]);
}

#[tokio::test]
async fn config_changes_trigger_one_coalesced_pass() {
    let h = Harness::new();
    let mut watcher = h.background.watch_config();
    let config = h.background.config();

    config.add_whitelist_domain("https://News.example/").await.unwrap();
    config.add_custom_rule("ads").await.unwrap();
    h.storage
        .set(StorageArea::Local, Map::from_iter([(BLOCKED_LOG_KEY.to_string(), json!([]))]))
        .await
        .unwrap();

    let outcome = watcher.next_pass().await.unwrap();
    assert_eq!(outcome, SyncOutcome::Applied { removed: 0, added: 2 });
    assert_eq!(h.installer.update_count(), 1);
}

#[tokio::test]
async fn malformed_messages_get_no_reply() {
    let h = Harness::new();
    for message in [
        json!({}),
        json!({ "type": "NOPE" }),
        json!({ "type": "TOGGLE_BLOCKING", "enabled": "yes" }),
        json!({ "type": "ADD_DNR_RULES" }),
        json!({ "type": "REMOVE_DNR_RULES", "ruleIds": 3 }),
    ] {
        assert!(matches!(
            h.background.endpoint().dispatch_value(&message),
            Dispatch::Ignored
        ));
        assert_eq!(h.send(message).await, None);
    }
    assert_eq!(h.installer.update_count(), 0);
}

#[tokio::test]
async fn ping_replies_immediately() {
    let h = Harness::new();
    match h.background.endpoint().dispatch_value(&json!({ "type": "PING" })) {
        Dispatch::Immediate(response) => {
            assert_eq!(response, Response::status("Service worker active"))
        }
        other => panic!("expected immediate reply, got {other:?}"),
    }
}

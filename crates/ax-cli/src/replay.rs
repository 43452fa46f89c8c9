//! Replay a message log against the background core with in-memory storage
//! and filtering.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use ax_service::{Background, MemoryRuleInstaller, MemoryStorage, StorageArea};
use serde_json::Value;

use crate::ruleset_file::read_config;

pub struct ReplayOptions<'a> {
    pub config: Option<&'a Path>,
    pub messages: &'a Path,
    pub max_rules: Option<usize>,
}

pub struct ReplaySummary {
    pub messages: usize,
    pub ignored: usize,
    pub matches_logged: usize,
    pub installed_rules: usize,
}

/// Each non-empty line is either a protocol message or a rule-match debug
/// event (`{"request": {...}, "rule": {...}}`). Replies are written to stdout
/// one per line; unanswered messages print `null`.
pub fn run_replay(opts: ReplayOptions<'_>) -> Result<ReplaySummary, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(replay(opts))
}

async fn replay(opts: ReplayOptions<'_>) -> Result<ReplaySummary, String> {
    let storage = Rc::new(MemoryStorage::new());
    if let Some(path) = opts.config {
        for (key, value) in read_config(path)?.to_items() {
            storage.insert(StorageArea::Sync, &key, value);
        }
    }

    let installer = match opts.max_rules {
        Some(max) => MemoryRuleInstaller::new().with_max_rules(max),
        None => MemoryRuleInstaller::new(),
    };
    let installer = Rc::new(installer);
    let background = Background::new(Rc::clone(&storage), Rc::clone(&installer));
    background.on_startup().await;

    let text = fs::read_to_string(opts.messages)
        .map_err(|e| format!("Failed to read '{}': {}", opts.messages.display(), e))?;

    let mut summary = ReplaySummary {
        messages: 0,
        ignored: 0,
        matches_logged: 0,
        installed_rules: 0,
    };

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| format!("Line {}: invalid JSON: {}", number + 1, e))?;

        if value.get("request").is_some() && value.get("rule").is_some() {
            if background.recorder().record_event(&value).await {
                summary.matches_logged += 1;
            }
            continue;
        }

        summary.messages += 1;
        match background.endpoint().dispatch_value(&value).into_response().await {
            Some(response) => println!("{}", response.to_value()),
            None => {
                summary.ignored += 1;
                println!("null");
            }
        }
    }

    summary.installed_rules = installer.installed_ids().len();
    Ok(summary)
}

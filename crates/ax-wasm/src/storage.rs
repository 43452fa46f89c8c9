//! `chrome.storage` backed `Storage`.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use ax_service::storage::{Storage, StorageArea, StorageChange, StorageError};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use js_sys::{Array, Object};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::chrome;

type Subscribers = Rc<RefCell<Vec<UnboundedSender<StorageChange>>>>;

pub struct ChromeStorage {
    subscribers: Subscribers,
}

impl ChromeStorage {
    /// `None` outside an extension (no `chrome.storage.sync`).
    pub fn new() -> Option<Self> {
        chrome::lookup(&["chrome", "storage", "sync"])?;

        let subscribers: Subscribers = Rc::new(RefCell::new(Vec::new()));
        let forward = Rc::clone(&subscribers);
        let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |changes: JsValue, area: JsValue| {
            let Some(area) = area.as_string().and_then(|name| StorageArea::parse(&name)) else {
                return;
            };
            let Some(changes) = changes.dyn_ref::<Object>() else {
                return;
            };
            let keys: Vec<String> = Object::keys(changes).iter().filter_map(|key| key.as_string()).collect();
            if keys.is_empty() {
                return;
            }

            let change = StorageChange { area, keys };
            forward
                .borrow_mut()
                .retain(|tx| tx.unbounded_send(change.clone()).is_ok());
        });

        if !chrome::add_listener(&["chrome", "storage", "onChanged"], listener.as_ref().unchecked_ref()) {
            log::warn!("chrome.storage.onChanged is not available; configuration changes will not be tracked");
        }
        listener.forget();

        Some(Self { subscribers })
    }

    fn area(&self, area: StorageArea) -> Result<JsValue, StorageError> {
        chrome::lookup(&["chrome", "storage", area.as_str()]).ok_or(StorageError::Unavailable)
    }
}

#[async_trait(?Send)]
impl Storage for ChromeStorage {
    async fn get(&self, area: StorageArea, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let target = self.area(area)?;
        let names = Array::new();
        for key in keys {
            names.push(&JsValue::from_str(key));
        }

        let result = chrome::call_async(&target, "get", &[names.into()])
            .await
            .map_err(StorageError::Backend)?;
        match chrome::to_json(&result).map_err(StorageError::Backend)? {
            Value::Object(items) => Ok(items),
            _ => Ok(Map::new()),
        }
    }

    async fn set(&self, area: StorageArea, items: Map<String, Value>) -> Result<(), StorageError> {
        let target = self.area(area)?;
        let items = chrome::from_json(&Value::Object(items)).map_err(StorageError::Backend)?;
        chrome::call_async(&target, "set", &[items])
            .await
            .map(|_| ())
            .map_err(StorageError::Backend)
    }

    fn subscribe(&self) -> UnboundedReceiver<StorageChange> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx
    }
}

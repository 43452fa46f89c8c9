//! Background service worker entry point.

use std::rc::Rc;

use ax_service::{Background, Dispatch, Response};
use js_sys::Function;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::chrome;
use crate::dnr::ChromeRuleInstaller;
use crate::storage::ChromeStorage;

type ChromeBackground = Background<ChromeStorage, ChromeRuleInstaller>;

/// Wire the background core to the extension events. Call once from the
/// service worker script.
#[wasm_bindgen]
pub fn start_background() {
    crate::logger::init(log::LevelFilter::Info);

    let Some(storage) = ChromeStorage::new() else {
        log::warn!("chrome.storage.sync is not available. This script must run as a Chrome extension.");
        return;
    };

    let background = Rc::new(Background::new(Rc::new(storage), Rc::new(ChromeRuleInstaller)));

    spawn_local(background.watch_config().run());

    let bg = Rc::clone(&background);
    listen_lifecycle(&["chrome", "runtime", "onInstalled"], move || {
        let bg = Rc::clone(&bg);
        spawn_local(async move {
            bg.on_installed().await;
        });
    });

    let bg = Rc::clone(&background);
    listen_lifecycle(&["chrome", "runtime", "onStartup"], move || {
        let bg = Rc::clone(&bg);
        spawn_local(async move {
            bg.on_startup().await;
        });
    });

    listen_messages(Rc::clone(&background));
    listen_rule_matches(background);
}

fn listen_lifecycle(path: &[&str], mut handler: impl FnMut() + 'static) {
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |_details: JsValue| handler());
    if !chrome::add_listener(path, listener.as_ref().unchecked_ref()) {
        log::debug!("{} is not available", path.join("."));
    }
    listener.forget();
}

/// `chrome.runtime.onMessage`: returning `true` keeps the reply channel open
/// for deferred responses.
fn listen_messages(background: Rc<ChromeBackground>) {
    let listener = Closure::<dyn FnMut(JsValue, JsValue, Function) -> JsValue>::new(
        move |message: JsValue, _sender: JsValue, send_response: Function| {
            let message = match chrome::to_json(&message) {
                Ok(message) => message,
                Err(e) => {
                    log::debug!("Ignoring unreadable message: {}", e);
                    return JsValue::UNDEFINED;
                }
            };

            match background.endpoint().dispatch_value(&message) {
                Dispatch::Immediate(response) => {
                    reply(&send_response, &response);
                    JsValue::UNDEFINED
                }
                Dispatch::Deferred(pending) => {
                    spawn_local(async move {
                        let response = pending.await;
                        reply(&send_response, &response);
                    });
                    JsValue::TRUE
                }
                Dispatch::Ignored => JsValue::UNDEFINED,
            }
        },
    );

    if !chrome::add_listener(&["chrome", "runtime", "onMessage"], listener.as_ref().unchecked_ref()) {
        log::warn!("chrome.runtime.onMessage is not available");
    }
    listener.forget();
}

fn reply(send_response: &Function, response: &Response) {
    let value = match chrome::from_json(&response.to_value()) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Failed to encode response: {}", e);
            return;
        }
    };
    if let Err(e) = send_response.call1(&JsValue::UNDEFINED, &value) {
        log::debug!("Reply not delivered: {}", chrome::describe(e));
    }
}

/// `chrome.declarativeNetRequest.onRuleMatchedDebug`, only present with the
/// `declarativeNetRequestFeedback` permission in an unpacked extension.
fn listen_rule_matches(background: Rc<ChromeBackground>) {
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |info: JsValue| {
        let event = match chrome::to_json(&info) {
            Ok(event) => event,
            Err(e) => {
                log::debug!("Ignoring unreadable rule match: {}", e);
                return;
            }
        };
        let recorder = background.recorder().clone();
        spawn_local(async move {
            recorder.record_event(&event).await;
        });
    });

    if chrome::add_listener(
        &["chrome", "declarativeNetRequest", "onRuleMatchedDebug"],
        listener.as_ref().unchecked_ref(),
    ) {
        listener.forget();
    }
}

//! Thin access to the `chrome.*` extension namespace.
//!
//! Everything is looked up dynamically from the global object so the same
//! module loads outside an extension and simply reports the API as missing.

use js_sys::{Array, Function, Promise, Reflect, JSON};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Resolve a dotted path such as `chrome.storage.sync` from the global object.
pub fn lookup(path: &[&str]) -> Option<JsValue> {
    let mut current: JsValue = js_sys::global().into();
    for key in path {
        let next = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
        if next.is_undefined() || next.is_null() {
            return None;
        }
        current = next;
    }
    Some(current)
}

pub fn method(target: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

/// Call `target[name](...args)` and await the promise it returns.
pub async fn call_async(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, String> {
    let function = method(target, name).ok_or_else(|| format!("{} is not available", name))?;

    let arguments = Array::new();
    for arg in args {
        arguments.push(arg);
    }

    let result = Reflect::apply(&function, target, &arguments).map_err(describe)?;
    let promise = result
        .dyn_into::<Promise>()
        .map_err(|_| format!("{} did not return a promise", name))?;
    JsFuture::from(promise).await.map_err(describe)
}

/// Register `listener` on an extension event such as `chrome.runtime.onStartup`.
pub fn add_listener(path: &[&str], listener: &Function) -> bool {
    let Some(event) = lookup(path) else {
        return false;
    };
    let Some(add) = method(&event, "addListener") else {
        return false;
    };
    add.call1(&event, listener).is_ok()
}

/// Human-readable text for a thrown value or rejected promise.
pub fn describe(error: JsValue) -> String {
    if let Some(text) = error.as_string() {
        return text;
    }
    if let Some(message) = Reflect::get(&error, &JsValue::from_str("message"))
        .ok()
        .and_then(|value| value.as_string())
    {
        return message;
    }
    format!("{:?}", error)
}

pub fn to_json(value: &JsValue) -> Result<Value, String> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = JSON::stringify(value)
        .map_err(describe)?
        .as_string()
        .unwrap_or_else(|| "null".to_string());
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

pub fn from_json(value: &Value) -> Result<JsValue, String> {
    let text = serde_json::to_string(value).map_err(|e| e.to_string())?;
    JSON::parse(&text).map_err(describe)
}

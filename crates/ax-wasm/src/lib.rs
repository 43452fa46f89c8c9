//! WebAssembly bindings for AdShield-X
//!
//! `start_background` runs in the service worker and `start_content` in every
//! page. The remaining exports are pure helpers for the options and popup
//! pages.

mod background;
mod chrome;
mod content;
mod dnr;
mod logger;
mod storage;

pub use background::start_background;
pub use content::start_content;

use ax_compiler::compile_ruleset;
use ax_core::{allowlist::Allowlist, domain::normalize_domain, types::Rule, url::hostname};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn compile_rules(blocking_enabled: bool, custom_rules: JsValue, whitelist: JsValue) -> Result<JsValue, JsValue> {
    let custom_rules: Vec<Rule> = match chrome::to_json(&custom_rules) {
        Ok(serde_json::Value::Null) => Vec::new(),
        Ok(value) => serde_json::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid custom rules: {}", e)))?,
        Err(e) => return Err(JsValue::from_str(&e)),
    };
    let whitelist = string_list(&whitelist);

    let compiled = compile_ruleset(blocking_enabled, &custom_rules, &whitelist);
    let rules = serde_json::to_value(&compiled.rules)
        .map_err(|e| JsValue::from_str(&format!("Failed to encode rules: {}", e)))?;

    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"rules".into(), &chrome::from_json(&rules).map_err(|e| JsValue::from_str(&e))?);
    let _ = js_sys::Reflect::set(&js_result, &"customRules".into(), &JsValue::from(compiled.stats.custom_rules as u32));
    let _ = js_sys::Reflect::set(&js_result, &"allowRules".into(), &JsValue::from(compiled.stats.allow_rules as u32));
    let _ = js_sys::Reflect::set(&js_result, &"droppedRules".into(), &JsValue::from(compiled.stats.dropped_rules as u32));

    Ok(js_result.into())
}

#[wasm_bindgen]
pub fn should_block_url(url: &str, blocking_enabled: bool, whitelist: JsValue) -> bool {
    blocking_enabled && !Allowlist::new(string_list(&whitelist)).matches_url(url)
}

#[wasm_bindgen]
pub fn normalize_domain_js(raw: &str) -> String {
    normalize_domain(raw)
}

#[wasm_bindgen]
pub fn hostname_js(url: &str) -> String {
    hostname(url)
}

fn string_list(value: &JsValue) -> Vec<String> {
    if !js_sys::Array::is_array(value) {
        return Vec::new();
    }
    js_sys::Array::from(value)
        .iter()
        .filter_map(|entry| entry.as_string())
        .collect()
}

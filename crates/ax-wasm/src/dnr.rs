//! `chrome.declarativeNetRequest` backed `RuleInstaller`.

use async_trait::async_trait;
use ax_core::types::Rule;
use ax_service::network::{InstallError, RuleInstaller};
use serde_json::{json, Value};
use wasm_bindgen::JsValue;

use crate::chrome;

const DNR_PATH: &[&str] = &["chrome", "declarativeNetRequest"];

#[derive(Debug, Default)]
pub struct ChromeRuleInstaller;

impl ChromeRuleInstaller {
    fn api(&self) -> Result<JsValue, InstallError> {
        chrome::lookup(DNR_PATH).ok_or(InstallError::Unavailable)
    }
}

#[async_trait(?Send)]
impl RuleInstaller for ChromeRuleInstaller {
    fn is_available(&self) -> bool {
        self.api()
            .map(|api| chrome::method(&api, "updateDynamicRules").is_some())
            .unwrap_or(false)
    }

    async fn installed_rule_ids(&self) -> Result<Vec<i64>, InstallError> {
        let api = self.api()?;
        let rules = chrome::call_async(&api, "getDynamicRules", &[])
            .await
            .map_err(InstallError::Backend)?;
        let rules = chrome::to_json(&rules).map_err(InstallError::Backend)?;

        Ok(rules
            .as_array()
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|rule| rule.get("id").and_then(Value::as_i64))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_rules(&self, remove_ids: &[i64], add_rules: &[Rule]) -> Result<(), InstallError> {
        let api = self.api()?;
        let options = json!({
            "removeRuleIds": remove_ids,
            "addRules": add_rules,
        });
        let options = chrome::from_json(&options).map_err(InstallError::Backend)?;

        chrome::call_async(&api, "updateDynamicRules", &[options])
            .await
            .map(|_| ())
            .map_err(InstallError::Rejected)
    }
}

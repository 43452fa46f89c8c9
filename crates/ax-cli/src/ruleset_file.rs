use std::fs;
use std::path::Path;
use std::time::Instant;

use ax_compiler::CompiledRuleset;
use ax_service::config::Config;
use serde_json::Value;

/// Read a configuration file laid out like the synced store
/// (`blockingEnabled`, `customRules`, `whitelist`). Missing keys take their
/// defaults.
pub fn read_config(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid JSON in '{}': {}", path.display(), e))?;

    match value {
        Value::Object(items) => Ok(Config::from_items(&items)),
        _ => Err(format!("'{}' must contain a JSON object", path.display())),
    }
}

pub fn compile_config(config: &Config) -> (CompiledRuleset, f64) {
    let start = Instant::now();
    let compiled = config.compile();
    (compiled, start.elapsed().as_secs_f64() * 1000.0)
}

pub fn write_json(path: &Path, value: &Value) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to encode JSON: {}", e))?;
    fs::write(path, text)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(())
}

//! `claudesync config`: read and write configuration keys.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::config::{ConfigStore, Scope};

/// Store `value` as a string under `key`, locally or globally.
pub fn run_set(config: &ConfigStore, key: &str, value: &str, local: bool) -> Result<()> {
    let scope = if local { Scope::Local } else { Scope::Global };
    config.set(key, value, scope)?;
    let path = match scope {
        Scope::Local => config.local_path(),
        Scope::Global => config.global_path(),
    };
    println!("Configuration {} set to {} ({})", key, value, path.display());
    Ok(())
}

/// Print the effective value of `key`; strings are printed bare.
pub fn run_get(config: &ConfigStore, key: &str) -> Result<()> {
    let merged = config.merged_redacted();
    match merged.get(key) {
        Some(Value::String(s)) => println!("{}", s),
        Some(Value::Null) | None => bail!("configuration key '{}' is not set", key),
        Some(other) => println!("{}", other),
    }
    Ok(())
}

/// Print the merged configuration as JSON, session keys masked.
pub fn run_list(config: &ConfigStore) -> Result<()> {
    let merged = config.merged_redacted();
    println!("{}", serde_json::to_string_pretty(&Value::Object(merged))?);
    Ok(())
}

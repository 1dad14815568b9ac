//! Building the rendering context from a context file and `--set` flags

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Load a context file (YAML or JSON) and apply `key=value` overrides on top
pub fn build(file: Option<&Path>, sets: &[String]) -> Result<Value> {
    let mut ctx = match file {
        Some(path) => load_file(path)?,
        None => Value::Object(Map::new()),
    };
    for entry in sets {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("Invalid --set '{}', expected key=value", entry))?;
        set_path(&mut ctx, key.trim(), scalar(raw))?;
    }
    Ok(ctx)
}

fn load_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse context file {}", path.display()))?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => bail!("Context file {} must contain a mapping", path.display()),
    }
}

/// Booleans and numbers keep their type; everything else is a string
///
/// A number is only used when it prints back exactly as given, so `007` and
/// `1.10` stay strings.
fn scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<f64>().map(Value::from))
            .ok()
            .filter(|v| v.is_number() && v.to_string() == raw)
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

/// Assign `value` at a dotted key, creating intermediate objects
fn set_path(ctx: &mut Value, key: &str, value: Value) -> Result<()> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        bail!("Invalid context key '{}'", key);
    }

    let mut current = ctx;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        let map = match current {
            Value::Object(map) => map,
            _ => bail!("Context key '{}' conflicts with a non-object value", key),
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

/// Insert `key` with `value` if the context does not define it already
pub fn insert_default(ctx: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = ctx {
        map.entry(key.to_string()).or_insert(value);
    }
}

//! Content decoding into flat, dotted, lowercase key maps.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use cfgsync_core::{CfgError, Format, Result};

/// Flat key space: dotted lowercase key → leaf value.
pub type FlatMap = BTreeMap<String, Value>;

/// Decode raw bytes under `format` and flatten the resulting document.
///
/// Whitespace-only content is an empty map. A document whose top level is
/// not a mapping is rejected.
pub fn decode(format: Format, raw: &[u8]) -> Result<FlatMap> {
    let text = std::str::from_utf8(raw).map_err(|e| CfgError::decode(format, e))?;
    if text.trim().is_empty() {
        return Ok(FlatMap::new());
    }

    let tree = match format {
        Format::Json => serde_json::from_str::<Value>(text).map_err(|e| CfgError::decode(format, e))?,
        Format::Yaml => {
            let doc: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| CfgError::decode(format, e))?;
            yaml_to_json(doc)
        }
        Format::Toml => {
            let table: toml::Table = toml::from_str(text).map_err(|e| CfgError::decode(format, e))?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    match tree {
        Value::Object(_) => Ok(flatten(&tree)),
        Value::Null => Ok(FlatMap::new()),
        other => Err(CfgError::decode(
            format,
            format!("top-level document must be a mapping, got {}", type_name(&other)),
        )),
    }
}

/// Flatten nested objects into dotted keys. Arrays and scalars are leaves;
/// empty objects vanish.
pub fn flatten(value: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut FlatMap) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.to_lowercase()
                } else {
                    format!("{prefix}.{}", k.to_lowercase())
                };
                flatten_into(v, key, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix, leaf.clone());
        }
        _ => {}
    }
}

/// Rebuild a nested object from dotted keys. When a key is both a leaf and a
/// parent, the deeper keys win.
pub fn unflatten(flat: &FlatMap) -> Value {
    let mut root = Map::new();
    for (key, value) in flat {
        let mut node = &mut root;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                node.insert(part.to_string(), value.clone());
                break;
            }
            let child = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let Value::Object(m) = child else { break };
            node = m;
        }
    }
    Value::Object(root)
}

/// Interpret a flag or environment string: JSON scalars keep their type,
/// anything else stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Y::Mapping(mapping) => {
            let mut out = Map::new();
            for (k, v) in mapping {
                out.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Y;
    match key {
        Y::String(s) => s,
        Y::Bool(b) => b.to_string(),
        Y::Number(n) => n.to_string(),
        Y::Null => "null".into(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

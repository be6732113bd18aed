use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::decode::{FlatMap, unflatten};
use crate::layers::{Merged, env_suffix};
use cfgsync_core::{Result, SourceKind};

/// Immutable merged view of the configuration at one point in time.
///
/// Equality compares content only (merged values and captured environment),
/// not the generation or origin.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    values: FlatMap,
    #[serde(skip)]
    env: BTreeMap<String, Value>,
    generation: u64,
    origin: String,
    kind: SourceKind,
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.env == other.env
    }
}

impl Snapshot {
    pub(crate) fn new(merged: Merged, origin: String, kind: SourceKind) -> Self {
        Self {
            values: merged.values,
            env: merged.env,
            generation: 0,
            origin,
            kind,
        }
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Value for a dotted key (case-insensitive). Keys no layer stores fall
    /// back to the prefixed environment variable they map to.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.to_lowercase();
        self.values
            .get(&key)
            .or_else(|| self.env.get(&env_suffix(&key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "on" => Some(true),
                "false" | "f" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// All merged keys, sorted. Variables reachable only through the
    /// environment fallback are not listed since their dotted form is ambiguous.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries under `prefix.`, with the prefix stripped.
    pub fn sub(&self, prefix: &str) -> FlatMap {
        let wanted = format!("{}.", prefix.to_lowercase().trim_end_matches('.'));
        self.values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&wanted).map(|rest| (rest.to_string(), v.clone())))
            .collect()
    }

    /// The merged values as a nested JSON object.
    pub fn to_nested(&self) -> Value {
        unflatten(&self.values)
    }

    /// Deserialize the nested view into `T`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_nested())?)
    }

    pub fn values(&self) -> &FlatMap {
        &self.values
    }

    /// 0 for the initial load, incremented on every applied reload.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Display form of the source the content came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }
}

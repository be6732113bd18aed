//! Precedence layers: defaults < source content < environment < overrides.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::decode::{FlatMap, flatten, parse_scalar};
use cfgsync_core::Result;

/// Where environment variables are read from on each load.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The live process environment.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(BTreeMap<String, String>),
}

impl EnvSource {
    pub fn fixed<K: Into<String>, V: Into<String>>(vars: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    fn vars(&self) -> Vec<(String, String)> {
        match self {
            Self::Process => std::env::vars().collect(),
            Self::Fixed(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// Environment variables captured for one load, keyed by their upper-cased
/// name with the prefix (and its separator) removed, e.g. `SERVER_PORT`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvCapture {
    vars: BTreeMap<String, String>,
}

impl EnvCapture {
    pub fn capture(prefix: &str, source: &EnvSource) -> Self {
        let wanted = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}_", prefix.to_ascii_uppercase())
        };
        let vars = source
            .vars()
            .into_iter()
            .filter_map(|(name, value)| {
                let upper = name.to_ascii_uppercase();
                let rest = upper.strip_prefix(&wanted)?;
                (!rest.is_empty()).then(|| (rest.to_string(), value))
            })
            .collect();
        Self { vars }
    }

    /// Look up the variable a dotted key maps to.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.vars.get(&env_suffix(key)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }
}

/// `server.port` → `SERVER_PORT`.
pub fn env_suffix(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}

/// Full variable name for `key` under `prefix`, e.g. `APP_SERVER_PORT`.
pub fn env_var_name(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        env_suffix(key)
    } else {
        format!("{}_{}", prefix.to_ascii_uppercase(), env_suffix(key))
    }
}

/// Defaults, environment prefix and explicit overrides around the source content.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    pub(crate) defaults: FlatMap,
    pub(crate) overrides: FlatMap,
    pub(crate) env_prefix: String,
    pub(crate) env: EnvSource,
}

/// Result of a precedence merge.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub values: FlatMap,
    /// Every captured variable keyed by env suffix (`SERVER_PORT`), whether
    /// or not it overlaid a stored key.
    pub env: BTreeMap<String, Value>,
}

impl Layers {
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
            ..Default::default()
        }
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    pub fn set_env_source(&mut self, env: EnvSource) {
        self.env = env;
    }

    /// Register a default; nested objects are flattened.
    pub fn set_default(&mut self, key: &str, value: Value) {
        insert_flat(&mut self.defaults, key, value);
    }

    /// Register defaults from any serializable value (usually a struct with `Default`).
    pub fn set_defaults_from<T: Serialize>(&mut self, defaults: &T) -> Result<()> {
        let tree = serde_json::to_value(defaults)?;
        self.defaults.extend(flatten(&tree));
        Ok(())
    }

    /// Bind an explicit override; always wins over every other layer.
    pub fn set_override(&mut self, key: &str, value: Value) {
        insert_flat(&mut self.overrides, key, value);
    }

    /// Bind a `key=value` string override.
    pub fn set_override_str(&mut self, key: &str, raw: &str) {
        self.set_override(key, parse_scalar(raw));
    }

    pub fn overrides(&self) -> &FlatMap {
        &self.overrides
    }

    /// Overlay the layers on freshly decoded source content.
    pub fn merge(&self, content: FlatMap) -> Merged {
        let env = EnvCapture::capture(&self.env_prefix, &self.env);

        let mut values = self.defaults.clone();
        values.extend(content);
        for (key, value) in values.iter_mut() {
            if let Some(raw) = env.lookup(key) {
                *value = parse_scalar(raw);
            }
        }
        values.extend(self.overrides.clone());

        let env = env
            .iter()
            .map(|(suffix, raw)| (suffix.clone(), parse_scalar(raw)))
            .collect();

        Merged { values, env }
    }
}

fn insert_flat(map: &mut FlatMap, key: &str, value: Value) {
    let key = key.to_lowercase();
    match value {
        Value::Object(_) => {
            for (sub, leaf) in flatten(&value) {
                map.insert(format!("{key}.{sub}"), leaf);
            }
        }
        leaf => {
            map.insert(key, leaf);
        }
    }
}

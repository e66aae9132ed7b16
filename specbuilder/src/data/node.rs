use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the type discriminator of a fragment.
pub const TYPE_KEY: &str = "type";

/// A single configuration fragment, `{ "type": tag, ...fields }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ConfigNode(Map<String, Value>);

impl ConfigNode {
    /// An empty fragment (`{}`).
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Copy `value` into a fragment if it is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(Self)
    }

    /// The discriminator, if present and non-empty.
    pub fn type_tag(&self) -> Option<&str> {
        self.0
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .filter(|tag| !tag.is_empty())
    }

    pub fn set_type(&mut self, tag: &str) {
        self.0
            .insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.0.insert(key.to_string(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Elements of the list stored at `key`; empty when absent or not a list.
    pub fn list(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Detach the list stored at `key`, yielding an empty one when absent.
    pub fn take_list(&mut self, key: &str) -> Vec<Value> {
        match self.0.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    /// Remove, in place, every key not in `allowed`.
    ///
    /// Idempotent: a second call with the same allow-list changes nothing.
    pub fn prune(&mut self, allowed: &[&str]) {
        let stale: Vec<String> = self
            .0
            .keys()
            .filter(|key| !allowed.iter().any(|a| *a == key.as_str()))
            .cloned()
            .collect();
        for key in stale {
            trace!("pruned `{key}`");
            self.0.remove(&key);
        }
    }
}

impl From<Map<String, Value>> for ConfigNode {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ConfigNode> for Value {
    fn from(node: ConfigNode) -> Self {
        Value::Object(node.0)
    }
}

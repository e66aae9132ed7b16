use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::node::ConfigNode;

/// Opaque side channel every node may read and merge keys into.
pub type Settings = Map<String, Value>;

/// The value exchanged between a parent, its children and the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Options {
    /// Fragment under edit; `null` once cleared.
    #[serde(default)]
    pub builder: Option<ConfigNode>,
    /// Shared settings.
    #[serde(default)]
    pub settings: Settings,
}

impl Options {
    pub fn new(builder: Option<ConfigNode>, settings: Settings) -> Self {
        Self { builder, settings }
    }

    /// The builder, or `{}` when there is none.
    pub fn builder_or_empty(&self) -> ConfigNode {
        self.builder.clone().unwrap_or_default()
    }

    /// The slice a parent hands to a hosted child: `builder` plus the shared settings.
    pub fn slice(&self, builder: Option<ConfigNode>) -> Options {
        Options {
            builder,
            settings: self.settings.clone(),
        }
    }

    /// Take a child's push: merge its settings and return its builder for the
    /// parent to place.
    pub fn absorb(&mut self, child: Options) -> Option<ConfigNode> {
        merge_settings(&mut self.settings, child.settings);
        child.builder
    }

    /// Adopt a child's push wholesale, for parents whose child edits the whole builder.
    pub fn adopt(&self, child: Options) -> Options {
        let mut next = self.clone();
        next.builder = next.absorb(child);
        next
    }

    pub fn with_builder(&self, builder: Option<ConfigNode>) -> Options {
        Options {
            builder,
            settings: self.settings.clone(),
        }
    }

    pub fn with_settings(&self, settings: Settings) -> Options {
        let mut next = self.clone();
        merge_settings(&mut next.settings, settings);
        next
    }
}

/// Shallow merge of `from` into `into`; on a shared key the last write wins.
pub fn merge_settings(into: &mut Settings, from: Settings) {
    for (key, value) in from {
        into.insert(key, value);
    }
}

/// JSON Schema of the [`Options`] value.
pub fn schema() -> serde_json::Result<Value> {
    serde_json::to_value(schemars::schema_for!(Options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings(value: Value) -> Settings {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_one_at_a_time_matches_batched() {
        let mut stepwise = Settings::new();
        merge_settings(&mut stepwise, settings(json!({"a": 1})));
        merge_settings(&mut stepwise, settings(json!({"b": 2})));
        merge_settings(&mut stepwise, settings(json!({"a": 3})));

        let mut batch = settings(json!({"a": 1}));
        merge_settings(&mut batch, settings(json!({"b": 2})));
        let mut batched = Settings::new();
        merge_settings(&mut batched, batch);
        merge_settings(&mut batched, settings(json!({"a": 3})));

        assert_eq!(Value::Object(stepwise.clone()), json!({"a": 3, "b": 2}));
        assert_eq!(stepwise, batched);
    }

    #[test]
    fn test_absorb_keeps_keys_from_other_children() {
        let mut parent = Options::new(None, settings(json!({"shared": true})));
        let first = parent.slice(None).with_settings(settings(json!({"left": 1})));
        let second = parent.slice(None).with_settings(settings(json!({"right": 2})));
        parent.absorb(first);
        parent.absorb(second);
        assert_eq!(
            Value::Object(parent.settings),
            json!({"shared": true, "left": 1, "right": 2})
        );
    }

    #[test]
    fn test_null_builder_round_trips() {
        let options: Options = serde_json::from_value(json!({"builder": null})).unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"builder": null, "settings": {}})
        );
    }

    #[test]
    fn test_schema_describes_both_properties() {
        let schema = schema().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("builder"));
        assert!(properties.contains_key("settings"));
    }
}

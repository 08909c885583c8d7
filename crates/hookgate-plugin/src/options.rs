//! Configuration handed to plugin factories.

use serde::de::DeserializeOwned;

/// Options passed to a plugin factory.
///
/// Sourced from the `[plugins.options.<module>]` table; an empty object when
/// the host configures nothing for the module.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginOptions {
    /// Raw option table.
    value: serde_json::Value,
}

impl PluginOptions {
    /// Wraps a raw option table.
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Returns an empty option table.
    pub fn empty() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Returns the raw option table.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Gets a single option by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.value.get(key)
    }

    /// Returns whether no options were supplied.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Null => true,
            _ => false,
        }
    }

    /// Deserializes the option table into a plugin-defined struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        limit: u32,
    }

    #[test]
    fn test_parse_typed_options() {
        let options = PluginOptions::new(serde_json::json!({ "limit": 7 }));
        let parsed: Sample = options.parse().unwrap();
        assert_eq!(parsed.limit, 7);
        assert!(!options.is_empty());
    }

    #[test]
    fn test_empty_options_use_struct_defaults() {
        let options = PluginOptions::empty();
        assert!(options.is_empty());
        let parsed: Sample = options.parse().unwrap();
        assert_eq!(parsed.limit, 0);
    }
}

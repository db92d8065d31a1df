use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Storage type of a model. Built-in redis types plus anything registered
/// later through `ModelRegistry::define_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelType {
    String,
    Hash,
    List,
    Set,
    SortedSet,
    Generic,
    Custom(std::string::String),
}

impl ModelType {
    /// Canonical form of a type name: split into words, joined with `_`,
    /// uppercased. Words break at separators, at lower-to-upper changes, at
    /// the end of an acronym and between letters and digits, so `sortedSet`,
    /// `sorted-set` and `Sorted Set` all become `SORTED_SET`, `HTTPServer`
    /// becomes `HTTP_SERVER` and `zset2` becomes `ZSET_2`.
    pub fn normalize(name: &str) -> std::string::String {
        let chars: Vec<char> = name.chars().collect();
        let mut out = std::string::String::with_capacity(name.len() + 4);
        let mut in_word = false;
        for (i, &ch) in chars.iter().enumerate() {
            if !ch.is_alphanumeric() {
                in_word = false;
                continue;
            }
            let starts_word = match i.checked_sub(1).map(|p| chars[p]) {
                Some(prev) if in_word => {
                    let next = chars.get(i + 1).copied();
                    (prev.is_lowercase() && ch.is_uppercase())
                        || (prev.is_numeric() != ch.is_numeric())
                        || (prev.is_uppercase()
                            && ch.is_uppercase()
                            && next.is_some_and(char::is_lowercase))
                }
                _ => true,
            };
            if starts_word && !out.is_empty() {
                out.push('_');
            }
            out.extend(ch.to_uppercase());
            in_word = true;
        }
        out
    }

    pub fn from_name(name: &str) -> Self {
        match Self::normalize(name).as_str() {
            "STRING" => ModelType::String,
            "HASH" => ModelType::Hash,
            "LIST" => ModelType::List,
            "SET" => ModelType::Set,
            "SORTED_SET" => ModelType::SortedSet,
            "GENERIC" => ModelType::Generic,
            other => ModelType::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelType::String => "STRING",
            ModelType::Hash => "HASH",
            ModelType::List => "LIST",
            ModelType::Set => "SET",
            ModelType::SortedSet => "SORTED_SET",
            ModelType::Generic => "GENERIC",
            ModelType::Custom(name) => name,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model definition as written by the caller, before registration.
///
/// Anything besides the known fields lands in `metadata` and is left for the
/// type's customization hook (the HASH hook reads `fields`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "type")]
    pub model_type: String,
    pub key: String,
    #[serde(default, alias = "allowedCommands", skip_serializing_if = "Option::is_none")]
    pub allowed_commands: Option<Vec<String>>,
    #[serde(default, alias = "disabledCommands", skip_serializing_if = "Option::is_none")]
    pub disabled_commands: Option<Vec<String>>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ModelSpec {
    pub fn new(model_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            key: key.into(),
            allowed_commands: None,
            disabled_commands: None,
            metadata: Map::new(),
        }
    }

    pub fn allow<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_commands = Some(commands.into_iter().map(Into::into).collect());
        self
    }

    pub fn disable<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_commands = Some(commands.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(name.into(), value);
        self
    }
}

/// Runtime parameters used to render a key template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum KeyParams {
    #[default]
    Empty,
    Scalar(Value),
    List(Vec<Value>),
    Map(Map<String, Value>),
}

impl KeyParams {
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        KeyParams::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        KeyParams::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for KeyParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => KeyParams::Empty,
            Value::Array(items) => KeyParams::List(items),
            Value::Object(map) => KeyParams::Map(map),
            scalar => KeyParams::Scalar(scalar),
        }
    }
}

impl From<()> for KeyParams {
    fn from(_: ()) -> Self {
        KeyParams::Empty
    }
}

impl From<&str> for KeyParams {
    fn from(value: &str) -> Self {
        KeyParams::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for KeyParams {
    fn from(value: String) -> Self {
        KeyParams::Scalar(Value::String(value))
    }
}

impl From<i64> for KeyParams {
    fn from(value: i64) -> Self {
        KeyParams::Scalar(value.into())
    }
}

impl From<u64> for KeyParams {
    fn from(value: u64) -> Self {
        KeyParams::Scalar(value.into())
    }
}

impl From<i32> for KeyParams {
    fn from(value: i32) -> Self {
        KeyParams::Scalar(value.into())
    }
}

impl<V: Into<Value>> From<Vec<V>> for KeyParams {
    fn from(values: Vec<V>) -> Self {
        KeyParams::positional(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_type_names() {
        assert_eq!(ModelType::normalize("hash"), "HASH");
        assert_eq!(ModelType::normalize("sortedSet"), "SORTED_SET");
        assert_eq!(ModelType::normalize("sorted-set"), "SORTED_SET");
        assert_eq!(ModelType::normalize("Sorted Set"), "SORTED_SET");
        assert_eq!(ModelType::normalize("SORTED_SET"), "SORTED_SET");
        assert_eq!(ModelType::from_name("sorted_set"), ModelType::SortedSet);
        assert_eq!(ModelType::normalize("HTTPServer"), "HTTP_SERVER");
        assert_eq!(ModelType::normalize("zset2"), "ZSET_2");
        assert_eq!(ModelType::normalize("  __geo__index "), "GEO_INDEX");
        assert_eq!(
            ModelType::from_name("geoIndex"),
            ModelType::Custom("GEO_INDEX".to_string())
        );
    }

    #[test]
    fn test_params_from_json() {
        assert_eq!(KeyParams::from(json!(null)), KeyParams::Empty);
        assert_eq!(KeyParams::from(json!(3)), KeyParams::Scalar(json!(3)));
        assert_eq!(
            KeyParams::from(json!(["1", 2])),
            KeyParams::List(vec![json!("1"), json!(2)])
        );
        assert!(matches!(KeyParams::from(json!({"a": 1})), KeyParams::Map(_)));
    }

    #[test]
    fn test_spec_deserializes_metadata() {
        let spec: ModelSpec = serde_json::from_value(json!({
            "type": "HASH",
            "key": "post:{postId}",
            "allowedCommands": ["hget"],
            "fields": {"count": {"like": "like:count"}}
        }))
        .unwrap();

        assert_eq!(spec.model_type, "HASH");
        assert_eq!(spec.allowed_commands, Some(vec!["hget".to_string()]));
        assert_eq!(spec.disabled_commands, None);
        assert_eq!(spec.metadata["fields"]["count"]["like"], json!("like:count"));
    }
}

use crate::domain::model::KeyParams;
use crate::utils::error::KeyError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"))
}

/// A key pattern such as `post:{postId}:comments:{commentId}`, split into
/// literal segments and the placeholder names between them.
///
/// `segments` always has one more entry than `placeholders`, so rendering is
/// `segments[0] + v0 + segments[1] + v1 + ... + segments[n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    segments: Vec<String>,
    placeholders: Vec<String>,
}

impl KeyTemplate {
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut placeholders = Vec::new();
        let mut last = 0;

        for caps in placeholder_pattern().captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            segments.push(pattern[last..whole.start()].to_string());
            placeholders.push(name.as_str().to_string());
            last = whole.end();
        }
        segments.push(pattern[last..].to_string());

        Self {
            raw: pattern.to_string(),
            segments,
            placeholders,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn is_literal(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Render a concrete key. Never panics; a bad parameter set comes back as
    /// a `KeyError` so callers can hold on to it.
    pub fn render(&self, params: &KeyParams) -> Result<String, KeyError> {
        match self.placeholders.len() {
            0 => Ok(self.raw.clone()),
            1 if !matches!(params, KeyParams::List(_) | KeyParams::Map(_)) => {
                let value = match params {
                    KeyParams::Scalar(value) => value,
                    _ => &Value::Null,
                };
                if !is_key_value(value) {
                    return Err(KeyError::InvalidParamType {
                        placeholder: self.placeholders[0].clone(),
                        value: value.to_string(),
                    });
                }
                Ok(format!(
                    "{}{}{}",
                    self.segments[0],
                    value_text(value),
                    self.segments[1]
                ))
            }
            _ => match params {
                KeyParams::Map(map) => self.render_named(map),
                KeyParams::List(values) => self.render_positional(values),
                KeyParams::Scalar(value) => self.render_positional(std::slice::from_ref(value)),
                KeyParams::Empty => self.render_positional(&[]),
            },
        }
    }

    fn render_positional(&self, values: &[Value]) -> Result<String, KeyError> {
        if values.len() != self.placeholders.len() {
            let missing = self
                .placeholders
                .iter()
                .skip(values.len())
                .cloned()
                .collect();
            return Err(self.mismatch(missing, values.len()));
        }
        Ok(self.interleave(values.iter()))
    }

    fn render_named(&self, map: &Map<String, Value>) -> Result<String, KeyError> {
        let accepted: Vec<Option<&Value>> = self
            .placeholders
            .iter()
            .map(|name| map.get(name).filter(|value| is_key_value(value)))
            .collect();

        if accepted.iter().any(Option::is_none) {
            let mut missing: Vec<String> = Vec::new();
            for (name, value) in self.placeholders.iter().zip(&accepted) {
                if value.is_none() && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
            let supplied = accepted.iter().filter(|value| value.is_some()).count();
            return Err(self.mismatch(missing, supplied));
        }

        Ok(self.interleave(accepted.into_iter().flatten()))
    }

    fn interleave<'a>(&self, values: impl Iterator<Item = &'a Value>) -> String {
        let mut key = String::with_capacity(self.raw.len());
        let mut segments = self.segments.iter();
        for value in values {
            if let Some(segment) = segments.next() {
                key.push_str(segment);
            }
            key.push_str(&value_text(value));
        }
        for segment in segments {
            key.push_str(segment);
        }
        key
    }

    fn mismatch(&self, missing: Vec<String>, supplied: usize) -> KeyError {
        KeyError::ParamCountMismatch {
            expected: self.placeholders.clone(),
            missing,
            supplied,
        }
    }
}

/// Keys accept numbers and non-empty strings only.
pub fn is_key_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Text form of a key or argument value. Integral floats drop the
/// fraction, so `1.0` and `1` produce the same key.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

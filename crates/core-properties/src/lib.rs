//! core-properties: read-only view over the configuration document.
//!
//! A [`PropertyNode`] wraps one JSON value together with the path that led
//! to it, so every extraction failure names the exact offending location.
//! Typed extraction goes through [`FromProperty`]; lookups distinguish the
//! required form ([`PropertyNode::get`]) from the defaulted form
//! ([`PropertyNode::get_or`]).

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

mod convert;

pub use convert::FromProperty;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("couldn't open configuration file {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("couldn't parse configuration file {path}: {source}")]
    FileParse {
        path: String,
        source: serde_json::Error,
    },
    #[error("expected property \"{path}\" to be of type {expected} but found {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("required property \"{path}\" not found")]
    Missing { path: String },
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "decimal",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One node of the configuration document, carrying its path for error
/// messages.
#[derive(Debug, Clone)]
pub struct PropertyNode<'v> {
    path: String,
    value: Cow<'v, Value>,
}

impl<'v> PropertyNode<'v> {
    pub fn new(path: impl Into<String>, value: &'v Value) -> Self {
        PropertyNode {
            path: path.into(),
            value: Cow::Borrowed(value),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn json(&self) -> &Value {
        self.value.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        type_name(self.json())
    }

    /// Typed extraction; fails with the node's path, the expected shape and
    /// the actual one.
    pub fn value<T: FromProperty>(&self) -> Result<T, PropertyError> {
        T::from_property(self).ok_or_else(|| PropertyError::TypeMismatch {
            path: self.path.clone(),
            expected: T::EXPECTED,
            actual: self.type_name(),
        })
    }

    /// Predicate form of [`PropertyNode::value`]; never fails.
    pub fn is<T: FromProperty>(&self) -> bool {
        T::from_property(self).is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        matches!(self.json(), Value::Object(members) if members.contains_key(key))
    }

    fn child_path(&self, key: &str) -> String {
        format!("{}/{}", self.path, key)
    }

    fn lookup(&self, key: &str, default: Value) -> Result<PropertyNode<'_>, PropertyError> {
        let Value::Object(members) = self.json() else {
            return Err(PropertyError::TypeMismatch {
                path: self.path.clone(),
                expected: "object",
                actual: self.type_name(),
            });
        };
        let path = self.child_path(key);
        let value = match members.get(key) {
            Some(stored) => Cow::Borrowed(stored),
            None => Cow::Owned(default),
        };
        if value.as_ref().is_null() {
            return Err(PropertyError::Missing { path });
        }
        Ok(PropertyNode { path, value })
    }

    /// Required member lookup. Absent keys (and explicit nulls) fail with
    /// [`PropertyError::Missing`].
    pub fn child(&self, key: &str) -> Result<PropertyNode<'_>, PropertyError> {
        self.lookup(key, Value::Null)
    }

    /// Member lookup with a per-access default, returned as if present.
    pub fn child_or(
        &self,
        key: &str,
        default: impl Into<Value>,
    ) -> Result<PropertyNode<'_>, PropertyError> {
        self.lookup(key, default.into())
    }

    /// Required member, extracted in one step.
    pub fn get<T: FromProperty>(&self, key: &str) -> Result<T, PropertyError> {
        self.child(key)?.value()
    }

    /// Defaulted member, extracted in one step.
    pub fn get_or<T: FromProperty>(
        &self,
        key: &str,
        default: impl Into<Value>,
    ) -> Result<T, PropertyError> {
        self.child_or(key, default)?.value()
    }

    /// Iterates an array node, yielding children with indexed paths.
    pub fn iter(
        &self,
    ) -> Result<impl Iterator<Item = PropertyNode<'_>> + '_, PropertyError> {
        let Value::Array(elements) = self.json() else {
            return Err(PropertyError::TypeMismatch {
                path: self.path.clone(),
                expected: "array",
                actual: self.type_name(),
            });
        };
        let path = &self.path;
        Ok(elements.iter().enumerate().map(move |(index, element)| {
            PropertyNode {
                path: format!("{path}[{index}]"),
                value: Cow::Borrowed(element),
            }
        }))
    }
}

/// The loaded configuration document.
#[derive(Debug)]
pub struct Properties {
    root: Value,
}

impl Properties {
    pub fn load(path: &Path) -> Result<Properties, PropertyError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| PropertyError::FileRead {
            path: display.clone(),
            source,
        })?;
        let root = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| PropertyError::FileParse {
                path: display,
                source,
            })?;
        Ok(Properties { root })
    }

    pub fn from_value(root: Value) -> Properties {
        Properties { root }
    }

    pub fn node(&self) -> PropertyNode<'_> {
        PropertyNode::new("", &self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use core_types::Rgb;

    fn doc(value: Value) -> Properties {
        Properties::from_value(value)
    }

    #[test]
    fn extracts_scalars() {
        let properties = doc(json!({"port": 1883, "host": "broker", "retain": true, "speed": 0.5}));
        let node = properties.node();
        assert_eq!(node.get::<u16>("port").unwrap(), 1883);
        assert_eq!(node.get::<String>("host").unwrap(), "broker");
        assert!(node.get::<bool>("retain").unwrap());
        assert_eq!(node.get::<f64>("speed").unwrap(), 0.5);
    }

    #[test]
    fn missing_required_key_names_the_path() {
        let properties = doc(json!({"outer": {}}));
        let error = properties
            .node()
            .child("outer")
            .unwrap()
            .get::<u16>("port")
            .unwrap_err();
        assert!(matches!(
            error,
            PropertyError::Missing { ref path } if path == "/outer/port"
        ));
    }

    #[test]
    fn defaults_apply_when_absent() {
        let properties = doc(json!({}));
        let node = properties.node();
        assert_eq!(node.get_or::<u16>("port", 1883).unwrap(), 1883);
        assert_eq!(
            node.get_or::<String>("clientId", "").unwrap(),
            String::new()
        );
    }

    #[test]
    fn stored_values_win_over_defaults() {
        let properties = doc(json!({"port": 9000}));
        assert_eq!(properties.node().get_or::<u16>("port", 1883).unwrap(), 9000);
    }

    #[test]
    fn type_mismatch_reports_expected_and_actual() {
        let properties = doc(json!({"port": "nine"}));
        let error = properties.node().get::<u16>("port").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("/port"));
        assert!(message.contains("number"));
        assert!(message.contains("string"));
    }

    #[test]
    fn durations_parse_from_suffixed_strings() {
        let properties = doc(json!({"speed": "500ms", "long": "2min"}));
        let node = properties.node();
        assert_eq!(
            node.get::<Duration>("speed").unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(
            node.get::<Duration>("long").unwrap(),
            Duration::from_secs(120)
        );
        assert!(!node.child("speed").unwrap().is::<u64>());
    }

    #[test]
    fn durations_reject_bare_numbers() {
        let properties = doc(json!({"speed": 500}));
        assert!(properties.node().get::<Duration>("speed").is_err());
    }

    #[test]
    fn colors_parse_from_hex_strings() {
        let properties = doc(json!({"color": "ff0080"}));
        assert_eq!(
            properties.node().get::<Rgb>("color").unwrap(),
            Rgb::new(0xff, 0x00, 0x80)
        );
    }

    #[test]
    fn homogeneous_arrays_extract() {
        let properties = doc(json!({"pins": [17, 22, 27]}));
        assert_eq!(
            properties.node().get::<Vec<u16>>("pins").unwrap(),
            vec![17, 22, 27]
        );
    }

    #[test]
    fn array_iteration_yields_indexed_paths() {
        let properties = doc(json!({"components": [{"type": "a"}, {"type": "b"}]}));
        let node = properties.node();
        let components = node.child("components").unwrap();
        let paths: Vec<String> = components
            .iter()
            .unwrap()
            .map(|child| child.path().to_string())
            .collect();
        assert_eq!(paths, vec!["/components[0]", "/components[1]"]);
    }

    #[test]
    fn iterating_a_non_array_fails() {
        let properties = doc(json!({"components": {"type": "a"}}));
        let node = properties.node();
        let components = node.child("components").unwrap();
        assert!(matches!(
            components.iter().map(|_| ()).err(),
            Some(PropertyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let properties = doc(json!({"id": null}));
        assert!(matches!(
            properties.node().child("id"),
            Err(PropertyError::Missing { .. })
        ));
    }
}

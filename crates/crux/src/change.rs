//! Payloads of property writes: the [`ChangeSet`] carried by the `changed`
//! event and the [`SetOptions`] accepted by setters.
//!
//! On the wire a change set is a JSON object keyed by property name:
//!
//! ```
//! use crux::ChangeSet;
//! use serde_json::json;
//!
//! let changes = ChangeSet::single("foo", json!(2), json!(1));
//! assert_eq!(changes.to_value(), json!({"foo": {"newVal": 2, "priorVal": 1}}));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One property transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub new_val: Value,
    pub prior_val: Value,
}

impl Change {
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert("newVal".to_string(), self.new_val.clone());
        map.insert("priorVal".to_string(), self.prior_val.clone());
        Value::Object(map)
    }
}

/// Ordered mapping from property name to its [`Change`].
///
/// Built fresh for every emitted `changed` event and not retained after
/// delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(IndexMap<String, Change>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<String>, new_val: Value, prior_val: Value) -> Self {
        let mut set = Self::new();
        set.insert(name, new_val, prior_val);
        set
    }

    pub fn insert(&mut self, name: impl Into<String>, new_val: Value, prior_val: Value) {
        self.0.insert(name.into(), Change { new_val, prior_val });
    }

    pub fn get(&self, name: &str) -> Option<&Change> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.0.iter().map(|(name, change)| (name.as_str(), change))
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, change)| (name.clone(), change.to_value()))
            .collect();
        Value::Object(map)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| Error::MalformedChangeSet(e.to_string()))
    }

    /// Decodes the change set from the arguments of a `changed` delivery.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        let first = args
            .first()
            .ok_or_else(|| Error::MalformedChangeSet("missing change set argument".to_string()))?;
        Self::from_value(first)
    }
}

/// Options for a single property write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Suppress the `changed` event. The change hook still runs.
    pub quiet: bool,
}

impl SetOptions {
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Reads options passed as a trailing behavior argument. `null` and a
    /// missing argument both mean the defaults.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(v) => serde_json::from_value(v.clone()).map_err(Error::InvalidSetOptions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_set_value_matches_serde_encoding() {
        let mut changes = ChangeSet::new();
        changes.insert("a", json!("x"), json!(null));
        changes.insert("b", json!([1, 2]), json!([]));
        assert_eq!(changes.to_value(), serde_json::to_value(&changes).unwrap());
    }

    #[test]
    fn change_set_keeps_insertion_order() {
        let mut changes = ChangeSet::new();
        changes.insert("z", json!(1), json!(0));
        changes.insert("a", json!(2), json!(0));
        let names: Vec<&str> = changes.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn change_set_decodes_from_event_args() {
        let args = vec![json!({"foo": {"newVal": 2, "priorVal": 1}})];
        let changes = ChangeSet::from_args(&args).unwrap();
        assert_eq!(changes.len(), 1);
        let foo = changes.get("foo").unwrap();
        assert_eq!(foo.new_val, json!(2));
        assert_eq!(foo.prior_val, json!(1));
    }

    #[test]
    fn change_set_rejects_bad_payloads() {
        assert!(matches!(
            ChangeSet::from_args(&[]),
            Err(Error::MalformedChangeSet(_))
        ));
        assert!(matches!(
            ChangeSet::from_args(&[json!(42)]),
            Err(Error::MalformedChangeSet(_))
        ));
        assert!(matches!(
            ChangeSet::from_args(&[json!({"foo": {"newVal": 1}})]),
            Err(Error::MalformedChangeSet(_))
        ));
    }

    #[test]
    fn set_options_defaults() {
        assert_eq!(SetOptions::from_value(None).unwrap(), SetOptions::default());
        assert_eq!(
            SetOptions::from_value(Some(&json!(null))).unwrap(),
            SetOptions::default()
        );
        assert_eq!(
            SetOptions::from_value(Some(&json!({}))).unwrap(),
            SetOptions::default()
        );
        assert_eq!(
            SetOptions::from_value(Some(&json!({"quiet": true}))).unwrap(),
            SetOptions::quiet()
        );
    }

    #[test]
    fn set_options_rejects_wrong_types() {
        assert!(matches!(
            SetOptions::from_value(Some(&json!({"quiet": "yes"}))),
            Err(Error::InvalidSetOptions(_))
        ));
        assert!(matches!(
            SetOptions::from_value(Some(&json!(true))),
            Err(Error::InvalidSetOptions(_))
        ));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic object instances.
//!
//! A live object graph is represented as an [`Instance`] tree: a type name
//! plus member values. Member maps are ordered so that the metadata-driven
//! member walk is deterministic.

use std::collections::BTreeMap;

/// Key of a [`Value::Map`] entry. Schema map keys are integral or string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A dynamic member value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
    Object(Instance),
}

impl Value {
    /// Byte-buffer value. A dedicated constructor avoids a `From<Vec<u8>>`
    /// impl that would collide with the generic array conversion.
    pub fn bytes(v: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(v.into())
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as map.
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as nested instance.
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

/// A dynamic instance of a registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    members: BTreeMap<String, Value>,
}

impl Instance {
    /// Create an empty instance of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: BTreeMap::new(),
        }
    }

    /// Concrete type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Set a member value (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    /// Set a member value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.members.insert(key.into(), value.into());
    }

    /// Get a member value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members.get(key)
    }

    /// Get a mutable member value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.members.get_mut(key)
    }

    /// Remove a member value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.members.remove(key)
    }

    /// All member values in key order.
    pub fn members(&self) -> &BTreeMap<String, Value> {
        &self.members
    }

    /// Number of populated members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no members are populated.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42i32).as_i64(), Some(42));
        assert_eq!(Value::from(2.5f64).as_number(), Some(2.5));
        assert_eq!(Value::from(7i64).as_number(), Some(7.0));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::bytes(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_array_conversion() {
        let v = Value::from(vec![1i64, 2, 3]);
        let arr = v.as_array().expect("array");
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[2].as_i64(), Some(3));
    }

    #[test]
    fn test_instance_members() {
        let mut inst = Instance::new("Position").with("x", 1.0).with("y", 2.0);
        inst.set("label", "origin");
        assert_eq!(inst.type_name(), "Position");
        assert_eq!(inst.len(), 3);
        assert_eq!(inst.get("label").and_then(Value::as_str), Some("origin"));
        assert!(inst.get("z").is_none());
        inst.remove("label");
        assert_eq!(inst.len(), 2);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut map = BTreeMap::new();
        map.insert(MapKey::from("b"), Value::from(2i64));
        map.insert(MapKey::from("a"), Value::from(1i64));
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec![&MapKey::from("a"), &MapKey::from("b")]);
    }

    #[test]
    fn test_deep_equality() {
        let a = Instance::new("Box").with("inner", Instance::new("P").with("x", 1.0));
        let b = Instance::new("Box").with("inner", Instance::new("P").with("x", 1.0));
        assert_eq!(a, b);
        let c = Instance::new("Box").with("inner", Instance::new("P").with("x", 2.0));
        assert_ne!(a, c);
    }
}

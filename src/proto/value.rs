// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-keyed values exchanged with the wire codec.

/// A raw protobuf value tree.
///
/// Messages are ordered `(field number, value)` lists; a repeated field
/// simply contributes multiple entries with the same number. Map fields are
/// represented as repeated entry messages with key = field 1 and value =
/// field 2, matching the wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Float(f32),
    Str(String),
    Bytes(Vec<u8>),
    Message(Vec<(u32, ProtoValue)>),
}

impl ProtoValue {
    /// Empty message value.
    pub fn message() -> Self {
        Self::Message(Vec::new())
    }

    /// Push a field entry (message values only; no-op otherwise).
    pub fn push(&mut self, number: u32, value: ProtoValue) {
        if let Self::Message(fields) = self {
            fields.push((number, value));
        }
    }

    /// First entry for a field number.
    pub fn field(&self, number: u32) -> Option<&ProtoValue> {
        match self {
            Self::Message(fields) => fields.iter().find(|(n, _)| *n == number).map(|(_, v)| v),
            _ => None,
        }
    }

    /// All entries for a field number, in wire order.
    pub fn fields(&self, number: u32) -> Vec<&ProtoValue> {
        match self {
            Self::Message(fields) => fields
                .iter()
                .filter(|(n, _)| *n == number)
                .map(|(_, v)| v)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of a message value.
    pub fn entries(&self) -> &[(u32, ProtoValue)] {
        match self {
            Self::Message(fields) => fields,
            _ => &[],
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

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_fields() {
        let mut msg = ProtoValue::message();
        msg.push(1, ProtoValue::Str("a".into()));
        msg.push(2, ProtoValue::Int32(1));
        msg.push(2, ProtoValue::Int32(2));

        assert_eq!(msg.field(1).and_then(ProtoValue::as_str), Some("a"));
        assert_eq!(msg.fields(2).len(), 2);
        assert!(msg.field(3).is_none());
    }
}

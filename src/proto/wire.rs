// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proto3 wire format encoding/decoding for [`ProtoValue`] trees.

use crate::proto::model::{FieldDescriptor, FieldKind, MessageDescriptor, ScalarKind};
use crate::proto::pool::LinkedSchemas;
use crate::proto::ProtoValue;
use std::fmt;

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// Errors for wire-level encode/decode.
#[derive(Debug)]
pub enum WireError {
    BufferTooSmall { need: usize, have: usize },
    InvalidVarint,
    TypeMismatch { expected: String, found: String },
    WrongWireType { field: String, found: u64 },
    UnknownField { message: String, number: u32 },
    UnknownType(String),
    Utf8Error(std::string::FromUtf8Error),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { need, have } => {
                write!(f, "buffer too small: need {} bytes, have {}", need, have)
            }
            Self::InvalidVarint => write!(f, "invalid varint"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Self::WrongWireType { field, found } => {
                write!(f, "wrong wire type {} for field {}", found, field)
            }
            Self::UnknownField { message, number } => {
                write!(f, "unknown field number {} for message {}", number, message)
            }
            Self::UnknownType(name) => write!(f, "unknown type: {}", name),
            Self::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::string::FromUtf8Error> for WireError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Utf8Error(e)
    }
}

fn mismatch(expected: &str, found: &ProtoValue) -> WireError {
    WireError::TypeMismatch {
        expected: expected.to_string(),
        found: format!("{:?}", found),
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encode a field-keyed message value against its descriptor.
pub fn encode_message(
    value: &ProtoValue,
    message: &MessageDescriptor,
    set: &LinkedSchemas,
) -> Result<Vec<u8>, WireError> {
    let mut buffer = Vec::new();
    let ProtoValue::Message(entries) = value else {
        return Err(mismatch("message", value));
    };
    for (number, entry) in entries {
        let field = message.field_by_number(*number).ok_or(WireError::UnknownField {
            message: message.name.clone(),
            number: *number,
        })?;
        encode_field(&mut buffer, field, entry, set)?;
    }
    Ok(buffer)
}

fn encode_field(
    buffer: &mut Vec<u8>,
    field: &FieldDescriptor,
    value: &ProtoValue,
    set: &LinkedSchemas,
) -> Result<(), WireError> {
    match &field.kind {
        FieldKind::Scalar(kind) => encode_scalar(buffer, field.number, *kind, value),
        // Enum values travel as varints.
        FieldKind::Enum(_) => match value {
            ProtoValue::Int32(v) => {
                put_tag(buffer, field.number, WIRE_VARINT);
                put_varint(buffer, *v as i64 as u64);
                Ok(())
            }
            other => Err(mismatch("enum (int32)", other)),
        },
        FieldKind::Message(name) => {
            let sub = set
                .message(name)
                .ok_or_else(|| WireError::UnknownType(name.clone()))?;
            let bytes = encode_message(value, sub, set)?;
            put_tag(buffer, field.number, WIRE_LEN);
            put_varint(buffer, bytes.len() as u64);
            buffer.extend_from_slice(&bytes);
            Ok(())
        }
        FieldKind::Map(key_kind, value_kind) => {
            // One length-delimited entry message per map pair.
            let mut entry = Vec::new();
            if let Some(key) = value.field(1) {
                encode_scalar(&mut entry, 1, *key_kind, key)?;
            }
            if let Some(val) = value.field(2) {
                match value_kind.as_ref() {
                    FieldKind::Scalar(kind) => encode_scalar(&mut entry, 2, *kind, val)?,
                    FieldKind::Message(name) => {
                        let sub = set
                            .message(name)
                            .ok_or_else(|| WireError::UnknownType(name.clone()))?;
                        let bytes = encode_message(val, sub, set)?;
                        put_tag(&mut entry, 2, WIRE_LEN);
                        put_varint(&mut entry, bytes.len() as u64);
                        entry.extend_from_slice(&bytes);
                    }
                    FieldKind::Enum(_) => match val {
                        ProtoValue::Int32(v) => {
                            put_tag(&mut entry, 2, WIRE_VARINT);
                            put_varint(&mut entry, *v as i64 as u64);
                        }
                        other => return Err(mismatch("enum (int32)", other)),
                    },
                    FieldKind::Map(..) => {
                        return Err(WireError::TypeMismatch {
                            expected: "non-map map value".into(),
                            found: "nested map".into(),
                        })
                    }
                }
            }
            put_tag(buffer, field.number, WIRE_LEN);
            put_varint(buffer, entry.len() as u64);
            buffer.extend_from_slice(&entry);
            Ok(())
        }
    }
}

fn encode_scalar(
    buffer: &mut Vec<u8>,
    number: u32,
    kind: ScalarKind,
    value: &ProtoValue,
) -> Result<(), WireError> {
    match (kind, value) {
        (ScalarKind::Bool, ProtoValue::Bool(v)) => {
            put_tag(buffer, number, WIRE_VARINT);
            put_varint(buffer, u64::from(*v));
        }
        (ScalarKind::Int32, ProtoValue::Int32(v)) => {
            put_tag(buffer, number, WIRE_VARINT);
            // Negative int32 sign-extends to a 10-byte varint, per proto3.
            put_varint(buffer, *v as i64 as u64);
        }
        (ScalarKind::Int64, ProtoValue::Int64(v)) => {
            put_tag(buffer, number, WIRE_VARINT);
            put_varint(buffer, *v as u64);
        }
        (ScalarKind::Double, ProtoValue::Double(v)) => {
            put_tag(buffer, number, WIRE_FIXED64);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (ScalarKind::Float, ProtoValue::Float(v)) => {
            put_tag(buffer, number, WIRE_FIXED32);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (ScalarKind::String, ProtoValue::Str(v)) => {
            put_tag(buffer, number, WIRE_LEN);
            put_varint(buffer, v.len() as u64);
            buffer.extend_from_slice(v.as_bytes());
        }
        (ScalarKind::Bytes, ProtoValue::Bytes(v)) => {
            put_tag(buffer, number, WIRE_LEN);
            put_varint(buffer, v.len() as u64);
            buffer.extend_from_slice(v);
        }
        (kind, other) => return Err(mismatch(&format!("{:?}", kind), other)),
    }
    Ok(())
}

fn put_tag(buffer: &mut Vec<u8>, number: u32, wire_type: u64) {
    put_varint(buffer, (u64::from(number) << 3) | wire_type);
}

fn put_varint(buffer: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            break;
        }
        buffer.push(byte | 0x80);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], WireError> {
        // `count` comes straight off the wire and may be near usize::MAX;
        // compare against the remainder instead of adding to the offset.
        if count > self.remaining() {
            return Err(WireError::BufferTooSmall {
                need: count,
                have: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .buffer
                .get(self.offset)
                .ok_or(WireError::InvalidVarint)?;
            self.offset += 1;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(WireError::InvalidVarint);
            }
        }
    }

    /// Skip a value of the given wire type (forward compatibility).
    fn skip(&mut self, wire_type: u64) -> Result<(), WireError> {
        match wire_type {
            WIRE_VARINT => {
                self.read_varint()?;
            }
            WIRE_FIXED64 => {
                self.read_bytes(8)?;
            }
            WIRE_LEN => {
                let len = self.read_varint()? as usize;
                self.read_bytes(len)?;
            }
            WIRE_FIXED32 => {
                self.read_bytes(4)?;
            }
            other => {
                return Err(WireError::WrongWireType {
                    field: "<unknown>".into(),
                    found: other,
                })
            }
        }
        Ok(())
    }
}

/// Decode wire bytes against a message descriptor.
///
/// Unknown field numbers are skipped by wire type; known fields with an
/// unexpected wire type are an error.
pub fn decode_message(
    bytes: &[u8],
    message: &MessageDescriptor,
    set: &LinkedSchemas,
) -> Result<ProtoValue, WireError> {
    let mut cursor = Cursor::new(bytes);
    let mut fields = Vec::new();

    while cursor.remaining() > 0 {
        let tag = cursor.read_varint()?;
        let number = (tag >> 3) as u32;
        let wire_type = tag & 7;

        let Some(field) = message.field_by_number(number) else {
            cursor.skip(wire_type)?;
            continue;
        };

        let value = decode_field(&mut cursor, field, wire_type, set)?;
        fields.push((number, value));
    }

    Ok(ProtoValue::Message(fields))
}

fn decode_field(
    cursor: &mut Cursor<'_>,
    field: &FieldDescriptor,
    wire_type: u64,
    set: &LinkedSchemas,
) -> Result<ProtoValue, WireError> {
    match &field.kind {
        FieldKind::Scalar(kind) => decode_scalar(cursor, &field.name, *kind, wire_type),
        FieldKind::Enum(_) => {
            expect_wire_type(&field.name, wire_type, WIRE_VARINT)?;
            Ok(ProtoValue::Int32(cursor.read_varint()? as i64 as i32))
        }
        FieldKind::Message(name) => {
            expect_wire_type(&field.name, wire_type, WIRE_LEN)?;
            let len = cursor.read_varint()? as usize;
            let bytes = cursor.read_bytes(len)?;
            let sub = set
                .message(name)
                .ok_or_else(|| WireError::UnknownType(name.clone()))?;
            decode_message(bytes, sub, set)
        }
        FieldKind::Map(key_kind, value_kind) => {
            expect_wire_type(&field.name, wire_type, WIRE_LEN)?;
            let len = cursor.read_varint()? as usize;
            let bytes = cursor.read_bytes(len)?;
            decode_map_entry(bytes, &field.name, *key_kind, value_kind, set)
        }
    }
}

fn decode_map_entry(
    bytes: &[u8],
    field_name: &str,
    key_kind: ScalarKind,
    value_kind: &FieldKind,
    set: &LinkedSchemas,
) -> Result<ProtoValue, WireError> {
    let mut cursor = Cursor::new(bytes);
    let mut entry = Vec::new();
    while cursor.remaining() > 0 {
        let tag = cursor.read_varint()?;
        let number = (tag >> 3) as u32;
        let wire_type = tag & 7;
        match number {
            1 => {
                let key = decode_scalar(&mut cursor, field_name, key_kind, wire_type)?;
                entry.push((1, key));
            }
            2 => {
                let value = match value_kind {
                    FieldKind::Scalar(kind) => {
                        decode_scalar(&mut cursor, field_name, *kind, wire_type)?
                    }
                    FieldKind::Message(name) => {
                        expect_wire_type(field_name, wire_type, WIRE_LEN)?;
                        let len = cursor.read_varint()? as usize;
                        let sub_bytes = cursor.read_bytes(len)?;
                        let sub = set
                            .message(name)
                            .ok_or_else(|| WireError::UnknownType(name.clone()))?;
                        decode_message(sub_bytes, sub, set)?
                    }
                    FieldKind::Enum(_) => {
                        expect_wire_type(field_name, wire_type, WIRE_VARINT)?;
                        ProtoValue::Int32(cursor.read_varint()? as i64 as i32)
                    }
                    FieldKind::Map(..) => {
                        return Err(WireError::TypeMismatch {
                            expected: "non-map map value".into(),
                            found: "nested map".into(),
                        })
                    }
                };
                entry.push((2, value));
            }
            _ => cursor.skip(wire_type)?,
        }
    }
    Ok(ProtoValue::Message(entry))
}

fn decode_scalar(
    cursor: &mut Cursor<'_>,
    field_name: &str,
    kind: ScalarKind,
    wire_type: u64,
) -> Result<ProtoValue, WireError> {
    match kind {
        ScalarKind::Bool => {
            expect_wire_type(field_name, wire_type, WIRE_VARINT)?;
            Ok(ProtoValue::Bool(cursor.read_varint()? != 0))
        }
        ScalarKind::Int32 => {
            expect_wire_type(field_name, wire_type, WIRE_VARINT)?;
            Ok(ProtoValue::Int32(cursor.read_varint()? as i64 as i32))
        }
        ScalarKind::Int64 => {
            expect_wire_type(field_name, wire_type, WIRE_VARINT)?;
            Ok(ProtoValue::Int64(cursor.read_varint()? as i64))
        }
        ScalarKind::Double => {
            expect_wire_type(field_name, wire_type, WIRE_FIXED64)?;
            let bytes = cursor.read_bytes(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(ProtoValue::Double(f64::from_le_bytes(raw)))
        }
        ScalarKind::Float => {
            expect_wire_type(field_name, wire_type, WIRE_FIXED32)?;
            let bytes = cursor.read_bytes(4)?;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            Ok(ProtoValue::Float(f32::from_le_bytes(raw)))
        }
        ScalarKind::String => {
            expect_wire_type(field_name, wire_type, WIRE_LEN)?;
            let len = cursor.read_varint()? as usize;
            let bytes = cursor.read_bytes(len)?;
            Ok(ProtoValue::Str(String::from_utf8(bytes.to_vec())?))
        }
        ScalarKind::Bytes => {
            expect_wire_type(field_name, wire_type, WIRE_LEN)?;
            let len = cursor.read_varint()? as usize;
            let bytes = cursor.read_bytes(len)?;
            Ok(ProtoValue::Bytes(bytes.to_vec()))
        }
    }
}

fn expect_wire_type(field: &str, found: u64, expected: u64) -> Result<(), WireError> {
    if found == expected {
        Ok(())
    } else {
        Err(WireError::WrongWireType {
            field: field.to_string(),
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{parse_file, SchemaPool};
    use std::sync::Arc;

    fn linked(texts: &[&str]) -> Arc<LinkedSchemas> {
        let mut pool = SchemaPool::new();
        for text in texts {
            pool.add_file(parse_file(text).expect("parse")).expect("add");
        }
        pool.link().expect("link")
    }

    #[test]
    fn test_varint_roundtrip() {
        for value in [0u64, 1, 127, 128, 300, u64::from(u32::MAX), u64::MAX] {
            let mut buffer = Vec::new();
            put_varint(&mut buffer, value);
            let mut cursor = Cursor::new(&buffer);
            assert_eq!(cursor.read_varint().unwrap(), value);
        }
    }

    #[test]
    fn test_scalar_roundtrip() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage All {\n\tbool b = 1;\n\tint32 i = 2;\n\tint64 l = 3;\n\tdouble d = 4;\n\tfloat f = 5;\n\tstring s = 6;\n\tbytes raw = 7;\n}",
        ]);
        let msg = set.message("All").unwrap().clone();

        let mut value = ProtoValue::message();
        value.push(1, ProtoValue::Bool(true));
        value.push(2, ProtoValue::Int32(-42));
        value.push(3, ProtoValue::Int64(1 << 40));
        value.push(4, ProtoValue::Double(2.5));
        value.push(5, ProtoValue::Float(0.25));
        value.push(6, ProtoValue::Str("hello".into()));
        value.push(7, ProtoValue::Bytes(vec![1, 2, 3]));

        let bytes = encode_message(&value, &msg, &set).expect("encode");
        let decoded = decode_message(&bytes, &msg, &set).expect("decode");

        assert_eq!(decoded.field(1), Some(&ProtoValue::Bool(true)));
        assert_eq!(decoded.field(2), Some(&ProtoValue::Int32(-42)));
        assert_eq!(decoded.field(3), Some(&ProtoValue::Int64(1 << 40)));
        assert_eq!(decoded.field(4), Some(&ProtoValue::Double(2.5)));
        assert_eq!(decoded.field(5), Some(&ProtoValue::Float(0.25)));
        assert_eq!(decoded.field(6).and_then(ProtoValue::as_str), Some("hello"));
        assert_eq!(
            decoded.field(7),
            Some(&ProtoValue::Bytes(vec![1, 2, 3]))
        );
    }

    #[test]
    fn test_nested_and_repeated() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage Point { double x = 1; }",
            "package t;\nsyntax = \"proto3\";\nimport \"Point.proto\";\nmessage Path { repeated Point points = 1; string name = 2; }",
        ]);
        let path = set.message("Path").unwrap().clone();

        let mut value = ProtoValue::message();
        for x in [1.0, 2.0, 3.0] {
            let mut point = ProtoValue::message();
            point.push(1, ProtoValue::Double(x));
            value.push(1, point);
        }
        value.push(2, ProtoValue::Str("track".into()));

        let bytes = encode_message(&value, &path, &set).expect("encode");
        let decoded = decode_message(&bytes, &path, &set).expect("decode");
        let points = decoded.fields(1);
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].field(1), Some(&ProtoValue::Double(2.0)));
        assert_eq!(decoded.field(2).and_then(ProtoValue::as_str), Some("track"));
    }

    #[test]
    fn test_map_roundtrip() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage Dict { map<string, int32> entries = 1; }",
        ]);
        let dict = set.message("Dict").unwrap().clone();

        let mut value = ProtoValue::message();
        for (k, v) in [("a", 1), ("b", 2)] {
            let mut entry = ProtoValue::message();
            entry.push(1, ProtoValue::Str(k.into()));
            entry.push(2, ProtoValue::Int32(v));
            value.push(1, entry);
        }

        let bytes = encode_message(&value, &dict, &set).expect("encode");
        let decoded = decode_message(&bytes, &dict, &set).expect("decode");
        let entries = decoded.fields(1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field(1).and_then(ProtoValue::as_str), Some("a"));
        assert_eq!(entries[1].field(2), Some(&ProtoValue::Int32(2)));
    }

    #[test]
    fn test_unknown_field_skipped() {
        let wide = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage Wide { string a = 1; int32 b = 2; double c = 3; }",
        ]);
        let narrow = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage Wide { string a = 1; }",
        ]);

        let mut value = ProtoValue::message();
        value.push(1, ProtoValue::Str("keep".into()));
        value.push(2, ProtoValue::Int32(7));
        value.push(3, ProtoValue::Double(1.5));

        let bytes = encode_message(&value, wide.message("Wide").unwrap(), &wide).unwrap();
        let decoded = decode_message(&bytes, narrow.message("Wide").unwrap(), &narrow).unwrap();
        assert_eq!(decoded.field(1).and_then(ProtoValue::as_str), Some("keep"));
        assert!(decoded.field(2).is_none());
        assert!(decoded.field(3).is_none());
    }

    #[test]
    fn test_field_number_zero_tolerated() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage Tagged { int32 _type = 0; string uid = 1; }",
        ]);
        let msg = set.message("Tagged").unwrap().clone();

        let mut value = ProtoValue::message();
        value.push(0, ProtoValue::Int32(3));
        value.push(1, ProtoValue::Str("x".into()));

        let bytes = encode_message(&value, &msg, &set).expect("encode");
        let decoded = decode_message(&bytes, &msg, &set).expect("decode");
        assert_eq!(decoded.field(0), Some(&ProtoValue::Int32(3)));
    }

    #[test]
    fn test_oversized_length_fails() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage M { string a = 1; }",
        ]);
        let msg = set.message("M").unwrap().clone();
        // Field 1, length-delimited, claiming a u64::MAX-sized payload.
        let mut bytes = vec![0x0A];
        bytes.extend_from_slice(&[0xFF; 9]);
        bytes.push(0x01);
        assert!(matches!(
            decode_message(&bytes, &msg, &set),
            Err(WireError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_truncated_input_fails() {
        let set = linked(&[
            "package t;\nsyntax = \"proto3\";\nmessage M { string a = 1; }",
        ]);
        let msg = set.message("M").unwrap().clone();
        let mut value = ProtoValue::message();
        value.push(1, ProtoValue::Str("hello".into()));
        let mut bytes = encode_message(&value, &msg, &set).unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(decode_message(&bytes, &msg, &set).is_err());
    }
}

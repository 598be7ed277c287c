// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire bytes to instance graph.

use crate::codec::ObjectCodec;
use crate::generator::constants::{DISCRIMINATOR_FIELD, UID_BIN, UID_MEMBER, UID_STR};
use crate::metadata::{FieldType, Instance, MapKey, MemberMetadata, Value};
use crate::proto::{
    FieldDescriptor, FieldKind, MessageDescriptor, ProtoValue, ScalarKind, WireError,
    ANY_TYPE_NAME,
};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Deserialization failure.
#[derive(Debug)]
pub enum DecodeError {
    Wire(WireError),
    /// No schema or metadata is loaded for the type tag.
    UnknownType(String),
    /// The envelope carries no type tag and no expected type was supplied.
    MissingTypeTag,
    /// The discriminator field selects an id the enum does not define.
    UnknownDiscriminator { type_name: String, id: i32 },
    /// A member flagged required is absent on the wire.
    MissingRequired { type_name: String, member: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {}", e),
            Self::UnknownType(name) => write!(f, "no schema loaded for type `{}`", name),
            Self::MissingTypeTag => write!(f, "envelope carries no type tag"),
            Self::UnknownDiscriminator { type_name, id } => {
                write!(f, "discriminator id {} of `{}` selects no known type", id, type_name)
            }
            Self::MissingRequired { type_name, member } => {
                write!(f, "required member `{}.{}` is absent on the wire", type_name, member)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<WireError> for DecodeError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl ObjectCodec {
    /// Decode envelope-wrapped bytes back into an instance.
    ///
    /// The envelope's type tag picks the schema; `expected` is the fallback
    /// when the tag is absent. Unknown wire fields are ignored.
    pub fn decode(&self, bytes: &[u8], expected: Option<&str>) -> Result<Instance, DecodeError> {
        let envelope = self.schemas.envelope().decode(bytes)?;
        let any = envelope.field(1);
        let tag = any
            .and_then(|a| a.field(1))
            .and_then(ProtoValue::as_str)
            .filter(|t| !t.is_empty());
        let payload = any
            .and_then(|a| a.field(2))
            .and_then(ProtoValue::as_bytes)
            .unwrap_or_default();
        let type_name = tag.or(expected).ok_or(DecodeError::MissingTypeTag)?;
        self.decode_payload(type_name, payload)
    }

    /// Decode a body (no envelope) against the routed schema of `type_name`.
    pub(crate) fn decode_payload(
        &self,
        type_name: &str,
        bytes: &[u8],
    ) -> Result<Instance, DecodeError> {
        let (_, schema) = self
            .routed_schema(type_name)
            .ok_or_else(|| DecodeError::UnknownType(type_name.to_string()))?;
        let raw = schema.decode(bytes)?;
        self.convert_message(type_name, schema.descriptor(), &raw)
    }

    /// Turn a decoded field-keyed tree into an instance of the resolved
    /// concrete type, walking expected members from metadata.
    fn convert_message(
        &self,
        static_type: &str,
        descriptor: &MessageDescriptor,
        raw: &ProtoValue,
    ) -> Result<Instance, DecodeError> {
        let target = self.resolve_target(static_type, descriptor, raw)?;
        let meta = self
            .metadata
            .own_metadata(&target)
            .ok_or_else(|| DecodeError::UnknownType(target.clone()))?;

        let mut instance = Instance::new(target.clone());
        for member in self.metadata.all_members(&target) {
            let Some(field_type) = member.field_type.clone() else {
                continue;
            };

            let assigned = if member.name == UID_MEMBER
                && descriptor.field_by_name(UID_BIN).is_some()
            {
                self.read_uid(descriptor, raw, &target, &member)?
            } else if let Some(field) = descriptor.field_by_name(&member.name) {
                self.read_member(field, &field_type, raw, &target, &member)?
            } else {
                self.read_alternative(descriptor, raw, &target, &member)?
            };

            match assigned {
                Some(value) => instance.set(member.key.clone(), value),
                None => {
                    if member.required {
                        return Err(DecodeError::MissingRequired {
                            type_name: target,
                            member: member.key.clone(),
                        });
                    }
                }
            }
        }

        if let Some(hook) = &meta.post_deserialize {
            hook(&mut instance);
        }
        Ok(instance)
    }

    /// Re-resolve the concrete type via the discriminator field when it
    /// selects a subtype different from the statically expected one.
    fn resolve_target(
        &self,
        static_type: &str,
        descriptor: &MessageDescriptor,
        raw: &ProtoValue,
    ) -> Result<String, DecodeError> {
        let Some(entry) = self.schemas.lookup(static_type) else {
            return Ok(static_type.to_string());
        };
        let Some(discriminator) = &entry.discriminator else {
            return Ok(static_type.to_string());
        };
        let Some(field) = descriptor.field_by_name(DISCRIMINATOR_FIELD) else {
            return Ok(static_type.to_string());
        };
        match raw.field(field.number).and_then(ProtoValue::as_i32) {
            Some(0) | None => Ok(static_type.to_string()),
            Some(id) => discriminator
                .variant_of(id)
                .map(|v| v.class_name.clone())
                .ok_or(DecodeError::UnknownDiscriminator {
                    type_name: static_type.to_string(),
                    id,
                }),
        }
    }

    /// Identifier duality: prefer the binary arm when present and non-empty,
    /// else the string arm, else absent. Malformed binary identifiers are
    /// reported and fall through to absent.
    fn read_uid(
        &self,
        descriptor: &MessageDescriptor,
        raw: &ProtoValue,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<Option<Value>, DecodeError> {
        let binary = descriptor
            .field_by_name(UID_BIN)
            .and_then(|f| raw.field(f.number))
            .and_then(ProtoValue::as_bytes)
            .filter(|b| !b.is_empty());
        if let Some(bytes) = binary {
            match Uuid::from_slice(bytes) {
                Ok(uuid) => return Ok(Some(Value::Str(uuid.hyphenated().to_string()))),
                Err(_) => {
                    self.report(
                        type_name,
                        &member.key,
                        format!("malformed binary identifier ({} bytes)", bytes.len()),
                    );
                    return Ok(None);
                }
            }
        }
        let text = descriptor
            .field_by_name(UID_STR)
            .and_then(|f| raw.field(f.number))
            .and_then(ProtoValue::as_str)
            .filter(|s| !s.is_empty());
        Ok(text.map(|s| Value::Str(s.to_string())))
    }

    fn read_member(
        &self,
        field: &FieldDescriptor,
        field_type: &FieldType,
        raw: &ProtoValue,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<Option<Value>, DecodeError> {
        if let FieldKind::Map(key_kind, value_kind) = &field.kind {
            let entries = raw.fields(field.number);
            if entries.is_empty() {
                return Ok(None);
            }
            let key_type = map_key_type(field_type);
            let element_type = map_value_type(field_type);
            let mut map = BTreeMap::new();
            for entry in entries {
                let Some(key) = entry.field(1).and_then(|k| map_key(*key_kind, key_type, k)) else {
                    self.report(type_name, &member.key, "map entry without a key");
                    continue;
                };
                let Some(raw_value) = entry.field(2) else {
                    continue;
                };
                if let Some(value) =
                    self.convert_single(value_kind, element_type, raw_value, type_name, member)?
                {
                    map.insert(key, value);
                }
            }
            return Ok(Some(Value::Map(map)));
        }
        if field.repeated {
            let entries = raw.fields(field.number);
            if entries.is_empty() {
                return Ok(None);
            }
            let element_type = array_element_type(field_type);
            let mut array = Vec::with_capacity(entries.len());
            for entry in entries {
                if let Some(value) =
                    self.convert_single(&field.kind, element_type, entry, type_name, member)?
                {
                    array.push(value);
                }
            }
            return Ok(Some(Value::Array(array)));
        }
        match raw.field(field.number) {
            Some(value) => {
                self.convert_single(&field.kind, Some(field_type), value, type_name, member)
            }
            None => Ok(None),
        }
    }

    /// Union of known alternatives: take the first populated arm; the
    /// generic fallback arm carries a type-tag + payload pair.
    fn read_alternative(
        &self,
        descriptor: &MessageDescriptor,
        raw: &ProtoValue,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<Option<Value>, DecodeError> {
        for arm in descriptor.oneof_fields(&member.name) {
            let Some(value) = raw.field(arm.number) else {
                continue;
            };
            match &arm.kind {
                FieldKind::Message(name) if name == ANY_TYPE_NAME => {
                    return self.unwrap_any(value, type_name, member);
                }
                FieldKind::Message(name) => {
                    let Some(nested_descriptor) = self.schemas.linked().message(name) else {
                        continue;
                    };
                    let nested = self.convert_message(name, nested_descriptor, value)?;
                    return Ok(Some(Value::Object(nested)));
                }
                _ => continue,
            }
        }
        Ok(None)
    }

    fn convert_single(
        &self,
        kind: &FieldKind,
        declared: Option<&FieldType>,
        value: &ProtoValue,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<Option<Value>, DecodeError> {
        let converted = match (kind, value) {
            (FieldKind::Scalar(ScalarKind::Bool), ProtoValue::Bool(v)) => Some(Value::Bool(*v)),
            (FieldKind::Scalar(ScalarKind::Int32), ProtoValue::Int32(v)) => {
                Some(Value::Int(i64::from(*v)))
            }
            (FieldKind::Scalar(ScalarKind::Int64), ProtoValue::Int64(v)) => Some(Value::Int(*v)),
            (FieldKind::Scalar(ScalarKind::Double), ProtoValue::Double(v)) => {
                Some(Value::Float(*v))
            }
            (FieldKind::Scalar(ScalarKind::Float), ProtoValue::Float(v)) => {
                Some(Value::Float(f64::from(*v)))
            }
            (FieldKind::Scalar(ScalarKind::String), ProtoValue::Str(s)) => {
                // Numbers that traveled as strings are coerced back.
                if matches!(declared, Some(FieldType::Number)) {
                    Some(parse_number(s))
                } else {
                    Some(Value::Str(s.clone()))
                }
            }
            (FieldKind::Scalar(ScalarKind::Bytes), ProtoValue::Bytes(b)) => {
                Some(Value::Bytes(b.clone()))
            }
            (FieldKind::Enum(_), ProtoValue::Int32(v)) => Some(Value::Int(i64::from(*v))),
            (FieldKind::Message(name), raw_message) if name == ANY_TYPE_NAME => {
                return self.unwrap_any(raw_message, type_name, member);
            }
            (FieldKind::Message(name), raw_message @ ProtoValue::Message(_)) => {
                let Some(nested_descriptor) = self.schemas.linked().message(name) else {
                    return Err(DecodeError::UnknownType(name.clone()));
                };
                let nested = self.convert_message(name, nested_descriptor, raw_message)?;
                Some(Value::Object(nested))
            }
            _ => None,
        };
        if converted.is_none() {
            self.report(
                type_name,
                &member.key,
                format!("wire value {:?} does not match the schema", value),
            );
        }
        Ok(converted)
    }

    /// Unwrap a type-tag + payload pair. Registered tags decode recursively;
    /// the `Boolean`/`Number`/`String` tags go through the fallback wrapper
    /// and coerce the stored rendering back to its primitive kind.
    fn unwrap_any(
        &self,
        value: &ProtoValue,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<Option<Value>, DecodeError> {
        let tag = value.field(1).and_then(ProtoValue::as_str).unwrap_or("");
        let payload = value
            .field(2)
            .and_then(ProtoValue::as_bytes)
            .unwrap_or_default();
        match tag {
            "" => Ok(None),
            "Boolean" => Ok(self
                .unwrap_primitive(payload)?
                .map(|s| Value::Bool(s == "true"))),
            "Number" => Ok(self.unwrap_primitive(payload)?.map(|s| parse_number(&s))),
            "String" => Ok(self.unwrap_primitive(payload)?.map(Value::Str)),
            other => {
                if self.schemas.lookup(other).is_some() {
                    let nested = self.decode_payload(other, payload)?;
                    Ok(Some(Value::Object(nested)))
                } else {
                    self.report(
                        type_name,
                        &member.key,
                        format!("unknown open-payload tag `{}`", other),
                    );
                    Ok(None)
                }
            }
        }
    }

    fn unwrap_primitive(&self, payload: &[u8]) -> Result<Option<String>, DecodeError> {
        let wrapper = self.schemas.primitive_wrapper().decode(payload)?;
        Ok(wrapper
            .field(1)
            .and_then(ProtoValue::as_str)
            .map(str::to_string))
    }
}

fn map_key(kind: ScalarKind, declared: Option<&FieldType>, value: &ProtoValue) -> Option<MapKey> {
    match (kind, value) {
        (ScalarKind::String, ProtoValue::Str(s)) => {
            // Numeric keys that traveled as strings are coerced back.
            if matches!(declared, Some(FieldType::Number)) {
                if let Ok(v) = s.parse::<i64>() {
                    return Some(MapKey::Int(v));
                }
            }
            Some(MapKey::Str(s.clone()))
        }
        (ScalarKind::Int32, ProtoValue::Int32(v)) => Some(MapKey::Int(i64::from(*v))),
        (ScalarKind::Int64, ProtoValue::Int64(v)) => Some(MapKey::Int(*v)),
        _ => None,
    }
}

fn parse_number(s: &str) -> Value {
    if let Ok(v) = s.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Value::Float(v);
    }
    Value::Str(s.to_string())
}

fn array_element_type(field_type: &FieldType) -> Option<&FieldType> {
    match field_type {
        FieldType::Array(element) => Some(element),
        _ => None,
    }
}

fn map_key_type(field_type: &FieldType) -> Option<&FieldType> {
    match field_type {
        FieldType::Map(key, _) => Some(key),
        _ => None,
    }
}

fn map_value_type(field_type: &FieldType) -> Option<&FieldType> {
    match field_type {
        FieldType::Map(_, value) => Some(value),
        _ => None,
    }
}

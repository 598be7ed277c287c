// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instance graph to wire bytes.

use crate::codec::ObjectCodec;
use crate::generator::constants::{
    ANY_ARM_SUFFIX, DISCRIMINATOR_FIELD, UID_BIN, UID_MEMBER, UID_STR,
};
use crate::metadata::{Instance, MapKey, MemberMetadata, Value};
use crate::proto::{
    FieldDescriptor, FieldKind, MessageDescriptor, ProtoValue, ScalarKind, WireError,
    ANY_TYPE_NAME,
};
use std::fmt;
use uuid::Uuid;

/// Serialization failure.
#[derive(Debug)]
pub enum EncodeError {
    /// No schema is loaded for the type.
    UnknownType(String),
    /// A member flagged required is absent on the instance.
    MissingRequired { type_name: String, member: String },
    /// The runtime value does not match the member's wire type.
    ValueMismatch {
        type_name: String,
        member: String,
        expected: &'static str,
    },
    /// The value kind has no fallback wire form.
    Unsupported { type_name: String, member: String },
    Wire(WireError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "no schema loaded for type `{}`", name),
            Self::MissingRequired { type_name, member } => {
                write!(f, "required member `{}.{}` is absent", type_name, member)
            }
            Self::ValueMismatch {
                type_name,
                member,
                expected,
            } => write!(
                f,
                "member `{}.{}` does not match wire type {}",
                type_name, member, expected
            ),
            Self::Unsupported { type_name, member } => {
                write!(f, "member `{}.{}` has no wire representation", type_name, member)
            }
            Self::Wire(e) => write!(f, "wire error: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<WireError> for EncodeError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl ObjectCodec {
    /// Encode an instance to envelope-wrapped wire bytes.
    ///
    /// The outermost unit is the envelope schema carrying the concrete type
    /// name as its tag, so decode can pick the right schema first.
    pub fn encode(&self, instance: &Instance) -> Result<Vec<u8>, EncodeError> {
        let payload = self.encode_payload(instance)?;
        let mut any = ProtoValue::message();
        any.push(1, ProtoValue::Str(instance.type_name().to_string()));
        any.push(2, ProtoValue::Bytes(payload));
        let mut envelope = ProtoValue::message();
        envelope.push(1, any);
        Ok(self.schemas.envelope().encode(&envelope)?)
    }

    /// Encode an instance body (no envelope) against its routed schema.
    fn encode_payload(&self, instance: &Instance) -> Result<Vec<u8>, EncodeError> {
        let (_, schema) = self
            .routed_schema(instance.type_name())
            .ok_or_else(|| EncodeError::UnknownType(instance.type_name().to_string()))?;
        let value = self.build_message(instance)?;
        Ok(schema.encode(&value)?)
    }

    /// Build the field-keyed value tree of one instance, walking members in
    /// metadata order and skipping absent values.
    pub(crate) fn build_message(&self, instance: &Instance) -> Result<ProtoValue, EncodeError> {
        let type_name = instance.type_name();
        let (entry, schema) = self
            .routed_schema(type_name)
            .ok_or_else(|| EncodeError::UnknownType(type_name.to_string()))?;
        let descriptor = schema.descriptor();
        let mut value = ProtoValue::message();

        if let Some(discriminator) = &entry.discriminator {
            let id = discriminator
                .id_of(type_name)
                .ok_or_else(|| EncodeError::UnknownType(type_name.to_string()))?;
            if let Some(field) = descriptor.field_by_name(DISCRIMINATOR_FIELD) {
                value.push(field.number, ProtoValue::Int32(id));
            }
        }

        for member in self.metadata.all_members(type_name) {
            if member.field_type.is_none() {
                continue;
            }
            let Some(member_value) = instance.get(&member.key) else {
                if member.required {
                    return Err(EncodeError::MissingRequired {
                        type_name: type_name.to_string(),
                        member: member.key.clone(),
                    });
                }
                continue;
            };

            let result = if member.name == UID_MEMBER
                && descriptor.field_by_name(UID_BIN).is_some()
            {
                self.push_uid(&mut value, descriptor, type_name, &member, member_value)
            } else if let Some(field) = descriptor.field_by_name(&member.name) {
                self.push_member(&mut value, field, type_name, &member, member_value)
            } else {
                self.push_alternative(&mut value, descriptor, type_name, &member, member_value)
            };

            if let Err(error) = result {
                if member.required || matches!(error, EncodeError::Wire(_)) {
                    return Err(error);
                }
                self.report(type_name, &member.key, error.to_string());
            }
        }
        Ok(value)
    }

    /// Identifier duality: a value that parses as a 128-bit identifier goes
    /// through the binary arm, anything else through the string arm.
    fn push_uid(
        &self,
        value: &mut ProtoValue,
        descriptor: &MessageDescriptor,
        type_name: &str,
        member: &MemberMetadata,
        member_value: &Value,
    ) -> Result<(), EncodeError> {
        let text = member_value
            .as_str()
            .ok_or_else(|| EncodeError::ValueMismatch {
                type_name: type_name.to_string(),
                member: member.key.clone(),
                expected: "string",
            })?;
        match Uuid::parse_str(text) {
            Ok(uuid) => {
                if let Some(field) = descriptor.field_by_name(UID_BIN) {
                    value.push(field.number, ProtoValue::Bytes(uuid.as_bytes().to_vec()));
                }
            }
            Err(_) => {
                if let Some(field) = descriptor.field_by_name(UID_STR) {
                    value.push(field.number, ProtoValue::Str(text.to_string()));
                }
            }
        }
        Ok(())
    }

    fn push_member(
        &self,
        value: &mut ProtoValue,
        field: &FieldDescriptor,
        type_name: &str,
        member: &MemberMetadata,
        member_value: &Value,
    ) -> Result<(), EncodeError> {
        if let FieldKind::Map(key_kind, value_kind) = &field.kind {
            let map = member_value
                .as_map()
                .ok_or_else(|| EncodeError::ValueMismatch {
                    type_name: type_name.to_string(),
                    member: member.key.clone(),
                    expected: "map",
                })?;
            // Flatten to one key/value entry message per pair.
            for (key, entry_value) in map {
                let mut entry = ProtoValue::message();
                entry.push(1, self.map_key_value(*key_kind, key, type_name, member)?);
                entry.push(
                    2,
                    self.single_value(value_kind, type_name, member, entry_value)?,
                );
                value.push(field.number, entry);
            }
            return Ok(());
        }
        if field.repeated {
            let elements = member_value
                .as_array()
                .ok_or_else(|| EncodeError::ValueMismatch {
                    type_name: type_name.to_string(),
                    member: member.key.clone(),
                    expected: "array",
                })?;
            for element in elements {
                value.push(
                    field.number,
                    self.single_value(&field.kind, type_name, member, element)?,
                );
            }
            return Ok(());
        }
        let encoded = self.single_value(&field.kind, type_name, member, member_value)?;
        value.push(field.number, encoded);
        Ok(())
    }

    /// Open-typed member emitted as a union of known alternatives: route the
    /// value to its matching arm, or the generic fallback arm.
    fn push_alternative(
        &self,
        value: &mut ProtoValue,
        descriptor: &MessageDescriptor,
        type_name: &str,
        member: &MemberMetadata,
        member_value: &Value,
    ) -> Result<(), EncodeError> {
        let arms = descriptor.oneof_fields(&member.name);
        if arms.is_empty() {
            // The member was dropped from the schema (unmappable kind).
            log::debug!(
                "member `{}.{}` has no schema field; skipped",
                type_name,
                member.key
            );
            return Ok(());
        }
        if let Value::Object(nested) = member_value {
            let arm_name = format!("{}_{}", member.name, nested.type_name().to_lowercase());
            if let Some(field) = arms.iter().find(|f| f.name == arm_name) {
                let encoded = self.build_message(nested)?;
                value.push(field.number, encoded);
                return Ok(());
            }
        }
        let fallback_name = format!("{}{}", member.name, ANY_ARM_SUFFIX);
        let fallback = arms
            .iter()
            .find(|f| f.name == fallback_name)
            .ok_or_else(|| EncodeError::Unsupported {
                type_name: type_name.to_string(),
                member: member.key.clone(),
            })?;
        let any = self.any_value(type_name, member, member_value)?;
        value.push(fallback.number, any);
        Ok(())
    }

    fn map_key_value(
        &self,
        kind: ScalarKind,
        key: &MapKey,
        type_name: &str,
        member: &MemberMetadata,
    ) -> Result<ProtoValue, EncodeError> {
        let mismatch = || EncodeError::ValueMismatch {
            type_name: type_name.to_string(),
            member: member.key.clone(),
            expected: "map key",
        };
        match (kind, key) {
            (ScalarKind::String, MapKey::Str(s)) => Ok(ProtoValue::Str(s.clone())),
            // Numeric map keys travel as strings when the schema key is a
            // string (hintless number keys).
            (ScalarKind::String, MapKey::Int(v)) => Ok(ProtoValue::Str(v.to_string())),
            (ScalarKind::Int32, MapKey::Int(v)) => i32::try_from(*v)
                .map(ProtoValue::Int32)
                .map_err(|_| mismatch()),
            (ScalarKind::Int64, MapKey::Int(v)) => Ok(ProtoValue::Int64(*v)),
            _ => Err(mismatch()),
        }
    }

    fn single_value(
        &self,
        kind: &FieldKind,
        type_name: &str,
        member: &MemberMetadata,
        member_value: &Value,
    ) -> Result<ProtoValue, EncodeError> {
        let mismatch = |expected: &'static str| EncodeError::ValueMismatch {
            type_name: type_name.to_string(),
            member: member.key.clone(),
            expected,
        };
        match kind {
            FieldKind::Scalar(ScalarKind::Bool) => member_value
                .as_bool()
                .map(ProtoValue::Bool)
                .ok_or_else(|| mismatch("bool")),
            // Out-of-range values are a mismatch, never a silent wrap.
            FieldKind::Scalar(ScalarKind::Int32) => member_value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(ProtoValue::Int32)
                .ok_or_else(|| mismatch("int32")),
            FieldKind::Scalar(ScalarKind::Int64) => member_value
                .as_i64()
                .map(ProtoValue::Int64)
                .ok_or_else(|| mismatch("int64")),
            FieldKind::Scalar(ScalarKind::Double) => member_value
                .as_number()
                .map(ProtoValue::Double)
                .ok_or_else(|| mismatch("double")),
            FieldKind::Scalar(ScalarKind::Float) => member_value
                .as_number()
                .map(|v| ProtoValue::Float(v as f32))
                .ok_or_else(|| mismatch("float")),
            FieldKind::Scalar(ScalarKind::String) => match member_value {
                Value::Str(s) => Ok(ProtoValue::Str(s.clone())),
                // Hintless numbers travel through their string rendering.
                Value::Int(v) => Ok(ProtoValue::Str(v.to_string())),
                Value::Float(v) => Ok(ProtoValue::Str(v.to_string())),
                _ => Err(mismatch("string")),
            },
            FieldKind::Scalar(ScalarKind::Bytes) => member_value
                .as_bytes()
                .map(|b| ProtoValue::Bytes(b.to_vec()))
                .ok_or_else(|| mismatch("bytes")),
            FieldKind::Enum(_) => member_value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(ProtoValue::Int32)
                .ok_or_else(|| mismatch("enum")),
            FieldKind::Message(name) if name == ANY_TYPE_NAME => {
                self.any_value(type_name, member, member_value)
            }
            FieldKind::Message(_) => {
                let nested = member_value.as_object().ok_or_else(|| mismatch("message"))?;
                self.build_message(nested)
            }
            FieldKind::Map(..) => Err(mismatch("map")),
        }
    }

    /// Type-tag + payload pair for an open slot. Registered objects encode
    /// against their own schema; unregistered primitives go through the
    /// fallback wrapper with a string rendering and a kind tag.
    fn any_value(
        &self,
        type_name: &str,
        member: &MemberMetadata,
        member_value: &Value,
    ) -> Result<ProtoValue, EncodeError> {
        let (tag, payload) = match member_value {
            Value::Object(nested) => {
                if self.schemas.lookup(nested.type_name()).is_none() {
                    return Err(EncodeError::UnknownType(nested.type_name().to_string()));
                }
                (nested.type_name().to_string(), self.encode_payload(nested)?)
            }
            Value::Bool(v) => ("Boolean".to_string(), self.wrap_primitive(&v.to_string())?),
            Value::Int(v) => ("Number".to_string(), self.wrap_primitive(&v.to_string())?),
            Value::Float(v) => ("Number".to_string(), self.wrap_primitive(&v.to_string())?),
            Value::Str(v) => ("String".to_string(), self.wrap_primitive(v)?),
            Value::Bytes(_) | Value::Array(_) | Value::Map(_) => {
                return Err(EncodeError::Unsupported {
                    type_name: type_name.to_string(),
                    member: member.key.clone(),
                })
            }
        };
        let mut any = ProtoValue::message();
        any.push(1, ProtoValue::Str(tag));
        any.push(2, ProtoValue::Bytes(payload));
        Ok(any)
    }

    fn wrap_primitive(&self, rendered: &str) -> Result<Vec<u8>, EncodeError> {
        let mut wrapper = ProtoValue::message();
        wrapper.push(1, ProtoValue::Str(rendered.to_string()));
        Ok(self.schemas.primitive_wrapper().encode(&wrapper)?)
    }
}

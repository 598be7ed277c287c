// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema descriptors produced by the parser and consumed by the wire codec.

/// Scalar wire kinds supported by the emitted proto3 subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// Parse a scalar type name. Returns `None` for message/enum references.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }

    /// Proto3 map keys must be integral, bool or string.
    pub fn valid_map_key(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Bool | Self::String)
    }
}

/// Resolved kind of a message field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Reference to a message type by name. Resolution against the pool is
    /// verified at link time.
    Message(String),
    /// Reference to an enum type by name.
    Enum(String),
    /// `map<K, V>`: encoded as repeated key/value entry messages.
    Map(ScalarKind, Box<FieldKind>),
}

/// One field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub repeated: bool,
    pub kind: FieldKind,
    /// Name of the enclosing `oneof` group, if any.
    pub oneof: Option<String>,
}

/// One message definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    pub package: String,
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Look up a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Look up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields belonging to a `oneof` group.
    pub fn oneof_fields(&self, group: &str) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.oneof.as_deref() == Some(group))
            .collect()
    }
}

/// One value of an enum definition, with the side metadata attached via
/// enum value options.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariantDescriptor {
    pub name: String,
    pub number: i32,
    /// `(className)` option: concrete class this variant identifies.
    pub class_name: Option<String>,
    /// `(packageName)` option: owning package of that class.
    pub package_name: Option<String>,
}

/// One enum definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub package: String,
    pub variants: Vec<EnumVariantDescriptor>,
}

impl EnumDescriptor {
    /// Look up a variant by number.
    pub fn variant_by_number(&self, number: i32) -> Option<&EnumVariantDescriptor> {
        self.variants.iter().find(|v| v.number == number)
    }

    /// Look up a variant by the class it identifies.
    pub fn variant_by_class(&self, class_name: &str) -> Option<&EnumVariantDescriptor> {
        self.variants
            .iter()
            .find(|v| v.class_name.as_deref() == Some(class_name))
    }
}

/// One parsed schema file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptor {
    pub package: String,
    pub imports: Vec<String>,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    /// Field names declared in `extend` blocks (extension declarations are
    /// recorded, not modeled as fields).
    pub extensions: Vec<String>,
}

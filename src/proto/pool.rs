// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema pool: accumulates parsed files and links cross-file references
//! into compiled schema handles.

use crate::proto::model::{
    FieldDescriptor, FieldKind, FileDescriptor, MessageDescriptor, ScalarKind,
};
use crate::proto::wire::{self, WireError};
use crate::proto::{EnumDescriptor, ProtoValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the predefined open-payload message.
pub const ANY_TYPE_NAME: &str = "google.protobuf.Any";

/// Schema linking failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    DuplicateMessage(String),
    DuplicateEnum(String),
    UnresolvedType { message: String, field: String, type_name: String },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMessage(name) => write!(f, "duplicate message definition: {}", name),
            Self::DuplicateEnum(name) => write!(f, "duplicate enum definition: {}", name),
            Self::UnresolvedType {
                message,
                field,
                type_name,
            } => write!(
                f,
                "unresolved type `{}` referenced by {}.{}",
                type_name, message, field
            ),
        }
    }
}

impl std::error::Error for LinkError {}

/// The predefined `google.protobuf.Any` descriptor: a type tag plus an
/// opaque payload.
fn any_descriptor() -> MessageDescriptor {
    MessageDescriptor {
        name: ANY_TYPE_NAME.to_string(),
        package: "google.protobuf".to_string(),
        fields: vec![
            FieldDescriptor {
                name: "type_url".to_string(),
                number: 1,
                repeated: false,
                kind: FieldKind::Scalar(ScalarKind::String),
                oneof: None,
            },
            FieldDescriptor {
                name: "value".to_string(),
                number: 2,
                repeated: false,
                kind: FieldKind::Scalar(ScalarKind::Bytes),
                oneof: None,
            },
        ],
    }
}

/// Linked, immutable descriptor set shared by all compiled handles.
#[derive(Debug)]
pub struct LinkedSchemas {
    messages: HashMap<String, Arc<MessageDescriptor>>,
    enums: HashMap<String, Arc<EnumDescriptor>>,
}

impl LinkedSchemas {
    /// Look up a linked message descriptor.
    pub fn message(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.messages.get(name)
    }

    /// Look up a linked enum descriptor.
    pub fn enum_def(&self, name: &str) -> Option<&Arc<EnumDescriptor>> {
        self.enums.get(name)
    }
}

/// Accumulates parsed schema files before linking.
#[derive(Debug, Default)]
pub struct SchemaPool {
    messages: HashMap<String, MessageDescriptor>,
    enums: HashMap<String, EnumDescriptor>,
}

impl SchemaPool {
    /// Create a pool preloaded with the predefined `google.protobuf.Any`.
    pub fn new() -> Self {
        let mut pool = Self {
            messages: HashMap::new(),
            enums: HashMap::new(),
        };
        let any = any_descriptor();
        pool.messages.insert(any.name.clone(), any);
        pool
    }

    /// Add all definitions of a parsed file.
    pub fn add_file(&mut self, file: FileDescriptor) -> Result<(), LinkError> {
        for message in file.messages {
            if self.messages.contains_key(&message.name) {
                return Err(LinkError::DuplicateMessage(message.name));
            }
            self.messages.insert(message.name.clone(), message);
        }
        for definition in file.enums {
            if self.enums.contains_key(&definition.name) {
                return Err(LinkError::DuplicateEnum(definition.name));
            }
            self.enums.insert(definition.name.clone(), definition);
        }
        Ok(())
    }

    /// Add a programmatically built message (synthetic schemas).
    pub fn add_message(&mut self, message: MessageDescriptor) -> Result<(), LinkError> {
        if self.messages.contains_key(&message.name) {
            return Err(LinkError::DuplicateMessage(message.name));
        }
        self.messages.insert(message.name.clone(), message);
        Ok(())
    }

    /// Verify every type reference resolves, rewrite enum references, and
    /// freeze the pool into a linked descriptor set.
    pub fn link(mut self) -> Result<Arc<LinkedSchemas>, LinkError> {
        let message_names: Vec<String> = self.messages.keys().cloned().collect();
        let enum_names: Vec<String> = self.enums.keys().cloned().collect();

        for message in self.messages.values_mut() {
            let message_name = message.name.clone();
            for field in &mut message.fields {
                let FieldDescriptor { name, kind, .. } = field;
                resolve_kind(kind, &message_name, name, &message_names, &enum_names)?;
            }
        }

        Ok(Arc::new(LinkedSchemas {
            messages: self
                .messages
                .into_iter()
                .map(|(k, v)| (k, Arc::new(v)))
                .collect(),
            enums: self
                .enums
                .into_iter()
                .map(|(k, v)| (k, Arc::new(v)))
                .collect(),
        }))
    }
}

fn resolve_kind(
    kind: &mut FieldKind,
    message: &str,
    field: &str,
    message_names: &[String],
    enum_names: &[String],
) -> Result<(), LinkError> {
    match kind {
        FieldKind::Scalar(_) | FieldKind::Enum(_) => Ok(()),
        FieldKind::Message(name) => {
            if message_names.iter().any(|m| m == name) {
                Ok(())
            } else if enum_names.iter().any(|e| e == name) {
                *kind = FieldKind::Enum(name.clone());
                Ok(())
            } else {
                Err(LinkError::UnresolvedType {
                    message: message.to_string(),
                    field: field.to_string(),
                    type_name: name.clone(),
                })
            }
        }
        FieldKind::Map(_, value) => resolve_kind(value, message, field, message_names, enum_names),
    }
}

/// Handle to one linked message definition, capable of encode/decode
/// against raw field-keyed data.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    message: Arc<MessageDescriptor>,
    set: Arc<LinkedSchemas>,
}

impl CompiledSchema {
    /// Resolve a compiled handle out of a linked set.
    pub fn resolve(set: &Arc<LinkedSchemas>, name: &str) -> Option<Self> {
        let message = set.message(name)?.clone();
        Some(Self {
            message,
            set: Arc::clone(set),
        })
    }

    /// The message descriptor behind this handle.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.message
    }

    /// The linked set this handle belongs to.
    pub fn linked(&self) -> &Arc<LinkedSchemas> {
        &self.set
    }

    /// Encode a field-keyed value tree to wire bytes.
    pub fn encode(&self, value: &ProtoValue) -> Result<Vec<u8>, WireError> {
        wire::encode_message(value, &self.message, &self.set)
    }

    /// Decode wire bytes to a field-keyed value tree.
    pub fn decode(&self, bytes: &[u8]) -> Result<ProtoValue, WireError> {
        wire::decode_message(bytes, &self.message, &self.set)
    }
}

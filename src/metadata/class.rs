// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class and member descriptors.

use crate::metadata::Instance;
use std::fmt;
use std::sync::Arc;

/// Declared type of a data member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Bool,
    /// Number; wire width is chosen from the member's [`NumberHint`].
    Number,
    /// Raw byte buffer.
    Bytes,
    /// Ordered collection of elements.
    Array(Box<FieldType>),
    /// Key/value mapping.
    Map(Box<FieldType>, Box<FieldType>),
    /// Reference to another registered type, by type name.
    Ref(String),
    /// Open-typed member: the declared type is intentionally dynamic.
    Any,
    /// Unordered collection. Cannot round-trip through a static schema.
    Set(Box<FieldType>),
    /// Untyped object. Cannot round-trip through a static schema.
    Object,
    /// Function-typed member. Never serialized.
    Function,
}

impl FieldType {
    /// Returns `true` for kinds that are excluded from schema generation by
    /// policy (they cannot round-trip losslessly through a static schema).
    pub fn is_unmappable(&self) -> bool {
        matches!(self, Self::Set(_) | Self::Object | Self::Function)
    }
}

/// Numeric width hint for [`FieldType::Number`] members.
///
/// Without a hint, numbers are encoded through a variable-width string
/// representation: an untyped number cannot be narrowed without risking
/// precision loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberHint {
    Double,
    Decimal,
    Float,
    Long,
    Integer,
    Short,
}

/// Descriptor for one data member of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberMetadata {
    /// Member key on the object.
    pub key: String,
    /// Wire name; defaults to the key, overridable per member.
    pub name: String,
    /// Declared type. `None` for members that are opaque to this crate.
    pub field_type: Option<FieldType>,
    /// Numeric width hint, when the declared type is a number.
    pub number_hint: Option<NumberHint>,
    /// Member may be absent on instances.
    pub optional: bool,
    /// Member must be present on the wire; absence is a hard decode failure.
    pub required: bool,
    /// Member is handled by a custom serializer. Combined with a missing
    /// declared type, the member is excluded from schema generation.
    pub custom_serializer: bool,
}

impl MemberMetadata {
    /// Create a member descriptor with the given declared type.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            field_type: Some(field_type),
            number_hint: None,
            optional: false,
            required: false,
            custom_serializer: false,
        }
    }

    /// Create a member descriptor without a declared type.
    pub fn untyped(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            field_type: None,
            number_hint: None,
            optional: false,
            required: false,
            custom_serializer: false,
        }
    }

    /// Set the numeric width hint.
    pub fn with_hint(mut self, hint: NumberHint) -> Self {
        self.number_hint = Some(hint);
        self
    }

    /// Override the wire name.
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as handled by a custom serializer.
    pub fn custom_serializer(mut self) -> Self {
        self.custom_serializer = true;
        self
    }
}

/// Hook invoked on an instance after all decoded members are assigned.
pub type PostDeserializeHook = Arc<dyn Fn(&mut Instance) + Send + Sync>;

/// Metadata for one registered type.
///
/// Created at type registration time; read-only afterwards. Derived
/// per-hierarchy state lives in the generator's resolved state, not here.
#[derive(Clone)]
pub struct ClassMetadata {
    /// Type name, unique across the registry.
    pub type_name: String,
    /// Owning module, e.g. `"hps/core"`. Packages are derived from it.
    pub module: String,
    /// Own data members in declaration order (inherited members excluded).
    pub members: Vec<MemberMetadata>,
    /// Direct parent type name, if any.
    pub parent: Option<String>,
    /// Optional post-deserialization hook.
    pub post_deserialize: Option<PostDeserializeHook>,
}

impl ClassMetadata {
    /// Look up an own member by key.
    pub fn member(&self, key: &str) -> Option<&MemberMetadata> {
        self.members.iter().find(|m| m.key == key)
    }

    /// Dotted package name derived from the module string
    /// (`"@hps/core"` and `"hps/core"` both map to `"hps.core"`).
    pub fn package(&self) -> String {
        package_of(&self.module)
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("type_name", &self.type_name)
            .field("module", &self.module)
            .field("members", &self.members)
            .field("parent", &self.parent)
            .field("post_deserialize", &self.post_deserialize.is_some())
            .finish()
    }
}

/// Dotted package name for a module string.
pub(crate) fn package_of(module: &str) -> String {
    module.trim_start_matches('@').replace('/', ".")
}

/// Fluent builder for [`ClassMetadata`].
pub struct ClassMetadataBuilder {
    meta: ClassMetadata,
}

impl ClassMetadataBuilder {
    /// Start building metadata for `type_name` owned by `module`.
    pub fn new(type_name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            meta: ClassMetadata {
                type_name: type_name.into(),
                module: module.into(),
                members: Vec::new(),
                parent: None,
                post_deserialize: None,
            },
        }
    }

    /// Add a member with the given declared type.
    pub fn member(mut self, key: impl Into<String>, field_type: FieldType) -> Self {
        self.meta.members.push(MemberMetadata::new(key, field_type));
        self
    }

    /// Add a numeric member with a width hint.
    pub fn number_member(mut self, key: impl Into<String>, hint: NumberHint) -> Self {
        self.meta
            .members
            .push(MemberMetadata::new(key, FieldType::Number).with_hint(hint));
        self
    }

    /// Add a pre-built member descriptor.
    pub fn member_with(mut self, member: MemberMetadata) -> Self {
        self.meta.members.push(member);
        self
    }

    /// Set the parent type.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.meta.parent = Some(parent.into());
        self
    }

    /// Set the post-deserialization hook.
    pub fn post_deserialize(mut self, hook: PostDeserializeHook) -> Self {
        self.meta.post_deserialize = Some(hook);
        self
    }

    /// Finish building.
    pub fn build(self) -> ClassMetadata {
        self.meta
    }
}

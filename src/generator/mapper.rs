// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Member type mapping: one declared member type to one schema type
//! expression, with the named references needed for import generation.

use crate::generator::hierarchy::ResolvedState;
use crate::generator::GeneratorOptions;
use crate::metadata::{FieldType, MemberMetadata, MetadataRegistry, NumberHint};
use crate::proto::ANY_TYPE_NAME;

/// Named message/enum a type expression depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    pub type_name: String,
    pub package: String,
}

/// Schema type expression for one member, transient per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Schema syntax, e.g. `"double"`, `"repeated GeoPosition"`,
    /// `"map<string, int32>"`.
    pub syntax: String,
    /// Named types referenced by the expression, in appearance order.
    pub refs: Vec<TypeReference>,
}

impl TypeMapping {
    fn plain(syntax: &str) -> Self {
        Self {
            syntax: syntax.to_string(),
            refs: Vec::new(),
        }
    }

    fn named(type_name: &str, package: &str) -> Self {
        Self {
            syntax: type_name.to_string(),
            refs: vec![TypeReference {
                type_name: type_name.to_string(),
                package: package.to_string(),
            }],
        }
    }
}

/// The open-payload wire form.
pub(crate) fn any_mapping() -> TypeMapping {
    TypeMapping::named(ANY_TYPE_NAME, "google.protobuf")
}

/// Map one declared member type to a schema type expression.
///
/// Returns `None` for kinds that cannot round-trip through a static schema
/// (sets, plain objects, functions) and for maps with an unmappable side;
/// callers drop the field.
pub fn map_type(
    registry: &MetadataRegistry,
    state: &ResolvedState,
    member: &MemberMetadata,
    field_type: &FieldType,
    options: &GeneratorOptions,
) -> Option<TypeMapping> {
    match field_type {
        FieldType::String => Some(TypeMapping::plain("string")),
        FieldType::Bool => Some(TypeMapping::plain("bool")),
        FieldType::Bytes => Some(TypeMapping::plain("bytes")),
        FieldType::Number => Some(number_mapping(member, options)),
        FieldType::Array(element) => {
            let inner = map_type(registry, state, member, element, options)?;
            Some(TypeMapping {
                syntax: format!("repeated {}", inner.syntax),
                refs: inner.refs,
            })
        }
        FieldType::Map(key, value) => {
            let key = map_type(registry, state, member, key, options)?;
            let value = map_type(registry, state, member, value, options)?;
            let mut refs = key.refs;
            refs.extend(value.refs);
            Some(TypeMapping {
                syntax: format!("map<{}, {}>", key.syntax, value.syntax),
                refs,
            })
        }
        FieldType::Any => Some(any_mapping()),
        FieldType::Ref(name) => Some(reference_mapping(registry, state, member, name, options)),
        FieldType::Set(_) | FieldType::Object | FieldType::Function => None,
    }
}

/// Wire width for a numeric member, from the member's width hint. Without a
/// hint the value travels as a string: an untyped number cannot be narrowed
/// without risking precision loss.
fn number_mapping(member: &MemberMetadata, options: &GeneratorOptions) -> TypeMapping {
    match member.number_hint {
        Some(NumberHint::Double | NumberHint::Decimal) => TypeMapping::plain("double"),
        Some(NumberHint::Float) => TypeMapping::plain("float"),
        Some(NumberHint::Long) => TypeMapping::plain("int64"),
        Some(NumberHint::Integer | NumberHint::Short) => TypeMapping::plain("int32"),
        None => {
            if options.warnings {
                log::warn!(
                    "member `{}` is a number without a width hint; \
                     encoding through a string representation",
                    member.key
                );
            }
            TypeMapping::plain("string")
        }
    }
}

fn reference_mapping(
    registry: &MetadataRegistry,
    state: &ResolvedState,
    member: &MemberMetadata,
    name: &str,
    options: &GeneratorOptions,
) -> TypeMapping {
    let Some(meta) = registry.own_metadata(name) else {
        // No metadata of its own: opaque payload.
        return any_mapping();
    };
    match state.canonical_of(name) {
        // Deduplicated family: redirect onto the canonical owner so only one
        // discriminator definition exists.
        Some(owner) if owner != name => {
            let owner = owner.to_string();
            reference_mapping(registry, state, member, &owner, options)
        }
        Some(_) => TypeMapping::named(name, &meta.package()),
        None => {
            let polymorphic = state
                .class(name)
                .is_some_and(|c| !c.subtypes.is_empty());
            if polymorphic {
                // Polymorphic but not deduplicated: open-payload fallback.
                any_mapping()
            } else {
                TypeMapping::named(name, &meta.package())
            }
        }
    }
}

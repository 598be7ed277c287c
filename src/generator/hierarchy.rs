// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchy resolution: merged member sets, discriminator enums and
//! canonical-owner stamping for polymorphic subtype families.

use crate::generator::GeneratorOptions;
use crate::metadata::{ClassMetadata, MemberMetadata, MetadataRegistry};
use crate::proto::EnumDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// One concrete arm of a [`DiscriminatorEnum`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorVariant {
    /// Schema-level variant name (`SCREAMING_SNAKE` of the class name).
    pub name: String,
    /// Stable integer id. 0 is reserved for "unspecified".
    pub number: i32,
    /// Concrete class this arm identifies.
    pub class_name: String,
    /// Dotted package of that class.
    pub package_name: String,
}

/// Integer tag enum embedded in a shared family schema, identifying which
/// concrete type a decoded instance represents. Carries each arm's class
/// name and package as side metadata so decode needs no external lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorEnum {
    /// Schema-level enum name, `<Owner>Type`.
    pub name: String,
    /// Canonical owner type of the family.
    pub owner: String,
    /// Concrete arms, numbered from 1 in sorted class-name order.
    pub variants: Vec<DiscriminatorVariant>,
}

impl DiscriminatorEnum {
    /// Enum id of a concrete class, if it is part of the family.
    pub fn id_of(&self, class_name: &str) -> Option<i32> {
        self.variants
            .iter()
            .find(|v| v.class_name == class_name)
            .map(|v| v.number)
    }

    /// Arm selected by an enum id.
    pub fn variant_of(&self, number: i32) -> Option<&DiscriminatorVariant> {
        self.variants.iter().find(|v| v.number == number)
    }

    /// Reconstruct from a parsed enum definition whose variants carry
    /// `className`/`packageName` value options. Arms without a class name
    /// (the reserved zero value) are skipped.
    pub fn from_descriptor(owner: &str, descriptor: &EnumDescriptor) -> Self {
        let variants = descriptor
            .variants
            .iter()
            .filter_map(|v| {
                let class_name = v.class_name.clone()?;
                Some(DiscriminatorVariant {
                    name: v.name.clone(),
                    number: v.number,
                    class_name,
                    package_name: v.package_name.clone().unwrap_or_default(),
                })
            })
            .collect();
        Self {
            name: descriptor.name.clone(),
            owner: owner.to_string(),
            variants,
        }
    }
}

/// Derived generation state of one type.
#[derive(Debug, Clone)]
pub struct ResolvedClass {
    pub type_name: String,
    /// Strict descendants, sorted by name.
    pub subtypes: Vec<String>,
    /// Distinct modules spanned by the family (self included), sorted.
    pub modules: Vec<String>,
    /// Members to emit: full member chain, plus subtype-introduced members
    /// cloned in as optional when this type owns a discriminated family.
    pub members: Vec<MemberMetadata>,
    /// `false` when a subtype redefines a shared member with a different
    /// declared type; the family then cannot share one schema message.
    pub allow_override: bool,
    /// Discriminator enum, present only on the canonical family owner.
    pub discriminator: Option<Arc<DiscriminatorEnum>>,
    /// Canonical owner backreference, present on stamped family members.
    pub canonical: Option<String>,
}

/// Immutable output of hierarchy resolution across a whole registry.
///
/// Resolution is a pure function of the registry and options: later type
/// registrations never retroactively change an already-resolved value.
#[derive(Debug, Default)]
pub struct ResolvedState {
    classes: HashMap<String, ResolvedClass>,
}

impl ResolvedState {
    /// Resolve every registered type.
    ///
    /// Types are processed roots-first (by hierarchy depth), so a family is
    /// claimed by its shallowest base: once an owner stamps its descendants,
    /// deeper bases do not build a second discriminator for the same types.
    pub fn resolve(registry: &MetadataRegistry, options: &GeneratorOptions) -> Self {
        let mut names = registry.type_names();
        names.sort_by_key(|n| (depth_of(registry, n), n.clone()));

        let mut classes: HashMap<String, ResolvedClass> = HashMap::new();
        for name in names {
            let Some(meta) = registry.own_metadata(&name) else {
                continue;
            };
            let stamped = classes.get(&name).and_then(|c| c.canonical.clone());
            let resolved = resolve_one(registry, &meta, stamped, options);

            if let Some(discriminator) = &resolved.discriminator {
                for subtype in &resolved.subtypes {
                    let entry = classes
                        .entry(subtype.clone())
                        .or_insert_with(|| placeholder(subtype));
                    if entry.canonical.is_none() {
                        entry.canonical = Some(discriminator.owner.clone());
                    }
                }
            }

            match classes.get_mut(&name) {
                // A placeholder was created while stamping; fill it in but
                // keep the canonical backreference.
                Some(entry) => {
                    let canonical = entry.canonical.clone();
                    *entry = resolved;
                    if entry.canonical.is_none() {
                        entry.canonical = canonical;
                    }
                }
                None => {
                    classes.insert(name, resolved);
                }
            }
        }
        Self { classes }
    }

    /// Resolved state of one type.
    pub fn class(&self, type_name: &str) -> Option<&ResolvedClass> {
        self.classes.get(type_name)
    }

    /// Canonical owner of a type's family: the stamped backreference, or the
    /// type itself when it owns a discriminator.
    pub fn canonical_of(&self, type_name: &str) -> Option<&str> {
        let class = self.classes.get(type_name)?;
        if let Some(owner) = &class.canonical {
            return Some(owner);
        }
        if class.discriminator.is_some() {
            return Some(&class.type_name);
        }
        None
    }

    /// Discriminator of a type's family, reached through the canonical owner.
    pub fn discriminator_of(&self, type_name: &str) -> Option<&Arc<DiscriminatorEnum>> {
        let owner = self.canonical_of(type_name)?;
        self.classes.get(owner)?.discriminator.as_ref()
    }
}

fn placeholder(type_name: &str) -> ResolvedClass {
    ResolvedClass {
        type_name: type_name.to_string(),
        subtypes: Vec::new(),
        modules: Vec::new(),
        members: Vec::new(),
        allow_override: true,
        discriminator: None,
        canonical: None,
    }
}

fn depth_of(registry: &MetadataRegistry, type_name: &str) -> usize {
    let mut depth = 0;
    let mut current = registry.own_metadata(type_name);
    while let Some(meta) = current {
        match &meta.parent {
            Some(parent) => {
                depth += 1;
                current = registry.own_metadata(parent);
            }
            None => break,
        }
    }
    depth
}

fn resolve_one(
    registry: &MetadataRegistry,
    meta: &ClassMetadata,
    stamped_canonical: Option<String>,
    options: &GeneratorOptions,
) -> ResolvedClass {
    let known = registry.known_types(&meta.type_name);
    let mut members = registry.all_members(&meta.type_name);
    let mut subtypes = Vec::new();
    let mut modules = vec![meta.module.clone()];
    let mut allow_override = true;

    if known.len() > 1 {
        for subtype in &known {
            if !registry.is_descendant(&subtype.type_name, &meta.type_name) {
                continue;
            }
            subtypes.push(subtype.type_name.clone());
            if !modules.contains(&subtype.module) {
                modules.push(subtype.module.clone());
            }
            for member in registry.all_members(&subtype.type_name) {
                match members.iter().find(|m| m.key == member.key) {
                    Some(existing) => {
                        if existing.field_type != member.field_type {
                            allow_override = false;
                        }
                    }
                    None => {
                        // Subtypes may introduce members the base does not
                        // have; they join the shared schema as optional.
                        let mut merged = member.clone();
                        merged.optional = true;
                        members.push(merged);
                    }
                }
            }
        }
        subtypes.sort();
        modules.sort();
    }

    let single_module = modules.len() <= 1;
    let already_claimed = stamped_canonical.is_some();
    let discriminator = if !subtypes.is_empty()
        && allow_override
        && (single_module || !options.cross_module_any)
        && !already_claimed
    {
        let mut variants = Vec::new();
        for (index, class) in known.iter().enumerate() {
            variants.push(DiscriminatorVariant {
                name: screaming_snake(&class.type_name),
                number: index as i32 + 1,
                class_name: class.type_name.clone(),
                package_name: class.package(),
            });
        }
        Some(Arc::new(DiscriminatorEnum {
            name: format!("{}Type", meta.type_name),
            owner: meta.type_name.clone(),
            variants,
        }))
    } else {
        None
    };

    if discriminator.is_none() {
        // Without a shared schema the merged-in subtype members are not
        // emitted on this type.
        members = registry.all_members(&meta.type_name);
    }

    ResolvedClass {
        type_name: meta.type_name.clone(),
        subtypes,
        modules,
        members,
        allow_override,
        discriminator,
        canonical: stamped_canonical,
    }
}

/// `GeoPosition` -> `GEO_POSITION`; acronym runs stay joined.
pub(crate) fn screaming_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }
    out
}

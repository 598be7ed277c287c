// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema text rendering for one type.

use crate::generator::constants::{
    ANY_ARM_SUFFIX, ANY_IMPORT, DISCRIMINATOR_FIELD, EXTENSION_FILE, HEADER, UID_BIN, UID_MEMBER,
    UID_STR,
};
use crate::generator::hierarchy::ResolvedState;
use crate::generator::mapper::{map_type, TypeReference};
use crate::generator::{root_prefix, GeneratorOptions};
use crate::metadata::{ClassMetadata, FieldType, MetadataRegistry};
use crate::proto::ANY_TYPE_NAME;
use std::fmt::Write as _;

/// One rendered schema file.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    /// Dotted package of the contained type.
    pub package: String,
    /// `<TypeName>.proto`.
    pub file_name: String,
    /// Complete schema text. Byte-identical for identical input metadata.
    pub text: String,
    /// Packages imported across package boundaries, for dependency checks.
    pub external_packages: Vec<String>,
}

struct Imports {
    current_package: String,
    current_type: String,
    prefix: String,
    paths: Vec<String>,
    external_packages: Vec<String>,
}

impl Imports {
    fn new(meta: &ClassMetadata) -> Self {
        let package = meta.package();
        Self {
            prefix: root_prefix(&package),
            current_package: package,
            current_type: meta.type_name.clone(),
            paths: Vec::new(),
            external_packages: Vec::new(),
        }
    }

    /// Record an import path once, keeping first-appearance order.
    fn add_path(&mut self, path: String) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    fn add_reference(&mut self, reference: &TypeReference) {
        if reference.type_name == ANY_TYPE_NAME {
            self.add_path(ANY_IMPORT.to_string());
            return;
        }
        if reference.type_name == self.current_type {
            return;
        }
        if reference.package == self.current_package {
            self.add_path(format!("{}.proto", reference.type_name));
        } else {
            if !self.external_packages.contains(&reference.package) {
                self.external_packages.push(reference.package.clone());
            }
            self.add_path(format!(
                "{}{}/{}.proto",
                self.prefix,
                reference.package.replace('.', "/"),
                reference.type_name
            ));
        }
    }
}

/// Render the schema file for one type.
///
/// Layout: banner, `package`, `syntax`, deduplicated imports, discriminator
/// enum (family owners only), message body. Field numbers are sequential
/// from 1 in member order; the discriminator field sits at number 0.
pub fn emit(
    registry: &MetadataRegistry,
    state: &ResolvedState,
    meta: &ClassMetadata,
    options: &GeneratorOptions,
) -> EmittedFile {
    let (members, discriminator) = match state.class(&meta.type_name) {
        Some(resolved) => (resolved.members.clone(), resolved.discriminator.clone()),
        None => (registry.all_members(&meta.type_name), None),
    };

    let mut imports = Imports::new(meta);
    let mut fields = String::new();
    let mut number = 1u32;

    if let Some(enum_def) = &discriminator {
        imports.add_path(format!("{}{}", imports.prefix, EXTENSION_FILE));
        let _ = writeln!(
            fields,
            "  {} {} = 0;",
            enum_def.name, DISCRIMINATOR_FIELD
        );
    }

    for member in &members {
        let Some(field_type) = &member.field_type else {
            // Opaque member: a custom serializer owns it, or it carries no
            // declared type at all.
            if !member.custom_serializer && options.warnings {
                log::warn!(
                    "member `{}` of `{}` has no declared type; skipped",
                    member.key,
                    meta.type_name
                );
            }
            continue;
        };

        if member.name == UID_MEMBER {
            let _ = writeln!(fields, "  oneof {} {{", UID_MEMBER);
            let _ = writeln!(fields, "    bytes {} = {};", UID_BIN, number);
            let _ = writeln!(fields, "    string {} = {};", UID_STR, number + 1);
            fields.push_str("  }\n");
            number += 2;
            continue;
        }

        if let Some(alternatives) = open_alternatives(registry, state, field_type) {
            let _ = writeln!(fields, "  oneof {} {{", member.name);
            for alt in &alternatives {
                imports.add_reference(&TypeReference {
                    type_name: alt.type_name.clone(),
                    package: alt.package(),
                });
                let _ = writeln!(
                    fields,
                    "    {} {}_{} = {};",
                    alt.type_name,
                    member.name,
                    alt.type_name.to_lowercase(),
                    number
                );
                number += 1;
            }
            imports.add_path(ANY_IMPORT.to_string());
            let _ = writeln!(
                fields,
                "    {} {}{} = {};",
                ANY_TYPE_NAME, member.name, ANY_ARM_SUFFIX, number
            );
            number += 1;
            fields.push_str("  }\n");
            continue;
        }

        let Some(mapping) = map_type(registry, state, member, field_type, options) else {
            if options.warnings {
                log::debug!(
                    "member `{}` of `{}` cannot be represented; skipped",
                    member.key,
                    meta.type_name
                );
            }
            continue;
        };
        for reference in &mapping.refs {
            imports.add_reference(reference);
        }
        let label = if member.optional && is_singular(&mapping.syntax) {
            "optional "
        } else {
            ""
        };
        let _ = writeln!(
            fields,
            "  {}{} {} = {};",
            label, mapping.syntax, member.name, number
        );
        number += 1;
    }

    let mut text = String::from(HEADER);
    let _ = writeln!(text, "package {};", imports.current_package);
    text.push('\n');
    text.push_str("syntax = \"proto3\";\n");
    if !imports.paths.is_empty() {
        text.push('\n');
        for path in &imports.paths {
            let _ = writeln!(text, "import \"{}\";", path);
        }
    }
    if let Some(enum_def) = &discriminator {
        text.push('\n');
        let _ = writeln!(text, "enum {} {{", enum_def.name);
        let _ = writeln!(
            text,
            "  {}_UNSPECIFIED = 0;",
            crate::generator::hierarchy::screaming_snake(&enum_def.name)
        );
        for variant in &enum_def.variants {
            let _ = writeln!(
                text,
                "  {} = {} [(className) = \"{}\", (packageName) = \"{}\"];",
                variant.name, variant.number, variant.class_name, variant.package_name
            );
        }
        text.push_str("}\n");
    }
    text.push('\n');
    let _ = writeln!(text, "message {} {{", meta.type_name);
    text.push_str(&fields);
    text.push_str("}\n");

    EmittedFile {
        file_name: format!("{}.proto", meta.type_name),
        package: imports.current_package.clone(),
        external_packages: imports.external_packages,
        text,
    }
}

fn is_singular(syntax: &str) -> bool {
    !syntax.starts_with("repeated ") && !syntax.starts_with("map<")
}

/// Known alternative types of an open slot: a reference to a polymorphic
/// family that was not deduplicated onto a shared schema is emitted as a
/// union enumerating every known concrete type plus a generic fallback arm.
fn open_alternatives(
    registry: &MetadataRegistry,
    state: &ResolvedState,
    field_type: &FieldType,
) -> Option<Vec<std::sync::Arc<ClassMetadata>>> {
    let FieldType::Ref(name) = field_type else {
        return None;
    };
    registry.own_metadata(name)?;
    if state.canonical_of(name).is_some() {
        return None;
    }
    let polymorphic = state.class(name).is_some_and(|c| !c.subtypes.is_empty());
    if !polymorphic {
        return None;
    }
    Some(registry.known_types(name))
}

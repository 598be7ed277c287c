// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema registry: loads a generated schema directory once and publishes
//! read-only compiled handles for the rest of the process.

use crate::generator::constants::{PRIMITIVE_WRAPPER_MESSAGE, WRAPPER_MESSAGE};
use crate::generator::DiscriminatorEnum;
use crate::proto::{
    parse_file, CompiledSchema, FieldDescriptor, FieldKind, LinkError, LinkedSchemas,
    MessageDescriptor, ParseError, ScalarKind, SchemaPool, ANY_TYPE_NAME,
};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry initialization failure. Any failure aborts: no partial registry
/// is ever published.
#[derive(Debug)]
pub enum RegistryLoadError {
    Io(io::Error),
    Parse { file: PathBuf, error: ParseError },
    Link(LinkError),
    MissingImport { file: PathBuf, import: String },
}

impl fmt::Display for RegistryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Parse { file, error } => {
                write!(f, "parse error in {}: {}", file.display(), error)
            }
            Self::Link(e) => write!(f, "link error: {}", e),
            Self::MissingImport { file, import } => {
                write!(f, "{} imports missing file \"{}\"", file.display(), import)
            }
        }
    }
}

impl std::error::Error for RegistryLoadError {}

impl From<io::Error> for RegistryLoadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<LinkError> for RegistryLoadError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// Published state of one loaded type.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    /// Compiled handle for the type's own message.
    pub schema: CompiledSchema,
    /// Discriminator enum, present on canonical family owners.
    pub discriminator: Option<Arc<DiscriminatorEnum>>,
    /// Canonical family owner; `Some` for every member of a discriminated
    /// family, the owner included.
    pub canonical: Option<String>,
}

/// Immutable map from type name to compiled schema state.
///
/// Built once by [`SchemaRegistry::load`]; concurrent lookups afterwards are
/// read-only. Discriminators and canonical owners are reconstructed from the
/// `className`/`packageName` value options carried by the loaded `_type`
/// enums, so loading needs no generation pass.
#[derive(Debug)]
pub struct SchemaRegistry {
    entries: HashMap<String, TypeEntry>,
    envelope: CompiledSchema,
    primitive_wrapper: CompiledSchema,
    linked: Arc<LinkedSchemas>,
}

impl SchemaRegistry {
    /// Load every `.proto` file below `dir`, link, and publish.
    pub fn load(dir: &Path) -> Result<Self, RegistryLoadError> {
        let mut files = Vec::new();
        scan(dir, String::new(), &mut files)?;

        let mut parsed = Vec::new();
        for (rel, path) in &files {
            let text = fs::read_to_string(path)?;
            let file = parse_file(&text).map_err(|error| RegistryLoadError::Parse {
                file: path.clone(),
                error,
            })?;
            parsed.push((rel.clone(), path.clone(), file));
        }

        let known: Vec<&str> = parsed.iter().map(|(rel, _, _)| rel.as_str()).collect();
        for (rel, path, file) in &parsed {
            for import in &file.imports {
                // The open-payload and descriptor definitions are predefined.
                if import.starts_with("google/protobuf/") {
                    continue;
                }
                let resolved = resolve_import(rel, import);
                let found = resolved
                    .as_deref()
                    .is_some_and(|r| known.contains(&r));
                if !found {
                    return Err(RegistryLoadError::MissingImport {
                        file: path.clone(),
                        import: import.clone(),
                    });
                }
            }
        }

        let mut pool = SchemaPool::new();
        let mut discriminators: HashMap<String, Arc<DiscriminatorEnum>> = HashMap::new();
        let mut type_names = Vec::new();
        for (_, _, file) in parsed {
            for message in &file.messages {
                type_names.push(message.name.clone());
                // A `<Type>Type` enum in the same file is the family
                // discriminator owned by that type.
                let enum_name = format!("{}Type", message.name);
                if let Some(descriptor) = file.enums.iter().find(|e| e.name == enum_name) {
                    discriminators.insert(
                        message.name.clone(),
                        Arc::new(DiscriminatorEnum::from_descriptor(&message.name, descriptor)),
                    );
                }
            }
            pool.add_file(file)?;
        }
        pool.add_message(envelope_descriptor())?;
        pool.add_message(primitive_wrapper_descriptor())?;

        let linked = pool.link()?;

        let mut canonical: HashMap<String, String> = HashMap::new();
        for (owner, discriminator) in &discriminators {
            for variant in &discriminator.variants {
                canonical
                    .entry(variant.class_name.clone())
                    .or_insert_with(|| owner.clone());
            }
            canonical
                .entry(owner.clone())
                .or_insert_with(|| owner.clone());
        }

        let mut entries = HashMap::new();
        for name in type_names {
            let Some(schema) = CompiledSchema::resolve(&linked, &name) else {
                continue;
            };
            let canonical_owner = canonical.get(&name).cloned();
            let discriminator = canonical_owner
                .as_deref()
                .and_then(|owner| discriminators.get(owner))
                .cloned();
            entries.insert(
                name,
                TypeEntry {
                    schema,
                    discriminator,
                    canonical: canonical_owner,
                },
            );
        }

        let envelope = CompiledSchema::resolve(&linked, WRAPPER_MESSAGE)
            .ok_or_else(|| RegistryLoadError::Link(LinkError::DuplicateMessage(
                WRAPPER_MESSAGE.to_string(),
            )))?;
        let primitive_wrapper = CompiledSchema::resolve(&linked, PRIMITIVE_WRAPPER_MESSAGE)
            .ok_or_else(|| RegistryLoadError::Link(LinkError::DuplicateMessage(
                PRIMITIVE_WRAPPER_MESSAGE.to_string(),
            )))?;

        log::debug!("schema registry loaded {} types", entries.len());
        Ok(Self {
            entries,
            envelope,
            primitive_wrapper,
            linked,
        })
    }

    /// Compiled state of a loaded type.
    pub fn lookup(&self, type_name: &str) -> Option<&TypeEntry> {
        self.entries.get(type_name)
    }

    /// The outermost type-tag + payload envelope schema.
    pub fn envelope(&self) -> &CompiledSchema {
        &self.envelope
    }

    /// Fallback wrapper for unregistered primitive payloads.
    pub fn primitive_wrapper(&self) -> &CompiledSchema {
        &self.primitive_wrapper
    }

    /// The linked descriptor set behind all published handles.
    pub fn linked(&self) -> &Arc<LinkedSchemas> {
        &self.linked
    }

    /// Number of loaded types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no types are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `WrapperMessage { google.protobuf.Any data = 1; }`
fn envelope_descriptor() -> MessageDescriptor {
    MessageDescriptor {
        name: WRAPPER_MESSAGE.to_string(),
        package: String::new(),
        fields: vec![FieldDescriptor {
            name: "data".to_string(),
            number: 1,
            repeated: false,
            kind: FieldKind::Message(ANY_TYPE_NAME.to_string()),
            oneof: None,
        }],
    }
}

/// `PrimitiveWrapperMessage { string value = 1; }`
fn primitive_wrapper_descriptor() -> MessageDescriptor {
    MessageDescriptor {
        name: PRIMITIVE_WRAPPER_MESSAGE.to_string(),
        package: String::new(),
        fields: vec![FieldDescriptor {
            name: "value".to_string(),
            number: 1,
            repeated: false,
            kind: FieldKind::Scalar(ScalarKind::String),
            oneof: None,
        }],
    }
}

/// Collect `(relative path, absolute path)` of every `.proto` below `dir`,
/// sorted per directory for deterministic load order.
fn scan(dir: &Path, rel: String, out: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    children.sort_by_key(std::fs::DirEntry::file_name);
    for child in children {
        let path = child.path();
        let name = child.file_name().to_string_lossy().into_owned();
        let child_rel = if rel.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel, name)
        };
        if path.is_dir() {
            scan(&path, child_rel, out)?;
        } else if name.ends_with(".proto") {
            out.push((child_rel, path));
        }
    }
    Ok(())
}

/// Resolve an import path relative to the importing file, collapsing `..`
/// segments. Returns `None` when the path escapes the schema root.
fn resolve_import(importer_rel: &str, import: &str) -> Option<String> {
    let mut parts: Vec<&str> = importer_rel.split('/').collect();
    parts.pop(); // file name
    for segment in import.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_project, GeneratorOptions};
    use crate::metadata::{ClassMetadataBuilder, FieldType, MetadataRegistry, NumberHint};

    fn generated_dir() -> (tempfile::TempDir, MetadataRegistry) {
        let mut reg = MetadataRegistry::new();
        reg.register(
            ClassMetadataBuilder::new("Position", "hps/core")
                .member("uid", FieldType::String)
                .number_member("x", NumberHint::Double)
                .build(),
        );
        reg.register(
            ClassMetadataBuilder::new("GeoPosition", "hps/core")
                .parent("Position")
                .number_member("lat", NumberHint::Double)
                .build(),
        );
        reg.register(
            ClassMetadataBuilder::new("DataFrame", "hps/core")
                .member("uid", FieldType::String)
                .member("origin", FieldType::Ref("Position".into()))
                .build(),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        generate_project(&reg, dir.path(), &GeneratorOptions::default()).expect("generate");
        (dir, reg)
    }

    #[test]
    fn test_load_generated_directory() {
        let (dir, _) = generated_dir();
        let registry = SchemaRegistry::load(dir.path()).expect("load");
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup("Position").is_some());
        assert!(registry.lookup("Unknown").is_none());
    }

    #[test]
    fn test_discriminators_reconstructed_from_options() {
        let (dir, _) = generated_dir();
        let registry = SchemaRegistry::load(dir.path()).expect("load");

        let owner = registry.lookup("Position").unwrap();
        let d = owner.discriminator.as_ref().expect("discriminator");
        assert_eq!(d.owner, "Position");
        assert_eq!(d.id_of("GeoPosition"), Some(1));
        assert_eq!(owner.canonical.as_deref(), Some("Position"));

        // The subtype entry points back at the canonical owner.
        let sub = registry.lookup("GeoPosition").unwrap();
        assert_eq!(sub.canonical.as_deref(), Some("Position"));
        assert!(sub.discriminator.is_some());

        // A plain type carries no family state.
        let frame = registry.lookup("DataFrame").unwrap();
        assert!(frame.discriminator.is_none());
        assert!(frame.canonical.is_none());
    }

    #[test]
    fn test_synthetic_schemas_published() {
        let (dir, _) = generated_dir();
        let registry = SchemaRegistry::load(dir.path()).expect("load");
        assert_eq!(registry.envelope().descriptor().name, WRAPPER_MESSAGE);
        assert_eq!(
            registry.primitive_wrapper().descriptor().name,
            PRIMITIVE_WRAPPER_MESSAGE
        );
    }

    #[test]
    fn test_missing_import_aborts_load() {
        let (dir, _) = generated_dir();
        fs::write(
            dir.path().join("hps/core/Broken.proto"),
            "package hps.core;\nsyntax = \"proto3\";\nimport \"Gone.proto\";\nmessage Broken { Gone g = 1; }",
        )
        .unwrap();
        match SchemaRegistry::load(dir.path()) {
            Err(RegistryLoadError::MissingImport { import, .. }) => {
                assert_eq!(import, "Gone.proto");
            }
            other => panic!("expected missing import, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_parse_failure_aborts_load() {
        let (dir, _) = generated_dir();
        fs::write(dir.path().join("hps/core/Bad.proto"), "message {{{{").unwrap();
        assert!(matches!(
            SchemaRegistry::load(dir.path()),
            Err(RegistryLoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_resolve_import() {
        assert_eq!(
            resolve_import("hps/core/Frame.proto", "Vector.proto").as_deref(),
            Some("hps/core/Vector.proto")
        );
        assert_eq!(
            resolve_import("hps/core/Frame.proto", "../../protomorph.proto").as_deref(),
            Some("protomorph.proto")
        );
        assert_eq!(
            resolve_import("hps/core/Frame.proto", "../../hps/ext/Remote.proto").as_deref(),
            Some("hps/ext/Remote.proto")
        );
        assert!(resolve_import("Top.proto", "../../escape.proto").is_none());
    }
}

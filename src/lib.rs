// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # protomorph - reflective schema generation and polymorphic serialization
//!
//! Derives Protocol Buffers message schemas from class-level reflection
//! metadata and converts dynamic object instances to/from a compact binary
//! representation against those schemas. Polymorphic subtype families share
//! one discriminated schema; open-typed members are carried as type-tagged
//! payloads; identifier members travel through a binary/string union.
//!
//! ## Quick Start
//!
//! ```rust
//! use protomorph::{
//!     ClassMetadataBuilder, FieldType, Instance, MetadataRegistry, NumberHint,
//!     ProtobufSerializer,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut metadata = MetadataRegistry::new();
//! metadata.register(
//!     ClassMetadataBuilder::new("Position", "hps/core")
//!         .member("uid", FieldType::String)
//!         .number_member("x", NumberHint::Double)
//!         .build(),
//! );
//!
//! // Generates schemas on the fly and loads them.
//! let serializer = ProtobufSerializer::initialize(Arc::new(metadata), None)?;
//!
//! let position = Instance::new("Position").with("uid", "p-1").with("x", 1.5);
//! let bytes = serializer.serialize(&position)?;
//! let decoded = serializer.deserialize(&bytes, None)?;
//! assert_eq!(decoded, position);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                          metadata                                  |
//! |   ClassMetadata / MemberMetadata / MetadataRegistry / Instance     |
//! +--------------------------------------------------------------------+
//! |                          generator                                 |
//! |   hierarchy resolution -> type mapping -> schema text emission     |
//! +--------------------------------------------------------------------+
//! |                       proto + registry                             |
//! |   parse .proto files -> link descriptors -> compiled schema pool   |
//! +--------------------------------------------------------------------+
//! |                            codec                                   |
//! |   metadata-driven encode/decode with discriminator resolution      |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MetadataRegistry`] | Registered class metadata, the reflection source |
//! | [`Instance`] | Dynamic object representation handled by the codec |
//! | [`ProtobufSerializer`] | Facade: initialize once, serialize/deserialize |
//! | [`SchemaRegistry`] | Compiled schemas loaded from a generated directory |
//! | [`ObjectCodec`] | Lower-level encoder/decoder over loaded schemas |
//!
//! Initialization (generation plus registry loading) runs once; afterwards
//! the serializer is immutable and serialize/deserialize calls are stateless
//! and safe to run concurrently. The crate emits diagnostics through the
//! [`log`] facade and never installs a logger itself.

pub mod codec;
pub mod generator;
pub mod metadata;
pub mod proto;
pub mod registry;
pub mod serializer;

pub use codec::{CodecIssue, DecodeError, EncodeError, IssueHandler, ObjectCodec};
pub use generator::{
    generate_project, DiscriminatorEnum, GeneratorOptions, SchemaGenerationError,
};
pub use metadata::{
    ClassMetadata, ClassMetadataBuilder, FieldType, Instance, MapKey, MemberMetadata,
    MetadataRegistry, NumberHint, Value,
};
pub use registry::{RegistryLoadError, SchemaRegistry, TypeEntry};
pub use serializer::{InitError, ProtobufSerializer};

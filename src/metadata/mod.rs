// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class-level reflection metadata for serializable object graphs.
//!
//! The annotation system that produces this metadata is an external
//! collaborator; this module models its read-only surface: per-class member
//! descriptors (name, declared type, options) plus the registry used to
//! enumerate registered types and walk inheritance chains.
//!
//! # Example
//!
//! ```rust
//! use protomorph::metadata::{ClassMetadataBuilder, FieldType, MetadataRegistry, NumberHint};
//!
//! let mut registry = MetadataRegistry::new();
//! registry.register(
//!     ClassMetadataBuilder::new("SensorReading", "hps/core")
//!         .member("uid", FieldType::String)
//!         .number_member("value", NumberHint::Double)
//!         .member("tags", FieldType::Array(Box::new(FieldType::String)))
//!         .build(),
//! );
//!
//! let meta = registry.own_metadata("SensorReading").unwrap();
//! assert_eq!(meta.members.len(), 3);
//! ```

mod class;
mod instance;
mod registry;

pub use class::{
    ClassMetadata, ClassMetadataBuilder, FieldType, MemberMetadata, NumberHint,
    PostDeserializeHook,
};
pub use instance::{Instance, MapKey, Value};
pub use registry::MetadataRegistry;

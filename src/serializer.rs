// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Public serialization facade.

use crate::codec::{DecodeError, EncodeError, IssueHandler, ObjectCodec};
use crate::generator::{generate_project, GeneratorOptions, SchemaGenerationError};
use crate::metadata::{Instance, MetadataRegistry};
use crate::registry::{RegistryLoadError, SchemaRegistry};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Initialization failure of the serializer.
#[derive(Debug)]
pub enum InitError {
    Generation(SchemaGenerationError),
    Registry(RegistryLoadError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation(e) => write!(f, "schema generation failed: {}", e),
            Self::Registry(e) => write!(f, "schema registry failed to load: {}", e),
        }
    }
}

impl std::error::Error for InitError {}

impl From<SchemaGenerationError> for InitError {
    fn from(e: SchemaGenerationError) -> Self {
        Self::Generation(e)
    }
}

impl From<RegistryLoadError> for InitError {
    fn from(e: RegistryLoadError) -> Self {
        Self::Registry(e)
    }
}

/// Reflection-driven object serializer.
///
/// Built once from a metadata registry and a schema source; immutable
/// afterwards. `serialize`/`deserialize` calls are stateless and safe to run
/// concurrently on a shared (`Arc`-held) serializer. There is no ambient
/// process-global instance: callers construct and pass the serializer
/// explicitly.
pub struct ProtobufSerializer {
    codec: ObjectCodec,
    schemas: Arc<SchemaRegistry>,
}

impl ProtobufSerializer {
    /// Build a serializer from registered metadata.
    ///
    /// With a source directory the schemas are loaded from it as-is. Without
    /// one, schemas are generated on the fly into a per-process temporary
    /// directory and loaded from there.
    pub fn initialize(
        metadata: Arc<MetadataRegistry>,
        source_dir: Option<&Path>,
    ) -> Result<Self, InitError> {
        Self::initialize_with_options(metadata, source_dir, &GeneratorOptions::default())
    }

    /// [`Self::initialize`] with explicit generation options.
    pub fn initialize_with_options(
        metadata: Arc<MetadataRegistry>,
        source_dir: Option<&Path>,
        options: &GeneratorOptions,
    ) -> Result<Self, InitError> {
        let schemas = match source_dir {
            Some(dir) => SchemaRegistry::load(dir)?,
            None => {
                let dir = scratch_dir();
                generate_project(&metadata, &dir, options)?;
                SchemaRegistry::load(&dir)?
            }
        };
        let schemas = Arc::new(schemas);
        Ok(Self {
            codec: ObjectCodec::new(metadata, Arc::clone(&schemas)),
            schemas,
        })
    }

    /// Replace the per-member issue sink.
    pub fn with_error_handler(mut self, handler: IssueHandler) -> Self {
        self.codec = self.codec.with_issue_handler(handler);
        self
    }

    /// Encode an instance to envelope-wrapped bytes.
    pub fn serialize(&self, instance: &Instance) -> Result<Vec<u8>, EncodeError> {
        self.codec.encode(instance)
    }

    /// Decode bytes back into an instance. `expected` is the fallback type
    /// when the envelope carries no tag.
    pub fn deserialize(
        &self,
        bytes: &[u8],
        expected: Option<&str>,
    ) -> Result<Instance, DecodeError> {
        self.codec.decode(bytes, expected)
    }

    /// The loaded schema registry.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }
}

/// Fresh scratch directory for on-the-fly schema generation. Unique per
/// initialization so concurrent builds never share partially written files.
fn scratch_dir() -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("protomorph-{}-{}", std::process::id(), seq))
}

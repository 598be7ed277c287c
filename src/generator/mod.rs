// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema synthesis: turns registered class metadata into proto3 schema text.
//!
//! The pipeline runs in three stages. [`ResolvedState`] computes per-hierarchy
//! derived state (merged member sets, discriminator enums, canonical owners)
//! as an immutable value. [`emit`] renders one schema file per type from that
//! state. [`generate_project`] writes the whole schema tree, one file per
//! type grouped into package directories, plus the shared extension file.

pub mod constants;
mod emitter;
mod hierarchy;
mod mapper;
mod project;


pub use emitter::{emit, EmittedFile};
pub use hierarchy::{DiscriminatorEnum, DiscriminatorVariant, ResolvedClass, ResolvedState};
pub use mapper::{map_type, TypeMapping, TypeReference};
pub use project::generate_project;

use std::fmt;
use std::io;

/// Policy knobs for schema generation.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// When `true`, a subtype family spanning more than one module falls back
    /// to the open-payload form instead of sharing a discriminated schema.
    pub cross_module_any: bool,
    /// Emit performance warnings (hintless numbers, skipped members).
    pub warnings: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            cross_module_any: true,
            warnings: true,
        }
    }
}

impl GeneratorOptions {
    /// Allow families spanning multiple modules to share one schema.
    pub fn allow_cross_module(mut self) -> Self {
        self.cross_module_any = false;
        self
    }

    /// Suppress generation warnings.
    pub fn quiet(mut self) -> Self {
        self.warnings = false;
        self
    }
}

/// Fatal schema generation failure.
#[derive(Debug)]
pub enum SchemaGenerationError {
    Io(io::Error),
    /// Packages import each other in a cycle; the generated tree could not
    /// be loaded back in any order.
    CircularPackageDependency(Vec<String>),
}

impl fmt::Display for SchemaGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::CircularPackageDependency(cycle) => {
                write!(f, "circular package dependency: {}", cycle.join(" -> "))
            }
        }
    }
}

impl std::error::Error for SchemaGenerationError {}

impl From<io::Error> for SchemaGenerationError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Relative path prefix climbing from a package directory back to the
/// output root.
pub(crate) fn root_prefix(package: &str) -> String {
    "../".repeat(package.split('.').filter(|s| !s.is_empty()).count())
}

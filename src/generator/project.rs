// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Whole-tree schema generation: one file per registered type, grouped into
//! package directories, plus the shared extension file.

use crate::generator::constants::{EXTENSION_FILE, EXTENSION_FILE_TEXT};
use crate::generator::emitter::{emit, EmittedFile};
use crate::generator::hierarchy::ResolvedState;
use crate::generator::{GeneratorOptions, SchemaGenerationError};
use crate::metadata::MetadataRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Generate the full schema tree for every registered type into `out`.
///
/// Fails without writing partial output when the package import graph is
/// cyclic; filesystem errors abort mid-write.
pub fn generate_project(
    registry: &MetadataRegistry,
    out: &Path,
    options: &GeneratorOptions,
) -> Result<(), SchemaGenerationError> {
    let state = ResolvedState::resolve(registry, options);

    let mut emitted = Vec::new();
    for name in registry.type_names() {
        let Some(meta) = registry.own_metadata(&name) else {
            continue;
        };
        emitted.push(emit(registry, &state, &meta, options));
    }

    check_package_cycles(&emitted)?;

    fs::create_dir_all(out)?;
    fs::write(out.join(EXTENSION_FILE), EXTENSION_FILE_TEXT)?;
    for file in &emitted {
        let dir: std::path::PathBuf = out.join(file.package.replace('.', "/"));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&file.file_name), &file.text)?;
    }
    log::debug!(
        "generated {} schema files into {}",
        emitted.len(),
        out.display()
    );
    Ok(())
}

/// Detect cycles in the package-level import graph.
fn check_package_cycles(emitted: &[EmittedFile]) -> Result<(), SchemaGenerationError> {
    let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for file in emitted {
        let deps = edges.entry(&file.package).or_default();
        for dep in &file.external_packages {
            deps.insert(dep);
        }
    }

    let mut done: BTreeSet<&str> = BTreeSet::new();
    for &start in edges.keys() {
        if done.contains(start) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        visit(start, &edges, &mut path, &mut done)?;
    }
    Ok(())
}

fn visit<'a>(
    package: &'a str,
    edges: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    path: &mut Vec<&'a str>,
    done: &mut BTreeSet<&'a str>,
) -> Result<(), SchemaGenerationError> {
    if let Some(position) = path.iter().position(|&p| p == package) {
        let mut cycle: Vec<String> = path[position..].iter().map(|s| s.to_string()).collect();
        cycle.push(package.to_string());
        return Err(SchemaGenerationError::CircularPackageDependency(cycle));
    }
    if done.contains(package) {
        return Ok(());
    }
    path.push(package);
    if let Some(deps) = edges.get(package) {
        for &dep in deps {
            visit(dep, edges, path, done)?;
        }
    }
    path.pop();
    done.insert(package);
    Ok(())
}

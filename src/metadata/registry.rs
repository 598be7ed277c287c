// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of class metadata, keyed by type name.

use crate::metadata::{ClassMetadata, MemberMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Explicitly constructed map from type name to [`ClassMetadata`].
///
/// Populated once at startup, read-only afterwards. There is deliberately no
/// process-global instance; callers pass the registry by reference.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, Arc<ClassMetadata>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, meta: ClassMetadata) {
        self.classes.insert(meta.type_name.clone(), Arc::new(meta));
    }

    /// Metadata declared on the type itself.
    pub fn own_metadata(&self, type_name: &str) -> Option<Arc<ClassMetadata>> {
        self.classes.get(type_name).cloned()
    }

    /// Metadata of the hierarchy root reached by walking parent links.
    pub fn root_metadata(&self, type_name: &str) -> Option<Arc<ClassMetadata>> {
        let mut current = self.classes.get(type_name)?;
        while let Some(parent) = current
            .parent
            .as_deref()
            .and_then(|p| self.classes.get(p))
        {
            current = parent;
        }
        Some(Arc::clone(current))
    }

    /// Returns `true` if `sub` is a strict descendant of `base`.
    pub fn is_descendant(&self, sub: &str, base: &str) -> bool {
        if sub == base {
            return false;
        }
        let mut current = self.classes.get(sub);
        while let Some(meta) = current {
            match meta.parent.as_deref() {
                Some(p) if p == base => return true,
                Some(p) => current = self.classes.get(p),
                None => return false,
            }
        }
        false
    }

    /// All known concrete types of `base`: the type itself plus every
    /// transitive descendant, sorted by name for deterministic iteration.
    pub fn known_types(&self, base: &str) -> Vec<Arc<ClassMetadata>> {
        let mut known: Vec<Arc<ClassMetadata>> = self
            .classes
            .values()
            .filter(|m| m.type_name == base || self.is_descendant(&m.type_name, base))
            .cloned()
            .collect();
        known.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        known
    }

    /// Full member list of a type: inherited members first (base-most first),
    /// then own members. A redefinition by a subtype replaces the inherited
    /// descriptor in place.
    pub fn all_members(&self, type_name: &str) -> Vec<MemberMetadata> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(type_name);
        while let Some(meta) = current {
            chain.push(Arc::clone(meta));
            current = meta.parent.as_deref().and_then(|p| self.classes.get(p));
        }

        let mut members: Vec<MemberMetadata> = Vec::new();
        for meta in chain.iter().rev() {
            for member in &meta.members {
                if let Some(existing) = members.iter_mut().find(|m| m.key == member.key) {
                    *existing = member.clone();
                } else {
                    members.push(member.clone());
                }
            }
        }
        members
    }

    /// All registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClassMetadataBuilder, FieldType, NumberHint};

    fn sample_registry() -> MetadataRegistry {
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
            ClassMetadataBuilder::new("IndoorPosition", "hps/core")
                .parent("GeoPosition")
                .member("floor", FieldType::Number)
                .build(),
        );
        reg
    }

    #[test]
    fn test_root_metadata() {
        let reg = sample_registry();
        assert_eq!(
            reg.root_metadata("IndoorPosition").unwrap().type_name,
            "Position"
        );
        assert_eq!(reg.root_metadata("Position").unwrap().type_name, "Position");
        assert!(reg.root_metadata("Unknown").is_none());
    }

    #[test]
    fn test_is_descendant() {
        let reg = sample_registry();
        assert!(reg.is_descendant("GeoPosition", "Position"));
        assert!(reg.is_descendant("IndoorPosition", "Position"));
        assert!(!reg.is_descendant("Position", "Position"));
        assert!(!reg.is_descendant("Position", "GeoPosition"));
    }

    #[test]
    fn test_known_types_sorted() {
        let reg = sample_registry();
        let names: Vec<_> = reg
            .known_types("Position")
            .iter()
            .map(|m| m.type_name.clone())
            .collect();
        assert_eq!(names, vec!["GeoPosition", "IndoorPosition", "Position"]);
        assert_eq!(reg.known_types("IndoorPosition").len(), 1);
    }

    #[test]
    fn test_all_members_base_first() {
        let reg = sample_registry();
        let members = reg.all_members("IndoorPosition");
        let keys: Vec<_> = members.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["uid", "x", "lat", "floor"]);
    }

    #[test]
    fn test_all_members_redefinition_replaces() {
        let mut reg = sample_registry();
        reg.register(
            ClassMetadataBuilder::new("TaggedPosition", "hps/core")
                .parent("Position")
                .member("x", FieldType::String)
                .build(),
        );
        let members = reg.all_members("TaggedPosition");
        let keys: Vec<_> = members.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["uid", "x"]);
        assert_eq!(
            members.iter().find(|m| m.key == "x").unwrap().field_type,
            Some(FieldType::String)
        );
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::similar_names)] // Test variable naming

//! End-to-end serialization: generate schemas, reload them from disk, and
//! round-trip nested polymorphic object graphs through the public facade.

use protomorph::{
    generate_project, ClassMetadataBuilder, FieldType, GeneratorOptions, Instance, MapKey,
    MemberMetadata, MetadataRegistry, NumberHint, ProtobufSerializer, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A positioning-flavoured model: a base position with two subtypes, and a
/// container frame holding a map member, an array member and an open slot.
fn tracking_metadata() -> Arc<MetadataRegistry> {
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Position", "hps/core")
            .member("uid", FieldType::String)
            .number_member("x", NumberHint::Double)
            .number_member("y", NumberHint::Double)
            .build(),
    );
    reg.register(
        ClassMetadataBuilder::new("GeoPosition", "hps/core")
            .parent("Position")
            .number_member("altitude", NumberHint::Double)
            .build(),
    );
    reg.register(
        ClassMetadataBuilder::new("OrientedPosition", "hps/core")
            .parent("Position")
            .number_member("heading", NumberHint::Float)
            .build(),
    );
    reg.register(
        ClassMetadataBuilder::new("DataFrame", "hps/core")
            .member("uid", FieldType::String)
            .member(
                "positions",
                FieldType::Map(
                    Box::new(FieldType::String),
                    Box::new(FieldType::Ref("Position".into())),
                ),
            )
            .member("tags", FieldType::Array(Box::new(FieldType::String)))
            .member("payload", FieldType::Any)
            .member_with(
                MemberMetadata::new("source", FieldType::String).required(),
            )
            .build(),
    );
    Arc::new(reg)
}

fn sample_frame() -> Instance {
    let mut positions = BTreeMap::new();
    positions.insert(
        MapKey::from("anchor"),
        Value::Object(
            Instance::new("Position")
                .with("uid", "6ba7b810-9dad-11d1-80b4-00c04fd430c8")
                .with("x", 0.0)
                .with("y", 0.0),
        ),
    );
    positions.insert(
        MapKey::from("rover"),
        Value::Object(
            Instance::new("GeoPosition")
                .with("uid", "rover-7")
                .with("x", 12.5)
                .with("y", -3.25)
                .with("altitude", 44.0),
        ),
    );
    Instance::new("DataFrame")
        .with("uid", "frame-1")
        .with("source", "gateway-2")
        .with("positions", Value::Map(positions))
        .with("tags", vec!["outdoor", "fused"])
        .with("payload", Value::Int(1337))
}

#[test]
fn round_trip_through_generated_directory() {
    let metadata = tracking_metadata();
    let dir = tempfile::tempdir().expect("tempdir");
    generate_project(&metadata, dir.path(), &GeneratorOptions::default()).expect("generate");

    let serializer = ProtobufSerializer::initialize(Arc::clone(&metadata), Some(dir.path()))
        .expect("initialize");

    let frame = sample_frame();
    let bytes = serializer.serialize(&frame).expect("serialize");
    let decoded = serializer.deserialize(&bytes, None).expect("deserialize");
    assert_eq!(decoded, frame);

    // Concrete subtype identities survive inside the map member.
    let positions = decoded.get("positions").and_then(Value::as_map).unwrap();
    let rover = positions
        .get(&MapKey::from("rover"))
        .and_then(Value::as_object)
        .unwrap();
    assert_eq!(rover.type_name(), "GeoPosition");
    assert_eq!(rover.get("altitude").and_then(Value::as_number), Some(44.0));
}

#[test]
fn polymorphic_decode_against_base_type() {
    let serializer =
        ProtobufSerializer::initialize(tracking_metadata(), None).expect("initialize");

    let oriented = Instance::new("OrientedPosition")
        .with("uid", "o-1")
        .with("x", 1.0)
        .with("y", 2.0)
        .with("heading", 90.0);
    let bytes = serializer.serialize(&oriented).expect("serialize");

    let decoded = serializer
        .deserialize(&bytes, Some("Position"))
        .expect("deserialize");
    assert_eq!(decoded.type_name(), "OrientedPosition");
    assert_eq!(decoded, oriented);
}

#[test]
fn identifier_arms_restore_the_same_string() {
    let serializer =
        ProtobufSerializer::initialize(tracking_metadata(), None).expect("initialize");

    for uid in ["6ba7b810-9dad-11d1-80b4-00c04fd430c8", "beacon-basement-2"] {
        let position = Instance::new("Position")
            .with("uid", uid)
            .with("x", 1.0)
            .with("y", 1.0);
        let bytes = serializer.serialize(&position).expect("serialize");
        let decoded = serializer.deserialize(&bytes, None).expect("deserialize");
        assert_eq!(decoded.get("uid").and_then(Value::as_str), Some(uid));
    }
}

#[test]
fn required_member_is_enforced_on_serialize() {
    let serializer =
        ProtobufSerializer::initialize(tracking_metadata(), None).expect("initialize");

    let mut frame = sample_frame();
    frame.remove("source");
    assert!(serializer.serialize(&frame).is_err());
}

#[test]
fn generated_schema_text_is_deterministic() {
    let metadata = tracking_metadata();
    let options = GeneratorOptions::default();

    let render = || {
        let dir = tempfile::tempdir().expect("tempdir");
        generate_project(&metadata, dir.path(), &options).expect("generate");
        let mut texts = Vec::new();
        for name in ["Position", "GeoPosition", "OrientedPosition", "DataFrame"] {
            let path = dir.path().join("hps/core").join(format!("{}.proto", name));
            texts.push(std::fs::read_to_string(path).expect("read"));
        }
        texts
    };
    assert_eq!(render(), render());
}

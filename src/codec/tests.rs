// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end codec workflows over generated and reloaded schemas.

use crate::codec::{DecodeError, EncodeError, ObjectCodec};
use crate::generator::{generate_project, GeneratorOptions};
use crate::metadata::{
    ClassMetadataBuilder, FieldType, Instance, MapKey, MemberMetadata, MetadataRegistry,
    NumberHint, Value,
};
use crate::registry::SchemaRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;

fn tracking_metadata() -> MetadataRegistry {
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
        ClassMetadataBuilder::new("Absolute2DPosition", "hps/core")
            .parent("Position")
            .number_member("accuracy", NumberHint::Float)
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
            .build(),
    );
    reg
}

fn codec_for(metadata: MetadataRegistry) -> (tempfile::TempDir, ObjectCodec) {
    let dir = tempfile::tempdir().expect("tempdir");
    generate_project(&metadata, dir.path(), &GeneratorOptions::default()).expect("generate");
    let schemas = SchemaRegistry::load(dir.path()).expect("load");
    let codec = ObjectCodec::new(Arc::new(metadata), Arc::new(schemas));
    (dir, codec)
}

#[test]
fn test_round_trip_scalars() {
    let (_dir, codec) = codec_for(tracking_metadata());
    let position = Instance::new("Position")
        .with("uid", "beacon-12")
        .with("x", 1.5)
        .with("y", -2.25);

    let bytes = codec.encode(&position).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded, position);
}

#[test]
fn test_discriminator_resolves_concrete_type() {
    let (_dir, codec) = codec_for(tracking_metadata());
    let geo = Instance::new("GeoPosition")
        .with("uid", "geo-1")
        .with("x", 4.0)
        .with("y", 5.0)
        .with("altitude", 120.5);

    let bytes = codec.encode(&geo).expect("encode");
    // Decoding with the base type as the expectation still yields the
    // concrete subtype, resolved via the discriminator.
    let decoded = codec.decode(&bytes, Some("Position")).expect("decode");
    assert_eq!(decoded.type_name(), "GeoPosition");
    assert_eq!(decoded, geo);
}

#[test]
fn test_identifier_duality() {
    let (_dir, codec) = codec_for(tracking_metadata());

    // A UUID-shaped identifier travels through the binary arm.
    let uuid = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
    let with_uuid = Instance::new("Position").with("uid", uuid).with("x", 0.0);
    let bytes = codec.encode(&with_uuid).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("uid").and_then(Value::as_str), Some(uuid));

    // An arbitrary identifier falls back to the string arm.
    let with_name = Instance::new("Position")
        .with("uid", "beacon-hallway-3")
        .with("x", 0.0);
    let bytes = codec.encode(&with_name).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(
        decoded.get("uid").and_then(Value::as_str),
        Some("beacon-hallway-3")
    );
}

#[test]
fn test_malformed_binary_identifier_reported_and_absent() {
    use std::sync::Mutex;

    let (_dir, codec) = codec_for(tracking_metadata());
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let codec = codec.with_issue_handler(Arc::new(move |issue| {
        sink.lock().unwrap().push(issue.member.clone());
    }));

    // Hand-build a payload whose binary identifier arm is too short to be a
    // 128-bit identifier.
    use crate::proto::ProtoValue;
    let entry = codec.schemas.lookup("Position").unwrap();
    let uid_bin = entry.schema.descriptor().field_by_name("uid_bin").unwrap().number;
    let mut raw = ProtoValue::message();
    raw.push(uid_bin, ProtoValue::Bytes(vec![1, 2, 3, 4, 5]));
    let payload = entry.schema.encode(&raw).expect("encode payload");

    let mut any = ProtoValue::message();
    any.push(1, ProtoValue::Str("Position".into()));
    any.push(2, ProtoValue::Bytes(payload));
    let mut envelope = ProtoValue::message();
    envelope.push(1, any);
    let bytes = codec.schemas.envelope().encode(&envelope).expect("encode envelope");

    let decoded = codec.decode(&bytes, None).expect("decode");
    assert!(decoded.get("uid").is_none());
    assert_eq!(seen.lock().unwrap().as_slice(), ["uid"]);
}

#[test]
fn test_open_member_primitive_fallback() {
    let (_dir, codec) = codec_for(tracking_metadata());

    for payload in [Value::from(42i64), Value::from(2.5f64), Value::from(true), Value::from("ok")]
    {
        let mut frame = Instance::new("DataFrame").with("uid", "frame-1");
        frame.set("payload", payload.clone());
        let bytes = codec.encode(&frame).expect("encode");
        let decoded = codec.decode(&bytes, None).expect("decode");
        assert_eq!(decoded.get("payload"), Some(&payload));
    }
}

#[test]
fn test_open_member_registered_object() {
    let (_dir, codec) = codec_for(tracking_metadata());
    let geo = Instance::new("GeoPosition")
        .with("uid", "geo-2")
        .with("x", 1.0)
        .with("y", 2.0)
        .with("altitude", 10.0);
    let frame = Instance::new("DataFrame")
        .with("uid", "frame-2")
        .with("payload", geo.clone());

    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    let payload = decoded.get("payload").and_then(Value::as_object).expect("object");
    assert_eq!(payload, &geo);
}

#[test]
fn test_alternative_arms_route_cross_module_family() {
    // A family split across modules keeps per-type schemas; a reference to
    // the base becomes a union of the known alternatives.
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Sensor", "hps/core")
            .member("uid", FieldType::String)
            .build(),
    );
    reg.register(
        ClassMetadataBuilder::new("RemoteSensor", "hps/ext")
            .parent("Sensor")
            .member("endpoint", FieldType::String)
            .build(),
    );
    reg.register(
        ClassMetadataBuilder::new("Frame", "hps/core")
            .member("source", FieldType::Ref("Sensor".into()))
            .build(),
    );
    let (_dir, codec) = codec_for(reg);

    // A subtype value routes through its own arm and keeps its identity.
    let remote = Instance::new("RemoteSensor")
        .with("uid", "s-1")
        .with("endpoint", "tcp://10.0.0.7");
    let frame = Instance::new("Frame").with("source", remote.clone());
    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("source").and_then(Value::as_object), Some(&remote));

    // The base type has an arm of its own.
    let base = Instance::new("Sensor").with("uid", "s-2");
    let frame = Instance::new("Frame").with("source", base.clone());
    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("source").and_then(Value::as_object), Some(&base));

    // Values with no matching arm go through the tagged fallback.
    let frame = Instance::new("Frame").with("source", 7i64);
    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("source"), Some(&Value::Int(7)));
}

#[test]
fn test_integer_map_keys_round_trip() {
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Tally", "hps/core")
            .member(
                "counts",
                FieldType::Map(Box::new(FieldType::Number), Box::new(FieldType::String)),
            )
            .build(),
    );
    let (_dir, codec) = codec_for(reg);

    // Hintless numeric keys travel through their string rendering and come
    // back as integers.
    let mut counts = BTreeMap::new();
    counts.insert(MapKey::Int(5), Value::from("five"));
    counts.insert(MapKey::Int(-3), Value::from("minus three"));
    let tally = Instance::new("Tally").with("counts", Value::Map(counts.clone()));

    let bytes = codec.encode(&tally).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("counts").and_then(Value::as_map), Some(&counts));
}

#[test]
fn test_container_with_map_and_array() {
    let (_dir, codec) = codec_for(tracking_metadata());

    let mut positions = BTreeMap::new();
    positions.insert(
        MapKey::from("origin"),
        Value::Object(
            Instance::new("Absolute2DPosition")
                .with("uid", "p-0")
                .with("x", 0.0)
                .with("y", 0.0)
                .with("accuracy", 0.5),
        ),
    );
    positions.insert(
        MapKey::from("target"),
        Value::Object(
            Instance::new("GeoPosition")
                .with("uid", "p-1")
                .with("x", 3.0)
                .with("y", 4.0)
                .with("altitude", 50.0),
        ),
    );
    let frame = Instance::new("DataFrame")
        .with("uid", "frame-3")
        .with("positions", Value::Map(positions))
        .with("tags", vec!["indoor", "calibrated"]);

    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, Some("DataFrame")).expect("decode");
    assert_eq!(decoded, frame);

    // Subtype identities inside the map survive the round trip.
    let positions = decoded.get("positions").and_then(Value::as_map).unwrap();
    let target = positions
        .get(&MapKey::from("target"))
        .and_then(Value::as_object)
        .unwrap();
    assert_eq!(target.type_name(), "GeoPosition");
}

#[test]
fn test_optional_member_stays_absent() {
    let (_dir, codec) = codec_for(tracking_metadata());
    let frame = Instance::new("DataFrame").with("uid", "frame-4");
    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    // No default zero-values appear for absent members.
    assert!(decoded.get("positions").is_none());
    assert!(decoded.get("tags").is_none());
    assert!(decoded.get("payload").is_none());
}

#[test]
fn test_required_member_enforced() {
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Record", "hps/core")
            .member_with(MemberMetadata::new("name", FieldType::String).required())
            .number_member("value", NumberHint::Integer)
            .build(),
    );
    let (_dir, codec) = codec_for(reg);

    let missing = Instance::new("Record").with("value", 7i64);
    match codec.encode(&missing) {
        Err(EncodeError::MissingRequired { member, .. }) => assert_eq!(member, "name"),
        other => panic!("expected missing required, got {:?}", other.map(|b| b.len())),
    }

    let complete = Instance::new("Record").with("name", "ok").with("value", 7i64);
    let bytes = codec.encode(&complete).expect("encode");
    assert_eq!(codec.decode(&bytes, None).expect("decode"), complete);
}

#[test]
fn test_required_member_missing_on_wire() {
    // Encode with relaxed metadata, decode with a required flag.
    let mut relaxed = MetadataRegistry::new();
    relaxed.register(
        ClassMetadataBuilder::new("Record", "hps/core")
            .member("name", FieldType::String)
            .build(),
    );
    let dir = tempfile::tempdir().expect("tempdir");
    generate_project(&relaxed, dir.path(), &GeneratorOptions::default()).expect("generate");
    let schemas = Arc::new(SchemaRegistry::load(dir.path()).expect("load"));

    let encoder = ObjectCodec::new(Arc::new(relaxed), Arc::clone(&schemas));
    let bytes = encoder.encode(&Instance::new("Record")).expect("encode");

    let mut strict = MetadataRegistry::new();
    strict.register(
        ClassMetadataBuilder::new("Record", "hps/core")
            .member_with(MemberMetadata::new("name", FieldType::String).required())
            .build(),
    );
    let decoder = ObjectCodec::new(Arc::new(strict), schemas);
    assert!(matches!(
        decoder.decode(&bytes, None),
        Err(DecodeError::MissingRequired { .. })
    ));
}

#[test]
fn test_hintless_number_coercion() {
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Sample", "hps/core")
            .member_with(MemberMetadata::new("reading", FieldType::Number))
            .build(),
    );
    let (_dir, codec) = codec_for(reg);

    // Integers and floats both survive the string representation.
    for value in [Value::Int(1234), Value::Float(12.75)] {
        let mut sample = Instance::new("Sample");
        sample.set("reading", value.clone());
        let bytes = codec.encode(&sample).expect("encode");
        let decoded = codec.decode(&bytes, None).expect("decode");
        assert_eq!(decoded.get("reading"), Some(&value));
    }
}

#[test]
fn test_post_deserialize_hook_runs() {
    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Stamped", "hps/core")
            .member("name", FieldType::String)
            .post_deserialize(Arc::new(|instance: &mut Instance| {
                instance.set("restored", true);
            }))
            .build(),
    );
    let (_dir, codec) = codec_for(reg);

    let bytes = codec
        .encode(&Instance::new("Stamped").with("name", "a"))
        .expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("restored").and_then(Value::as_bool), Some(true));
}

#[test]
fn test_issue_handler_receives_skipped_members() {
    use std::sync::Mutex;

    let (_dir, codec) = codec_for(tracking_metadata());
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let codec = codec.with_issue_handler(Arc::new(move |issue| {
        sink.lock().unwrap().push(issue.member.clone());
    }));

    // A mismatched optional member is skipped, not fatal.
    let frame = Instance::new("DataFrame")
        .with("uid", "frame-5")
        .with("tags", Value::Str("not-an-array".into()));
    let bytes = codec.encode(&frame).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert!(decoded.get("tags").is_none());
    assert_eq!(seen.lock().unwrap().as_slice(), ["tags"]);
}

#[test]
fn test_out_of_range_int32_reported_not_truncated() {
    use std::sync::Mutex;

    let mut reg = MetadataRegistry::new();
    reg.register(
        ClassMetadataBuilder::new("Counter", "hps/core")
            .number_member("hits", NumberHint::Integer)
            .build(),
    );
    let (_dir, codec) = codec_for(reg);
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let codec = codec.with_issue_handler(Arc::new(move |issue| {
        sink.lock().unwrap().push(issue.member.clone());
    }));

    // A value outside the int32 range is skipped and reported, not wrapped.
    let counter = Instance::new("Counter").with("hits", i64::from(i32::MAX) + 1);
    let bytes = codec.encode(&counter).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert!(decoded.get("hits").is_none());
    assert_eq!(seen.lock().unwrap().as_slice(), ["hits"]);

    let counter = Instance::new("Counter").with("hits", 42i64);
    let bytes = codec.encode(&counter).expect("encode");
    let decoded = codec.decode(&bytes, None).expect("decode");
    assert_eq!(decoded.get("hits"), Some(&Value::Int(42)));
}

#[test]
fn test_decode_without_tag_or_expectation_fails() {
    let (_dir, codec) = codec_for(tracking_metadata());
    // An empty envelope has neither a tag nor a payload.
    let empty = codec.schemas.envelope().encode(&crate::proto::ProtoValue::message()).unwrap();
    assert!(matches!(
        codec.decode(&empty, None),
        Err(DecodeError::MissingTypeTag)
    ));
}

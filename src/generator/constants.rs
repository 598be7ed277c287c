// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed names and file fragments shared by generation and loading.

/// Banner prepended to every generated schema file.
pub const HEADER: &str = "/**\n * Automatically generated schema definition.\n * DO NOT EDIT: changes are overwritten on the next generation run.\n */\n";

/// File name of the shared extension declarations, written at the root of
/// the output tree.
pub const EXTENSION_FILE: &str = "protomorph.proto";

/// Content of [`EXTENSION_FILE`]: enum value options carrying the class name
/// and owning package of each discriminator arm, so a loaded schema directory
/// is self-describing.
pub const EXTENSION_FILE_TEXT: &str = "/**\n * Automatically generated schema definition.\n * DO NOT EDIT: changes are overwritten on the next generation run.\n */\nsyntax = \"proto3\";\n\nimport \"google/protobuf/descriptor.proto\";\n\nextend google.protobuf.EnumValueOptions {\n  optional string className = 50000;\n  optional string packageName = 50001;\n}\n";

/// Wire name of the discriminator field, emitted at field number 0 ahead of
/// all data fields.
pub const DISCRIMINATOR_FIELD: &str = "_type";

/// Conventional name of the identifier member, emitted as a two-arm union.
pub const UID_MEMBER: &str = "uid";

/// Binary identifier arm (16-byte parsed form).
pub const UID_BIN: &str = "uid_bin";

/// String identifier arm (unparsed fallback).
pub const UID_STR: &str = "uid_str";

/// Import path of the predefined open-payload definition.
pub const ANY_IMPORT: &str = "google/protobuf/any.proto";

/// Suffix of the generic fallback arm in open-typed member unions.
pub const ANY_ARM_SUFFIX: &str = "_any";

/// Name of the synthetic outermost envelope message.
pub const WRAPPER_MESSAGE: &str = "WrapperMessage";

/// Name of the synthetic fallback wrapper for unregistered primitives.
pub const PRIMITIVE_WRAPPER_MESSAGE: &str = "PrimitiveWrapperMessage";

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal proto3 schema compiler and wire codec.
//!
//! This module plays the role of the external binary codec: it compiles
//! schema text into message descriptors and encodes/decodes field-keyed
//! [`ProtoValue`] trees against them. Only the proto3 subset emitted by the
//! generator is supported:
//!
//! - `package`, `syntax`, `import`, `message`, `enum`, `oneof`,
//!   `repeated`, `map<K, V>`, field and enum value options, `extend` blocks
//! - scalars `double`, `float`, `int32`, `int64`, `bool`, `string`, `bytes`
//! - the predefined `google.protobuf.Any` message
//!
//! Unknown wire fields are skipped on decode (forward compatibility). Field
//! number 0 is tolerated; the discriminator convention uses it.

mod model;
mod parser;
mod pool;
mod value;
mod wire;

pub use model::{
    EnumDescriptor, EnumVariantDescriptor, FieldDescriptor, FieldKind, FileDescriptor,
    MessageDescriptor, ScalarKind,
};
pub use parser::{parse_file, ParseError};
pub use pool::{CompiledSchema, LinkError, LinkedSchemas, SchemaPool, ANY_TYPE_NAME};
pub use value::ProtoValue;
pub use wire::WireError;

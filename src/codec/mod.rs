// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object codec: metadata-driven conversion between dynamic instance graphs
//! and wire bytes, routed through the schema registry.
//!
//! Per-member problems on non-required members go to an injectable issue
//! handler and the member is skipped; required members escalate to a hard
//! error of the whole call. Encode and decode are stateless per call and
//! safe to run concurrently against a shared codec.

mod decoder;
mod encoder;

#[cfg(test)]
mod tests;

pub use decoder::DecodeError;
pub use encoder::EncodeError;

use crate::metadata::MetadataRegistry;
use crate::proto::CompiledSchema;
use crate::registry::{SchemaRegistry, TypeEntry};
use std::sync::Arc;

/// One reported per-member problem.
#[derive(Debug, Clone)]
pub struct CodecIssue {
    pub type_name: String,
    pub member: String,
    pub message: String,
}

/// Sink for per-member problems that do not abort the call.
pub type IssueHandler = Arc<dyn Fn(&CodecIssue) + Send + Sync>;

/// Default sink: structured warning log.
pub fn log_issue_handler() -> IssueHandler {
    Arc::new(|issue: &CodecIssue| {
        log::warn!(
            "{}.{}: {}",
            issue.type_name,
            issue.member,
            issue.message
        );
    })
}

/// Metadata-driven encoder/decoder over a loaded schema registry.
pub struct ObjectCodec {
    pub(crate) metadata: Arc<MetadataRegistry>,
    pub(crate) schemas: Arc<SchemaRegistry>,
    pub(crate) issues: IssueHandler,
}

impl ObjectCodec {
    /// Create a codec over loaded metadata and schemas.
    pub fn new(metadata: Arc<MetadataRegistry>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            metadata,
            schemas,
            issues: log_issue_handler(),
        }
    }

    /// Replace the per-member issue sink.
    pub fn with_issue_handler(mut self, handler: IssueHandler) -> Self {
        self.issues = handler;
        self
    }

    /// Schema entry and the schema a type is encoded/decoded against: its
    /// canonical family owner's when the type is part of a discriminated
    /// family, its own otherwise.
    pub(crate) fn routed_schema(
        &self,
        type_name: &str,
    ) -> Option<(&TypeEntry, &CompiledSchema)> {
        let entry = self.schemas.lookup(type_name)?;
        let schema = match entry.canonical.as_deref() {
            Some(owner) if owner != type_name => &self.schemas.lookup(owner)?.schema,
            _ => &entry.schema,
        };
        Some((entry, schema))
    }

    pub(crate) fn report(&self, type_name: &str, member: &str, message: impl Into<String>) {
        (self.issues)(&CodecIssue {
            type_name: type_name.to_string(),
            member: member.to_string(),
            message: message.into(),
        });
    }
}

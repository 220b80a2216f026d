//! Error types for schema discovery, persistence and synchronization

use std::path::PathBuf;

use folio_common::{ErrorSeverity, Severity};
use folio_fields::FieldsError;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors that can occur while building or synchronizing the schema graph
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A member declares a field kind the registry does not know
    #[error("content type '{content_type}': member '{member}' uses unknown field kind '{kind}'")]
    UnknownFieldKind {
        content_type: String,
        member: String,
        kind: String,
    },

    /// Two siblings resolved to the same internal id
    #[error("duplicate internal id '{internal_id}' in {scope}")]
    DuplicateInternalId { scope: String, internal_id: String },

    /// An internal id override or derived name is unusable
    #[error("invalid internal id '{value}'")]
    InvalidInternalId { value: String },

    /// A batch referenced a content type that is not persisted
    #[error("content type not found: {internal_id}")]
    ContentTypeNotFound { internal_id: String },

    /// A batch referenced a region that is not persisted
    #[error("region not found: {content_type}/{region}")]
    RegionNotFound { content_type: String, region: String },

    /// `delete_orphans` was called without a preceding `build`
    #[error("no pending diff; call build before delete_orphans")]
    NoPendingDiff,

    /// A shape declaration file could not be parsed
    #[error("invalid shape file '{path}': {source}")]
    ShapeFile {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// A persisted schema document could not be parsed
    #[error("corrupt schema document '{path}': {source}")]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Storage backend failure
    #[error("store error: {message}")]
    Store { message: String },

    /// Field registry error
    #[error(transparent)]
    Fields(#[from] FieldsError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SchemaError {
    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for SchemaError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

impl Severity for SchemaError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SchemaError::UnknownFieldKind { .. }
            | SchemaError::DuplicateInternalId { .. }
            | SchemaError::InvalidInternalId { .. }
            | SchemaError::NoPendingDiff
            | SchemaError::ShapeFile { .. }
            | SchemaError::Config(_) => ErrorSeverity::Critical,
            SchemaError::Fields(e) => e.severity(),
            SchemaError::ContentTypeNotFound { .. }
            | SchemaError::RegionNotFound { .. }
            | SchemaError::CorruptDocument { .. }
            | SchemaError::Store { .. }
            | SchemaError::Io(_)
            | SchemaError::Yaml(_) => ErrorSeverity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_names_everything() {
        let err = SchemaError::UnknownFieldKind {
            content_type: "Article".into(),
            member: "Body".into(),
            kind: "Wysiwyg".into(),
        };
        assert_eq!(
            err.to_string(),
            "content type 'Article': member 'Body' uses unknown field kind 'Wysiwyg'"
        );
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn fields_errors_keep_their_severity() {
        let err: SchemaError = FieldsError::UnknownDiscriminator {
            discriminator: "x".into(),
        }
        .into();
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn store_errors_are_recoverable() {
        assert!(!SchemaError::store("disk full").severity().is_fatal());
    }
}

//! Error types for the field kind registry and value binding

use folio_common::{ErrorSeverity, Severity};
use thiserror::Error;

use crate::types::ValueType;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in field registry, serializer and binder operations
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Registration attempted after the registry was frozen
    #[error("field kind registry is frozen; cannot register '{kind}'")]
    RegistryFrozen { kind: String },

    /// A value of the wrong runtime type was handed to a serializer
    #[error("type mismatch for field kind '{kind}': expected {expected}, got {actual}")]
    TypeMismatch {
        kind: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// An instant whose year has no RFC 3339 form
    #[error("field kind '{kind}' cannot store year {year}; years must be 0000-9999")]
    YearOutOfRange { kind: String, year: i32 },

    /// A descriptor whose serializer encodes a different runtime type than it declares
    #[error("field kind '{kind}' declares {declared} but its serializer encodes {encodes}")]
    SerializerMismatch {
        kind: String,
        declared: ValueType,
        encodes: ValueType,
    },

    /// Field kind name not present in the registry
    #[error("unknown field kind: {kind}")]
    UnknownKind { kind: String },

    /// A stored value carries a discriminator the registry cannot resolve
    #[error("unknown discriminator '{discriminator}' on stored value")]
    UnknownDiscriminator { discriminator: String },

    /// Incoming form data could not be bound to a field
    #[error("binding failed for field '{field}': {source}")]
    BindingFailed {
        field: String,
        #[source]
        source: BindingCause,
    },
}

impl FieldsError {
    /// Create a binding failure for `field`
    pub fn binding(field: impl Into<String>, source: BindingCause) -> Self {
        Self::BindingFailed {
            field: field.into(),
            source,
        }
    }
}

impl Severity for FieldsError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            FieldsError::RegistryFrozen { .. }
            | FieldsError::TypeMismatch { .. }
            | FieldsError::SerializerMismatch { .. }
            | FieldsError::UnknownKind { .. } => ErrorSeverity::Critical,
            FieldsError::YearOutOfRange { .. }
            | FieldsError::UnknownDiscriminator { .. }
            | FieldsError::BindingFailed { .. } => ErrorSeverity::Error,
        }
    }
}

/// Why a binding attempt failed
#[derive(Debug, Error)]
pub enum BindingCause {
    /// The `<field>.discriminator` key was absent or empty
    #[error("missing discriminator key '{key}'")]
    MissingDiscriminator { key: String },

    /// The discriminator names a kind that is not registered
    #[error("discriminator '{discriminator}' is not a registered field kind")]
    UnknownDiscriminator { discriminator: String },

    /// The raw value could not be parsed as the resolved kind
    #[error("invalid value {raw:?} for field kind '{kind}'")]
    InvalidValue { kind: String, raw: String },

    /// The structural delegate reported an error
    #[error("{0}")]
    Delegate(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = FieldsError::RegistryFrozen {
            kind: "Text".into(),
        };
        assert_eq!(
            err.to_string(),
            "field kind registry is frozen; cannot register 'Text'"
        );
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = FieldsError::TypeMismatch {
            kind: "CheckBox".into(),
            expected: ValueType::Bool,
            actual: ValueType::Text,
        };
        let msg = err.to_string();
        assert!(msg.contains("CheckBox"));
        assert!(msg.contains("bool"));
        assert!(msg.contains("text"));
    }

    #[test]
    fn binding_failed_exposes_cause() {
        let err = FieldsError::binding(
            "Body",
            BindingCause::MissingDiscriminator {
                key: "Body.discriminator".into(),
            },
        );
        let source = err.source().expect("binding errors carry a cause");
        assert!(source.to_string().contains("Body.discriminator"));
    }

    #[test]
    fn severity_separates_programmer_errors_from_request_errors() {
        let frozen = FieldsError::RegistryFrozen { kind: "X".into() };
        let binding = FieldsError::binding(
            "Body",
            BindingCause::UnknownDiscriminator {
                discriminator: "Nope".into(),
            },
        );
        assert_eq!(frozen.severity(), ErrorSeverity::Critical);
        assert_eq!(binding.severity(), ErrorSeverity::Error);
    }
}

//! The table of field kinds and their serializers.
//!
//! Lifecycle: construct, populate with [`FieldKindRegistry::register`], call
//! [`FieldKindRegistry::freeze`], then share behind an `Arc` for the rest of the
//! process. A frozen registry rejects further registration, so the set of kinds
//! that can appear in storage cannot drift once content has been read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{FieldsError, Result};
use crate::serializer::Serializer;
use crate::types::{StoredValue, Value, ValueType};

/// Everything the engine knows about one field kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldKindDescriptor {
    /// Stable key; doubles as the discriminator written to storage.
    pub name: String,
    pub value_type: ValueType,
    /// Editor component hint for management UIs.
    pub ui_component: String,
    pub serializer: Serializer,
}

impl FieldKindDescriptor {
    /// A descriptor using the default encoding for `value_type`.
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        ui_component: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value_type,
            ui_component: ui_component.into(),
            serializer: Serializer::for_type(value_type),
        }
    }

    /// The discriminator stored alongside values of this kind.
    pub fn discriminator(&self) -> &str {
        &self.name
    }

    /// Encode a value of this kind.
    pub fn serialize(&self, value: &Value) -> Result<String> {
        self.serializer.serialize(&self.name, value)
    }

    /// Decode stored text, falling back to the zero value.
    pub fn deserialize(&self, text: &str) -> Value {
        self.serializer.deserialize(text)
    }

    /// Decode stored text strictly.
    pub fn try_deserialize(&self, text: &str) -> Option<Value> {
        self.serializer.try_deserialize(text)
    }

    /// The zero value of this kind.
    pub fn zero(&self) -> Value {
        self.value_type.zero()
    }
}

/// Built-in kinds in registration order: (name, value type, ui component).
const BUILTIN_KINDS: &[(&str, ValueType, &str)] = &[
    ("Text", ValueType::Text, "text-field"),
    ("String", ValueType::Text, "string-field"),
    ("Html", ValueType::Text, "html-field"),
    ("Markdown", ValueType::Text, "markdown-field"),
    ("Color", ValueType::Text, "color-field"),
    ("CheckBox", ValueType::Bool, "checkbox-field"),
    ("Number", ValueType::Integer, "number-field"),
    ("Date", ValueType::DateTime, "date-field"),
    ("Image", ValueType::Reference, "image-field"),
    ("Document", ValueType::Reference, "document-field"),
    ("Video", ValueType::Reference, "video-field"),
    ("Audio", ValueType::Reference, "audio-field"),
    ("Media", ValueType::Reference, "media-field"),
    ("Page", ValueType::Reference, "page-field"),
    ("Post", ValueType::Reference, "post-field"),
];

/// Registry of field kinds, keyed by kind name.
#[derive(Debug, Clone, Default)]
pub struct FieldKindRegistry {
    kinds: IndexMap<String, FieldKindDescriptor>,
    frozen: bool,
}

impl FieldKindRegistry {
    /// An empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// An unfrozen registry holding the built-in kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (name, value_type, ui) in BUILTIN_KINDS {
            registry
                .kinds
                .insert((*name).to_string(), FieldKindDescriptor::new(*name, *value_type, *ui));
        }
        registry
    }

    /// Register or replace a kind. The last registration for a name wins.
    ///
    /// The descriptor's serializer must encode the runtime type it declares.
    pub fn register(&mut self, descriptor: FieldKindDescriptor) -> Result<()> {
        if self.frozen {
            return Err(FieldsError::RegistryFrozen {
                kind: descriptor.name,
            });
        }
        if descriptor.serializer.value_type() != descriptor.value_type {
            return Err(FieldsError::SerializerMismatch {
                encodes: descriptor.serializer.value_type(),
                declared: descriptor.value_type,
                kind: descriptor.name,
            });
        }
        debug!(
            kind = %descriptor.name,
            value_type = %descriptor.value_type,
            "registered field kind"
        );
        // IndexMap::insert keeps the original position for an existing key
        self.kinds.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Stop accepting registrations. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(kinds = self.kinds.len(), "field kind registry frozen");
        }
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Get a kind by name.
    pub fn lookup(&self, name: &str) -> Option<&FieldKindDescriptor> {
        self.kinds.get(name)
    }

    /// Get the canonical kind for a runtime type: the earliest registered kind
    /// that declares it.
    pub fn lookup_by_value_type(&self, value_type: ValueType) -> Option<&FieldKindDescriptor> {
        self.kinds.values().find(|d| d.value_type == value_type)
    }

    /// Get a kind by name or fail with [`FieldsError::UnknownKind`].
    pub fn require(&self, name: &str) -> Result<&FieldKindDescriptor> {
        self.lookup(name).ok_or_else(|| FieldsError::UnknownKind {
            kind: name.to_string(),
        })
    }

    /// All kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &FieldKindDescriptor> {
        self.kinds.values()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Encode `value` as a stored value of kind `kind`.
    pub fn serialize_value(&self, kind: &str, value: &Value) -> Result<StoredValue> {
        let descriptor = self.require(kind)?;
        let payload = descriptor.serialize(value)?;
        Ok(StoredValue::new(descriptor.discriminator(), payload))
    }

    /// Decode a stored value.
    ///
    /// An unregistered discriminator fails closed. A malformed payload decodes
    /// to the kind's zero value.
    pub fn deserialize_value(&self, stored: &StoredValue) -> Result<Value> {
        let descriptor = self.lookup(&stored.discriminator).ok_or_else(|| {
            FieldsError::UnknownDiscriminator {
                discriminator: stored.discriminator.clone(),
            }
        })?;
        match descriptor.try_deserialize(&stored.payload) {
            Some(value) => Ok(value),
            None => {
                trace!(
                    discriminator = %stored.discriminator,
                    payload = %stored.payload,
                    "malformed stored payload, using zero value"
                );
                Ok(descriptor.zero())
            }
        }
    }
}

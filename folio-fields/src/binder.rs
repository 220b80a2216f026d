//! Polymorphic value binding for incoming flat key/value payloads.
//!
//! Form data does not say which Rust type a field holds; it carries a
//! discriminator next to the value:
//!
//! ```text
//! Body.discriminator = Markdown
//! Body.value         = # Hello
//! Gallery[0].discriminator = Image
//! Gallery[0].value         = 01HV6Y4Y0ZJ5T1D9P6Q0M5K8XR
//! ```
//!
//! Binding is a two-state machine. [`DiscriminatorPending`] reads the
//! discriminator and resolves it against the registry; only a [`Resolved`]
//! binder can hand the remaining keys to a [`StructuralBinder`]. A missing or
//! unregistered discriminator is a hard failure: unlike stored data, a request
//! without one is broken or tampered with, so nothing is defaulted.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{BindingCause, FieldsError, Result};
use crate::registry::{FieldKindDescriptor, FieldKindRegistry};
use crate::types::{StoredValue, Value};

/// Key suffix holding a field's kind name.
pub const DISCRIMINATOR_KEY: &str = "discriminator";

/// Key suffix holding a field's raw value.
pub const VALUE_KEY: &str = "value";

/// Key for `<field>.discriminator`.
pub fn discriminator_key(field: &str) -> String {
    format!("{field}.{DISCRIMINATOR_KEY}")
}

/// Key for `<field>.value`.
pub fn value_key(field: &str) -> String {
    format!("{field}.{VALUE_KEY}")
}

/// Prefix of the `index`-th item of a collection field.
pub fn item_prefix(field: &str, index: usize) -> String {
    format!("{field}[{index}]")
}

/// Read access to an incoming flat payload.
pub trait ValueProvider {
    fn value(&self, key: &str) -> Option<&str>;
}

impl ValueProvider for HashMap<String, String> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl ValueProvider for BTreeMap<String, String> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl<P: ValueProvider + ?Sized> ValueProvider for &P {
    fn value(&self, key: &str) -> Option<&str> {
        (**self).value(key)
    }
}

/// Extracts a typed value once the concrete kind is known.
pub trait StructuralBinder: Send + Sync {
    fn bind(
        &self,
        descriptor: &FieldKindDescriptor,
        prefix: &str,
        values: &dyn ValueProvider,
    ) -> std::result::Result<Value, BindingCause>;
}

/// Default delegate: reads `<prefix>.value` and decodes it strictly.
///
/// An absent value key binds to the kind's zero value, matching how HTML forms
/// omit unchecked boxes and empty inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadBinder;

impl StructuralBinder for PayloadBinder {
    fn bind(
        &self,
        descriptor: &FieldKindDescriptor,
        prefix: &str,
        values: &dyn ValueProvider,
    ) -> std::result::Result<Value, BindingCause> {
        let Some(raw) = values.value(&value_key(prefix)) else {
            return Ok(descriptor.zero());
        };
        descriptor
            .try_deserialize(raw)
            .ok_or_else(|| BindingCause::InvalidValue {
                kind: descriptor.name.clone(),
                raw: raw.to_string(),
            })
    }
}

/// A field whose discriminator has not been read yet.
#[derive(Debug, Clone)]
pub struct DiscriminatorPending {
    field: String,
}

impl DiscriminatorPending {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Read `<field>.discriminator` and resolve it against `registry`.
    pub fn resolve<'r>(
        self,
        registry: &'r FieldKindRegistry,
        values: &dyn ValueProvider,
    ) -> Result<Resolved<'r>> {
        let key = discriminator_key(&self.field);
        let discriminator = match values.value(&key).map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => {
                return Err(FieldsError::binding(
                    self.field,
                    BindingCause::MissingDiscriminator { key },
                ))
            }
        };
        let Some(descriptor) = registry.lookup(discriminator) else {
            return Err(FieldsError::binding(
                self.field,
                BindingCause::UnknownDiscriminator {
                    discriminator: discriminator.to_string(),
                },
            ));
        };
        Ok(Resolved {
            field: self.field,
            descriptor,
        })
    }
}

/// A field whose concrete kind is known.
#[derive(Debug, Clone)]
pub struct Resolved<'r> {
    field: String,
    descriptor: &'r FieldKindDescriptor,
}

impl<'r> Resolved<'r> {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn descriptor(&self) -> &'r FieldKindDescriptor {
        self.descriptor
    }

    /// Delegate structural extraction to `delegate`, scoped to this kind.
    pub fn bind(
        self,
        delegate: &dyn StructuralBinder,
        values: &dyn ValueProvider,
    ) -> Result<BoundField> {
        match delegate.bind(self.descriptor, &self.field, values) {
            Ok(value) if value.value_type() == self.descriptor.value_type => Ok(BoundField {
                field: self.field,
                kind: self.descriptor.name.clone(),
                value,
            }),
            Ok(value) => Err(FieldsError::binding(
                self.field,
                BindingCause::Delegate(Box::new(FieldsError::TypeMismatch {
                    kind: self.descriptor.name.clone(),
                    expected: self.descriptor.value_type,
                    actual: value.value_type(),
                })),
            )),
            Err(cause) => Err(FieldsError::binding(self.field, cause)),
        }
    }
}

/// The result of a successful binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundField {
    /// Key prefix the value was read from
    pub field: String,
    /// Resolved kind name
    pub kind: String,
    pub value: Value,
}

impl BoundField {
    /// Re-serialize for persistence.
    pub fn to_stored(&self, registry: &FieldKindRegistry) -> Result<StoredValue> {
        registry.serialize_value(&self.kind, &self.value)
    }
}

/// Registry plus delegate: the entry point request handlers use.
///
/// Holds no mutable state, so one binder can serve any number of concurrent
/// requests.
pub struct ValueBinder<'r> {
    registry: &'r FieldKindRegistry,
    delegate: Box<dyn StructuralBinder + 'r>,
}

impl<'r> ValueBinder<'r> {
    /// A binder using [`PayloadBinder`] as the delegate.
    pub fn new(registry: &'r FieldKindRegistry) -> Self {
        Self::with_delegate(registry, PayloadBinder)
    }

    pub fn with_delegate(
        registry: &'r FieldKindRegistry,
        delegate: impl StructuralBinder + 'r,
    ) -> Self {
        Self {
            registry,
            delegate: Box::new(delegate),
        }
    }

    /// Bind a single field.
    pub fn bind(&self, field: &str, values: &dyn ValueProvider) -> Result<BoundField> {
        let resolved = DiscriminatorPending::new(field).resolve(self.registry, values)?;
        debug!(field, kind = %resolved.descriptor().name, "resolved discriminator");
        resolved.bind(self.delegate.as_ref(), values)
    }

    /// Bind a collection field item by item.
    ///
    /// Items are read from index 0 until the first index with no discriminator
    /// key. Each item may resolve to a different kind; any failing item fails
    /// the whole collection.
    pub fn bind_collection(
        &self,
        field: &str,
        values: &dyn ValueProvider,
    ) -> Result<Vec<BoundField>> {
        let mut items = Vec::new();
        loop {
            let prefix = item_prefix(field, items.len());
            if values.value(&discriminator_key(&prefix)).is_none() {
                break;
            }
            items.push(self.bind(&prefix, values)?);
        }
        Ok(items)
    }
}

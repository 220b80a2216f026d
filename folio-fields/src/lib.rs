//! Field kind registry and polymorphic field values
//!
//! `folio-fields` owns everything that happens to a single field value:
//!
//! - **Registry**: [`FieldKindRegistry`] maps a stable kind name to its runtime
//!   [`ValueType`], UI component and [`Serializer`]. Populate it, freeze it,
//!   then share it read-only.
//! - **Serializers**: strict on write ([`FieldsError::TypeMismatch`]), forgiving
//!   on read (malformed text becomes the zero value).
//! - **Stored values**: [`StoredValue`] is the `{discriminator, payload}` pair
//!   written to storage.
//! - **Binding**: [`ValueBinder`] resolves the discriminator posted with a form
//!   field before any value extraction happens.
//!
//! Nothing here holds shared mutable state; a frozen registry can be read from
//! any number of threads without locking.

pub mod binder;
pub mod error;
pub mod registry;
pub mod serializer;
pub mod types;

pub use binder::{
    BoundField, DiscriminatorPending, PayloadBinder, Resolved, StructuralBinder, ValueBinder,
    ValueProvider,
};
pub use error::{BindingCause, FieldsError, Result};
pub use registry::{FieldKindDescriptor, FieldKindRegistry};
pub use serializer::Serializer;
pub use types::{StoredValue, Value, ValueType};

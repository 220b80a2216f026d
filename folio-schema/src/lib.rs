//! Content schema discovery, persistence and synchronization
//!
//! `folio-schema` turns declared content shapes into a schema graph of content
//! types, regions and fields, and keeps a store in step with it.
//!
//! # Architecture
//!
//! - **Discovery**: a [`ShapeProvider`] supplies [`ShapeDescriptor`]s; the
//!   [`SchemaBuilder`] resolves them against a [`folio_fields::FieldKindRegistry`]
//!   into a [`SchemaGraph`] with no storage identity.
//! - **Synchronization**: [`SchemaSynchronizer`] diffs that graph against a
//!   [`SchemaStore`] by internal id, upserts per content type, and prunes
//!   orphans only when asked.
//! - **Storage**: [`MemoryStore`] for tests and embedding, [`YamlStore`] for one
//!   YAML document per content type on disk.
//! - **Startup**: [`SchemaInitializer`] runs the whole sequence once and hands
//!   every caller the same [`SchemaSnapshot`].

pub mod builder;
pub mod config;
pub mod error;
pub mod init;
pub mod shape;
pub mod store;
pub mod sync;
pub mod types;
pub mod yaml_store;

pub use builder::{BuildFailure, BuildReport, SchemaBuilder};
pub use config::FolioConfig;
pub use error::{Result, SchemaError};
pub use init::{SchemaInitializer, SchemaSnapshot};
pub use shape::{
    FieldMember, MemberDescriptor, MemberShape, ShapeDescriptor, ShapeProvider, StaticShapes,
    YamlShapeProvider,
};
pub use store::{MemoryStore, SchemaOp, SchemaStore, TypeBatch};
pub use sync::{SchemaDiff, SchemaPath, SchemaSynchronizer, SyncFailure, SyncReport, TypeDiff};
pub use types::{ContentType, FieldDefinition, Region, SchemaGraph, Settings};
pub use yaml_store::YamlStore;

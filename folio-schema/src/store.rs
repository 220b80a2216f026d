//! Persistence seam for the schema graph.
//!
//! A store only has to do three things: list what it holds, fetch one type,
//! and commit a batch of operations for a single type all-or-nothing. The
//! batch semantics live in [`TypeBatch::apply_to`] so every backend agrees on
//! them.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::types::{ContentType, FieldDefinition, Region, SchemaGraph};

/// One mutation inside a type batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOp {
    /// Insert or replace the type's own attributes; its regions are untouched
    UpsertType(ContentType),
    /// Insert or replace a region's own attributes; its fields are untouched
    UpsertRegion { region: Region },
    UpsertField { region: String, field: FieldDefinition },
    DeleteType,
    DeleteRegion { region: String },
    DeleteField { region: String, field: String },
}

/// Operations for one content type, committed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeBatch {
    pub content_type: String,
    pub ops: Vec<SchemaOp>,
}

impl TypeBatch {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: SchemaOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the batch to the current persisted state of its type.
    ///
    /// Works on a copy, so an error leaves `current` as it was. Deleting
    /// something that is already gone is not an error. Returns `None` when the
    /// type was deleted.
    pub fn apply_to(&self, current: Option<ContentType>) -> Result<Option<ContentType>> {
        let mut state = current;
        for op in &self.ops {
            match op {
                SchemaOp::UpsertType(header) => {
                    if header.internal_id != self.content_type {
                        return Err(SchemaError::store(format!(
                            "batch for '{}' cannot upsert type '{}'",
                            self.content_type, header.internal_id
                        )));
                    }
                    let regions = state.take().map(|ct| ct.regions).unwrap_or_default();
                    state = Some(ContentType {
                        regions,
                        ..header.header()
                    });
                }
                SchemaOp::UpsertRegion { region } => {
                    let ct = self.require_type(&mut state)?;
                    match ct.region_mut(&region.internal_id) {
                        Some(existing) => {
                            let fields = std::mem::take(&mut existing.fields);
                            *existing = Region {
                                fields,
                                ..region.header()
                            };
                        }
                        None => ct.regions.push(region.header()),
                    }
                }
                SchemaOp::UpsertField { region, field } => {
                    let content_type = self.content_type.clone();
                    let ct = self.require_type(&mut state)?;
                    let target = ct.region_mut(region).ok_or_else(|| {
                        SchemaError::RegionNotFound {
                            content_type,
                            region: region.clone(),
                        }
                    })?;
                    match target
                        .fields
                        .iter_mut()
                        .find(|f| f.internal_id == field.internal_id)
                    {
                        Some(existing) => *existing = field.clone(),
                        None => target.fields.push(field.clone()),
                    }
                }
                SchemaOp::DeleteType => state = None,
                SchemaOp::DeleteRegion { region } => {
                    if let Some(ct) = state.as_mut() {
                        ct.regions.retain(|r| &r.internal_id != region);
                    }
                }
                SchemaOp::DeleteField { region, field } => {
                    if let Some(target) = state.as_mut().and_then(|ct| ct.region_mut(region)) {
                        target.fields.retain(|f| &f.internal_id != field);
                    }
                }
            }
        }
        if let Some(ct) = state.as_mut() {
            ct.normalize_order();
        }
        Ok(state)
    }

    fn require_type<'a>(&self, state: &'a mut Option<ContentType>) -> Result<&'a mut ContentType> {
        state.as_mut().ok_or_else(|| SchemaError::ContentTypeNotFound {
            internal_id: self.content_type.clone(),
        })
    }
}

/// Persistence backend for content type definitions.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Every persisted content type.
    async fn content_types(&self) -> Result<Vec<ContentType>>;

    /// One persisted content type by internal id.
    async fn content_type(&self, internal_id: &str) -> Result<Option<ContentType>>;

    /// Apply a batch all-or-nothing.
    async fn commit(&self, batch: TypeBatch) -> Result<()>;

    /// The persisted schema as a graph.
    async fn load_graph(&self) -> Result<SchemaGraph> {
        Ok(SchemaGraph::new(self.content_types().await?))
    }
}

/// In-process store; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    types: RwLock<IndexMap<String, ContentType>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `types`.
    pub fn with_types(types: impl IntoIterator<Item = ContentType>) -> Self {
        let types = types
            .into_iter()
            .map(|ct| (ct.internal_id.clone(), ct))
            .collect();
        Self {
            types: RwLock::new(types),
        }
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn content_types(&self) -> Result<Vec<ContentType>> {
        Ok(self.types.read().await.values().cloned().collect())
    }

    async fn content_type(&self, internal_id: &str) -> Result<Option<ContentType>> {
        Ok(self.types.read().await.get(internal_id).cloned())
    }

    async fn commit(&self, batch: TypeBatch) -> Result<()> {
        let mut types = self.types.write().await;
        let current = types.get(&batch.content_type).cloned();
        match batch.apply_to(current)? {
            Some(ct) => {
                types.insert(batch.content_type.clone(), ct);
            }
            None => {
                types.shift_remove(&batch.content_type);
            }
        }
        trace!(content_type = %batch.content_type, ops = batch.ops.len(), "committed batch");
        Ok(())
    }
}

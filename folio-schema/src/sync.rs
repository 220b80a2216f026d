//! Reconciles a discovered schema graph with the persisted one.
//!
//! Matching is by internal id at every level. Anything present on both sides
//! is an update, even when only its order or title moved, so identity and
//! storage ids survive reordering. Apply never deletes; pruning is a separate
//! call that removes exactly the candidates found by the most recent build.
//!
//! Pruning removes definitions only. Instance values stored against a pruned
//! field are left where they are.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_common::Pretty;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::error::{Result, SchemaError};
use crate::store::{SchemaOp, SchemaStore, TypeBatch};
use crate::types::{ContentType, SchemaGraph};

/// Address of one definition in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "level", rename_all = "kebab-case")]
pub enum SchemaPath {
    Type {
        content_type: String,
    },
    Region {
        content_type: String,
        region: String,
    },
    Field {
        content_type: String,
        region: String,
        field: String,
    },
}

impl SchemaPath {
    pub fn content_type(&self) -> &str {
        match self {
            SchemaPath::Type { content_type }
            | SchemaPath::Region { content_type, .. }
            | SchemaPath::Field { content_type, .. } => content_type,
        }
    }

    fn ty(content_type: &str) -> Self {
        SchemaPath::Type {
            content_type: content_type.to_string(),
        }
    }

    fn region(content_type: &str, region: &str) -> Self {
        SchemaPath::Region {
            content_type: content_type.to_string(),
            region: region.to_string(),
        }
    }

    fn field(content_type: &str, region: &str, field: &str) -> Self {
        SchemaPath::Field {
            content_type: content_type.to_string(),
            region: region.to_string(),
            field: field.to_string(),
        }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaPath::Type { content_type } => write!(f, "{content_type}"),
            SchemaPath::Region {
                content_type,
                region,
            } => write!(f, "{content_type}/{region}"),
            SchemaPath::Field {
                content_type,
                region,
                field,
            } => write!(f, "{content_type}/{region}/{field}"),
        }
    }
}

/// Diff for one declared content type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDiff {
    pub internal_id: String,
    /// The declared definition carrying persisted ids and timestamps
    #[serde(skip)]
    pub merged: ContentType,
    pub inserts: Vec<SchemaPath>,
    pub updates: Vec<SchemaPath>,
    pub delete_candidates: Vec<SchemaPath>,
    /// Whether committing `merged` would change anything
    pub changed: bool,
}

impl TypeDiff {
    /// Upserts for the whole declared subtree.
    pub fn batch(&self) -> TypeBatch {
        let mut batch = TypeBatch::new(&self.internal_id);
        batch.push(SchemaOp::UpsertType(self.merged.header()));
        for region in &self.merged.regions {
            batch.push(SchemaOp::UpsertRegion {
                region: region.header(),
            });
            for field in &region.fields {
                batch.push(SchemaOp::UpsertField {
                    region: region.internal_id.clone(),
                    field: field.clone(),
                });
            }
        }
        batch
    }
}

/// Result of comparing a declared graph with a persisted one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaDiff {
    pub types: Vec<TypeDiff>,
    /// Persisted types no longer declared
    pub orphan_types: Vec<SchemaPath>,
}

impl SchemaDiff {
    /// Compare `declared` against `persisted`, stamping changes with the current time.
    pub fn between(declared: &SchemaGraph, persisted: &SchemaGraph) -> Self {
        Self::between_at(declared, persisted, &[], Utc::now())
    }

    /// Like [`SchemaDiff::between`], but persisted types listed in `held` are
    /// never orphan candidates. Used for types whose declaration failed to build.
    pub fn between_holding(
        declared: &SchemaGraph,
        persisted: &SchemaGraph,
        held: &[String],
    ) -> Self {
        Self::between_at(declared, persisted, held, Utc::now())
    }

    pub fn between_at(
        declared: &SchemaGraph,
        persisted: &SchemaGraph,
        held: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let types = declared
            .types
            .iter()
            .map(|d| diff_type(d, persisted.content_type(&d.internal_id), now))
            .collect();

        let declared_ids: HashSet<&str> = declared.internal_ids().collect();
        let orphan_types = persisted
            .types
            .iter()
            .filter(|p| !declared_ids.contains(p.internal_id.as_str()))
            .filter(|p| !held.contains(&p.internal_id))
            .map(|p| SchemaPath::ty(&p.internal_id))
            .collect();

        Self {
            types,
            orphan_types,
        }
    }

    pub fn to_insert(&self) -> Vec<SchemaPath> {
        self.types.iter().flat_map(|t| t.inserts.clone()).collect()
    }

    pub fn to_update(&self) -> Vec<SchemaPath> {
        self.types.iter().flat_map(|t| t.updates.clone()).collect()
    }

    pub fn to_delete_candidates(&self) -> Vec<SchemaPath> {
        self.types
            .iter()
            .flat_map(|t| t.delete_candidates.clone())
            .chain(self.orphan_types.iter().cloned())
            .collect()
    }

    /// True when applying and pruning would both be no-ops.
    pub fn is_empty(&self) -> bool {
        self.types.iter().all(|t| !t.changed && t.delete_candidates.is_empty())
            && self.orphan_types.is_empty()
    }
}

fn diff_type(
    declared: &ContentType,
    persisted: Option<&ContentType>,
    now: DateTime<Utc>,
) -> TypeDiff {
    let type_id = declared.internal_id.as_str();
    let mut merged = declared.clone();
    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    let mut delete_candidates = Vec::new();

    let Some(persisted) = persisted else {
        merged.id = Some(Ulid::new());
        merged.created = Some(now);
        merged.last_modified = Some(now);
        inserts.push(SchemaPath::ty(type_id));
        for region in &mut merged.regions {
            region.id = Some(Ulid::new());
            inserts.push(SchemaPath::region(type_id, &region.internal_id));
            for field in &mut region.fields {
                field.id = Some(Ulid::new());
                inserts.push(SchemaPath::field(type_id, &region.internal_id, &field.internal_id));
            }
        }
        return TypeDiff {
            internal_id: type_id.to_string(),
            merged,
            inserts,
            updates,
            delete_candidates,
            changed: true,
        };
    };

    let mut changed = !declared.same_header(persisted);
    merged.id = persisted.id.or_else(|| Some(Ulid::new()));
    merged.created = persisted.created.or(Some(now));
    changed |= persisted.id.is_none() || persisted.created.is_none();
    updates.push(SchemaPath::ty(type_id));

    for region in &mut merged.regions {
        let Some(old_region) = persisted.region(&region.internal_id) else {
            changed = true;
            region.id = Some(Ulid::new());
            inserts.push(SchemaPath::region(type_id, &region.internal_id));
            for field in &mut region.fields {
                field.id = Some(Ulid::new());
                inserts.push(SchemaPath::field(type_id, &region.internal_id, &field.internal_id));
            }
            continue;
        };

        changed |= !region.same_header(old_region) || old_region.id.is_none();
        region.id = old_region.id.or_else(|| Some(Ulid::new()));
        updates.push(SchemaPath::region(type_id, &region.internal_id));

        for field in &mut region.fields {
            match old_region.field(&field.internal_id) {
                Some(old_field) => {
                    changed |= !field.same_definition(old_field) || old_field.id.is_none();
                    field.id = old_field.id.or_else(|| Some(Ulid::new()));
                    updates.push(SchemaPath::field(
                        type_id,
                        &region.internal_id,
                        &field.internal_id,
                    ));
                }
                None => {
                    changed = true;
                    field.id = Some(Ulid::new());
                    inserts.push(SchemaPath::field(
                        type_id,
                        &region.internal_id,
                        &field.internal_id,
                    ));
                }
            }
        }

        for old_field in &old_region.fields {
            if region.field(&old_field.internal_id).is_none() {
                delete_candidates.push(SchemaPath::field(
                    type_id,
                    &old_region.internal_id,
                    &old_field.internal_id,
                ));
            }
        }
    }

    for old_region in &persisted.regions {
        if merged.region(&old_region.internal_id).is_none() {
            delete_candidates.push(SchemaPath::region(type_id, &old_region.internal_id));
        }
    }

    merged.last_modified = if changed {
        Some(now)
    } else {
        persisted.last_modified.or(Some(now))
    };

    TypeDiff {
        internal_id: type_id.to_string(),
        merged,
        inserts,
        updates,
        delete_candidates,
        changed,
    }
}

/// A content type whose batch failed to commit.
#[derive(Debug)]
pub struct SyncFailure {
    pub content_type: String,
    pub error: SchemaError,
}

/// Aggregate outcome of an apply or prune pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub committed: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_types(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.content_type.as_str()).collect()
    }
}

/// Applies diffs to a schema store.
pub struct SchemaSynchronizer {
    store: Arc<dyn SchemaStore>,
    /// Delete candidates from the most recent build
    pending: Mutex<Option<Vec<SchemaPath>>>,
}

impl SchemaSynchronizer {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn SchemaStore> {
        &self.store
    }

    /// Diff `declared` against the store and remember its delete candidates.
    pub async fn build(&self, declared: &SchemaGraph) -> Result<SchemaDiff> {
        self.build_holding(declared, &[]).await
    }

    /// Like [`SchemaSynchronizer::build`], never proposing the held types for pruning.
    pub async fn build_holding(
        &self,
        declared: &SchemaGraph,
        held: &[String],
    ) -> Result<SchemaDiff> {
        let persisted = self.store.load_graph().await?;
        let diff = SchemaDiff::between_holding(declared, &persisted, held);
        debug!(diff = %Pretty(&diff), "schema diff");
        *self.pending.lock().await = Some(diff.to_delete_candidates());
        Ok(diff)
    }

    /// Commit inserts and updates, one batch per content type.
    ///
    /// A failing type is recorded in the report and the remaining types are
    /// still committed.
    pub async fn apply(&self, diff: &SchemaDiff) -> SyncReport {
        let mut report = SyncReport::default();
        for type_diff in &diff.types {
            if !type_diff.changed {
                report.unchanged.push(type_diff.internal_id.clone());
                continue;
            }
            match self.store.commit(type_diff.batch()).await {
                Ok(()) => {
                    debug!(
                        content_type = %type_diff.internal_id,
                        inserts = type_diff.inserts.len(),
                        updates = type_diff.updates.len(),
                        "content type synchronized"
                    );
                    report.committed.push(type_diff.internal_id.clone());
                }
                Err(error) => {
                    warn!(
                        content_type = %type_diff.internal_id,
                        %error,
                        "content type sync failed"
                    );
                    report.failed.push(SyncFailure {
                        content_type: type_diff.internal_id.clone(),
                        error,
                    });
                }
            }
        }
        info!(
            committed = report.committed.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "schema apply finished"
        );
        report
    }

    /// Delete the candidates found by the most recent build, one batch per type.
    ///
    /// Consumes them: a second call without a new build fails with
    /// [`SchemaError::NoPendingDiff`].
    pub async fn delete_orphans(&self) -> Result<SyncReport> {
        let candidates = self
            .pending
            .lock()
            .await
            .take()
            .ok_or(SchemaError::NoPendingDiff)?;

        let mut batches: IndexMap<String, TypeBatch> = IndexMap::new();
        for path in candidates {
            let batch = batches
                .entry(path.content_type().to_string())
                .or_insert_with(|| TypeBatch::new(path.content_type()));
            match path {
                SchemaPath::Type { .. } => {
                    batch.ops.clear();
                    batch.push(SchemaOp::DeleteType);
                }
                _ if batch.ops.contains(&SchemaOp::DeleteType) => {}
                SchemaPath::Region { region, .. } => batch.push(SchemaOp::DeleteRegion { region }),
                SchemaPath::Field { region, field, .. } => {
                    batch.push(SchemaOp::DeleteField { region, field })
                }
            }
        }

        let mut report = SyncReport::default();
        for (content_type, batch) in batches {
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(%content_type, "pruned orphaned definitions");
                    report.committed.push(content_type);
                }
                Err(error) => {
                    warn!(%content_type, %error, "pruning failed");
                    report.failed.push(SyncFailure {
                        content_type,
                        error,
                    });
                }
            }
        }
        Ok(report)
    }
}

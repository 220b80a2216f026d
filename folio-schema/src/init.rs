//! Once-only schema initialization.
//!
//! Discovery, diff and apply run at most once per [`SchemaInitializer`].
//! Callers arriving while the first run is in flight wait for it and receive
//! the same snapshot. A failed run leaves nothing behind, so the next caller
//! tries again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use folio_fields::FieldKindRegistry;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::builder::{BuildFailure, SchemaBuilder};
use crate::config::FolioConfig;
use crate::error::Result;
use crate::shape::{ShapeProvider, YamlShapeProvider};
use crate::store::SchemaStore;
use crate::sync::{SchemaDiff, SchemaSynchronizer, SyncReport};
use crate::types::SchemaGraph;
use crate::yaml_store::YamlStore;

/// Immutable result of initialization.
#[derive(Debug)]
pub struct SchemaSnapshot {
    pub registry: Arc<FieldKindRegistry>,
    /// Graph built from the declared shapes
    pub declared: SchemaGraph,
    /// Graph read back from the store after sync
    pub persisted: SchemaGraph,
    pub build_failures: Vec<BuildFailure>,
    pub diff: SchemaDiff,
    pub sync: SyncReport,
    /// Present when pruning ran
    pub pruned: Option<SyncReport>,
}

pub struct SchemaInitializer {
    registry: Arc<FieldKindRegistry>,
    provider: Arc<dyn ShapeProvider>,
    synchronizer: SchemaSynchronizer,
    prune_orphans: bool,
    snapshot: OnceCell<Arc<SchemaSnapshot>>,
    runs: AtomicUsize,
}

impl SchemaInitializer {
    /// Freezes `registry`; no kinds can be added once schema work begins.
    pub fn new(
        mut registry: FieldKindRegistry,
        provider: Arc<dyn ShapeProvider>,
        store: Arc<dyn SchemaStore>,
    ) -> Self {
        registry.freeze();
        Self {
            registry: Arc::new(registry),
            provider,
            synchronizer: SchemaSynchronizer::new(store),
            prune_orphans: false,
            snapshot: OnceCell::new(),
            runs: AtomicUsize::new(0),
        }
    }

    /// Wire a YAML shape directory and YAML store from `config`.
    pub async fn from_config(registry: FieldKindRegistry, config: &FolioConfig) -> Result<Self> {
        let provider = Arc::new(YamlShapeProvider::new(&config.shapes_dir));
        let store = Arc::new(YamlStore::open(&config.store_dir).await?);
        Ok(Self::new(registry, provider, store).with_prune_orphans(config.prune_orphans))
    }

    pub fn with_prune_orphans(mut self, prune: bool) -> Self {
        self.prune_orphans = prune;
        self
    }

    pub fn registry(&self) -> &Arc<FieldKindRegistry> {
        &self.registry
    }

    pub fn synchronizer(&self) -> &SchemaSynchronizer {
        &self.synchronizer
    }

    /// Run initialization, or wait for and return the completed run.
    pub async fn initialize(&self) -> Result<Arc<SchemaSnapshot>> {
        self.snapshot
            .get_or_try_init(|| self.run())
            .await
            .map(Arc::clone)
    }

    /// The snapshot, if initialization has completed.
    pub fn snapshot(&self) -> Option<Arc<SchemaSnapshot>> {
        self.snapshot.get().cloned()
    }

    /// Number of times the underlying build and apply sequence started.
    pub fn executions(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    async fn run(&self) -> Result<Arc<SchemaSnapshot>> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let shapes = self.provider.shapes().await?;
        let report = SchemaBuilder::new(&self.registry).build(&shapes);
        let held = report.failed_ids();

        let diff = self
            .synchronizer
            .build_holding(&report.graph, &held)
            .await?;
        let sync = self.synchronizer.apply(&diff).await;
        let pruned = if self.prune_orphans {
            Some(self.synchronizer.delete_orphans().await?)
        } else {
            None
        };
        let persisted = self.synchronizer.store().load_graph().await?;

        if !report.failures.is_empty() || !sync.is_success() {
            warn!(
                build_failures = report.failures.len(),
                sync_failures = sync.failed.len(),
                "schema initialized with failures"
            );
        }
        info!(
            declared = report.graph.len(),
            persisted = persisted.len(),
            committed = sync.committed.len(),
            pruned = pruned.as_ref().map_or(0, |p| p.committed.len()),
            "schema initialized"
        );

        Ok(Arc::new(SchemaSnapshot {
            registry: Arc::clone(&self.registry),
            declared: report.graph,
            persisted,
            build_failures: report.failures,
            diff,
            sync,
            pruned,
        }))
    }
}

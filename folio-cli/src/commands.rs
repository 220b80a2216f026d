//! Command implementations.
//!
//! Each command writes its result to `out` and returns the process exit code:
//! 0 on success, 2 when the command finished but some content types failed to
//! build or commit. Hard errors propagate and become exit code 1 in `main`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::Cell;
use folio_fields::FieldKindRegistry;
use folio_schema::{
    BuildReport, ContentType, FolioConfig, SchemaBuilder, SchemaDiff, SchemaInitializer,
    SchemaPath, SchemaStore, SchemaSynchronizer, ShapeProvider, SyncReport, YamlShapeProvider,
    YamlStore,
};
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::table::{new_table, truncate_str};

pub const EXIT_OK: i32 = 0;
pub const EXIT_PARTIAL: i32 = 2;

fn emit<T: Serialize>(out: &mut dyn Write, format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
        OutputFormat::Yaml => write!(out, "{}", serde_yaml_ng::to_string(value)?)?,
        OutputFormat::Table => bail!("table output must be rendered by the command"),
    }
    Ok(())
}

/// Run the parsed command line. Configuration is loaded only for commands
/// that work against a project, so `kinds` runs anywhere.
pub async fn dispatch(cli: Cli, out: &mut dyn Write) -> Result<i32> {
    let format = cli.format;
    match cli.command {
        Commands::Kinds => run_kinds(out, format),
        Commands::Discover => run_discover(out, &load_config(&cli.dir)?, format).await,
        Commands::Diff => run_diff(out, &load_config(&cli.dir)?, format).await,
        Commands::Sync { prune } => run_sync(out, &load_config(&cli.dir)?, prune, format).await,
        Commands::Prune => run_prune(out, &load_config(&cli.dir)?, format).await,
        Commands::Show { content_type } => {
            run_show(out, &load_config(&cli.dir)?, &content_type, format).await
        }
    }
}

fn load_config(dir: &Path) -> Result<FolioConfig> {
    let config = FolioConfig::load_from(dir)
        .with_context(|| format!("failed to load configuration from {}", dir.display()))?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn exit_code(partial: bool) -> i32 {
    if partial {
        EXIT_PARTIAL
    } else {
        EXIT_OK
    }
}

#[derive(Serialize)]
struct FailureView {
    content_type: String,
    error: String,
}

#[derive(Serialize)]
struct ReportView {
    committed: Vec<String>,
    unchanged: Vec<String>,
    failed: Vec<FailureView>,
}

impl From<&SyncReport> for ReportView {
    fn from(report: &SyncReport) -> Self {
        Self {
            committed: report.committed.clone(),
            unchanged: report.unchanged.clone(),
            failed: report
                .failed
                .iter()
                .map(|f| FailureView {
                    content_type: f.content_type.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

fn build_failures(report: &BuildReport) -> Vec<FailureView> {
    report
        .failures
        .iter()
        .map(|f| FailureView {
            content_type: f.shape.clone(),
            error: f.error.to_string(),
        })
        .collect()
}

fn write_failures(out: &mut dyn Write, failures: &[FailureView]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "Failed: {}", failures.len())?;
    for failure in failures {
        writeln!(out, "  {}: {}", failure.content_type, failure.error)?;
    }
    Ok(())
}

async fn discover(config: &FolioConfig, registry: &FieldKindRegistry) -> Result<BuildReport> {
    let provider = YamlShapeProvider::new(&config.shapes_dir);
    let shapes = provider
        .shapes()
        .await
        .with_context(|| format!("reading shapes from {}", config.shapes_dir.display()))?;
    debug!(count = shapes.len(), "read shapes");
    Ok(SchemaBuilder::new(registry).build(&shapes))
}

async fn open_store(config: &FolioConfig) -> Result<YamlStore> {
    YamlStore::open(&config.store_dir)
        .await
        .with_context(|| format!("opening schema store at {}", config.store_dir.display()))
}

/// `folio kinds`
pub fn run_kinds(out: &mut dyn Write, format: OutputFormat) -> Result<i32> {
    let registry = FieldKindRegistry::with_defaults();
    let kinds: Vec<_> = registry.kinds().collect();
    if format != OutputFormat::Table {
        emit(out, format, &kinds)?;
        return Ok(EXIT_OK);
    }

    let mut table = new_table();
    table.set_header(vec!["Kind", "Value type", "UI component"]);
    for kind in kinds {
        table.add_row(vec![
            Cell::new(&kind.name),
            Cell::new(kind.value_type),
            Cell::new(&kind.ui_component),
        ]);
    }
    writeln!(out, "{table}")?;
    Ok(EXIT_OK)
}

#[derive(Serialize)]
struct DiscoverView<'a> {
    types: &'a [ContentType],
    failed: Vec<FailureView>,
}

/// `folio discover`
pub async fn run_discover(
    out: &mut dyn Write,
    config: &FolioConfig,
    format: OutputFormat,
) -> Result<i32> {
    let registry = FieldKindRegistry::with_defaults();
    let report = discover(config, &registry).await?;
    let failed = build_failures(&report);
    let partial = !failed.is_empty();

    if format != OutputFormat::Table {
        emit(
            out,
            format,
            &DiscoverView {
                types: &report.graph.types,
                failed,
            },
        )?;
        return Ok(exit_code(partial));
    }

    let mut table = new_table();
    table.set_header(vec!["Content type", "Region", "Field", "Kind", "Order"]);
    for ct in &report.graph.types {
        for region in &ct.regions {
            let region_label = if region.is_collection {
                format!("{}[]", region.internal_id)
            } else {
                region.internal_id.clone()
            };
            for field in &region.fields {
                table.add_row(vec![
                    Cell::new(&ct.internal_id),
                    Cell::new(&region_label),
                    Cell::new(&field.internal_id),
                    Cell::new(&field.kind),
                    Cell::new(format!("{}.{}", region.sort_order, field.sort_order)),
                ]);
            }
        }
        if ct.regions.is_empty() {
            table.add_row(vec![
                Cell::new(&ct.internal_id),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
        }
    }
    writeln!(
        out,
        "Types: {}  Regions: {}  Fields: {}",
        report.graph.len(),
        report.graph.region_count(),
        report.graph.field_count()
    )?;
    writeln!(out, "{table}")?;
    write_failures(out, &failed)?;
    Ok(exit_code(partial))
}

#[derive(Serialize)]
struct DiffView {
    insert: Vec<String>,
    update: Vec<String>,
    delete_candidates: Vec<String>,
    failed: Vec<FailureView>,
}

fn strings(paths: Vec<SchemaPath>) -> Vec<String> {
    paths.iter().map(ToString::to_string).collect()
}

/// `folio diff`
pub async fn run_diff(
    out: &mut dyn Write,
    config: &FolioConfig,
    format: OutputFormat,
) -> Result<i32> {
    let registry = FieldKindRegistry::with_defaults();
    let report = discover(config, &registry).await?;
    let store = open_store(config).await?;
    let persisted = store.load_graph().await?;
    let diff = SchemaDiff::between_holding(&report.graph, &persisted, &report.failed_ids());

    let view = DiffView {
        insert: strings(diff.to_insert()),
        update: strings(diff.to_update()),
        delete_candidates: strings(diff.to_delete_candidates()),
        failed: build_failures(&report),
    };
    let partial = !view.failed.is_empty();

    if format != OutputFormat::Table {
        emit(out, format, &view)?;
        return Ok(exit_code(partial));
    }

    let mut table = new_table();
    table.set_header(vec!["Change", "Definition"]);
    for (label, paths) in [
        ("insert", &view.insert),
        ("update", &view.update),
        ("prune", &view.delete_candidates),
    ] {
        for path in paths {
            table.add_row(vec![label, path.as_str()]);
        }
    }
    writeln!(out, "{table}")?;
    write_failures(out, &view.failed)?;
    Ok(exit_code(partial))
}

fn write_report(out: &mut dyn Write, title: &str, report: &ReportView) -> Result<()> {
    writeln!(
        out,
        "{title}: {} committed, {} unchanged, {} failed",
        report.committed.len(),
        report.unchanged.len(),
        report.failed.len()
    )?;
    for ct in &report.committed {
        writeln!(out, "  {ct}")?;
    }
    write_failures(out, &report.failed)
}

#[derive(Serialize)]
struct SyncView {
    build_failed: Vec<FailureView>,
    sync: ReportView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pruned: Option<ReportView>,
}

/// `folio sync`
pub async fn run_sync(
    out: &mut dyn Write,
    config: &FolioConfig,
    prune: bool,
    format: OutputFormat,
) -> Result<i32> {
    let init = SchemaInitializer::from_config(FieldKindRegistry::with_defaults(), config)
        .await?
        .with_prune_orphans(prune || config.prune_orphans);
    let snapshot = init.initialize().await?;

    let view = SyncView {
        build_failed: snapshot
            .build_failures
            .iter()
            .map(|f| FailureView {
                content_type: f.shape.clone(),
                error: f.error.to_string(),
            })
            .collect(),
        sync: ReportView::from(&snapshot.sync),
        pruned: snapshot.pruned.as_ref().map(ReportView::from),
    };
    let partial = !view.build_failed.is_empty()
        || !view.sync.failed.is_empty()
        || view.pruned.as_ref().is_some_and(|p| !p.failed.is_empty());

    if format != OutputFormat::Table {
        emit(out, format, &view)?;
        return Ok(exit_code(partial));
    }

    write_failures(out, &view.build_failed)?;
    write_report(out, "Sync", &view.sync)?;
    if let Some(pruned) = &view.pruned {
        write_report(out, "Prune", pruned)?;
    }
    Ok(exit_code(partial))
}

/// `folio prune`
pub async fn run_prune(
    out: &mut dyn Write,
    config: &FolioConfig,
    format: OutputFormat,
) -> Result<i32> {
    let registry = FieldKindRegistry::with_defaults();
    let report = discover(config, &registry).await?;
    let store: Arc<dyn SchemaStore> = Arc::new(open_store(config).await?);
    let sync = SchemaSynchronizer::new(store);
    sync.build_holding(&report.graph, &report.failed_ids()).await?;
    let pruned = ReportView::from(&sync.delete_orphans().await?);
    let partial = !pruned.failed.is_empty() || !report.is_complete();

    if format != OutputFormat::Table {
        emit(out, format, &pruned)?;
        return Ok(exit_code(partial));
    }
    write_failures(out, &build_failures(&report))?;
    write_report(out, "Prune", &pruned)?;
    Ok(exit_code(partial))
}

/// `folio show <content-type>`
pub async fn run_show(
    out: &mut dyn Write,
    config: &FolioConfig,
    content_type: &str,
    format: OutputFormat,
) -> Result<i32> {
    let store = open_store(config).await?;
    let Some(ct) = store.content_type(content_type).await? else {
        bail!("content type not found: {content_type}");
    };

    if format != OutputFormat::Table {
        emit(out, format, &ct)?;
        return Ok(EXIT_OK);
    }

    writeln!(out, "{} ({})", ct.display_name, ct.internal_id)?;
    if let Some(id) = ct.id {
        writeln!(out, "id: {id}")?;
    }
    if let Some(description) = &ct.description {
        writeln!(out, "{}", truncate_str(description, 100))?;
    }
    if !ct.routes.is_empty() {
        writeln!(out, "routes: {}", ct.routes.join(", "))?;
    }

    let mut table = new_table();
    table.set_header(vec!["Region", "Title", "Collection", "Field", "Kind", "Discriminator"]);
    for region in &ct.regions {
        for field in &region.fields {
            table.add_row(vec![
                Cell::new(&region.internal_id),
                Cell::new(truncate_str(&region.title, 40)),
                Cell::new(if region.is_collection { "yes" } else { "" }),
                Cell::new(&field.internal_id),
                Cell::new(&field.kind),
                Cell::new(&field.discriminator),
            ]);
        }
    }
    writeln!(out, "{table}")?;
    Ok(EXIT_OK)
}

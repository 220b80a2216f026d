//! CLI definition for the Folio command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Folio - content schema discovery and synchronization.
///
/// Reads content shape declarations from a shapes directory, builds the
/// schema graph, and reconciles it with a YAML schema store.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Inspect and synchronize content schemas")]
#[command(
    long_about = "Folio discovers content types from declared shapes and keeps a schema \
    store in step with them.\n\n\
    Configuration is read from folio.toml and folio.yaml in the project directory.\n\n\
    Environment variables:\n  \
    FOLIO_SHAPES_DIR     Directory of shape declarations (default: shapes)\n  \
    FOLIO_STORE_DIR      Schema store root (default: .folio/schema)\n  \
    FOLIO_PRUNE_ORPHANS  Prune orphaned definitions during sync"
)]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Project directory holding folio.toml / folio.yaml
    #[arg(short = 'C', long, global = true, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the registered field kinds
    Kinds,

    /// Build the schema graph from the declared shapes without touching the store
    Discover,

    /// Show what a sync would insert, update and leave for pruning
    Diff,

    /// Insert and update persisted definitions to match the declared shapes
    Sync {
        /// Also delete orphaned definitions
        #[arg(long)]
        prune: bool,
    },

    /// Delete persisted definitions that are no longer declared
    Prune,

    /// Show one persisted content type
    Show {
        /// Content type internal id
        content_type: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_with_prune() {
        let cli = Cli::try_parse_from(["folio", "-C", "site", "sync", "--prune"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("site"));
        assert!(matches!(cli.command, Commands::Sync { prune: true }));
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn format_is_global() {
        let cli = Cli::try_parse_from(["folio", "show", "Article", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Show { ref content_type } if content_type == "Article"));
    }
}

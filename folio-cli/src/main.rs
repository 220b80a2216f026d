//! Folio CLI - inspect and synchronize content schemas.
//!
//! Commands:
//! - `folio kinds`: List the registered field kinds
//! - `folio discover`: Build the schema graph from the declared shapes
//! - `folio diff`: Show pending inserts, updates and prune candidates
//! - `folio sync [--prune]`: Bring the schema store in line with the shapes
//! - `folio prune`: Delete persisted definitions that are no longer declared
//! - `folio show <type>`: Show one persisted content type
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error
//! - 2: Finished, but some content types failed to build or commit

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folio::{commands, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("folio=debug,folio_schema=debug,folio_fields=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let exit_code = match commands::dispatch(cli, &mut stdout.lock()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

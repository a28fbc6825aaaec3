//! # closet CLI entry point
//!
//! Parses command-line arguments, opens the session, and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use closet_client::ClosetConfig;
use closet_store::CollectionKind;
use tracing_subscriber::EnvFilter;

use closet_cli::collection::{run_collection, CollectionArgs};
use closet_cli::listing::{run_listing, ListingArgs};
use closet_cli::search::{run_search, SearchArgs};
use closet_cli::{open_session, resolve_data_dir};

/// Closet — cart, wishlist, and wardrobe from the command line.
#[derive(Parser, Debug)]
#[command(name = "closet", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the persisted collections.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shopping cart entries.
    Cart(CollectionArgs),
    /// Wishlist entries (local copy).
    Wishlist(CollectionArgs),
    /// Wardrobe entries.
    Wardrobe(CollectionArgs),
    /// Recent search history.
    Search(SearchArgs),
    /// Page through the catalog listing.
    Listing(ListingArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = ClosetConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");
    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    let session = open_session(&data_dir, config.toast_reset)?;

    match cli.command {
        Commands::Cart(args) => run_collection(&args, session.collection(CollectionKind::Cart)),
        Commands::Wishlist(args) => {
            run_collection(&args, session.collection(CollectionKind::Wishlist))
        }
        Commands::Wardrobe(args) => {
            run_collection(&args, session.collection(CollectionKind::Wardrobe))
        }
        Commands::Search(args) => run_search(&args, &session.searches),
        Commands::Listing(args) => run_listing(&args, &config, &session.snapshots).await,
    }
}

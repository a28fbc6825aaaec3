//! `closet search` — recent search history.

use anyhow::Result;
use clap::{Args, Subcommand};
use closet_store::RecentSearches;

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(subcommand)]
    pub command: SearchCommand,
}

#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    /// Remember a search term.
    Record { term: String },
    /// Print remembered terms, most recent first.
    List,
    /// Forget one term.
    Remove { term: String },
    /// Forget every term.
    Clear,
}

pub fn run_search(args: &SearchArgs, searches: &RecentSearches) -> Result<u8> {
    match &args.command {
        SearchCommand::Record { term } => {
            searches.record(term);
            println!("OK: recorded {:?}", term.trim());
        }
        SearchCommand::List => {
            let terms = searches.list();
            if terms.is_empty() {
                println!("No recent searches.");
            }
            for term in terms {
                println!("  {term}");
            }
        }
        SearchCommand::Remove { term } => {
            if !searches.remove(term) {
                println!("No recent search {term:?}");
                return Ok(1);
            }
            println!("OK: removed {term:?}");
        }
        SearchCommand::Clear => {
            searches.clear();
            println!("OK: cleared recent searches");
        }
    }
    Ok(0)
}

//! shelfload: Load bibliographic dumps into a SQLite store
//!
//! Usage:
//!   # Load authors, then works
//!   shelfload load --authors ol_dump_authors.txt --works ol_dump_works.txt
//!
//!   # Only sample the first 1000 authors
//!   shelfload load --authors a.txt --works w.txt --author-limit 1000
//!
//!   # Re-run the work pass against authors loaded by an earlier run
//!   shelfload load --works w.txt --skip-authors
//!
//!   # Inspect a stored record
//!   shelfload get book OL1W

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shelfload::load::Record;
use shelfload::{
    load_dumps, load_works_dump, Author, AuthorsLoaded, Book, LoadConfig, MemoryStore, Repository,
    SqliteStore,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shelfload")]
#[command(about = "Load author and works dumps into a book store", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(long, global = true, default_value = "shelf.db")]
    db: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the author pass, then the work pass
    Load {
        /// Author dump file
        #[arg(long, env = "DATADUMP_LOCATION_AUTHOR", required_unless_present = "skip_authors")]
        authors: Option<PathBuf>,

        /// Works dump file
        #[arg(long, env = "DATADUMP_LOCATION_WORKS")]
        works: PathBuf,

        /// Stop the author pass after this many lines
        #[arg(long)]
        author_limit: Option<usize>,

        /// Stop the work pass after this many lines
        #[arg(long)]
        work_limit: Option<usize>,

        /// Use the authors already in the database instead of loading them
        #[arg(long)]
        skip_authors: bool,

        /// Load into memory and only print the summary
        #[arg(long, conflicts_with = "skip_authors")]
        dry_run: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored record as JSON
    Get {
        #[arg(value_enum)]
        kind: RecordKind,

        id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RecordKind {
    Author,
    Book,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Load {
            authors,
            works,
            author_limit,
            work_limit,
            skip_authors,
            dry_run,
            json,
        } => {
            let config = LoadConfig {
                author_dump: authors.unwrap_or_default(),
                works_dump: works,
                author_line_limit: author_limit,
                work_line_limit: work_limit,
            };

            let summary = if dry_run {
                let authors = MemoryStore::<Author>::new();
                let books = MemoryStore::<Book>::new();
                load_dumps(&config, &authors, &books)?
            } else {
                let store = SqliteStore::open(&args.db)
                    .with_context(|| format!("Failed to open database {}", args.db.display()))?;
                if skip_authors {
                    load_works_dump(&config, &store, &store, AuthorsLoaded::assume_existing())?
                } else {
                    load_dumps(&config, &store, &store)?
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary);
            }
        }
        Command::Get { kind, id } => {
            let store = SqliteStore::open(&args.db)
                .with_context(|| format!("Failed to open database {}", args.db.display()))?;
            match kind {
                RecordKind::Author => print_record::<Author>(&store, &id)?,
                RecordKind::Book => print_record::<Book>(&store, &id)?,
            }
        }
    }

    Ok(())
}

fn print_record<T>(store: &SqliteStore, id: &str) -> Result<()>
where
    T: Serialize + Record,
    SqliteStore: Repository<T>,
{
    match <SqliteStore as Repository<T>>::find_by_id(store, id)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => anyhow::bail!("No record with id {}", id),
    }
    Ok(())
}

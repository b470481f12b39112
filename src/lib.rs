//! # Shelfload - bibliographic dump loader
//!
//! Loads the author and works dumps of an Open Library style export into a
//! store, copying author names onto every book.
//!
//! ## Modules
//!
//! - **load**: line extraction, record decoding, author name resolution and
//!   the per-line ingestion driver
//! - **store**: the [`Repository`] port with in-memory and SQLite backends
//!
//! ## Quick Start
//!
//! ```rust
//! use shelfload::load::{load_authors, load_works, Book};
//! use shelfload::store::{MemoryStore, Repository};
//! use std::io::Cursor;
//!
//! # fn main() -> anyhow::Result<()> {
//! let authors = MemoryStore::new();
//! let books = MemoryStore::new();
//!
//! let author_dump = "/type/author\t/authors/OL1A\t1\t2008-04-01T03:28:50.625462\t\
//!     {\"key\": \"/authors/OL1A\", \"name\": \"Jane Doe\"}\n";
//! let works_dump = "{\"key\": \"/works/OL1W\", \"title\": \"Test Book\", \
//!     \"authors\": [{\"author\": {\"key\": \"/authors/OL1A\"}}]}\n";
//!
//! // The work pass needs the proof returned by a finished author pass
//! let loaded = load_authors(Cursor::new(author_dump), &authors, None)?;
//! load_works(Cursor::new(works_dump), &authors, &books, None, &loaded)?;
//!
//! let book: Option<Book> = books.find_by_id("OL1W")?;
//! assert_eq!(book.unwrap().author_names, vec!["Jane Doe"]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod load;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{LineError, LoadError, StoreError};
pub use load::{Author, AuthorsLoaded, Book, LoadConfig, PassReport};
pub use store::{MemoryStore, Repository, SqliteStore};

use load::{load_authors, load_works, open_dump};
use serde::Serialize;
use std::fmt;

/// Reports of a full load
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    /// None when the author pass was skipped
    pub authors: Option<PassReport>,
    pub works: PassReport,
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authors {
            Some(report) => writeln!(f, "{}", report)?,
            None => writeln!(f, "authors: skipped, using existing store")?,
        }
        write!(f, "{}", self.works)
    }
}

/// Main entry point: load the author dump, then the works dump
pub fn load_dumps<A, B>(config: &LoadConfig, authors: &A, books: &B) -> Result<LoadSummary, LoadError>
where
    A: Repository<Author>,
    B: Repository<Book>,
{
    let reader = open_dump(&config.author_dump)?;
    let loaded = load_authors(reader, authors, config.author_line_limit)?;
    load_works_dump(config, authors, books, loaded)
}

/// Load only the works dump, given proof that the authors are in place
pub fn load_works_dump<A, B>(
    config: &LoadConfig,
    authors: &A,
    books: &B,
    loaded: AuthorsLoaded,
) -> Result<LoadSummary, LoadError>
where
    A: Repository<Author>,
    B: Repository<Book>,
{
    let reader = open_dump(&config.works_dump)?;
    let works = load_works(reader, authors, books, config.work_line_limit, &loaded)?;

    Ok(LoadSummary {
        authors: loaded.into_report(),
        works,
    })
}

//! Dump loading - turn dump lines into stored authors and books
//!
//! Each line goes through the same stages: cut the JSON payload out of the
//! line, decode it, resolve author names (works only), and upsert the result.
//! Authors must be loaded before works, which [`AuthorsLoaded`] enforces.

pub mod types;
pub mod extractor;
pub mod resolver;
pub mod report;
pub mod driver;

pub use types::{Author, Book, LoadConfig, Record, UNKNOWN_AUTHOR};
pub use extractor::{decode_author, decode_book, extract_json, parse_object, Fields};
pub use resolver::resolve_author_names;
pub use report::{LineOutcome, Pass, PassReport, SkippedLine};
pub use driver::{
    load_authors, load_works, open_dump, process_line, run_pass, AuthorLoader, AuthorsLoaded,
    LineHandler, WorkLoader,
};

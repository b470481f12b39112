//! Per-line ingestion of dump files
//!
//! A pass is a fold over the lines of one dump: each line is extracted,
//! decoded, resolved (works only) and persisted by a [`LineHandler`], and the
//! outcome is folded into a [`PassReport`]. Only I/O errors on the dump and
//! fatal store errors end a pass early; the handler flushes its store once the
//! last line is done.

use crate::error::{LineError, LoadError, StoreError};
use crate::load::extractor::{decode_author, decode_book, extract_json, parse_object};
use crate::load::report::{LineOutcome, Pass, PassReport};
use crate::load::resolver::resolve_author_names;
use crate::load::types::{Author, Book};
use crate::store::Repository;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Turns one extracted JSON payload into a stored record
pub trait LineHandler {
    fn pass(&self) -> Pass;

    /// Decode and persist a payload, returning the id it was stored under
    fn handle(&mut self, json: &str) -> Result<String, LineError>;

    /// Make everything written during the pass durable
    fn finish(&mut self) -> Result<(), StoreError>;
}

/// Stores authors as they are decoded
pub struct AuthorLoader<'a, S> {
    authors: &'a S,
}

impl<'a, S: Repository<Author>> AuthorLoader<'a, S> {
    pub fn new(authors: &'a S) -> Self {
        AuthorLoader { authors }
    }
}

impl<S: Repository<Author>> LineHandler for AuthorLoader<'_, S> {
    fn pass(&self) -> Pass {
        Pass::Authors
    }

    fn handle(&mut self, json: &str) -> Result<String, LineError> {
        let author = decode_author(&parse_object(json)?);
        self.authors.upsert(&author)?;
        Ok(author.id)
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        self.authors.flush()
    }
}

/// Stores books with their author names looked up in the author store
pub struct WorkLoader<'a, A, B> {
    authors: &'a A,
    books: &'a B,
}

impl<'a, A, B> WorkLoader<'a, A, B>
where
    A: Repository<Author>,
    B: Repository<Book>,
{
    /// Only constructible once the author store has been loaded
    pub fn new(authors: &'a A, books: &'a B, _loaded: &AuthorsLoaded) -> Self {
        WorkLoader { authors, books }
    }
}

impl<A, B> LineHandler for WorkLoader<'_, A, B>
where
    A: Repository<Author>,
    B: Repository<Book>,
{
    fn pass(&self) -> Pass {
        Pass::Works
    }

    fn handle(&mut self, json: &str) -> Result<String, LineError> {
        let book = decode_book(&parse_object(json)?)?;
        let names = resolve_author_names(&book.author_ids, |id| {
            Ok(self.authors.find_by_id(id)?.map(|author| author.name))
        })?;
        let book = book.with_author_names(names);

        debug!(id = %book.id, title = %book.name, "saving book");
        self.books.upsert(&book)?;
        Ok(book.id)
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        self.books.flush()
    }
}

/// Push a single raw dump line through a handler
pub fn process_line<H: LineHandler>(handler: &mut H, line: &str) -> LineOutcome {
    match extract_json(line).and_then(|json| handler.handle(json)) {
        Ok(id) => LineOutcome::Persisted(id),
        Err(err) => LineOutcome::Skipped(err),
    }
}

/// Turn one raw dump line into text
///
/// Invalid UTF-8 only costs the line it appears on; the error carries a lossy
/// copy of the line for the report.
fn decode_line(mut bytes: Vec<u8>) -> Result<String, (String, LineError)> {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|err| {
        let raw = String::from_utf8_lossy(err.as_bytes()).into_owned();
        (raw, LineError::from(err.utf8_error()))
    })
}

/// Run a handler over every line of `reader`, up to `limit` lines
pub fn run_pass<R, H>(reader: R, handler: &mut H, limit: Option<usize>) -> Result<PassReport, LoadError>
where
    R: BufRead,
    H: LineHandler,
{
    let pass = handler.pass();
    info!(%pass, limit = ?limit, "starting pass");

    let report = reader
        .split(b'\n')
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .try_fold(PassReport::new(pass), |mut report, (idx, bytes)| {
            let line_no = idx + 1;
            let bytes = bytes.map_err(|source| LoadError::Read { line: line_no, source })?;
            let (raw, outcome) = match decode_line(bytes) {
                Ok(line) => {
                    let outcome = process_line(handler, &line);
                    (line, outcome)
                }
                Err((raw, err)) => (raw, LineOutcome::Skipped(err)),
            };
            report.record(line_no, &raw, outcome)?;
            Ok::<_, LoadError>(report)
        })?;

    handler
        .finish()
        .map_err(|source| LoadError::StoreUnavailable {
            line: report.lines_read,
            source,
        })?;

    info!(%pass, lines = report.lines_read, persisted = report.persisted, skipped = report.skipped(), "finished pass");
    Ok(report)
}

/// Open a dump file for reading
pub fn open_dump(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Proof that the author store is ready for the work pass
///
/// Obtained from a finished [`load_authors`] run, or explicitly through
/// [`AuthorsLoaded::assume_existing`] when a previous run already loaded the
/// authors into a persistent store.
#[derive(Debug)]
pub struct AuthorsLoaded {
    report: Option<PassReport>,
}

impl AuthorsLoaded {
    pub fn assume_existing() -> Self {
        AuthorsLoaded { report: None }
    }

    /// The author pass report, if the pass ran in this process
    pub fn report(&self) -> Option<&PassReport> {
        self.report.as_ref()
    }

    pub fn into_report(self) -> Option<PassReport> {
        self.report
    }
}

/// Run the author pass to completion
pub fn load_authors<R, S>(reader: R, authors: &S, limit: Option<usize>) -> Result<AuthorsLoaded, LoadError>
where
    R: BufRead,
    S: Repository<Author>,
{
    let report = run_pass(reader, &mut AuthorLoader::new(authors), limit)?;
    Ok(AuthorsLoaded {
        report: Some(report),
    })
}

/// Run the work pass against an author store that has been loaded
pub fn load_works<R, A, B>(
    reader: R,
    authors: &A,
    books: &B,
    limit: Option<usize>,
    loaded: &AuthorsLoaded,
) -> Result<PassReport, LoadError>
where
    R: BufRead,
    A: Repository<Author>,
    B: Repository<Book>,
{
    run_pass(reader, &mut WorkLoader::new(authors, books, loaded), limit)
}

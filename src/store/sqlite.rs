use crate::error::StoreError;
use crate::load::types::{Author, Book};
use crate::store::Repository;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::cell::Cell;
use std::path::Path;
use tracing::warn;

/// Upserts per transaction unless overridden with `with_batch_size`
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS authors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        personal_name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS books (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        published_date TEXT,
        cover_ids TEXT NOT NULL,
        author_ids TEXT NOT NULL,
        author_names TEXT NOT NULL
    );
";

/// SQLite-backed store holding both authors and books
///
/// Writes are grouped into transactions of `batch_size` upserts; `flush`
/// commits whatever is still open. Lookups run on the same connection and
/// see uncommitted writes.
pub struct SqliteStore {
    conn: Connection,
    batch_size: usize,
    pending: Cell<usize>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the tables exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(connection_error)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(connection_error)?;
        Ok(SqliteStore {
            conn,
            batch_size: DEFAULT_BATCH_SIZE,
            pending: Cell::new(0),
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN").map_err(classify)?;
        }
        Ok(())
    }

    fn end_write(&self) -> Result<(), StoreError> {
        let pending = self.pending.get() + 1;
        self.pending.set(pending);
        if pending >= self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT").map_err(classify)?;
        }
        self.pending.set(0);
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            warn!(%err, "failed to commit pending writes");
        }
    }
}

/// Errors raised while opening the database always stop the load
fn connection_error(err: rusqlite::Error) -> StoreError {
    StoreError::Connection(err.to_string())
}

/// Split SQLite failures into "database is gone" and "this statement failed"
fn classify(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied,
        ) => StoreError::Connection(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Repository<Author> for SqliteStore {
    fn upsert(&self, author: &Author) -> Result<(), StoreError> {
        self.begin_write()?;
        self.conn
            .execute(
                "INSERT INTO authors (id, name, personal_name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     personal_name = excluded.personal_name",
                params![author.id, author.name, author.personal_name],
            )
            .map_err(classify)?;
        self.end_write()
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Author>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, personal_name FROM authors WHERE id = ?1",
                [id],
                |row| {
                    Ok(Author {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        personal_name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(classify)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.commit()
    }
}

impl Repository<Book> for SqliteStore {
    fn upsert(&self, book: &Book) -> Result<(), StoreError> {
        let cover_ids = serde_json::to_string(&book.cover_ids)?;
        let author_ids = serde_json::to_string(&book.author_ids)?;
        let author_names = serde_json::to_string(&book.author_names)?;

        self.begin_write()?;
        self.conn
            .execute(
                "INSERT INTO books
                     (id, name, description, published_date, cover_ids, author_ids, author_names)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     description = excluded.description,
                     published_date = excluded.published_date,
                     cover_ids = excluded.cover_ids,
                     author_ids = excluded.author_ids,
                     author_names = excluded.author_names",
                params![
                    book.id,
                    book.name,
                    book.description,
                    book.published_date,
                    cover_ids,
                    author_ids,
                    author_names,
                ],
            )
            .map_err(classify)?;
        self.end_write()
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Book>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, description, published_date, cover_ids, author_ids, author_names
                 FROM books WHERE id = ?1",
                [id],
                |row| {
                    Ok(Book {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        published_date: row.get(3)?,
                        cover_ids: json_list(row, 4)?,
                        author_ids: json_list(row, 5)?,
                        author_names: json_list(row, 6)?,
                    })
                },
            )
            .optional()
            .map_err(classify)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_book() -> Book {
        Book {
            id: "OL1W".into(),
            name: "Test Book".into(),
            description: Some("A story".into()),
            published_date: NaiveDate::from_ymd_opt(2020, 1, 2),
            cover_ids: vec!["111".into(), "222".into()],
            author_ids: vec!["OL1A".into()],
            author_names: vec!["Jane Doe".into()],
        }
    }

    #[test]
    fn test_author_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let author = Author {
            id: "OL1A".into(),
            name: "Jane Doe".into(),
            personal_name: "Jane".into(),
        };
        store.upsert(&author).unwrap();

        let found: Option<Author> = store.find_by_id("OL1A").unwrap();
        assert_eq!(found, Some(author));
        let missing: Option<Author> = store.find_by_id("OL2A").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_book_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&sample_book()).unwrap();

        let found: Option<Book> = store.find_by_id("OL1W").unwrap();
        assert_eq!(found, Some(sample_book()));
    }

    #[test]
    fn test_book_upsert_replaces() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&sample_book()).unwrap();
        store.upsert(&sample_book()).unwrap();

        let mut changed = sample_book();
        changed.description = None;
        changed.published_date = None;
        store.upsert(&changed).unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let found: Option<Book> = store.find_by_id("OL1W").unwrap();
        assert_eq!(found, Some(changed));
    }

    fn committed_authors(path: &Path) -> i64 {
        Connection::open(path)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_writes_commit_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");
        let store = SqliteStore::open(&path).unwrap().with_batch_size(2);

        for id in ["OL1A", "OL2A", "OL3A"] {
            let author = Author {
                id: id.into(),
                ..Author::default()
            };
            store.upsert(&author).unwrap();
        }

        // the third upsert is still in an open transaction but visible here
        let third: Option<Author> = store.find_by_id("OL3A").unwrap();
        assert!(third.is_some());
        assert_eq!(committed_authors(&path), 2);

        Repository::<Author>::flush(&store).unwrap();
        assert_eq!(committed_authors(&path), 3);
    }

    #[test]
    fn test_drop_commits_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&Author::default()).unwrap();
        }
        assert_eq!(committed_authors(&path), 1);
    }

    #[test]
    fn test_unopenable_path_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteStore::open(dir.path().join("missing").join("shelf.db"));
        assert!(matches!(result, Err(ref e) if e.is_fatal()));
    }
}

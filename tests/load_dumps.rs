use chrono::NaiveDate;
use shelfload::{load_dumps, Author, Book, LoadConfig, Repository, SqliteStore};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const AUTHOR_LINE: &str = "/type/author\t/authors/OL1A\t2\t2008-04-01T03:28:50.625462\t{\"key\": \"/authors/OL1A\", \"name\": \"Jane Doe\", \"personal_name\": \"Jane\"}";

const WORK_LINE: &str = "/type/work\t/works/OL1W\t3\t2020-01-02T03:04:05.000000\t{\"key\": \"/works/OL1W\", \"title\": \"Test Book\", \"created\": {\"type\": \"/type/datetime\", \"value\": \"2020-01-02T03:04:05.000000\"}, \"covers\": [111, 222], \"authors\": [{\"author\": {\"key\": \"/authors/OL1A\"}, \"type\": {\"key\": \"/type/author_role\"}}]}";

fn dump(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn config(authors: &NamedTempFile, works: &NamedTempFile) -> LoadConfig {
    LoadConfig {
        author_dump: authors.path().to_path_buf(),
        works_dump: works.path().to_path_buf(),
        ..LoadConfig::default()
    }
}

fn store(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(dir.path().join("shelf.db")).unwrap()
}

#[test]
fn test_full_load_denormalizes_author_names() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[AUTHOR_LINE]);
    let works = dump(&[WORK_LINE]);

    let summary = load_dumps(&config(&authors, &works), &store, &store).unwrap();
    assert_eq!(summary.authors.as_ref().unwrap().persisted, 1);
    assert_eq!(summary.works.persisted, 1);

    let author: Author = store.find_by_id("OL1A").unwrap().unwrap();
    assert_eq!(author.personal_name, "Jane");

    let book: Book = store.find_by_id("OL1W").unwrap().unwrap();
    assert_eq!(book.id, "OL1W");
    assert_eq!(book.name, "Test Book");
    assert_eq!(book.description, None);
    assert_eq!(book.published_date, NaiveDate::from_ymd_opt(2020, 1, 2));
    assert_eq!(book.cover_ids, vec!["111", "222"]);
    assert_eq!(book.author_ids, vec!["OL1A"]);
    assert_eq!(book.author_names, vec!["Jane Doe"]);
}

#[test]
fn test_missing_author_gets_sentinel() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[]);
    let works = dump(&[WORK_LINE]);

    load_dumps(&config(&authors, &works), &store, &store).unwrap();

    let book: Book = store.find_by_id("OL1W").unwrap().unwrap();
    assert_eq!(book.author_names, vec!["Unknown author"]);
}

#[test]
fn test_bad_created_date_still_persists_book() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[AUTHOR_LINE]);
    let works = dump(&[
        "{\"key\": \"/works/OL2W\", \"title\": \"Undated\", \"created\": {\"value\": \"not-a-date\"}}",
    ]);

    let summary = load_dumps(&config(&authors, &works), &store, &store).unwrap();
    assert_eq!(summary.works.persisted, 1);

    let book: Book = store.find_by_id("OL2W").unwrap().unwrap();
    assert_eq!(book.name, "Undated");
    assert_eq!(book.published_date, None);
}

#[test]
fn test_line_without_json_is_skipped() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[AUTHOR_LINE]);
    let works = dump(&[WORK_LINE, "/type/work\t/works/OL3W\t1\ttruncated"]);

    let summary = load_dumps(&config(&authors, &works), &store, &store).unwrap();
    assert_eq!(summary.works.lines_read, 2);
    assert_eq!(summary.works.persisted, 1);
    assert_eq!(summary.works.skipped(), 1);
    assert_eq!(summary.works.skipped_extract, 1);
    assert_eq!(summary.works.samples[0].line, 2);
}

#[test]
fn test_rerun_overwrites_by_id() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[AUTHOR_LINE]);
    let works = dump(&[WORK_LINE]);
    let config = config(&authors, &works);

    load_dumps(&config, &store, &store).unwrap();
    let first: Option<Book> = store.find_by_id("OL1W").unwrap();
    load_dumps(&config, &store, &store).unwrap();
    let second: Option<Book> = store.find_by_id("OL1W").unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_author_line_limit() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[
        "{\"key\": \"/authors/OL1A\", \"name\": \"Jane Doe\"}",
        "{\"key\": \"/authors/OL2A\", \"name\": \"John Roe\"}",
    ]);
    let works = dump(&[]);
    let config = LoadConfig {
        author_line_limit: Some(1),
        ..config(&authors, &works)
    };

    let summary = load_dumps(&config, &store, &store).unwrap();
    assert_eq!(summary.authors.unwrap().lines_read, 1);

    let second: Option<Author> = store.find_by_id("OL2A").unwrap();
    assert!(second.is_none());
}

#[test]
fn test_passes_commit_before_returning() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let authors = dump(&[AUTHOR_LINE]);
    let works = dump(&[WORK_LINE]);

    load_dumps(&config(&authors, &works), &store, &store).unwrap();

    // a second connection only sees committed rows
    let reader = rusqlite::Connection::open(dir.path().join("shelf.db")).unwrap();
    let count = |table: &str| -> i64 {
        reader
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(count("authors"), 1);
    assert_eq!(count("books"), 1);
}

//! Persistence for loaded records
//!
//! [`Repository`] is the only thing the load pipeline knows about storage.
//! `MemoryStore` keeps records in a map; `SqliteStore` writes them to a
//! SQLite database file.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::load::types::Record;

/// Upsert and lookup by id
pub trait Repository<T: Record> {
    /// Create or replace the record stored under `record.id()`
    fn upsert(&self, record: &T) -> Result<(), StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Make buffered writes durable; called at the end of every pass
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

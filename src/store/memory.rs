use crate::error::StoreError;
use crate::load::types::Record;
use crate::store::Repository;
use std::cell::RefCell;
use std::collections::HashMap;

/// Map-backed store, used for dry runs and tests
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RefCell<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            records: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record + Clone> FromIterator<T> for MemoryStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let records = iter
            .into_iter()
            .map(|record| (record.id().to_string(), record))
            .collect();
        MemoryStore {
            records: RefCell::new(records),
        }
    }
}

impl<T: Record + Clone> Repository<T> for MemoryStore<T> {
    fn upsert(&self, record: &T) -> Result<(), StoreError> {
        self.records
            .borrow_mut()
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.records.borrow().get(id).cloned())
    }
}

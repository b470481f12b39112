use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Display name substituted for author ids missing from the store
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// Anything stored by id
pub trait Record {
    fn id(&self) -> &str;
}

/// An author, one per line of the author dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub personal_name: String,
}

impl Record for Author {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A work from the works dump, with its author names copied in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,

    /// The work's title
    pub name: String,

    pub description: Option<String>,

    pub published_date: Option<NaiveDate>,

    pub cover_ids: Vec<String>,

    pub author_ids: Vec<String>,

    /// Same length and order as `author_ids`
    pub author_names: Vec<String>,
}

impl Book {
    pub fn new(id: impl Into<String>) -> Self {
        Book {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_author_names(mut self, names: Vec<String>) -> Self {
        self.author_names = names;
        self
    }
}

impl Record for Book {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Configuration for a full load
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Path of the author dump
    pub author_dump: PathBuf,

    /// Path of the works dump
    pub works_dump: PathBuf,

    /// Stop the author pass after this many lines (None = whole file)
    pub author_line_limit: Option<usize>,

    /// Stop the work pass after this many lines (None = whole file)
    pub work_line_limit: Option<usize>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            author_dump: PathBuf::from("ol_dump_authors.txt"),
            works_dump: PathBuf::from("ol_dump_works.txt"),
            author_line_limit: None,
            work_line_limit: None,
        }
    }
}

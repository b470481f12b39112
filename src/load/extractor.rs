use crate::error::LineError;
use crate::load::types::{Author, Book};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::warn;

pub const AUTHOR_KEY_PREFIX: &str = "/authors/";
pub const WORK_KEY_PREFIX: &str = "/works/";

/// Timestamp layout of `created.value`, e.g. `2009-12-11T01:57:19.964652`
pub const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f";

/// Cut the JSON payload out of a dump line
///
/// Dump lines carry tab-separated metadata columns ahead of the record, so
/// everything before the first `{` is dropped. The payload is not validated.
pub fn extract_json(line: &str) -> Result<&str, LineError> {
    line.find('{')
        .map(|start| &line[start..])
        .ok_or(LineError::Extract)
}

/// Parse an extracted payload into a JSON object
pub fn parse_object(json: &str) -> Result<Map<String, Value>, LineError> {
    match serde_json::from_str(json)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(LineError::shape("payload is not a JSON object")),
    }
}

/// Optional-valued accessors over a JSON object
///
/// Every accessor treats a missing key and an explicit `null` the same way,
/// so callers pick the default explicitly.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    pub fn new(obj: &'a Map<String, Value>) -> Self {
        Fields(obj)
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// The field as a string, only if it is one
    pub fn str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The field rendered as text; non-string scalars are printed
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    /// A nested object; anything else counts as absent
    pub fn object(&self, name: &str) -> Option<Fields<'a>> {
        self.get(name).and_then(Value::as_object).map(Fields)
    }

    /// A nested array; anything else counts as absent
    pub fn array(&self, name: &str) -> Option<&'a [Value]> {
        self.get(name).and_then(Value::as_array).map(Vec::as_slice)
    }
}

/// Drop a namespace prefix such as `/authors/` from a key
pub fn strip_namespace(key: &str, prefix: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}

/// Decode an author record. Every field is optional.
pub fn decode_author(obj: &Map<String, Value>) -> Author {
    let fields = Fields::new(obj);

    Author {
        id: strip_namespace(&fields.text_or_default("key"), AUTHOR_KEY_PREFIX),
        name: fields.text_or_default("name"),
        personal_name: fields.text_or_default("personal_name"),
    }
}

/// Parse `created.value` down to its calendar date
pub fn parse_created_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, CREATED_FORMAT).map(|ts| ts.date())
}

/// Decode a work record into a book draft
///
/// `author_names` is left empty; see [`resolve_author_names`](crate::load::resolve_author_names).
/// A `created` date that cannot be parsed is dropped with a warning rather
/// than failing the record.
pub fn decode_book(obj: &Map<String, Value>) -> Result<Book, LineError> {
    let fields = Fields::new(obj);

    let key = fields
        .str("key")
        .ok_or_else(|| LineError::shape("work has no key"))?;
    let id = strip_namespace(key, WORK_KEY_PREFIX);
    if id.is_empty() {
        return Err(LineError::shape(format!("work key {:?} has an empty id", key)));
    }

    let description = fields
        .object("description")
        .map(|desc| desc.text_or_default("value"));

    let published_date = fields
        .object("created")
        .and_then(|created| created_date(&id, created));

    let cover_ids = match fields.array("covers") {
        Some(covers) => decode_covers(covers)?,
        None => Vec::new(),
    };

    let author_ids = match fields.array("authors") {
        Some(authors) => decode_author_refs(authors)?,
        None => Vec::new(),
    };

    Ok(Book {
        name: fields.text_or_default("title"),
        description,
        published_date,
        cover_ids,
        author_ids,
        ..Book::new(id)
    })
}

fn created_date(work_id: &str, created: Fields<'_>) -> Option<NaiveDate> {
    let Some(value) = created.str("value") else {
        warn!(work = work_id, "created date has no value, leaving it unset");
        return None;
    };

    match parse_created_date(value) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(work = work_id, value, %err, "unparseable created date, leaving it unset");
            None
        }
    }
}

fn decode_covers(covers: &[Value]) -> Result<Vec<String>, LineError> {
    covers
        .iter()
        .map(|cover| {
            cover
                .as_i64()
                .map(|n| n.to_string())
                .ok_or_else(|| LineError::shape(format!("cover id {} is not an integer", cover)))
        })
        .collect()
}

fn decode_author_refs(authors: &[Value]) -> Result<Vec<String>, LineError> {
    authors
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_object()
                .map(Fields::new)
                .and_then(|item| item.object("author"))
                .and_then(|author| author.str("key"))
                .map(|key| strip_namespace(key, AUTHOR_KEY_PREFIX))
                .ok_or_else(|| LineError::shape(format!("authors[{}] has no author.key", idx)))
        })
        .collect()
}

//! Author id to display name resolution
//!
//! Each id costs one lookup against the author store, which dominates the
//! time spent on a work line. No caching is done here.

use crate::error::StoreError;
use crate::load::types::UNKNOWN_AUTHOR;
use tracing::debug;

/// Map author ids to display names, one lookup per id
///
/// The result has the same length and order as `ids`. An id the lookup does
/// not know becomes [`UNKNOWN_AUTHOR`]. Lookup failures are returned as-is.
pub fn resolve_author_names<F>(ids: &[String], mut lookup: F) -> Result<Vec<String>, StoreError>
where
    F: FnMut(&str) -> Result<Option<String>, StoreError>,
{
    ids.iter()
        .map(|id| {
            Ok(match lookup(id)? {
                Some(name) => name,
                None => {
                    debug!(author = %id, "author not in store");
                    UNKNOWN_AUTHOR.to_string()
                }
            })
        })
        .collect()
}

//! Cursor pagination helper.
//!
//! Listing endpoints fetch `limit + 1` rows ordered by ascending id. If the
//! extra row comes back, it is dropped and the id of the last kept row is
//! exposed as the cursor for the next page. Keying on the last-seen id keeps
//! pages stable under concurrent inserts, unlike offset pagination.

use serde::Serialize;

/// One page of results plus the cursor for the following page.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<i64>,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with `LIMIT limit + 1`.
    ///
    /// `id_of` extracts the ordering column value from a row.
    pub fn from_rows(mut rows: Vec<T>, limit: usize, id_of: impl Fn(&T) -> i64) -> Self {
        let next_cursor = if rows.len() > limit {
            rows.pop();
            rows.last().map(&id_of)
        } else {
            None
        };
        Self {
            data: rows,
            next_cursor,
        }
    }
}

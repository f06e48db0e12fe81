//! # Pagination
//!
//! Shared cursor primitives. The in-memory engine pages over slices with
//! [`paginate_slice`]; SQL engines fetch one row past the limit and trim with
//! [`Connection::from_probe`]. Both report `has_next_page` exactly.

use crate::error::{AppError, Result};
use crate::models::{Connection, Edge, PageInfo};

/// Page arguments as received from the API layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// `<= 0` means no limit.
    pub limit: i64,
    /// `None` starts from the beginning.
    pub after: Option<String>,
}

impl PageRequest {
    pub fn new(limit: i64, after: Option<String>) -> Self {
        Self { limit, after }
    }

    pub fn first(limit: i64) -> Self {
        Self::new(limit, None)
    }

    /// Everything from the beginning.
    pub fn all() -> Self {
        Self::new(0, None)
    }

    pub fn after(limit: i64, cursor: impl Into<String>) -> Self {
        Self::new(limit, Some(cursor.into()))
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit <= 0
    }

    /// Row count to ask a backend for: one past the limit, or `None` for all.
    pub fn probe_limit(&self) -> Option<i64> {
        if self.is_unbounded() {
            None
        } else {
            Some(self.limit.saturating_add(1))
        }
    }
}

/// Resolves `request` against an ID-ordered slice and clones out the page.
///
/// The cursor is located by linear scan; a cursor that matches nothing is an
/// [`AppError::InvalidCursor`].
pub fn paginate_slice<T, F>(items: &[T], id_of: F, request: &PageRequest) -> Result<Connection<T>>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let start = match &request.after {
        Some(cursor) => {
            let index = items
                .iter()
                .position(|item| id_of(item) == cursor.as_str())
                .ok_or_else(|| AppError::InvalidCursor(cursor.clone()))?;
            index + 1
        }
        None => 0,
    };

    let remaining = items.len() - start;
    let end = if request.is_unbounded() {
        items.len()
    } else {
        start + remaining.min(usize::try_from(request.limit).unwrap_or(usize::MAX))
    };

    let edges: Vec<Edge<T>> = items[start..end]
        .iter()
        .map(|item| Edge {
            cursor: id_of(item).to_string(),
            node: item.clone(),
        })
        .collect();

    Ok(Connection {
        page_info: PageInfo {
            end_cursor: edges.last().map(|edge| edge.cursor.clone()),
            has_next_page: end < items.len(),
        },
        edges,
    })
}

impl<T> Connection<T> {
    /// Builds a page from rows fetched with [`PageRequest::probe_limit`].
    ///
    /// An extra row beyond the limit is dropped and only sets `has_next_page`.
    pub fn from_probe<F>(mut rows: Vec<T>, id_of: F, request: &PageRequest) -> Self
    where
        F: Fn(&T) -> String,
    {
        let mut has_next_page = false;
        if !request.is_unbounded() {
            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
            if rows.len() > limit {
                rows.truncate(limit);
                has_next_page = true;
            }
        }

        let edges: Vec<Edge<T>> = rows
            .into_iter()
            .map(|node| Edge {
                cursor: id_of(&node),
                node,
            })
            .collect();

        Connection {
            page_info: PageInfo {
                end_cursor: edges.last().map(|edge| edge.cursor.clone()),
                has_next_page,
            },
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    fn cursors<T>(conn: &Connection<T>) -> Vec<&str> {
        conn.edges.iter().map(|e| e.cursor.as_str()).collect()
    }

    #[test]
    fn slice_first_page_reports_more() {
        let items = ids(3);
        let page = paginate_slice(&items, |s| s.as_str(), &PageRequest::first(2)).unwrap();
        assert_eq!(cursors(&page), vec!["1", "2"]);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("2"));
        assert!(page.page_info.has_next_page);
    }

    #[test]
    fn slice_after_cursor_reaches_end() {
        let items = ids(3);
        let page = paginate_slice(&items, |s| s.as_str(), &PageRequest::after(2, "2")).unwrap();
        assert_eq!(cursors(&page), vec!["3"]);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn slice_non_positive_limit_returns_remainder() {
        let items = ids(4);
        let page = paginate_slice(&items, |s| s.as_str(), &PageRequest::after(-1, "1")).unwrap();
        assert_eq!(cursors(&page), vec!["2", "3", "4"]);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn slice_unknown_cursor_is_rejected() {
        let items = ids(2);
        let err = paginate_slice(&items, |s| s.as_str(), &PageRequest::after(1, "9")).unwrap_err();
        assert!(matches!(err, AppError::InvalidCursor(c) if c == "9"));
    }

    #[test]
    fn slice_last_cursor_gives_empty_page() {
        let items = ids(2);
        let page = paginate_slice(&items, |s| s.as_str(), &PageRequest::after(5, "2")).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page_info.end_cursor, None);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn probe_trims_extra_row() {
        let page = Connection::from_probe(ids(3), |s| s.clone(), &PageRequest::first(2));
        assert_eq!(cursors(&page), vec!["1", "2"]);
        assert!(page.page_info.has_next_page);
    }

    #[test]
    fn probe_exactly_full_page_has_no_next() {
        let page = Connection::from_probe(ids(2), |s| s.clone(), &PageRequest::first(2));
        assert_eq!(page.len(), 2);
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn probe_limit_is_one_past() {
        assert_eq!(PageRequest::first(10).probe_limit(), Some(11));
        assert_eq!(PageRequest::all().probe_limit(), None);
        assert_eq!(PageRequest::first(i64::MAX).probe_limit(), Some(i64::MAX));
    }
}

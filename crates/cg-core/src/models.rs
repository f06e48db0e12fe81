//! # Domain Models
//!
//! These structs represent the core entities of the content graph.
//! IDs are opaque strings assigned by the storage engine; cursors are the
//! very same strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A top-level piece of content that comments hang off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    /// When false the service layer refuses new comments and replies.
    pub allow_comments: bool,
}

/// A comment on a post. With `parent_id` set it is a reply to another comment
/// of the same post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    /// Serialized as RFC 3339.
    pub created_at: DateTime<Utc>,
    /// Nested reply view. Engines leave this empty; it is filled on demand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<CommentConnection>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// One element of a page together with its cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Cursor of the last edge on the page; `None` for an empty page.
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Relay-style page: ordered edges plus page metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    /// Iterates over the nodes in page order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }

    /// Converts every node, keeping cursors and page info.
    pub fn map<U, F>(self, mut f: F) -> Connection<U>
    where
        F: FnMut(T) -> U,
    {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
            page_info: self.page_info,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

pub type PostConnection = Connection<Post>;
pub type CommentConnection = Connection<Comment>;

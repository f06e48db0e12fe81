//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Comment, CommentConnection, Post, PostConnection};
use crate::pagination::PageRequest;

/// Persistence contract for posts, comments, and replies.
///
/// Every engine honors the same pagination rules: results ascend by ID, a
/// non-positive limit returns everything, an unknown cursor is
/// `InvalidCursor`, and `has_next_page` is exact.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    // Post Operations
    async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        content: &str,
        allow_comments: bool,
    ) -> Result<Post>;
    async fn get_posts(&self, page: PageRequest) -> Result<PostConnection>;
    async fn get_post_by_id(&self, id: &str) -> Result<Post>;

    // Comment Operations
    async fn create_comment(&self, author_id: &str, post_id: &str, content: &str) -> Result<Comment>;
    async fn get_comments(&self, post_id: &str, page: PageRequest) -> Result<CommentConnection>;

    // Reply Operations
    /// Creates a comment on `post_id` linked to `parent_id`; the parent must
    /// be a comment of the same post.
    async fn create_reply(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
        parent_id: &str,
    ) -> Result<Comment>;
    /// Direct replies of `comment_id`, in ID order.
    async fn get_replies_by_comment_id(
        &self,
        comment_id: &str,
        page: PageRequest,
    ) -> Result<CommentConnection>;
}

/// Receives every comment (or reply) after it has been stored.
pub trait CommentSink: Send + Sync {
    fn comment_added(&self, comment: &Comment);
}

//! # cg-services
//!
//! Write-side policy on top of any `Repository`: content limits, the
//! per-post `allow_comments` switch, and comment notifications. Readers pass
//! straight through.

use std::sync::Arc;

use cg_core::error::{AppError, Result};
use cg_core::models::{Comment, CommentConnection, Post, PostConnection};
use cg_core::pagination::PageRequest;
use cg_core::traits::{CommentSink, Repository};
use tracing::{debug, info};

/// Upper bound on comment length, in characters.
pub const MAX_COMMENT_LEN: usize = 2000;

pub struct ContentService<R: ?Sized, S: ?Sized> {
    repo: Arc<R>,
    sink: Arc<S>,
}

impl<R: ?Sized, S: ?Sized> Clone for ContentService<R, S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            sink: Arc::clone(&self.sink),
        }
    }
}

fn validate_comment(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::ValidationError("comment must not be empty".into()));
    }
    let len = content.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(AppError::ValidationError(format!(
            "comment is {len} characters, the limit is {MAX_COMMENT_LEN}"
        )));
    }
    Ok(())
}

impl<R, S> ContentService<R, S>
where
    R: Repository + ?Sized,
    S: CommentSink + ?Sized,
{
    pub fn new(repo: Arc<R>, sink: Arc<S>) -> Self {
        Self { repo, sink }
    }

    pub async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        content: &str,
        allow_comments: bool,
    ) -> Result<Post> {
        if title.trim().is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }
        let post = self
            .repo
            .create_post(author_id, title, content, allow_comments)
            .await?;
        info!(post_id = %post.id, allow_comments, "post published");
        Ok(post)
    }

    /// Fails with `CommentsDisabled` when the post author turned comments off.
    async fn commentable_post(&self, post_id: &str) -> Result<Post> {
        let post = self.repo.get_post_by_id(post_id).await?;
        if !post.allow_comments {
            return Err(AppError::CommentsDisabled(post.id));
        }
        Ok(post)
    }

    pub async fn create_comment(&self, author_id: &str, post_id: &str, content: &str) -> Result<Comment> {
        validate_comment(content)?;
        self.commentable_post(post_id).await?;

        let comment = self.repo.create_comment(author_id, post_id, content).await?;
        self.sink.comment_added(&comment);
        Ok(comment)
    }

    pub async fn create_reply(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
        parent_id: &str,
    ) -> Result<Comment> {
        validate_comment(content)?;
        self.commentable_post(post_id).await?;

        let reply = self
            .repo
            .create_reply(author_id, post_id, content, parent_id)
            .await?;
        self.sink.comment_added(&reply);
        Ok(reply)
    }

    pub async fn posts(&self, page: PageRequest) -> Result<PostConnection> {
        self.repo.get_posts(page).await
    }

    pub async fn post(&self, id: &str) -> Result<Post> {
        self.repo.get_post_by_id(id).await
    }

    pub async fn comments(&self, post_id: &str, page: PageRequest) -> Result<CommentConnection> {
        self.repo.get_comments(post_id, page).await
    }

    pub async fn replies(&self, comment_id: &str, page: PageRequest) -> Result<CommentConnection> {
        self.repo.get_replies_by_comment_id(comment_id, page).await
    }

    /// Fills `comment.replies` with one page of its direct replies.
    pub async fn load_replies(&self, comment: &mut Comment, page: PageRequest) -> Result<()> {
        let replies = self.repo.get_replies_by_comment_id(&comment.id, page).await?;
        debug!(comment_id = %comment.id, count = replies.len(), "replies loaded");
        comment.replies = Some(replies);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::notify::NullSink;
    use cg_core::traits::MockRepository;
    use cg_store_memory::InMemoryRepository;
    use chrono::Utc;
    use mockall::predicate::eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Comment>>,
    }

    impl CommentSink for RecordingSink {
        fn comment_added(&self, comment: &Comment) {
            self.seen.lock().unwrap().push(comment.clone());
        }
    }

    fn post(id: &str, allow_comments: bool) -> Post {
        Post {
            id: id.to_string(),
            author_id: "1".to_string(),
            title: "Title".to_string(),
            content: "Content".to_string(),
            allow_comments,
        }
    }

    fn comment(id: &str, post_id: &str, content: &str) -> Comment {
        Comment {
            id: id.to_string(),
            author_id: "2".to_string(),
            post_id: post_id.to_string(),
            parent_id: None,
            content: content.to_string(),
            created_at: Utc::now(),
            replies: None,
        }
    }

    #[tokio::test]
    async fn comment_on_closed_post_is_refused() {
        let mut repo = MockRepository::new();
        repo.expect_get_post_by_id()
            .with(eq("1"))
            .times(1)
            .returning(|id| Ok(post(id, false)));
        repo.expect_create_comment().never();

        let service = ContentService::new(Arc::new(repo), Arc::new(NullSink));
        let err = service.create_comment("2", "1", "hello").await.unwrap_err();
        assert!(matches!(err, AppError::CommentsDisabled(id) if id == "1"));
    }

    #[tokio::test]
    async fn oversized_comment_never_reaches_repository() {
        let mut repo = MockRepository::new();
        repo.expect_get_post_by_id().never();
        repo.expect_create_comment().never();

        let service = ContentService::new(Arc::new(repo), Arc::new(NullSink));
        let long = "x".repeat(MAX_COMMENT_LEN + 1);
        let err = service.create_comment("2", "1", &long).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let exactly = "ё".repeat(MAX_COMMENT_LEN);
        assert!(validate_comment(&exactly).is_ok());
        assert!(validate_comment("   ").is_err());
    }

    #[tokio::test]
    async fn successful_comment_is_published() {
        let mut repo = MockRepository::new();
        repo.expect_get_post_by_id()
            .returning(|id| Ok(post(id, true)));
        repo.expect_create_comment()
            .times(1)
            .returning(|_, post_id, content| Ok(comment("7", post_id, content)));

        let sink = Arc::new(RecordingSink::default());
        let service = ContentService::new(Arc::new(repo), Arc::clone(&sink));
        let created = service.create_comment("2", "1", "Nice post!").await.unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, created.id);
    }

    #[tokio::test]
    async fn failed_reply_is_not_published() {
        let mut repo = MockRepository::new();
        repo.expect_get_post_by_id()
            .returning(|id| Ok(post(id, true)));
        repo.expect_create_reply()
            .returning(|_, _, _, parent| Err(AppError::not_found("comment", parent)));

        let sink = Arc::new(RecordingSink::default());
        let service = ContentService::new(Arc::new(repo), Arc::clone(&sink));
        let err = service.create_reply("3", "1", "Thanks!", "99").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(..)));
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn load_replies_fills_nested_view() {
        tokio_test::block_on(async {
            let repo = Arc::new(InMemoryRepository::new());
            let service = ContentService::new(repo, Arc::new(NullSink));

            let post = service.create_post("1", "Title", "Content", true).await.unwrap();
            let mut root = service.create_comment("2", &post.id, "Nice post!").await.unwrap();
            service.create_reply("3", &post.id, "Thanks!", &root.id).await.unwrap();

            service.load_replies(&mut root, PageRequest::first(10)).await.unwrap();
            let replies = root.replies.as_ref().unwrap();
            assert_eq!(replies.len(), 1);
            assert_eq!(replies.edges[0].node.content, "Thanks!");
        });
    }

    #[test]
    fn blank_title_is_rejected() {
        tokio_test::block_on(async {
            let service = ContentService::new(Arc::new(InMemoryRepository::new()), Arc::new(NullSink));
            let err = service.create_post("1", "  ", "Content", true).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        });
    }
}

//! # cg-store-memory
//!
//! Transient, in-process implementation of `Repository`.
//! All state lives behind a single `RwLock`: readers share it, writers take it
//! exclusively. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use cg_core::error::{AppError, Result};
use cg_core::ids::parse_canonical;
use cg_core::models::{Comment, CommentConnection, Post, PostConnection};
use cg_core::pagination::{paginate_slice, PageRequest};
use cg_core::traits::Repository;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct State {
    /// Keyed by numeric ID so iteration is creation order.
    posts: BTreeMap<u64, Post>,
    /// Flat comment table shared by every post; replies included.
    comments: BTreeMap<u64, Comment>,
    /// Comment IDs per post, in insertion order.
    by_post: HashMap<String, Vec<u64>>,
}

impl State {
    fn post(&self, id: &str) -> Option<&Post> {
        parse_canonical::<u64>(id).and_then(|key| self.posts.get(&key))
    }

    fn comment(&self, id: &str) -> Option<&Comment> {
        parse_canonical::<u64>(id).and_then(|key| self.comments.get(&key))
    }

    /// Stored ID of `id`'s post, or `NotFound`.
    fn post_id(&self, id: &str) -> Result<String> {
        self.post(id)
            .map(|post| post.id.clone())
            .ok_or_else(|| AppError::not_found("post", id))
    }

    fn insert_comment(&mut self, comment: Comment, key: u64) {
        self.by_post
            .entry(comment.post_id.clone())
            .or_default()
            .push(key);
        self.comments.insert(key, comment);
    }

    fn next_comment_key(&self) -> u64 {
        self.comments.len() as u64 + 1
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        content: &str,
        allow_comments: bool,
    ) -> Result<Post> {
        let mut state = self.state.write().await;

        let key = state.posts.len() as u64 + 1;
        let post = Post {
            id: key.to_string(),
            author_id: author_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            allow_comments,
        };
        state.posts.insert(key, post.clone());

        debug!(post_id = %post.id, "post created");
        Ok(post)
    }

    async fn get_posts(&self, page: PageRequest) -> Result<PostConnection> {
        let state = self.state.read().await;

        let posts: Vec<&Post> = state.posts.values().collect();
        let conn = paginate_slice(&posts, |post| post.id.as_str(), &page)?;
        Ok(conn.map(Post::clone))
    }

    async fn get_post_by_id(&self, id: &str) -> Result<Post> {
        let state = self.state.read().await;

        state
            .post(id)
            .cloned()
            .ok_or_else(|| AppError::not_found("post", id))
    }

    async fn create_comment(&self, author_id: &str, post_id: &str, content: &str) -> Result<Comment> {
        let mut state = self.state.write().await;

        let post_id = state.post_id(post_id)?;

        let key = state.next_comment_key();
        let comment = Comment {
            id: key.to_string(),
            author_id: author_id.to_string(),
            post_id: post_id.clone(),
            parent_id: None,
            content: content.to_string(),
            created_at: Utc::now(),
            replies: None,
        };
        state.insert_comment(comment.clone(), key);

        debug!(%post_id, comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    async fn get_comments(&self, post_id: &str, page: PageRequest) -> Result<CommentConnection> {
        let state = self.state.read().await;

        let post_id = state.post_id(post_id)?;

        let comments: Vec<&Comment> = state
            .by_post
            .get(&post_id)
            .map(|keys| keys.iter().filter_map(|key| state.comments.get(key)).collect())
            .unwrap_or_default();
        let conn = paginate_slice(&comments, |comment| comment.id.as_str(), &page)?;
        Ok(conn.map(Comment::clone))
    }

    async fn create_reply(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
        parent_id: &str,
    ) -> Result<Comment> {
        let mut state = self.state.write().await;

        let post_id = state.post_id(post_id)?;
        let parent_id = match state.comment(parent_id) {
            Some(parent) if parent.post_id == post_id => parent.id.clone(),
            _ => return Err(AppError::not_found("comment", parent_id)),
        };

        let key = state.next_comment_key();
        let reply = Comment {
            id: key.to_string(),
            author_id: author_id.to_string(),
            post_id: post_id.clone(),
            parent_id: Some(parent_id.clone()),
            content: content.to_string(),
            created_at: Utc::now(),
            replies: None,
        };
        state.insert_comment(reply.clone(), key);

        debug!(%post_id, %parent_id, comment_id = %reply.id, "reply created");
        Ok(reply)
    }

    async fn get_replies_by_comment_id(
        &self,
        comment_id: &str,
        page: PageRequest,
    ) -> Result<CommentConnection> {
        let state = self.state.read().await;

        let parent_id = state
            .comment(comment_id)
            .map(|parent| parent.id.as_str())
            .ok_or_else(|| AppError::not_found("comment", comment_id))?;

        let replies: Vec<&Comment> = state
            .comments
            .values()
            .filter(|comment| comment.parent_id.as_deref() == Some(parent_id))
            .collect();
        let conn = paginate_slice(&replies, |reply| reply.id.as_str(), &page)?;
        Ok(conn.map(Comment::clone))
    }
}

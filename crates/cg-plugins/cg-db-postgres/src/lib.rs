//! # cg-db-postgres Implementation
//!
//! This module implements the data mapping between the PostgreSQL relational
//! model and the `cg-core` domain models.
//!
//! Comments (replies included) live in one flat `comments` table; the
//! parent/reply link is a row in `replies_comments`. IDs are `BIGSERIAL`
//! surrogate keys exposed as strings.

mod pool;

pub use pool::{connect, migrate, ConnectOptions};

use async_trait::async_trait;
use cg_core::error::{AppError, Result};
use cg_core::ids::parse_canonical;
use cg_core::models::{Comment, CommentConnection, Connection, Post, PostConnection};
use cg_core::pagination::PageRequest;
use cg_core::traits::Repository;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Executor, Postgres, Row};
use tracing::{debug, instrument};

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(err: sqlx::Error) -> AppError {
    AppError::backend(err)
}

/// Keys are integers in their canonical rendering; any other string can
/// never match a row.
fn parse_id(id: &str) -> Option<i64> {
    parse_canonical::<i64>(id)
}

fn cursor_id(page: &PageRequest) -> Result<Option<i64>> {
    match &page.after {
        Some(cursor) => parse_id(cursor)
            .map(Some)
            .ok_or_else(|| AppError::InvalidCursor(cursor.clone())),
        None => Ok(None),
    }
}

fn invalid_cursor(page: &PageRequest) -> AppError {
    AppError::InvalidCursor(page.after.clone().unwrap_or_default())
}

fn row_to_post(row: &PgRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get::<i64, _>("id").map_err(db_err)?.to_string(),
        author_id: row.try_get("author_id").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        content: row.try_get("content").map_err(db_err)?,
        allow_comments: row.try_get("allow_comments").map_err(db_err)?,
    })
}

fn row_to_comment(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get::<i64, _>("id").map_err(db_err)?.to_string(),
        author_id: row.try_get("author_id").map_err(db_err)?,
        post_id: row.try_get::<i64, _>("post_id").map_err(db_err)?.to_string(),
        parent_id: row
            .try_get::<Option<i64>, _>("parent_id")
            .map_err(db_err)?
            .map(|id| id.to_string()),
        content: row.try_get("content").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        replies: None,
    })
}

async fn post_exists<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(db_err)
}

async fn comment_exists<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(db_err)
}

async fn insert_comment<'e, E>(
    executor: E,
    author_id: &str,
    post_id: i64,
    content: &str,
) -> Result<Comment>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        "INSERT INTO comments (author_id, post_id, content, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id, author_id, post_id, NULL::BIGINT AS parent_id, content, created_at",
    )
    .bind(author_id)
    .bind(post_id)
    .bind(content)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
    .map_err(db_err)?;

    row_to_comment(&row)
}

#[async_trait]
impl Repository for PostgresRepository {
    #[instrument(skip(self, content), level = "debug")]
    async fn create_post(
        &self,
        author_id: &str,
        title: &str,
        content: &str,
        allow_comments: bool,
    ) -> Result<Post> {
        let row = sqlx::query(
            "INSERT INTO posts (author_id, title, content, allow_comments)
             VALUES ($1, $2, $3, $4)
             RETURNING id, author_id, title, content, allow_comments",
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(allow_comments)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row_to_post(&row)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_posts(&self, page: PageRequest) -> Result<PostConnection> {
        let after = cursor_id(&page)?;
        if let Some(after) = after {
            if !post_exists(&self.pool, after).await? {
                return Err(invalid_cursor(&page));
            }
        }

        let rows = sqlx::query(
            "SELECT id, author_id, title, content, allow_comments
             FROM posts
             WHERE ($1::BIGINT IS NULL OR id > $1)
             ORDER BY id
             LIMIT $2",
        )
        .bind(after)
        .bind(page.probe_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
        Ok(Connection::from_probe(posts, |post| post.id.clone(), &page))
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_post_by_id(&self, id: &str) -> Result<Post> {
        let key = parse_id(id).ok_or_else(|| AppError::not_found("post", id))?;

        let row = sqlx::query(
            "SELECT id, author_id, title, content, allow_comments FROM posts WHERE id = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => row_to_post(&row),
            None => Err(AppError::not_found("post", id)),
        }
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn create_comment(&self, author_id: &str, post_id: &str, content: &str) -> Result<Comment> {
        let post_key = parse_id(post_id).ok_or_else(|| AppError::not_found("post", post_id))?;
        if !post_exists(&self.pool, post_key).await? {
            return Err(AppError::not_found("post", post_id));
        }

        let comment = insert_comment(&self.pool, author_id, post_key, content).await?;
        debug!(comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_comments(&self, post_id: &str, page: PageRequest) -> Result<CommentConnection> {
        let post_key = parse_id(post_id).ok_or_else(|| AppError::not_found("post", post_id))?;
        if !post_exists(&self.pool, post_key).await? {
            return Err(AppError::not_found("post", post_id));
        }

        let after = cursor_id(&page)?;
        if let Some(after) = after {
            let known = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1 AND post_id = $2)",
            )
            .bind(after)
            .bind(post_key)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            if !known {
                return Err(invalid_cursor(&page));
            }
        }

        let rows = sqlx::query(
            "SELECT c.id, c.author_id, c.post_id, rc.parent_comment_id AS parent_id, c.content, c.created_at
             FROM comments c
             LEFT JOIN replies_comments rc ON rc.reply_comment_id = c.id
             WHERE c.post_id = $1 AND ($2::BIGINT IS NULL OR c.id > $2)
             ORDER BY c.id
             LIMIT $3",
        )
        .bind(post_key)
        .bind(after)
        .bind(page.probe_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let comments = rows.iter().map(row_to_comment).collect::<Result<Vec<_>>>()?;
        Ok(Connection::from_probe(comments, |comment| comment.id.clone(), &page))
    }

    /// Inserts the comment and its reply link in one transaction; dropping
    /// `tx` on any early return rolls both back.
    #[instrument(skip(self, content), level = "debug")]
    async fn create_reply(
        &self,
        author_id: &str,
        post_id: &str,
        content: &str,
        parent_id: &str,
    ) -> Result<Comment> {
        let post_key = parse_id(post_id).ok_or_else(|| AppError::not_found("post", post_id))?;
        let parent_key =
            parse_id(parent_id).ok_or_else(|| AppError::not_found("comment", parent_id))?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if !post_exists(&mut *tx, post_key).await? {
            return Err(AppError::not_found("post", post_id));
        }

        let parent_post = sqlx::query_scalar::<_, i64>("SELECT post_id FROM comments WHERE id = $1")
            .bind(parent_key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if parent_post != Some(post_key) {
            return Err(AppError::not_found("comment", parent_id));
        }

        let mut reply = insert_comment(&mut *tx, author_id, post_key, content).await?;
        let reply_key = parse_id(&reply.id).ok_or_else(|| AppError::not_found("comment", &reply.id))?;

        sqlx::query("INSERT INTO replies_comments (parent_comment_id, reply_comment_id) VALUES ($1, $2)")
            .bind(parent_key)
            .bind(reply_key)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        reply.parent_id = Some(parent_key.to_string());
        debug!(comment_id = %reply.id, "reply created");
        Ok(reply)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_replies_by_comment_id(
        &self,
        comment_id: &str,
        page: PageRequest,
    ) -> Result<CommentConnection> {
        let parent_key =
            parse_id(comment_id).ok_or_else(|| AppError::not_found("comment", comment_id))?;
        if !comment_exists(&self.pool, parent_key).await? {
            return Err(AppError::not_found("comment", comment_id));
        }

        let after = cursor_id(&page)?;
        if let Some(after) = after {
            let known = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (
                     SELECT 1 FROM replies_comments
                     WHERE parent_comment_id = $1 AND reply_comment_id = $2
                 )",
            )
            .bind(parent_key)
            .bind(after)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            if !known {
                return Err(invalid_cursor(&page));
            }
        }

        let rows = sqlx::query(
            "SELECT c.id, c.author_id, c.post_id, rc.parent_comment_id AS parent_id, c.content, c.created_at
             FROM comments c
             JOIN replies_comments rc ON c.id = rc.reply_comment_id
             WHERE rc.parent_comment_id = $1 AND ($2::BIGINT IS NULL OR c.id > $2)
             ORDER BY c.id
             LIMIT $3",
        )
        .bind(parent_key)
        .bind(after)
        .bind(page.probe_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let replies = rows.iter().map(row_to_comment).collect::<Result<Vec<_>>>()?;
        Ok(Connection::from_probe(replies, |reply| reply.id.clone(), &page))
    }
}

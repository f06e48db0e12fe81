//! Engine-independent contract checks.
//!
//! Every check expects an empty repository and panics on the first violated
//! property, so each engine's test file can drive the same suite.

use cg_core::error::AppError;
use cg_core::models::{CommentConnection, PostConnection};
use cg_core::pagination::PageRequest;
use cg_core::traits::Repository;

/// An ID no engine hands out in a test run.
pub const UNKNOWN_ID: &str = "987654321";

fn titles(conn: &PostConnection) -> Vec<String> {
    conn.nodes().map(|post| post.title.clone()).collect()
}

fn contents(conn: &CommentConnection) -> Vec<String> {
    conn.nodes().map(|comment| comment.content.clone()).collect()
}

/// Walking the pages by end cursor yields every post once, in order.
pub async fn pagination_monotonicity(repo: &dyn Repository) {
    let expected: Vec<String> = (1..=7).map(|i| format!("Title{i}")).collect();
    for title in &expected {
        repo.create_post("author", title, "body", true).await.unwrap();
    }

    for limit in [1, 2, 3, 7, 10] {
        let mut seen = Vec::new();
        let mut cursor = None;
        let mut calls = 0;
        loop {
            calls += 1;
            let page = repo.get_posts(PageRequest::new(limit, cursor.clone())).await.unwrap();
            assert!(page.len() <= limit as usize);
            seen.extend(titles(&page));
            if !page.page_info.has_next_page {
                break;
            }
            cursor = page.page_info.end_cursor.clone();
            assert!(cursor.is_some(), "a page with more results must carry an end cursor");
        }
        assert_eq!(seen, expected, "limit {limit}");
        assert_eq!(calls, expected.len().div_ceil(limit as usize), "limit {limit}");
    }
}

pub async fn posts_first_pages_scenario(repo: &dyn Repository) {
    repo.create_post("1", "Title1", "Content1", true).await.unwrap();
    repo.create_post("2", "Title2", "Content2", false).await.unwrap();
    repo.create_post("3", "Title3", "Content3", true).await.unwrap();

    let first = repo.get_posts(PageRequest::first(2)).await.unwrap();
    assert_eq!(titles(&first), vec!["Title1", "Title2"]);
    assert!(first.page_info.has_next_page);

    let second = repo
        .get_posts(PageRequest::new(2, first.page_info.end_cursor.clone()))
        .await
        .unwrap();
    assert_eq!(titles(&second), vec!["Title3"]);
    assert!(!second.page_info.has_next_page);
}

pub async fn reply_scenario(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let comment = repo.create_comment("2", &post.id, "Nice post!").await.unwrap();
    let reply = repo
        .create_reply("3", &post.id, "Thanks!", &comment.id)
        .await
        .unwrap();
    assert_eq!(reply.parent_id.as_deref(), Some(comment.id.as_str()));
    assert_eq!(reply.post_id, post.id);

    let replies = repo
        .get_replies_by_comment_id(&comment.id, PageRequest::first(10))
        .await
        .unwrap();
    assert_eq!(contents(&replies), vec!["Thanks!"]);
    assert!(!replies.page_info.has_next_page);
}

pub async fn cursor_validity(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let other = repo.create_post("1", "Other", "Content", true).await.unwrap();
    let comment = repo.create_comment("2", &post.id, "Nice post!").await.unwrap();
    let elsewhere = repo.create_comment("2", &other.id, "Other thread").await.unwrap();

    let err = repo.get_posts(PageRequest::after(2, UNKNOWN_ID)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCursor(_)), "{err}");

    let err = repo
        .get_comments(&post.id, PageRequest::after(2, UNKNOWN_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCursor(_)), "{err}");

    // The cursor exists, but not in this post's comments.
    let err = repo
        .get_comments(&post.id, PageRequest::after(2, elsewhere.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCursor(_)), "{err}");

    let err = repo
        .get_replies_by_comment_id(&comment.id, PageRequest::after(2, "not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCursor(_)), "{err}");

    // Cursors are matched as handed out, not by numeric value.
    for cursor in [format!("0{}", post.id), format!("+{}", post.id), format!(" {}", post.id)] {
        let err = repo.get_posts(PageRequest::after(2, cursor.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCursor(_)), "{cursor:?}: {err}");
    }
    for cursor in [format!("0{}", comment.id), format!("+{}", comment.id)] {
        let err = repo
            .get_comments(&post.id, PageRequest::after(2, cursor.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCursor(_)), "{cursor:?}: {err}");
    }
}

pub async fn non_canonical_ids(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let comment = repo.create_comment("2", &post.id, "Nice post!").await.unwrap();

    for spelling in [format!("0{}", post.id), format!("+{}", post.id), format!(" {}", post.id)] {
        let err = repo.get_post_by_id(&spelling).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)), "{spelling:?}: {err}");

        let err = repo.create_comment("2", &spelling, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)), "{spelling:?}: {err}");

        let err = repo.get_comments(&spelling, PageRequest::all()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)), "{spelling:?}: {err}");
    }

    let spelling = format!("+{}", comment.id);
    let err = repo
        .create_reply("3", &post.id, "Thanks!", &spelling)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");
    let err = repo
        .get_replies_by_comment_id(&spelling, PageRequest::all())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");

    // Nothing was stored under another spelling of the post.
    let comments = repo.get_comments(&post.id, PageRequest::all()).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments.nodes().all(|c| c.post_id == post.id));
}

pub async fn not_found_propagation(repo: &dyn Repository) {
    let err = repo.get_post_by_id(UNKNOWN_ID).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");

    let err = repo.create_comment("2", UNKNOWN_ID, "hello").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");

    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let err = repo
        .create_reply("3", &post.id, "Thanks!", UNKNOWN_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");

    let err = repo
        .get_replies_by_comment_id(UNKNOWN_ID, PageRequest::first(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)), "{err}");

    // A failed reply leaves nothing behind.
    let comments = repo.get_comments(&post.id, PageRequest::all()).await.unwrap();
    assert!(comments.is_empty());
}

pub async fn reply_linkage(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let root = repo.create_comment("2", &post.id, "root").await.unwrap();
    let sibling = repo.create_comment("2", &post.id, "sibling").await.unwrap();

    for i in 1..=3 {
        repo.create_reply("3", &post.id, &format!("reply {i}"), &root.id)
            .await
            .unwrap();
    }
    let nested = repo.create_reply("4", &post.id, "to sibling", &sibling.id).await.unwrap();
    repo.create_reply("5", &post.id, "deeper", &nested.id).await.unwrap();

    let first = repo
        .get_replies_by_comment_id(&root.id, PageRequest::first(2))
        .await
        .unwrap();
    assert_eq!(contents(&first), vec!["reply 1", "reply 2"]);
    assert!(first.page_info.has_next_page);

    let rest = repo
        .get_replies_by_comment_id(&root.id, PageRequest::new(2, first.page_info.end_cursor.clone()))
        .await
        .unwrap();
    assert_eq!(contents(&rest), vec!["reply 3"]);
    assert!(!rest.page_info.has_next_page);

    let of_sibling = repo
        .get_replies_by_comment_id(&sibling.id, PageRequest::all())
        .await
        .unwrap();
    assert_eq!(contents(&of_sibling), vec!["to sibling"]);

    // Replies are comments of the post as well, parent link included.
    let all = repo.get_comments(&post.id, PageRequest::all()).await.unwrap();
    assert_eq!(all.len(), 7);
    let linked = all.nodes().filter(|c| c.parent_id.as_deref() == Some(root.id.as_str())).count();
    assert_eq!(linked, 3);
}

pub async fn exact_last_page(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    for i in 1..=4 {
        repo.create_comment("2", &post.id, &format!("c{i}")).await.unwrap();
    }

    let first = repo.get_comments(&post.id, PageRequest::first(2)).await.unwrap();
    assert!(first.page_info.has_next_page);
    let second = repo
        .get_comments(&post.id, PageRequest::new(2, first.page_info.end_cursor.clone()))
        .await
        .unwrap();
    assert_eq!(contents(&second), vec!["c3", "c4"]);
    assert!(!second.page_info.has_next_page);

    for limit in [0, -1] {
        let everything = repo.get_comments(&post.id, PageRequest::first(limit)).await.unwrap();
        assert_eq!(everything.len(), 4);
        assert!(!everything.page_info.has_next_page);
        assert_eq!(everything.page_info.end_cursor, everything.edges.last().map(|e| e.cursor.clone()));
    }
}

pub async fn idempotent_reads(repo: &dyn Repository) {
    let post = repo.create_post("1", "Title", "Content", false).await.unwrap();
    let a = repo.get_post_by_id(&post.id).await.unwrap();
    let b = repo.get_post_by_id(&post.id).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a, post);
}

/// Runs every check, resetting the engine before each with `reset`.
#[macro_export]
macro_rules! run_contract {
    ($repo:expr, $reset:expr) => {{
        $reset.await;
        $crate::pagination_monotonicity($repo).await;
        $reset.await;
        $crate::posts_first_pages_scenario($repo).await;
        $reset.await;
        $crate::reply_scenario($repo).await;
        $reset.await;
        $crate::cursor_validity($repo).await;
        $reset.await;
        $crate::non_canonical_ids($repo).await;
        $reset.await;
        $crate::not_found_propagation($repo).await;
        $reset.await;
        $crate::reply_linkage($repo).await;
        $reset.await;
        $crate::exact_last_page($repo).await;
        $reset.await;
        $crate::idempotent_reads($repo).await;
    }};
}

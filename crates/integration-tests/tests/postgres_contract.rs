//! Runs the contract suite against a throwaway PostgreSQL container.
//!
//! Needs a reachable Docker daemon.

use cg_core::error::AppError;
use cg_core::pagination::PageRequest;
use cg_core::traits::Repository;
use cg_db_postgres::{connect, migrate, ConnectOptions, PostgresRepository};
use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

async fn start() -> (ContainerAsync<Postgres>, PgPool) {
    let container = Postgres::default().start().await.expect("start postgres");
    let host = container.get_host().await.expect("container host");
    let port = container.get_host_port_ipv4(5432).await.expect("container port");

    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
    let pool = connect(&url, &ConnectOptions::default()).await.expect("connect");
    migrate(&pool).await.expect("migrate");
    (container, pool)
}

async fn reset(pool: &PgPool) {
    sqlx::query("TRUNCATE replies_comments, comments, posts RESTART IDENTITY CASCADE")
        .execute(pool)
        .await
        .expect("truncate");
}

#[tokio::test]
async fn postgres_honors_repository_contract() {
    let (_container, pool) = start().await;

    let repo = PostgresRepository::new(pool.clone());
    integration_tests::run_contract!(&repo, reset(&pool));
}

#[tokio::test]
async fn failed_reply_link_leaves_no_orphan_comment() {
    let (_container, pool) = start().await;
    let repo = PostgresRepository::new(pool.clone());

    let post = repo.create_post("1", "Title", "Content", true).await.unwrap();
    let parent = repo.create_comment("2", &post.id, "Nice post!").await.unwrap();

    // Make the link insert fail after the reply row is already written.
    sqlx::query(
        "CREATE FUNCTION reject_reply_link() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'reply links disabled'; END; $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .expect("create function");
    sqlx::query(
        "CREATE TRIGGER reject_reply_link BEFORE INSERT ON replies_comments \
         FOR EACH ROW EXECUTE FUNCTION reject_reply_link()",
    )
    .execute(&pool)
    .await
    .expect("create trigger");

    let err = repo
        .create_reply("3", &post.id, "Thanks!", &parent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Backend(_)), "{err}");

    let comments = repo.get_comments(&post.id, PageRequest::all()).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments.edges[0].node.id, parent.id);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

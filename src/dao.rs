use crate::model::Link;
use sqlx::sqlite::SqliteQueryResult;
use sqlx::{Error, Pool, Sqlite};

/// Idempotent schema setup, safe to run on every startup.
const MIGRATIONS: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS links ( name TEXT NOT NULL, url TEXT NOT NULL )",
    "CREATE UNIQUE INDEX IF NOT EXISTS links_name ON links (name)",
    "CREATE TABLE IF NOT EXISTS user_links ( name TEXT NOT NULL, url TEXT NOT NULL, username TEXT NOT NULL )",
    "CREATE UNIQUE INDEX IF NOT EXISTS user_links_name ON user_links (name, username)",
    "CREATE TABLE IF NOT EXISTS users ( username TEXT NOT NULL, ip TEXT NOT NULL, admin INTEGER NOT NULL DEFAULT 0 )",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username ON users (username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_ip ON users (ip)",
];

pub async fn migrate(db_connection_pool: Pool<Sqlite>) -> Result<(), Error> {
    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(&db_connection_pool)
            .await?;
    }
    Ok(())
}

pub async fn upsert_link(
    db_connection_pool: Pool<Sqlite>,
    name: &str,
    url: &str,
) -> Result<SqliteQueryResult, Error> {
    sqlx::query(
        r#"
              insert into links (name, url) values ($1, $2)
              on conflict (name) do update set url = excluded.url
            "#,
    )
    .bind(name)
    .bind(url)
    .execute(&db_connection_pool)
    .await
}

pub async fn upsert_user_link(
    db_connection_pool: Pool<Sqlite>,
    name: &str,
    url: &str,
    username: &str,
) -> Result<SqliteQueryResult, Error> {
    sqlx::query(
        r#"
              insert into user_links (name, url, username) values ($1, $2, $3)
              on conflict (name, username) do update set url = excluded.url
            "#,
    )
    .bind(name)
    .bind(url)
    .bind(username)
    .execute(&db_connection_pool)
    .await
}

pub async fn get_link(
    db_connection_pool: Pool<Sqlite>,
    name: &str,
) -> Result<Option<Link>, Error> {
    sqlx::query_as("select name, url from links where name = $1")
        .bind(name)
        .fetch_optional(&db_connection_pool)
        .await
}

pub async fn get_user_link(
    db_connection_pool: Pool<Sqlite>,
    name: &str,
    username: &str,
) -> Result<Option<Link>, Error> {
    sqlx::query_as("select name, url, username from user_links where name = $1 and username = $2")
        .bind(name)
        .bind(username)
        .fetch_optional(&db_connection_pool)
        .await
}

/// Resolves a name to its destination. With a username scope the user-owned
/// entry shadows the global one; without a scope only the global relation is
/// consulted.
pub async fn resolve(
    db_connection_pool: Pool<Sqlite>,
    name: &str,
    username: Option<&str>,
) -> Result<Option<String>, Error> {
    match username {
        Some(username) => {
            sqlx::query_scalar(
                r#"
                      select url from (
                          select url, 0 as scope_rank from user_links where name = $1 and username = $2
                          union all
                          select url, 1 as scope_rank from links where name = $1
                      )
                      order by scope_rank
                      limit 1
                    "#,
            )
            .bind(name)
            .bind(username)
            .fetch_optional(&db_connection_pool)
            .await
        }
        None => {
            sqlx::query_scalar("select url from links where name = $1")
                .bind(name)
                .fetch_optional(&db_connection_pool)
                .await
        }
    }
}

pub async fn list_links(db_connection_pool: Pool<Sqlite>) -> Result<Vec<Link>, Error> {
    sqlx::query_as("select name, url from links order by name")
        .fetch_all(&db_connection_pool)
        .await
}

/// Both relations merged, one ordering across the union.
pub async fn list_all(db_connection_pool: Pool<Sqlite>) -> Result<Vec<Link>, Error> {
    sqlx::query_as(
        r#"
              select name, url, username from (
                  select name, url, '' as username from links
                  union all
                  select name, url, username from user_links
              )
              order by name
            "#,
    )
    .fetch_all(&db_connection_pool)
    .await
}

/// Best-effort identity lookup; an unknown address is anonymous, not an error.
pub async fn username_for_ip(
    db_connection_pool: Pool<Sqlite>,
    ip: &str,
) -> Result<Option<String>, Error> {
    sqlx::query_scalar("select username from users where ip = $1")
        .bind(ip)
        .fetch_optional(&db_connection_pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Creating in-memory database failed");
        migrate(pool.clone()).await.expect("Migrations failed");
        pool
    }

    async fn count_links(pool: &Pool<Sqlite>) -> i64 {
        sqlx::query_scalar("select count(*) from links")
            .fetch_one(pool)
            .await
            .expect("Counting links failed")
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = test_pool().await;
        migrate(pool.clone()).await.expect("Second run failed");
    }

    #[tokio::test]
    async fn upsert_same_pair_keeps_a_single_row() {
        let pool = test_pool().await;
        upsert_link(pool.clone(), "docs", "https://a.example").await.unwrap();
        upsert_link(pool.clone(), "docs", "https://a.example").await.unwrap();
        assert_eq!(count_links(&pool).await, 1);
        let url = resolve(pool.clone(), "docs", None).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://a.example"));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_url() {
        let pool = test_pool().await;
        upsert_link(pool.clone(), "docs", "https://old.example").await.unwrap();
        upsert_link(pool.clone(), "docs", "https://new.example").await.unwrap();
        assert_eq!(count_links(&pool).await, 1);
        let url = resolve(pool.clone(), "docs", None).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://new.example"));
    }

    #[tokio::test]
    async fn user_link_shadows_global_link() {
        let pool = test_pool().await;
        upsert_link(pool.clone(), "docs", "https://a.example").await.unwrap();
        upsert_user_link(pool.clone(), "docs", "https://b.example", "alice").await.unwrap();

        let for_alice = resolve(pool.clone(), "docs", Some("alice")).await.unwrap();
        assert_eq!(for_alice.as_deref(), Some("https://b.example"));
        let for_bob = resolve(pool.clone(), "docs", Some("bob")).await.unwrap();
        assert_eq!(for_bob.as_deref(), Some("https://a.example"));
        let anonymous = resolve(pool.clone(), "docs", Some("")).await.unwrap();
        assert_eq!(anonymous.as_deref(), Some("https://a.example"));
    }

    #[tokio::test]
    async fn user_link_without_global_still_resolves() {
        let pool = test_pool().await;
        upsert_user_link(pool.clone(), "mine", "https://mine.example", "alice").await.unwrap();
        let for_alice = resolve(pool.clone(), "mine", Some("alice")).await.unwrap();
        assert_eq!(for_alice.as_deref(), Some("https://mine.example"));
        let for_bob = resolve(pool.clone(), "mine", Some("bob")).await.unwrap();
        assert_eq!(for_bob, None);
    }

    #[tokio::test]
    async fn resolve_unknown_name_is_none() {
        let pool = test_pool().await;
        let url = resolve(pool.clone(), "missing", Some("alice")).await.unwrap();
        assert_eq!(url, None);
        let url = resolve(pool.clone(), "missing", None).await.unwrap();
        assert_eq!(url, None);
    }

    #[tokio::test]
    async fn list_all_orders_by_name_across_scopes() {
        let pool = test_pool().await;
        upsert_link(pool.clone(), "zeta", "https://z.example").await.unwrap();
        upsert_link(pool.clone(), "beta", "https://b.example").await.unwrap();
        upsert_user_link(pool.clone(), "alpha", "https://a.example", "alice").await.unwrap();

        let links = list_all(pool.clone()).await.unwrap();
        let names: Vec<&str> = links.iter().map(|link| link.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "zeta"]);
        assert_eq!(links[0].username, "alice");
        assert_eq!(links[1].username, "");
    }

    #[tokio::test]
    async fn list_links_covers_global_scope_only() {
        let pool = test_pool().await;
        upsert_link(pool.clone(), "docs", "https://a.example").await.unwrap();
        upsert_user_link(pool.clone(), "mine", "https://b.example", "alice").await.unwrap();

        let links = list_links(pool.clone()).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "docs");
    }

    #[tokio::test]
    async fn username_lookup_by_address() {
        let pool = test_pool().await;
        sqlx::query("insert into users (username, ip, admin) values ($1, $2, 0)")
            .bind("alice")
            .bind("10.0.0.7")
            .execute(&pool)
            .await
            .unwrap();

        let hit = username_for_ip(pool.clone(), "10.0.0.7").await.unwrap();
        assert_eq!(hit.as_deref(), Some("alice"));
        let miss = username_for_ip(pool.clone(), "10.0.0.8").await.unwrap();
        assert_eq!(miss, None);
    }
}

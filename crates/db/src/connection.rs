//! SQLite pool setup.
//!
//! Negotiations are chat-paced, so the pool stays small; writers wait on
//! the busy timeout instead of surfacing lock errors to a session.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_TIMEOUT_MS: u32 = 5_000;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, DEFAULT_MAX_CONNECTIONS, DEFAULT_ACQUIRE_TIMEOUT).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(acquire_timeout)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // deal_messages rows reference deals(id); WAL lets history
                // reads proceed while an agent turn is being persisted
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::*;

    #[tokio::test]
    async fn connections_enforce_foreign_keys() {
        let pool = connect("sqlite::memory:").await.expect("connect");

        let row = sqlx::query("PRAGMA foreign_keys").fetch_one(&pool).await.expect("pragma");
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);

        let row = sqlx::query("PRAGMA busy_timeout").fetch_one(&pool).await.expect("pragma");
        let timeout: i64 = row.get(0);
        assert_eq!(timeout, i64::from(BUSY_TIMEOUT_MS));
    }
}

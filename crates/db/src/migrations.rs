use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["deals", "deal_messages", "idx_deal_messages_deal_id", "idx_deal_messages_round"];

    #[tokio::test]
    async fn migrations_create_the_negotiation_schema() {
        let pool = connect("sqlite::memory:").await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        for object in MANAGED_SCHEMA_OBJECTS {
            let row = sqlx::query(
                "SELECT COUNT(*) AS present FROM sqlite_master WHERE name = ?",
            )
            .bind(object)
            .fetch_one(&pool)
            .await
            .expect("schema query");
            let present: i64 = row.get("present");
            assert_eq!(present, 1, "missing schema object {object}");
        }
    }
}

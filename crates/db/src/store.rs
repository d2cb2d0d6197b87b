//! `DealStore` implementations: SQLite for production, in-memory for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::chrono::{DateTime, Utc};
use parley_core::{Deal, DealId, DealMessage, DealStatus, DealStore, MessageRole, StoreError};
use sqlx::{sqlite::SqliteRow, Row};

use crate::DbPool;

pub struct SqlDealStore {
    pool: DbPool,
}

impl SqlDealStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn decode(message: impl Into<String>) -> StoreError {
    StoreError::Decode(message.into())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| decode(err.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| decode(err.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|err| decode(format!("bad timestamp `{raw}`: {err}")))
}

fn deal_from_row(row: &SqliteRow) -> Result<Deal, StoreError> {
    let status_raw: String = row.try_get("status").map_err(backend)?;
    let status = DealStatus::parse(&status_raw)
        .ok_or_else(|| decode(format!("unknown deal status `{status_raw}`")))?;
    let round: i64 = row.try_get("current_round").map_err(backend)?;
    let config_json: String = row.try_get("config_json").map_err(backend)?;
    let created_at: String = row.try_get("created_at").map_err(backend)?;

    Ok(Deal {
        id: DealId(row.try_get("id").map_err(backend)?),
        vendor_name: row.try_get("vendor_name").map_err(backend)?,
        status,
        current_round: u32::try_from(round)
            .map_err(|_| decode(format!("negative round {round}")))?,
        config: from_json(&config_json)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<DealMessage, StoreError> {
    let role_raw: String = row.try_get("role").map_err(backend)?;
    let role = MessageRole::parse(&role_raw)
        .ok_or_else(|| decode(format!("unknown message role `{role_raw}`")))?;
    let round: i64 = row.try_get("round").map_err(backend)?;
    let created_at: String = row.try_get("created_at").map_err(backend)?;

    let offer_json: Option<String> = row.try_get("offer_json").map_err(backend)?;
    let decision_json: Option<String> = row.try_get("decision_json").map_err(backend)?;
    let explainability_json: Option<String> =
        row.try_get("explainability_json").map_err(backend)?;

    Ok(DealMessage {
        role,
        content: row.try_get("content").map_err(backend)?,
        offer: offer_json.as_deref().map(from_json).transpose()?,
        decision: decision_json.as_deref().map(from_json).transpose()?,
        explainability: explainability_json.as_deref().map(from_json).transpose()?,
        round: u32::try_from(round).map_err(|_| decode(format!("negative round {round}")))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl DealStore for SqlDealStore {
    async fn create_deal(&self, deal: Deal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO deals (id, vendor_name, status, current_round, config_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&deal.id.0)
        .bind(&deal.vendor_name)
        .bind(deal.status.as_str())
        .bind(i64::from(deal.current_round))
        .bind(to_json(&deal.config)?)
        .bind(deal.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, vendor_name, status, current_round, config_json, created_at
            FROM deals
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| deal_from_row(&row)).transpose()
    }

    async fn append_message(&self, id: &DealId, message: DealMessage) -> Result<(), StoreError> {
        let offer_json = message.offer.as_ref().map(to_json).transpose()?;
        let decision_json = message.decision.as_ref().map(to_json).transpose()?;
        let explainability_json = message.explainability.as_ref().map(to_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO deal_messages (
                deal_id, role, content, offer_json, decision_json,
                explainability_json, round, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(offer_json)
        .bind(decision_json)
        .bind(explainability_json)
        .bind(i64::from(message.round))
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn history(&self, id: &DealId) -> Result<Vec<DealMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT role, content, offer_json, decision_json, explainability_json,
                   round, created_at
            FROM deal_messages
            WHERE deal_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(message_from_row).collect()
    }

    async fn advance_round(&self, id: &DealId) -> Result<u32, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE deals SET current_round = current_round + 1
            WHERE id = ?
            RETURNING current_round
            "#,
        )
        .bind(&id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let round: i64 = row.try_get("current_round").map_err(backend)?;
        u32::try_from(round).map_err(|_| decode(format!("negative round {round}")))
    }

    async fn set_status(&self, id: &DealId, status: DealStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE deals SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

/// In-memory double for unit and orchestration tests.
#[derive(Default)]
pub struct InMemoryDealStore {
    deals: Mutex<HashMap<String, (Deal, Vec<DealMessage>)>>,
}

impl InMemoryDealStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DealStore for InMemoryDealStore {
    async fn create_deal(&self, deal: Deal) -> Result<(), StoreError> {
        let mut deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        deals.insert(deal.id.0.clone(), (deal, Vec::new()));
        Ok(())
    }

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError> {
        let deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(deals.get(&id.0).map(|(deal, _)| deal.clone()))
    }

    async fn append_message(&self, id: &DealId, message: DealMessage) -> Result<(), StoreError> {
        let mut deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (_, history) = deals
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::Backend(format!("no deal {}", id.0)))?;
        history.push(message);
        Ok(())
    }

    async fn history(&self, id: &DealId) -> Result<Vec<DealMessage>, StoreError> {
        let deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(deals.get(&id.0).map(|(_, history)| history.clone()).unwrap_or_default())
    }

    async fn advance_round(&self, id: &DealId) -> Result<u32, StoreError> {
        let mut deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (deal, _) = deals
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::Backend(format!("no deal {}", id.0)))?;
        deal.current_round += 1;
        Ok(deal.current_round)
    }

    async fn set_status(&self, id: &DealId, status: DealStatus) -> Result<(), StoreError> {
        let mut deals = self.deals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (deal, _) = deals
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::Backend(format!("no deal {}", id.0)))?;
        deal.status = status;
        Ok(())
    }
}

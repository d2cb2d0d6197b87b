//! Persistence collaborator contract.
//!
//! The engine never re-derives round or status from scratch: each call
//! receives exactly what it needs from the store and returns updates for
//! the caller to persist. Implementations live outside the core (SQL in
//! `parley-db`, an in-memory double for tests).

use async_trait::async_trait;

use crate::domain::deal::{Deal, DealId, DealMessage, DealStatus};
use crate::domain::offer::Offer;
use crate::errors::StoreError;

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn create_deal(&self, deal: Deal) -> Result<(), StoreError>;

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError>;

    /// Append to the deal's append-only message history.
    async fn append_message(&self, id: &DealId, message: DealMessage) -> Result<(), StoreError>;

    /// Full history, oldest first.
    async fn history(&self, id: &DealId) -> Result<Vec<DealMessage>, StoreError>;

    /// Bump the round counter; returns the new current round.
    async fn advance_round(&self, id: &DealId) -> Result<u32, StoreError>;

    async fn set_status(&self, id: &DealId, status: DealStatus) -> Result<(), StoreError>;
}

/// The counter-offer carried by the most recent agent message, if any.
/// Derived from history here so every store backend agrees on it.
pub fn last_counter_offer(history: &[DealMessage]) -> Option<Offer> {
    history
        .iter()
        .rev()
        .filter_map(|message| message.decision.as_ref())
        .find_map(|decision| decision.counter_offer.clone())
}

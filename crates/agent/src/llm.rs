use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parley_core::rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// The target the collaborator should steer its phrasing toward.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TargetContext {
    pub price: Option<Decimal>,
    pub terms: Option<String>,
    pub delivery: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TextGenRequest {
    pub messages: Vec<ChatMessage>,
    pub target_context: TargetContext,
    /// The collaborator is expected to answer (or fail) within this budget.
    pub time_budget: Duration,
}

/// External text-generation collaborator. Implementations may take
/// arbitrarily long; callers race them against the budget and abandon the
/// losing branch, since there is no cancellation hook.
#[async_trait]
pub trait TextGenClient: Send + Sync {
    async fn complete(&self, request: &TextGenRequest) -> Result<String>;
}

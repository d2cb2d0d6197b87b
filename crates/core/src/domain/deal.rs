use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NegotiationConfig;
use crate::domain::decision::{Decision, Explainability};
use crate::domain::offer::Offer;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl DealId {
    pub fn generate() -> Self {
        Self(format!("deal-{}", uuid::Uuid::new_v4()))
    }
}

/// Accepted, WalkedAway and Escalated are terminal: no further decision is
/// computed for the deal until an explicit reset back to Negotiating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    Negotiating,
    Accepted,
    WalkedAway,
    Escalated,
}

impl DealStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DealStatus::Negotiating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::Negotiating => "negotiating",
            DealStatus::Accepted => "accepted",
            DealStatus::WalkedAway => "walked_away",
            DealStatus::Escalated => "escalated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "negotiating" => Some(DealStatus::Negotiating),
            "accepted" => Some(DealStatus::Accepted),
            "walked_away" => Some(DealStatus::WalkedAway),
            "escalated" => Some(DealStatus::Escalated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    Vendor,
    Agent,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::Vendor => "vendor",
            MessageRole::Agent => "agent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vendor" => Some(MessageRole::Vendor),
            "agent" => Some(MessageRole::Agent),
            _ => None,
        }
    }
}

/// One entry of the append-only per-deal message history. Vendor messages
/// carry the extracted offer; agent messages carry the decision and its
/// explainability. The core never re-derives history state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DealMessage {
    pub role: MessageRole,
    pub content: String,
    pub offer: Option<Offer>,
    pub decision: Option<Decision>,
    pub explainability: Option<Explainability>,
    pub round: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub vendor_name: String,
    pub status: DealStatus,
    /// 1-based; a round completes only when the agent response lands, not
    /// when the vendor message alone is recorded.
    pub current_round: u32,
    pub config: NegotiationConfig,
    pub created_at: DateTime<Utc>,
}

impl Deal {
    pub fn new(vendor_name: impl Into<String>, config: NegotiationConfig) -> Self {
        Self {
            id: DealId::generate(),
            vendor_name: vendor_name.into(),
            status: DealStatus::Negotiating,
            current_round: 1,
            config,
            created_at: Utc::now(),
        }
    }

    pub fn can_transition_to(&self, next: DealStatus) -> bool {
        match (self.status, next) {
            (DealStatus::Negotiating, _) => true,
            // explicit reset/resume path out of a terminal state
            (_, DealStatus::Negotiating) => true,
            _ => false,
        }
    }

    pub fn transition_to(&mut self, next: DealStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }
        Err(DomainError::InvalidDealTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NegotiationConfig;

    fn deal(status: DealStatus) -> Deal {
        let mut deal = Deal::new("Acme Industrial", NegotiationConfig::sample());
        deal.status = status;
        deal
    }

    #[test]
    fn negotiating_deal_can_terminate() {
        let mut deal = deal(DealStatus::Negotiating);
        deal.transition_to(DealStatus::Accepted).expect("negotiating -> accepted");
        assert_eq!(deal.status, DealStatus::Accepted);
    }

    #[test]
    fn terminal_deal_blocks_further_transitions() {
        let mut deal = deal(DealStatus::WalkedAway);
        let error = deal
            .transition_to(DealStatus::Escalated)
            .expect_err("walked_away -> escalated should fail");
        assert!(matches!(error, DomainError::InvalidDealTransition { .. }));
    }

    #[test]
    fn terminal_deal_can_be_reset_to_negotiating() {
        let mut deal = deal(DealStatus::Escalated);
        deal.transition_to(DealStatus::Negotiating).expect("explicit resume");
        assert_eq!(deal.status, DealStatus::Negotiating);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            DealStatus::Negotiating,
            DealStatus::Accepted,
            DealStatus::WalkedAway,
            DealStatus::Escalated,
        ] {
            assert_eq!(DealStatus::parse(status.as_str()), Some(status));
        }
    }
}

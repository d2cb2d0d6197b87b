use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::offer::Offer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Accept,
    Counter,
    WalkAway,
    Escalate,
    AskClarify,
}

impl DecisionAction {
    /// Terminal actions end the negotiation; no further decision is
    /// computed for the deal until an explicit reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, DecisionAction::Accept | DecisionAction::WalkAway | DecisionAction::Escalate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionAction::Accept => "ACCEPT",
            DecisionAction::Counter => "COUNTER",
            DecisionAction::WalkAway => "WALK_AWAY",
            DecisionAction::Escalate => "ESCALATE",
            DecisionAction::AskClarify => "ASK_CLARIFY",
        }
    }
}

/// Outcome of one decision-engine transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    /// Total weighted utility in [0, 1]. `None` only for AskClarify, where
    /// nothing scoreable was observed.
    pub utility_score: Option<f64>,
    /// Accept echoes the vendor offer unchanged; Counter carries the next
    /// concession; Escalate carries the last computed counter, if any.
    pub counter_offer: Option<Offer>,
}

/// Whether response or suggestion text came from the text-generation
/// collaborator or from the deterministic template path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Llm,
    Fallback,
}

/// Per-parameter line of the audit breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterBreakdown {
    pub name: String,
    pub raw_value: Option<ParameterRawValue>,
    pub utility: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterRawValue {
    Numeric(Decimal),
    Categorical(String),
}

/// Fully re-derivable from config + offer + decision; audit/UI only and
/// never fed back into the decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Explainability {
    pub per_parameter: Vec<ParameterBreakdown>,
    pub total_utility: Option<f64>,
    pub action: DecisionAction,
    pub thresholds_crossed: Vec<String>,
}

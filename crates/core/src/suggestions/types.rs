use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four fixed scenario buckets, each base-priced at a different point
/// of the configured price range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    Hard,
    Medium,
    Soft,
    WalkAway,
}

pub const SCENARIOS: [Scenario; 4] = [Scenario::Hard, Scenario::Medium, Scenario::Soft, Scenario::WalkAway];

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Hard => "HARD",
            Scenario::Medium => "MEDIUM",
            Scenario::Soft => "SOFT",
            Scenario::WalkAway => "WALK_AWAY",
        }
    }
}

/// Bias tag steering a suggestion's trade-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Price,
    Terms,
    Delivery,
    Value,
}

pub const EMPHASES: [Emphasis; 4] =
    [Emphasis::Price, Emphasis::Terms, Emphasis::Delivery, Emphasis::Value];

impl Emphasis {
    pub fn as_str(self) -> &'static str {
        match self {
            Emphasis::Price => "price",
            Emphasis::Terms => "terms",
            Emphasis::Delivery => "delivery",
            Emphasis::Value => "value",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "price" => Some(Emphasis::Price),
            "terms" => Some(Emphasis::Terms),
            "delivery" => Some(Emphasis::Delivery),
            "value" => Some(Emphasis::Value),
            _ => None,
        }
    }
}

/// Delivery window the suggestion engine perturbs around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    pub standard_days: u32,
    pub minimum_days: u32,
    pub maximum_days: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { standard_days: 21, minimum_days: 7, maximum_days: 45 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSuggestion {
    pub message: String,
    pub price: Decimal,
    pub payment_terms: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_days: u32,
    pub emphasis: Emphasis,
}

/// Four suggestions per scenario bucket. Serializes to the stable persisted
/// shape: `{"HARD": [...], "MEDIUM": [...], "SOFT": [...], "WALK_AWAY": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSuggestions {
    pub by_scenario: BTreeMap<Scenario, Vec<StructuredSuggestion>>,
}

impl ScenarioSuggestions {
    pub fn get(&self, scenario: Scenario) -> &[StructuredSuggestion] {
        self.by_scenario.get(&scenario).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Narrow an all-emphases result to a subset without regeneration.
    pub fn filter_emphases(&self, emphases: &BTreeSet<Emphasis>) -> ScenarioSuggestions {
        let by_scenario = self
            .by_scenario
            .iter()
            .map(|(scenario, suggestions)| {
                let filtered = suggestions
                    .iter()
                    .filter(|suggestion| emphases.contains(&suggestion.emphasis))
                    .cloned()
                    .collect();
                (*scenario, filtered)
            })
            .collect();
        ScenarioSuggestions { by_scenario }
    }
}

//! Utility scoring of offers against a negotiation config.
//!
//! Missing-parameter policy: a parameter the offer does not mention scores
//! utility 0 and its weight stays in the denominator, on every call path.
//! An unstated term is a term the vendor has not conceded; excluding it
//! would let a price-only offer outscore a complete one.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::{CategoricalSpec, Direction, NegotiationConfig, NumericSpec, ParameterSpec};
use crate::domain::offer::{Offer, ParameterValue};

/// Fixed classification bands for the weighted-mode summary.
pub const BAND_ACCEPT: f64 = 0.70;
pub const BAND_COUNTER: f64 = 0.50;
pub const BAND_ESCALATE: f64 = 0.30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UtilityBand {
    Accept,
    Counter,
    Escalate,
    WalkAway,
}

impl UtilityBand {
    pub fn classify(total: f64) -> Self {
        if total >= BAND_ACCEPT {
            UtilityBand::Accept
        } else if total >= BAND_COUNTER {
            UtilityBand::Counter
        } else if total >= BAND_ESCALATE {
            UtilityBand::Escalate
        } else {
            UtilityBand::WalkAway
        }
    }
}

/// Per-parameter line of a scored offer.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterScore {
    pub name: String,
    pub observed: Option<ParameterValue>,
    pub utility: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredOffer {
    pub per_parameter: Vec<ParameterScore>,
    pub total: f64,
    pub band: UtilityBand,
    /// Number of configured parameters the offer actually mentioned.
    pub observed_count: usize,
}

#[derive(Clone, Debug, Default)]
pub struct UtilityScorer;

impl UtilityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Clamped linear utility between anchor (1) and max_acceptable (0).
    pub fn numeric_utility(&self, spec: &NumericSpec, value: Decimal) -> f64 {
        let value = value.to_f64().unwrap_or(0.0);
        let anchor = spec.anchor.to_f64().unwrap_or(0.0);
        let max_acceptable = spec.max_acceptable.to_f64().unwrap_or(0.0);

        let raw = match spec.direction {
            Direction::Minimize => (max_acceptable - value) / (max_acceptable - anchor),
            Direction::Maximize => (value - max_acceptable) / (anchor - max_acceptable),
        };
        raw.clamp(0.0, 1.0)
    }

    /// Table lookup; null or unseen options score 0.
    pub fn categorical_utility(&self, spec: &CategoricalSpec, value: Option<&str>) -> f64 {
        value.and_then(|option| spec.utility.get(option)).copied().unwrap_or(0.0)
    }

    pub fn parameter_utility(&self, spec: &ParameterSpec, value: Option<&ParameterValue>) -> f64 {
        match (spec, value) {
            (ParameterSpec::Numeric(numeric), Some(ParameterValue::Numeric(observed))) => {
                self.numeric_utility(numeric, *observed)
            }
            (ParameterSpec::Categorical(categorical), Some(ParameterValue::Categorical(option))) => {
                self.categorical_utility(categorical, Some(option))
            }
            // missing or type-mismatched observation: worst case
            _ => 0.0,
        }
    }

    /// Weighted average over all configured parameters. Weights need not
    /// sum to 1; the denominator normalizes.
    pub fn score(
        &self,
        config: &NegotiationConfig,
        values: &BTreeMap<String, ParameterValue>,
    ) -> ScoredOffer {
        let weight_sum: f64 = config.parameters.values().map(ParameterSpec::weight).sum();
        let mut per_parameter = Vec::with_capacity(config.parameters.len());
        let mut weighted_sum = 0.0;
        let mut observed_count = 0;

        for (name, spec) in &config.parameters {
            let observed = values.get(name);
            if observed.is_some() {
                observed_count += 1;
            }
            let utility = self.parameter_utility(spec, observed);
            let weight = spec.weight();
            let contribution =
                if weight_sum > 0.0 { weight * utility / weight_sum } else { 0.0 };
            weighted_sum += contribution;

            per_parameter.push(ParameterScore {
                name: name.clone(),
                observed: observed.cloned(),
                utility,
                weight,
                contribution,
            });
        }

        ScoredOffer {
            per_parameter,
            total: weighted_sum,
            band: UtilityBand::classify(weighted_sum),
            observed_count,
        }
    }

    pub fn score_offer(&self, config: &NegotiationConfig, offer: &Offer) -> ScoredOffer {
        self.score(config, &offer.parameter_values())
    }
}

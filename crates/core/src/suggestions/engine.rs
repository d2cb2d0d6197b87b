//! Deterministic scenario-suggestion generation.
//!
//! Each of the four buckets is base-priced at a different point of the
//! configured price range (anchor, target minus half a concession step,
//! target, max_acceptable). Within a bucket the four slots vary by
//! emphasis, each perturbing price, terms and delivery window along a
//! distinct axis. With an emphasis filter, all four slots in every bucket
//! lead with the requested emphases while still differing in concrete
//! trade-off.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::config::{CategoricalSpec, NegotiationConfig, NumericSpec, ParameterSpec};
use crate::decision::step_toward;
use crate::errors::ConfigError;

use super::types::{
    DeliveryConfig, Emphasis, Scenario, ScenarioSuggestions, StructuredSuggestion, EMPHASES,
    SCENARIOS,
};

pub const SUGGESTIONS_PER_SCENARIO: usize = 4;

#[derive(Clone, Debug)]
pub struct SuggestionRequest<'a> {
    pub config: &'a NegotiationConfig,
    pub delivery: DeliveryConfig,
    /// Empty means "all emphases": one suggestion per emphasis, in order.
    pub emphases: Vec<Emphasis>,
    /// Anchors delivery_date computation; `None` leaves dates unset so the
    /// output stays fully deterministic.
    pub base_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default)]
pub struct ScenarioSuggestionEngine;

impl ScenarioSuggestionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, request: &SuggestionRequest<'_>) -> Result<ScenarioSuggestions, ConfigError> {
        let price_spec = price_parameter(request.config)?;
        let terms = terms_options(request.config);

        let mut emphases: Vec<Emphasis> = request.emphases.clone();
        emphases.sort();
        emphases.dedup();
        let slot_emphases: Vec<Emphasis> = if emphases.is_empty() {
            EMPHASES.to_vec()
        } else {
            (0..SUGGESTIONS_PER_SCENARIO).map(|slot| emphases[slot % emphases.len()]).collect()
        };

        let mut by_scenario = BTreeMap::new();
        for scenario in SCENARIOS {
            let base_price = scenario_base_price(scenario, price_spec);
            let suggestions = slot_emphases
                .iter()
                .enumerate()
                .map(|(slot, emphasis)| {
                    build_suggestion(
                        scenario,
                        *emphasis,
                        slot,
                        base_price,
                        price_spec,
                        &terms,
                        request.delivery,
                        request.base_date,
                    )
                })
                .collect();
            by_scenario.insert(scenario, suggestions);
        }
        Ok(ScenarioSuggestions { by_scenario })
    }
}

fn price_parameter(config: &NegotiationConfig) -> Result<&NumericSpec, ConfigError> {
    if let Some(ParameterSpec::Numeric(spec)) = config.parameters.get("unit_price") {
        return Ok(spec);
    }
    config
        .parameters
        .values()
        .find_map(|spec| match spec {
            ParameterSpec::Numeric(numeric) => Some(numeric),
            ParameterSpec::Categorical(_) => None,
        })
        .ok_or_else(|| ConfigError::Parameter {
            name: "unit_price".to_owned(),
            message: "scenario suggestions need a numeric price parameter".to_owned(),
        })
}

fn terms_options(config: &NegotiationConfig) -> Vec<String> {
    match config.parameters.get("payment_terms") {
        Some(ParameterSpec::Categorical(CategoricalSpec { options, .. })) if !options.is_empty() => {
            options.clone()
        }
        _ => vec!["Net 60".to_owned(), "Net 30".to_owned(), "Net 15".to_owned()],
    }
}

fn scenario_base_price(scenario: Scenario, spec: &NumericSpec) -> Decimal {
    let half_step = spec.concession_step / Decimal::from(2);
    match scenario {
        Scenario::Hard => spec.anchor,
        Scenario::Medium => step_toward(spec.target, spec.anchor, half_step),
        Scenario::Soft => spec.target,
        Scenario::WalkAway => spec.max_acceptable,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_suggestion(
    scenario: Scenario,
    emphasis: Emphasis,
    slot: usize,
    base_price: Decimal,
    price_spec: &NumericSpec,
    terms: &[String],
    delivery: DeliveryConfig,
    base_date: Option<NaiveDate>,
) -> StructuredSuggestion {
    let quarter_step = price_spec.concession_step / Decimal::from(4);
    let slot_factor = Decimal::from(slot as u32 + 1);
    let best_terms = terms.first().cloned().unwrap_or_else(|| "Net 30".to_owned());
    let standard_terms = terms.get(terms.len() / 2).cloned().unwrap_or_else(|| best_terms.clone());

    let (price, payment_terms, delivery_days) = match emphasis {
        Emphasis::Price => {
            // hold the number; flex delivery a touch per slot
            let price = step_toward(base_price, price_spec.anchor, quarter_step * slot_factor);
            let days = delivery.standard_days.saturating_sub(slot as u32).max(delivery.minimum_days);
            (price, standard_terms, days)
        }
        Emphasis::Terms => {
            // concede a little price per slot in exchange for the best terms
            let price =
                step_toward(base_price, price_spec.max_acceptable, quarter_step * slot_factor);
            (price, best_terms, delivery.standard_days)
        }
        Emphasis::Delivery => {
            let days = (delivery.minimum_days + slot as u32).min(delivery.maximum_days);
            (base_price, standard_terms, days)
        }
        Emphasis::Value => {
            let price = step_toward(
                base_price,
                price_spec.max_acceptable,
                quarter_step * Decimal::from(2),
            );
            let days = delivery.maximum_days.saturating_sub(slot as u32).max(delivery.minimum_days);
            (price, best_terms, days)
        }
    };

    let delivery_date = base_date.map(|date| date + Duration::days(i64::from(delivery_days)));
    let message = suggestion_message(scenario, emphasis, price, &payment_terms, delivery_days);

    StructuredSuggestion { message, price, payment_terms, delivery_date, delivery_days, emphasis }
}

fn scenario_tone(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Hard => "Holding firm:",
        Scenario::Medium => "Meeting partway:",
        Scenario::Soft => "Staying flexible:",
        Scenario::WalkAway => "Last position before we walk:",
    }
}

fn suggestion_message(
    scenario: Scenario,
    emphasis: Emphasis,
    price: Decimal,
    terms: &str,
    days: u32,
) -> String {
    let tone = scenario_tone(scenario);
    match emphasis {
        Emphasis::Price => format!(
            "{tone} {price} per unit on {terms}, delivery in {days} days. The number is the priority here."
        ),
        Emphasis::Terms => format!(
            "{tone} {price} per unit works if we land {terms}. Payment flexibility carries this one."
        ),
        Emphasis::Delivery => format!(
            "{tone} {price} per unit on {terms}, and we pull delivery in to {days} days."
        ),
        Emphasis::Value => format!(
            "{tone} the full package of {price} per unit, {terms}, delivery within {days} days is where the value sits."
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::NegotiationConfig;

    fn request(config: &NegotiationConfig, emphases: Vec<Emphasis>) -> SuggestionRequest<'_> {
        SuggestionRequest {
            config,
            delivery: DeliveryConfig::default(),
            emphases,
            base_date: None,
        }
    }

    #[test]
    fn every_bucket_has_exactly_four_suggestions() {
        let config = NegotiationConfig::sample();
        let suggestions =
            ScenarioSuggestionEngine::new().generate(&request(&config, Vec::new())).unwrap();

        for scenario in SCENARIOS {
            let bucket = suggestions.get(scenario);
            assert_eq!(bucket.len(), SUGGESTIONS_PER_SCENARIO, "{scenario:?}");
            for suggestion in bucket {
                assert!(EMPHASES.contains(&suggestion.emphasis));
                assert!(!suggestion.message.is_empty());
            }
        }
    }

    #[test]
    fn unfiltered_buckets_cover_all_four_emphases() {
        let config = NegotiationConfig::sample();
        let suggestions =
            ScenarioSuggestionEngine::new().generate(&request(&config, Vec::new())).unwrap();

        let emphases: BTreeSet<Emphasis> =
            suggestions.get(Scenario::Medium).iter().map(|s| s.emphasis).collect();
        assert_eq!(emphases.len(), 4);
    }

    #[test]
    fn bucket_base_prices_sit_at_distinct_range_points() {
        let config = NegotiationConfig::sample();
        let suggestions =
            ScenarioSuggestionEngine::new().generate(&request(&config, Vec::new())).unwrap();

        // the delivery-emphasis slot carries the unperturbed base price
        let base_of = |scenario| {
            suggestions
                .get(scenario)
                .iter()
                .find(|s| s.emphasis == Emphasis::Delivery)
                .map(|s| s.price)
                .expect("delivery slot")
        };
        assert_eq!(base_of(Scenario::Hard), Decimal::from(85));
        assert_eq!(base_of(Scenario::Medium), "97.5".parse().unwrap());
        assert_eq!(base_of(Scenario::Soft), Decimal::from(100));
        assert_eq!(base_of(Scenario::WalkAway), Decimal::from(120));
    }

    #[test]
    fn emphasis_filter_regenerates_all_slots_with_requested_emphases() {
        let config = NegotiationConfig::sample();
        let suggestions = ScenarioSuggestionEngine::new()
            .generate(&request(&config, vec![Emphasis::Delivery]))
            .unwrap();

        for scenario in SCENARIOS {
            let bucket = suggestions.get(scenario);
            assert_eq!(bucket.len(), SUGGESTIONS_PER_SCENARIO);
            assert!(bucket.iter().all(|s| s.emphasis == Emphasis::Delivery));
            // same emphasis, still four distinct trade-offs
            let days: BTreeSet<u32> = bucket.iter().map(|s| s.delivery_days).collect();
            assert_eq!(days.len(), 4);
        }
    }

    #[test]
    fn blended_emphases_share_slots_with_equal_priority() {
        let config = NegotiationConfig::sample();
        let suggestions = ScenarioSuggestionEngine::new()
            .generate(&request(&config, vec![Emphasis::Terms, Emphasis::Price]))
            .unwrap();

        let bucket = suggestions.get(Scenario::Soft);
        let price_count = bucket.iter().filter(|s| s.emphasis == Emphasis::Price).count();
        let terms_count = bucket.iter().filter(|s| s.emphasis == Emphasis::Terms).count();
        assert_eq!(price_count, 2);
        assert_eq!(terms_count, 2);
    }

    #[test]
    fn generation_is_deterministic() {
        let config = NegotiationConfig::sample();
        let engine = ScenarioSuggestionEngine::new();
        let first = engine.generate(&request(&config, vec![Emphasis::Value])).unwrap();
        let second = engine.generate(&request(&config, vec![Emphasis::Value])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn base_date_fills_delivery_dates() {
        let config = NegotiationConfig::sample();
        let mut req = request(&config, Vec::new());
        req.base_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        let suggestions = ScenarioSuggestionEngine::new().generate(&req).unwrap();

        for suggestion in suggestions.get(Scenario::Hard) {
            let expected = req.base_date.unwrap() + Duration::days(i64::from(suggestion.delivery_days));
            assert_eq!(suggestion.delivery_date, Some(expected));
        }
    }

    #[test]
    fn config_without_numeric_price_is_rejected() {
        let mut utility = std::collections::BTreeMap::new();
        utility.insert("Net 30".to_owned(), 1.0);
        let mut parameters = std::collections::BTreeMap::new();
        parameters.insert(
            "payment_terms".to_owned(),
            ParameterSpec::Categorical(CategoricalSpec {
                weight: 1.0,
                options: vec!["Net 30".to_owned()],
                utility,
            }),
        );
        let config = NegotiationConfig::new(parameters, 0.7, 0.45, 6).unwrap();
        let result = ScenarioSuggestionEngine::new().generate(&request(&config, Vec::new()));
        assert!(matches!(result, Err(ConfigError::Parameter { .. })));
    }
}

//! The negotiation state-transition function.
//!
//! One transition per completed round, with a fixed priority order:
//! clarify, accept, walk away, escalate, counter. Ties at a threshold
//! resolve toward continuing negotiation: accept at exactly the accept
//! threshold, counter (not walk-away) at exactly the walkaway threshold.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::config::{NegotiationConfig, ParameterSpec};
use crate::domain::decision::{Decision, DecisionAction};
use crate::domain::offer::{Offer, ParameterValue};
use crate::scoring::UtilityScorer;

/// History-derived inputs the persistence collaborator supplies alongside
/// the latest offer. The engine never re-derives these.
#[derive(Clone, Debug, Default)]
pub struct DecisionInputs {
    /// 1-based round for the transition being computed.
    pub round: u32,
    /// The counter-offer from the previous agent message, if any.
    /// Concessions step from here; the anchor seeds the first counter.
    pub last_counter: Option<Offer>,
    /// Categorical options the vendor has already turned down, per
    /// parameter name.
    pub rejected_options: BTreeMap<String, BTreeSet<String>>,
}

impl DecisionInputs {
    pub fn for_round(round: u32) -> Self {
        Self { round, ..Self::default() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecisionEngine {
    scorer: UtilityScorer,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self { scorer: UtilityScorer::new() }
    }

    pub fn decide(
        &self,
        config: &NegotiationConfig,
        offer: &Offer,
        inputs: &DecisionInputs,
    ) -> Decision {
        let values = offer.parameter_values();
        let scored = self.scorer.score(config, &values);

        if scored.observed_count == 0 {
            return Decision {
                action: DecisionAction::AskClarify,
                utility_score: None,
                counter_offer: None,
            };
        }

        let total = scored.total;
        if total >= config.accept_threshold {
            return Decision {
                action: DecisionAction::Accept,
                utility_score: Some(total),
                counter_offer: Some(offer.clone()),
            };
        }
        if total < config.walkaway_threshold {
            return Decision {
                action: DecisionAction::WalkAway,
                utility_score: Some(total),
                counter_offer: None,
            };
        }
        if inputs.round >= config.max_rounds {
            return Decision {
                action: DecisionAction::Escalate,
                utility_score: Some(total),
                counter_offer: inputs.last_counter.clone(),
            };
        }

        let counter_values = self.next_counter_values(config, inputs);
        if self.offer_dominates_counter(config, &values, &counter_values) {
            return Decision {
                action: DecisionAction::Accept,
                utility_score: Some(total),
                counter_offer: Some(offer.clone()),
            };
        }

        Decision {
            action: DecisionAction::Counter,
            utility_score: Some(total),
            counter_offer: Some(Offer::from_parameter_values(&counter_values)),
        }
    }

    /// Numeric parameters move one concession step from the previous
    /// counter (anchor when none) toward target, never crossing it, and
    /// therefore never crossing max_acceptable. Categorical parameters
    /// pick the best option the vendor has not yet rejected.
    fn next_counter_values(
        &self,
        config: &NegotiationConfig,
        inputs: &DecisionInputs,
    ) -> BTreeMap<String, ParameterValue> {
        let previous = inputs
            .last_counter
            .as_ref()
            .map(Offer::parameter_values)
            .unwrap_or_default();

        let mut counter = BTreeMap::new();
        for (name, spec) in &config.parameters {
            match spec {
                ParameterSpec::Numeric(numeric) => {
                    let base = match previous.get(name) {
                        Some(ParameterValue::Numeric(value)) => *value,
                        _ => numeric.anchor,
                    };
                    let next = step_toward(base, numeric.target, numeric.concession_step);
                    counter.insert(name.clone(), ParameterValue::Numeric(next));
                }
                ParameterSpec::Categorical(categorical) => {
                    let rejected = inputs.rejected_options.get(name);
                    let choice = categorical
                        .options
                        .iter()
                        .find(|option| {
                            rejected.map_or(true, |set| !set.contains(option.as_str()))
                        })
                        .or_else(|| categorical.options.last());
                    if let Some(option) = choice {
                        counter
                            .insert(name.clone(), ParameterValue::Categorical(option.clone()));
                    }
                }
            }
        }
        counter
    }

    /// Counter-dominance clamp: when the vendor's offer is already at
    /// least as favorable as the counter we would send, countering would
    /// ask the vendor to move to something we like less. Applies only when
    /// the vendor's offer covers every configured parameter.
    fn offer_dominates_counter(
        &self,
        config: &NegotiationConfig,
        offer_values: &BTreeMap<String, ParameterValue>,
        counter_values: &BTreeMap<String, ParameterValue>,
    ) -> bool {
        for (name, spec) in &config.parameters {
            let Some(observed) = offer_values.get(name) else {
                return false;
            };
            let offered = self.scorer.parameter_utility(spec, Some(observed));
            let countered = self.scorer.parameter_utility(spec, counter_values.get(name));
            if offered < countered {
                return false;
            }
        }
        true
    }
}

/// Move `base` one `step` toward `target`, never crossing it.
pub fn step_toward(base: Decimal, target: Decimal, step: Decimal) -> Decimal {
    if base <= target {
        (base + step).min(target)
    } else {
        (base - step).max(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoricalSpec, Direction, NegotiationConfig, NumericSpec, ParameterSpec};

    fn engine() -> DecisionEngine {
        DecisionEngine::new()
    }

    fn price_offer(price: i64) -> Offer {
        Offer { unit_price: Some(Decimal::from(price)), ..Offer::default() }
    }

    #[test]
    fn scenario_a_accepts_favorable_price() {
        let config = NegotiationConfig::sample();
        let decision =
            engine().decide(&config, &price_offer(90), &DecisionInputs::for_round(1));

        assert_eq!(decision.action, DecisionAction::Accept);
        let utility = decision.utility_score.expect("scored");
        assert!((utility - 30.0 / 35.0).abs() < 1e-9);
        // accept echoes the vendor offer unchanged
        assert_eq!(decision.counter_offer, Some(price_offer(90)));
    }

    #[test]
    fn scenario_b_walks_away_below_threshold() {
        let config = NegotiationConfig::sample();
        let decision =
            engine().decide(&config, &price_offer(118), &DecisionInputs::for_round(1));

        assert_eq!(decision.action, DecisionAction::WalkAway);
        let utility = decision.utility_score.expect("scored");
        assert!((utility - 2.0 / 35.0).abs() < 1e-9);
        assert_eq!(decision.counter_offer, None);
    }

    #[test]
    fn scenario_c_counters_between_thresholds() {
        // price 100 scores 20/35 ~= 0.571, between 0.45 and 0.70
        let config = NegotiationConfig::sample();
        let decision =
            engine().decide(&config, &price_offer(100), &DecisionInputs::for_round(3));

        assert_eq!(decision.action, DecisionAction::Counter);
        let counter = decision.counter_offer.expect("counter offer");
        // first counter steps one concession from the anchor toward target
        assert_eq!(counter.unit_price, Some(Decimal::from(90)));
    }

    #[test]
    fn counter_steps_from_previous_counter_and_stops_at_target() {
        let config = NegotiationConfig::sample();
        let mut inputs = DecisionInputs::for_round(4);
        inputs.last_counter = Some(price_offer(98));

        let decision = engine().decide(&config, &price_offer(102), &inputs);
        assert_eq!(decision.action, DecisionAction::Counter);
        let counter = decision.counter_offer.expect("counter offer");
        // 98 + 5 clamps at the 100 target, never crossing max_acceptable
        assert_eq!(counter.unit_price, Some(Decimal::from(100)));
    }

    #[test]
    fn accept_boundary_resolves_toward_accepting() {
        // utility == accept_threshold exactly: 120 - 0.7*35 = 95.5
        let config = NegotiationConfig::sample();
        let offer = Offer {
            unit_price: Some("95.5".parse().unwrap()),
            ..Offer::default()
        };
        let decision = engine().decide(&config, &offer, &DecisionInputs::for_round(1));
        assert_eq!(decision.action, DecisionAction::Accept);
    }

    #[test]
    fn walkaway_boundary_resolves_toward_countering() {
        // utility == walkaway_threshold exactly: 120 - 0.45*35 = 104.25
        let config = NegotiationConfig::sample();
        let offer = Offer {
            unit_price: Some("104.25".parse().unwrap()),
            ..Offer::default()
        };
        let decision = engine().decide(&config, &offer, &DecisionInputs::for_round(1));
        assert_eq!(decision.action, DecisionAction::Counter);
    }

    #[test]
    fn exhaustion_escalates_instead_of_countering() {
        let config = NegotiationConfig::sample();
        let mut inputs = DecisionInputs::for_round(6);
        inputs.last_counter = Some(price_offer(95));

        let decision = engine().decide(&config, &price_offer(100), &inputs);
        assert_eq!(decision.action, DecisionAction::Escalate);
        // escalate carries the last computed counter
        assert_eq!(decision.counter_offer, Some(price_offer(95)));
    }

    #[test]
    fn unscoreable_offer_asks_for_clarification() {
        let config = NegotiationConfig::sample();
        let decision =
            engine().decide(&config, &Offer::default(), &DecisionInputs::for_round(1));

        assert_eq!(decision.action, DecisionAction::AskClarify);
        assert_eq!(decision.utility_score, None);
        assert_eq!(decision.counter_offer, None);

        // quantity alone is not a configured parameter either
        let offer = Offer { quantity: Some(500), ..Offer::default() };
        let decision = engine().decide(&config, &offer, &DecisionInputs::for_round(1));
        assert_eq!(decision.action, DecisionAction::AskClarify);
    }

    #[test]
    fn categorical_counter_skips_rejected_options() {
        let mut utility = BTreeMap::new();
        utility.insert("Net 90".to_owned(), 1.0);
        utility.insert("Net 60".to_owned(), 0.6);
        utility.insert("Net 30".to_owned(), 0.2);
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "unit_price".to_owned(),
            ParameterSpec::Numeric(NumericSpec {
                weight: 0.7,
                direction: Direction::Minimize,
                anchor: Decimal::from(85),
                target: Decimal::from(100),
                max_acceptable: Decimal::from(120),
                concession_step: Decimal::from(5),
            }),
        );
        parameters.insert(
            "payment_terms".to_owned(),
            ParameterSpec::Categorical(CategoricalSpec {
                weight: 0.3,
                options: vec!["Net 90".to_owned(), "Net 60".to_owned(), "Net 30".to_owned()],
                utility,
            }),
        );
        let config = NegotiationConfig::new(parameters, 0.9, 0.1, 6).unwrap();

        let mut inputs = DecisionInputs::for_round(2);
        inputs
            .rejected_options
            .entry("payment_terms".to_owned())
            .or_default()
            .insert("Net 90".to_owned());

        let offer = Offer {
            unit_price: Some(Decimal::from(100)),
            payment_terms: Some("Net 30".to_owned()),
            ..Offer::default()
        };
        let decision = engine().decide(&config, &offer, &inputs);
        assert_eq!(decision.action, DecisionAction::Counter);
        let counter = decision.counter_offer.expect("counter offer");
        assert_eq!(counter.payment_terms.as_deref(), Some("Net 60"));
    }

    #[test]
    fn vendor_offer_better_than_counter_short_circuits_to_accept() {
        // high accept threshold keeps the raw score in counter territory,
        // but the vendor's 88 beats the 90 we would counter with
        let mut config = NegotiationConfig::sample();
        config.accept_threshold = 0.95;
        config.walkaway_threshold = 0.10;

        let decision =
            engine().decide(&config, &price_offer(88), &DecisionInputs::for_round(2));
        assert_eq!(decision.action, DecisionAction::Accept);
        assert_eq!(decision.counter_offer, Some(price_offer(88)));
    }

    #[test]
    fn dominance_clamp_requires_full_coverage() {
        let mut utility = BTreeMap::new();
        utility.insert("Net 90".to_owned(), 1.0);
        utility.insert("Net 30".to_owned(), 0.0);
        let mut parameters = NegotiationConfig::sample().parameters;
        parameters.insert(
            "payment_terms".to_owned(),
            ParameterSpec::Categorical(CategoricalSpec {
                weight: 0.5,
                options: vec!["Net 90".to_owned(), "Net 30".to_owned()],
                utility,
            }),
        );
        let config = NegotiationConfig::new(parameters, 0.95, 0.10, 6).unwrap();

        // price beats the would-be counter but terms were never mentioned
        let decision =
            engine().decide(&config, &price_offer(86), &DecisionInputs::for_round(2));
        assert_eq!(decision.action, DecisionAction::Counter);
    }

    #[test]
    fn step_toward_clamps_in_both_directions() {
        assert_eq!(
            step_toward(Decimal::from(85), Decimal::from(100), Decimal::from(5)),
            Decimal::from(90)
        );
        assert_eq!(
            step_toward(Decimal::from(98), Decimal::from(100), Decimal::from(5)),
            Decimal::from(100)
        );
        assert_eq!(
            step_toward(Decimal::from(36), Decimal::from(24), Decimal::from(20)),
            Decimal::from(24)
        );
    }
}

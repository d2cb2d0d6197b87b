//! Audit breakdown of a decision.
//!
//! Pure function of (config, offer, decision): everything here is
//! re-derivable, there is no hidden state, and nothing feeds back into
//! the decision engine.

use crate::config::NegotiationConfig;
use crate::domain::decision::{
    Decision, DecisionAction, Explainability, ParameterBreakdown, ParameterRawValue,
};
use crate::domain::offer::{Offer, ParameterValue};
use crate::scoring::UtilityScorer;

#[derive(Clone, Debug, Default)]
pub struct ExplainabilityBuilder {
    scorer: UtilityScorer,
}

impl ExplainabilityBuilder {
    pub fn new() -> Self {
        Self { scorer: UtilityScorer::new() }
    }

    pub fn build(
        &self,
        config: &NegotiationConfig,
        offer: &Offer,
        decision: &Decision,
    ) -> Explainability {
        let scored = self.scorer.score_offer(config, offer);

        let per_parameter = scored
            .per_parameter
            .into_iter()
            .map(|line| ParameterBreakdown {
                name: line.name,
                raw_value: line.observed.map(|value| match value {
                    ParameterValue::Numeric(numeric) => ParameterRawValue::Numeric(numeric),
                    ParameterValue::Categorical(option) => ParameterRawValue::Categorical(option),
                }),
                utility: line.utility,
                weight: line.weight,
                contribution: line.contribution,
            })
            .collect();

        Explainability {
            per_parameter,
            total_utility: decision.utility_score,
            action: decision.action,
            thresholds_crossed: thresholds_crossed(config, decision),
        }
    }
}

fn thresholds_crossed(config: &NegotiationConfig, decision: &Decision) -> Vec<String> {
    match decision.action {
        DecisionAction::AskClarify => vec!["no_scoreable_fields".to_owned()],
        DecisionAction::Accept => {
            let at_threshold = decision
                .utility_score
                .is_some_and(|total| total >= config.accept_threshold);
            if at_threshold {
                vec!["total>=accept_threshold".to_owned()]
            } else {
                // counter-dominance clamp accepted below the threshold
                vec!["offer_dominates_next_counter".to_owned()]
            }
        }
        DecisionAction::WalkAway => vec!["total<walkaway_threshold".to_owned()],
        DecisionAction::Escalate => vec![
            "walkaway_threshold<=total<accept_threshold".to_owned(),
            "round>=max_rounds".to_owned(),
        ],
        DecisionAction::Counter => {
            vec!["walkaway_threshold<=total<accept_threshold".to_owned()]
        }
    }
}

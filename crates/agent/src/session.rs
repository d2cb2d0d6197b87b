//! Negotiation session orchestration.
//!
//! Message handling is two-phase. Phase one (`record_vendor_message`)
//! persists the vendor message with its extracted offer and invalidates
//! cached suggestions; it never advances the round. Phase two (`respond`
//! or `respond_fallback`) computes the decision, persists the agent
//! message, then advances the round or moves the deal to a terminal
//! status. A crash between the phases leaves a recorded vendor message
//! that phase two can pick up as-is.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parley_core::chrono::Utc;
use parley_core::{
    last_counter_offer, Deal, DealId, DealMessage, DealStatus, DealStore, Decision,
    DecisionAction, DecisionEngine, DecisionInputs, DeliveryConfig, Emphasis, Explainability,
    ExplainabilityBuilder, MessageRole, NegotiationConfig, Offer, OfferExtractor,
    ScenarioSuggestionEngine, ScenarioSuggestions, SessionError, SuggestionCache,
    SuggestionCacheEntry, SuggestionCacheKey, SuggestionRequest, TextSource,
};
use tracing::{info, warn};

use crate::respond::{GeneratedResponse, ResponseContext, ResponseTextGenerator};

/// The outcome of one completed round.
#[derive(Clone, Debug)]
pub struct NegotiationTurn {
    pub decision: Decision,
    pub explainability: Explainability,
    pub response: GeneratedResponse,
    /// The round this turn completed (the value before any advancement).
    pub round: u32,
}

pub struct NegotiationSession {
    store: Arc<dyn DealStore>,
    responder: ResponseTextGenerator,
    suggestion_engine: ScenarioSuggestionEngine,
    suggestion_cache: Arc<SuggestionCache>,
    extractor: OfferExtractor,
    decision_engine: DecisionEngine,
    explain: ExplainabilityBuilder,
    delivery: DeliveryConfig,
}

impl NegotiationSession {
    pub fn new(
        store: Arc<dyn DealStore>,
        responder: ResponseTextGenerator,
        suggestion_cache: Arc<SuggestionCache>,
        delivery: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            responder,
            suggestion_engine: ScenarioSuggestionEngine::new(),
            suggestion_cache,
            extractor: OfferExtractor::new(),
            decision_engine: DecisionEngine::new(),
            explain: ExplainabilityBuilder::new(),
            delivery,
        }
    }

    pub async fn open_deal(
        &self,
        vendor_name: impl Into<String>,
        config: NegotiationConfig,
    ) -> Result<Deal, SessionError> {
        let deal = Deal::new(vendor_name, config);
        self.store.create_deal(deal.clone()).await?;
        info!(
            event_name = "negotiation.session.open",
            deal_id = %deal.id.0,
            vendor = %deal.vendor_name,
            "deal opened"
        );
        Ok(deal)
    }

    /// Phase one: record the vendor message and its extracted offer.
    pub async fn record_vendor_message(
        &self,
        deal_id: &DealId,
        text: &str,
    ) -> Result<Offer, SessionError> {
        let deal = self.open_deal_state(deal_id).await?;
        let offer = self.extractor.extract(text);

        self.store
            .append_message(
                deal_id,
                DealMessage {
                    role: MessageRole::Vendor,
                    content: text.to_owned(),
                    offer: Some(offer.clone()),
                    decision: None,
                    explainability: None,
                    round: deal.current_round,
                    created_at: Utc::now(),
                },
            )
            .await?;

        // stale suggestions would reflect the pre-message state
        self.suggestion_cache.invalidate_deal(deal_id);

        info!(
            event_name = "negotiation.session.vendor_message",
            deal_id = %deal_id.0,
            round = deal.current_round,
            has_price = offer.unit_price.is_some(),
            "vendor message recorded"
        );
        Ok(offer)
    }

    /// Phase two with the text-generation collaborator in the loop.
    pub async fn respond(&self, deal_id: &DealId) -> Result<NegotiationTurn, SessionError> {
        self.respond_inner(deal_id, true).await
    }

    /// Phase two without the collaborator: deterministic template text,
    /// same decision and persistence path.
    pub async fn respond_fallback(
        &self,
        deal_id: &DealId,
    ) -> Result<NegotiationTurn, SessionError> {
        self.respond_inner(deal_id, false).await
    }

    async fn respond_inner(
        &self,
        deal_id: &DealId,
        use_collaborator: bool,
    ) -> Result<NegotiationTurn, SessionError> {
        let mut deal = self.open_deal_state(deal_id).await?;
        let history = self.store.history(deal_id).await?;

        let offer = latest_vendor_offer(&history);
        let inputs = DecisionInputs {
            round: deal.current_round,
            last_counter: last_counter_offer(&history),
            rejected_options: rejected_options(&history),
        };
        let decision = self.decision_engine.decide(&deal.config, &offer, &inputs);
        let explainability = self.explain.build(&deal.config, &offer, &decision);

        let context = ResponseContext {
            config: &deal.config,
            history: &history,
            delivery: self.delivery,
            round: deal.current_round,
            max_rounds: deal.config.max_rounds,
            vendor_name: &deal.vendor_name,
        };
        let response = if use_collaborator {
            self.responder.generate(&decision, &context).await
        } else {
            self.responder.fallback(&decision, &context)
        };

        self.store
            .append_message(
                deal_id,
                DealMessage {
                    role: MessageRole::Agent,
                    content: response.text.clone(),
                    offer: None,
                    decision: Some(decision.clone()),
                    explainability: Some(explainability.clone()),
                    round: deal.current_round,
                    created_at: Utc::now(),
                },
            )
            .await?;

        let completed_round = deal.current_round;
        match terminal_status(decision.action) {
            Some(status) => {
                deal.transition_to(status)?;
                self.store.set_status(deal_id, status).await?;
            }
            None => {
                let new_round = self.store.advance_round(deal_id).await?;
                self.precompute_suggestions(deal_id.clone(), deal.config.clone(), new_round);
            }
        }

        info!(
            event_name = "negotiation.session.respond",
            deal_id = %deal_id.0,
            round = completed_round,
            action = decision.action.as_str(),
            utility = decision.utility_score.unwrap_or(0.0),
            text_source = ?response.source,
            "round completed"
        );
        Ok(NegotiationTurn { decision, explainability, response, round: completed_round })
    }

    /// Cached scenario suggestions for the deal's current round.
    ///
    /// An exact `(deal, round, emphases)` hit is served as-is. A filtered
    /// request can also be satisfied by narrowing a cached all-emphases
    /// entry; only a full miss generates.
    pub async fn suggestions(
        &self,
        deal_id: &DealId,
        emphases: &[Emphasis],
    ) -> Result<ScenarioSuggestions, SessionError> {
        let deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(deal_id.clone()))?;
        let round = deal.current_round;

        let exact = SuggestionCacheKey::new(deal_id.clone(), round, emphases);
        if let Some(entry) = self.suggestion_cache.get(&exact) {
            return Ok(entry.suggestions);
        }

        if !emphases.is_empty() {
            let all = SuggestionCacheKey::all(deal_id.clone(), round);
            if let Some(entry) = self.suggestion_cache.get(&all) {
                let wanted: BTreeSet<Emphasis> = emphases.iter().copied().collect();
                return Ok(entry.suggestions.filter_emphases(&wanted));
            }
        }

        let suggestions = self.suggestion_engine.generate(&SuggestionRequest {
            config: &deal.config,
            delivery: self.delivery,
            emphases: emphases.to_vec(),
            base_date: None,
        })?;
        self.suggestion_cache.insert(
            exact,
            SuggestionCacheEntry::new(suggestions.clone(), TextSource::Fallback, self.delivery),
        );
        Ok(suggestions)
    }

    async fn open_deal_state(&self, deal_id: &DealId) -> Result<Deal, SessionError> {
        let deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(deal_id.clone()))?;
        if deal.status.is_terminal() {
            return Err(SessionError::InvalidState { deal: deal_id.clone(), status: deal.status });
        }
        Ok(deal)
    }

    /// Best-effort warm of the all-emphases entry for the round that just
    /// opened. Failures are logged and swallowed; the request path
    /// regenerates on a miss.
    fn precompute_suggestions(&self, deal_id: DealId, config: NegotiationConfig, round: u32) {
        let cache = Arc::clone(&self.suggestion_cache);
        let engine = self.suggestion_engine.clone();
        let delivery = self.delivery;
        tokio::spawn(async move {
            let request =
                SuggestionRequest { config: &config, delivery, emphases: Vec::new(), base_date: None };
            match engine.generate(&request) {
                Ok(suggestions) => {
                    cache.insert(
                        SuggestionCacheKey::all(deal_id, round),
                        SuggestionCacheEntry::new(suggestions, TextSource::Fallback, delivery),
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "negotiation.session.precompute",
                        deal_id = %deal_id.0,
                        round,
                        error = %error,
                        "suggestion precompute failed"
                    );
                }
            }
        });
    }
}

fn latest_vendor_offer(history: &[DealMessage]) -> Offer {
    history
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Vendor)
        .and_then(|message| message.offer.clone())
        .unwrap_or_default()
}

fn terminal_status(action: DecisionAction) -> Option<DealStatus> {
    match action {
        DecisionAction::Accept => Some(DealStatus::Accepted),
        DecisionAction::WalkAway => Some(DealStatus::WalkedAway),
        DecisionAction::Escalate => Some(DealStatus::Escalated),
        DecisionAction::Counter | DecisionAction::AskClarify => None,
    }
}

/// Categorical options offered in earlier counters count as rejected: the
/// vendor answered them with another round rather than acceptance.
fn rejected_options(history: &[DealMessage]) -> BTreeMap<String, BTreeSet<String>> {
    let mut rejected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for message in history {
        let Some(decision) = &message.decision else { continue };
        if decision.action != DecisionAction::Counter {
            continue;
        }
        if let Some(terms) = decision.counter_offer.as_ref().and_then(|o| o.payment_terms.clone())
        {
            rejected.entry("payment_terms".to_owned()).or_default().insert(terms);
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use parley_core::rust_decimal::Decimal;

    use super::*;

    fn counter_message(terms: &str, round: u32) -> DealMessage {
        DealMessage {
            role: MessageRole::Agent,
            content: "counter".to_owned(),
            offer: None,
            decision: Some(Decision {
                action: DecisionAction::Counter,
                utility_score: Some(0.6),
                counter_offer: Some(Offer {
                    unit_price: Some(Decimal::from(90)),
                    payment_terms: Some(terms.to_owned()),
                    ..Offer::default()
                }),
            }),
            explainability: None,
            round,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn earlier_counter_terms_count_as_rejected() {
        let history =
            vec![counter_message("Net 90", 1), counter_message("Net 60", 2)];
        let rejected = rejected_options(&history);
        let terms = rejected.get("payment_terms").expect("payment_terms bucket");
        assert!(terms.contains("Net 90"));
        assert!(terms.contains("Net 60"));
    }

    #[test]
    fn accept_decisions_do_not_mark_rejections() {
        let mut message = counter_message("Net 60", 1);
        if let Some(decision) = message.decision.as_mut() {
            decision.action = DecisionAction::Accept;
        }
        assert!(rejected_options(&[message]).is_empty());
    }

    #[test]
    fn terminal_mapping_covers_every_action() {
        assert_eq!(terminal_status(DecisionAction::Accept), Some(DealStatus::Accepted));
        assert_eq!(terminal_status(DecisionAction::WalkAway), Some(DealStatus::WalkedAway));
        assert_eq!(terminal_status(DecisionAction::Escalate), Some(DealStatus::Escalated));
        assert_eq!(terminal_status(DecisionAction::Counter), None);
        assert_eq!(terminal_status(DecisionAction::AskClarify), None);
    }

    #[test]
    fn latest_vendor_offer_prefers_newest_message() {
        let older = DealMessage {
            role: MessageRole::Vendor,
            content: "$110 per unit".to_owned(),
            offer: Some(Offer { unit_price: Some(Decimal::from(110)), ..Offer::default() }),
            decision: None,
            explainability: None,
            round: 1,
            created_at: Utc::now(),
        };
        let mut newer = older.clone();
        newer.round = 2;
        newer.offer = Some(Offer { unit_price: Some(Decimal::from(98)), ..Offer::default() });

        let offer = latest_vendor_offer(&[older, newer]);
        assert_eq!(offer.unit_price, Some(Decimal::from(98)));
    }
}

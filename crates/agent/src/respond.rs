//! Decision-to-text generation.
//!
//! The primary path delegates phrasing to the text-generation
//! collaborator, raced against a fixed budget; the loser of the race is
//! abandoned, never retried into state. The fallback path interpolates
//! fixed per-action templates and is fully deterministic, so callers
//! always get a response within the bound.

use std::sync::Arc;
use std::time::Duration;

use parley_core::{
    DealMessage, Decision, DecisionAction, DeliveryConfig, MessageRole, NegotiationConfig, Offer,
    ParameterSpec, TextSource,
};
use tracing::warn;

use crate::llm::{ChatMessage, TargetContext, TextGenClient, TextGenRequest};

pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(8);

#[derive(Clone, Debug)]
pub struct ResponseContext<'a> {
    pub config: &'a NegotiationConfig,
    pub history: &'a [DealMessage],
    pub delivery: DeliveryConfig,
    pub round: u32,
    pub max_rounds: u32,
    pub vendor_name: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub text: String,
    pub source: TextSource,
}

pub struct ResponseTextGenerator {
    client: Arc<dyn TextGenClient>,
    time_budget: Duration,
}

impl ResponseTextGenerator {
    pub fn new(client: Arc<dyn TextGenClient>, time_budget: Duration) -> Self {
        Self { client, time_budget }
    }

    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    /// Race one collaborator call against the budget. `None` means the
    /// collaborator lost (timeout, error, or empty output) and the caller
    /// should take the fallback path; a late response is discarded.
    pub async fn race(&self, request: &TextGenRequest, event: &'static str) -> Option<String> {
        match tokio::time::timeout(self.time_budget, self.client.complete(request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                warn!(event_name = event, "collaborator returned empty text; using fallback");
                None
            }
            Ok(Err(error)) => {
                warn!(event_name = event, error = %error, "collaborator failed; using fallback");
                None
            }
            Err(_) => {
                warn!(
                    event_name = event,
                    budget_ms = self.time_budget.as_millis() as u64,
                    "collaborator timed out; using fallback"
                );
                None
            }
        }
    }

    pub async fn generate(
        &self,
        decision: &Decision,
        context: &ResponseContext<'_>,
    ) -> GeneratedResponse {
        let request = build_request(decision, context, self.time_budget);
        match self.race(&request, "negotiation.respond.collaborator").await {
            Some(text) => GeneratedResponse { text, source: TextSource::Llm },
            None => self.fallback(decision, context),
        }
    }

    /// Deterministic per-action templates. Also the dedicated entry point
    /// for callers that already gave up waiting on the slow phase.
    pub fn fallback(&self, decision: &Decision, context: &ResponseContext<'_>) -> GeneratedResponse {
        GeneratedResponse {
            text: template_text(decision, context),
            source: TextSource::Fallback,
        }
    }
}

fn counter_terms(decision: &Decision, context: &ResponseContext<'_>) -> (String, String, u32) {
    let counter = decision.counter_offer.as_ref();
    let price = counter
        .and_then(|offer| offer.unit_price)
        .map(|price| price.to_string())
        .unwrap_or_else(|| "our target".to_owned());
    let terms = counter
        .and_then(|offer| offer.payment_terms.clone())
        .unwrap_or_else(|| best_terms(context.config));
    let days = counter
        .and_then(|offer| offer.delivery_days)
        .unwrap_or(context.delivery.standard_days);
    (price, terms, days)
}

fn best_terms(config: &NegotiationConfig) -> String {
    match config.parameters.get("payment_terms") {
        Some(ParameterSpec::Categorical(spec)) => {
            spec.options.first().cloned().unwrap_or_else(|| "Net 30".to_owned())
        }
        _ => "Net 30".to_owned(),
    }
}

fn template_text(decision: &Decision, context: &ResponseContext<'_>) -> String {
    match decision.action {
        DecisionAction::Accept => {
            let price = decision
                .counter_offer
                .as_ref()
                .and_then(|offer| offer.unit_price)
                .map(|price| format!(" at {price} per unit"))
                .unwrap_or_default();
            format!(
                "Thanks, {}, we're aligned. We accept the offer{price} and will send the \
                 purchase order for signature today.",
                context.vendor_name
            )
        }
        DecisionAction::Counter => {
            let (price, terms, days) = counter_terms(decision, context);
            format!(
                "We appreciate the movement, but we can't get there as offered. We can do \
                 {price} per unit on {terms} with delivery in {days} days. That's round \
                 {} of {} on our side.",
                context.round, context.max_rounds
            )
        }
        DecisionAction::WalkAway => format!(
            "Thanks for working through this with us, {}. The terms on the table sit outside \
             what we can justify, so we'll have to pass at this level and pursue our \
             alternatives.",
            context.vendor_name
        ),
        DecisionAction::Escalate => format!(
            "We've gone {} rounds without converging, so we're routing this to our sourcing \
             lead for a final call. We'll come back to you within one business day.",
            context.round
        ),
        DecisionAction::AskClarify => {
            "Before we can respond, could you confirm the unit price, payment terms, and \
             delivery timing you're proposing?"
                .to_owned()
        }
    }
}

fn build_request(
    decision: &Decision,
    context: &ResponseContext<'_>,
    time_budget: Duration,
) -> TextGenRequest {
    let mut messages: Vec<ChatMessage> = context
        .history
        .iter()
        .map(|message| ChatMessage {
            role: match message.role {
                MessageRole::Vendor => "user".to_owned(),
                MessageRole::Agent => "assistant".to_owned(),
            },
            content: message.content.clone(),
        })
        .collect();
    messages.push(ChatMessage {
        role: "system".to_owned(),
        content: format!(
            "Write the buyer's next message for a {} decision in round {} of {}. Keep it \
             professional and concrete.",
            decision.action.as_str(),
            context.round,
            context.max_rounds
        ),
    });

    let counter: Option<&Offer> = decision.counter_offer.as_ref();
    TextGenRequest {
        messages,
        target_context: TargetContext {
            price: counter.and_then(|offer| offer.unit_price),
            terms: counter.and_then(|offer| offer.payment_terms.clone()),
            delivery: Some(format!("{} days", context.delivery.standard_days)),
        },
        time_budget,
    }
}

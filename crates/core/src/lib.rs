pub mod config;
pub mod decision;
pub mod domain;
pub mod errors;
pub mod explain;
pub mod extract;
pub mod scoring;
pub mod store;
pub mod suggestions;

pub use config::{
    CategoricalSpec, Direction, NegotiationConfig, NumericSpec, ParameterSpec,
};
pub use decision::{DecisionEngine, DecisionInputs};
pub use domain::deal::{Deal, DealId, DealMessage, DealStatus, MessageRole};
pub use domain::decision::{
    Decision, DecisionAction, Explainability, ParameterBreakdown, ParameterRawValue, TextSource,
};
pub use domain::offer::{Offer, ParameterValue};
pub use errors::{ConfigError, DomainError, SessionError, StoreError};
pub use explain::ExplainabilityBuilder;
pub use extract::OfferExtractor;
pub use scoring::{ScoredOffer, UtilityBand, UtilityScorer};
pub use store::{last_counter_offer, DealStore};
pub use suggestions::{
    DeliveryConfig, Emphasis, Scenario, ScenarioSuggestionEngine, ScenarioSuggestions,
    StructuredSuggestion, SuggestionCache, SuggestionCacheEntry, SuggestionCacheKey,
    SuggestionRequest,
};

// re-export for downstream crates that build on the same time/decimal types
pub use chrono;
pub use rust_decimal;

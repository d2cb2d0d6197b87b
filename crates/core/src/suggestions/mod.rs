//! Scenario-based counter-suggestions with emphasis filtering and a
//! per-round cache.

mod cache;
mod engine;
mod types;

pub use cache::{
    emphasis_key, SuggestionCache, SuggestionCacheEntry, SuggestionCacheKey,
    DEFAULT_SUGGESTION_TTL,
};
pub use engine::{ScenarioSuggestionEngine, SuggestionRequest, SUGGESTIONS_PER_SCENARIO};
pub use types::{
    DeliveryConfig, Emphasis, Scenario, ScenarioSuggestions, StructuredSuggestion, EMPHASES,
    SCENARIOS,
};

//! Injected, explicitly keyed suggestion cache.
//!
//! Entries are created once per `(deal, round, emphasis set)` key and never
//! mutated in place; a new vendor message invalidates the deal's entries
//! wholesale. Round is the partition key, so no entry survives a round
//! boundary. TTL is explicit, not ambient process state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::deal::DealId;
use crate::domain::decision::TextSource;

use super::types::{DeliveryConfig, Emphasis, ScenarioSuggestions};

pub const DEFAULT_SUGGESTION_TTL: Duration = Duration::from_secs(15 * 60);

/// Stable key; `emphasis_key` is `"all"` or the sorted emphases joined
/// with `+` (for example `"delivery+price"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SuggestionCacheKey {
    pub deal_id: DealId,
    pub round: u32,
    pub emphasis_key: String,
}

impl SuggestionCacheKey {
    pub fn new(deal_id: DealId, round: u32, emphases: &[Emphasis]) -> Self {
        Self { deal_id, round, emphasis_key: emphasis_key(emphases) }
    }

    pub fn all(deal_id: DealId, round: u32) -> Self {
        Self { deal_id, round, emphasis_key: "all".to_owned() }
    }
}

pub fn emphasis_key(emphases: &[Emphasis]) -> String {
    if emphases.is_empty() {
        return "all".to_owned();
    }
    let mut sorted: Vec<&str> = emphases.iter().map(|e| e.as_str()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join("+")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCacheEntry {
    pub suggestions: ScenarioSuggestions,
    pub source: TextSource,
    pub delivery_config: DeliveryConfig,
    pub created_at: DateTime<Utc>,
}

impl SuggestionCacheEntry {
    pub fn new(
        suggestions: ScenarioSuggestions,
        source: TextSource,
        delivery_config: DeliveryConfig,
    ) -> Self {
        Self { suggestions, source, delivery_config, created_at: Utc::now() }
    }
}

#[derive(Debug)]
pub struct SuggestionCache {
    ttl: Duration,
    entries: Mutex<HashMap<SuggestionCacheKey, SuggestionCacheEntry>>,
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &SuggestionCacheKey) -> Option<SuggestionCacheEntry> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.get(key) {
            if !self.is_expired(entry, now) {
                return Some(entry.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// First write wins: a concurrent pre-compute racing a fresh request
    /// must not replace an entry that is already being served.
    pub fn insert(&self, key: SuggestionCacheKey, entry: SuggestionCacheEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.entry(key).or_insert(entry);
    }

    /// Drop every entry for the deal, all rounds and emphasis sets.
    pub fn invalidate_deal(&self, deal_id: &DealId) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|key, _| &key.deal_id != deal_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &SuggestionCacheEntry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.created_at);
        age.to_std().map(|age| age > self.ttl).unwrap_or(false)
    }
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn deal() -> DealId {
        DealId("deal-test".to_owned())
    }

    fn entry() -> SuggestionCacheEntry {
        SuggestionCacheEntry::new(
            ScenarioSuggestions::default(),
            TextSource::Fallback,
            DeliveryConfig::default(),
        )
    }

    #[test]
    fn emphasis_key_is_order_insensitive() {
        assert_eq!(emphasis_key(&[]), "all");
        assert_eq!(
            emphasis_key(&[Emphasis::Terms, Emphasis::Price]),
            emphasis_key(&[Emphasis::Price, Emphasis::Terms])
        );
        assert_eq!(emphasis_key(&[Emphasis::Price, Emphasis::Terms]), "price+terms");
    }

    #[test]
    fn entries_partition_by_round() {
        let cache = SuggestionCache::default();
        cache.insert(SuggestionCacheKey::all(deal(), 2), entry());

        assert!(cache.get(&SuggestionCacheKey::all(deal(), 2)).is_some());
        // after advancement to round 3 the round-2 entry is never served
        assert!(cache.get(&SuggestionCacheKey::all(deal(), 3)).is_none());
    }

    #[test]
    fn invalidation_clears_every_key_for_the_deal() {
        let cache = SuggestionCache::default();
        cache.insert(SuggestionCacheKey::all(deal(), 1), entry());
        cache.insert(SuggestionCacheKey::new(deal(), 1, &[Emphasis::Price]), entry());
        cache.insert(SuggestionCacheKey::all(DealId("deal-other".to_owned()), 1), entry());

        cache.invalidate_deal(&deal());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&SuggestionCacheKey::all(DealId("deal-other".to_owned()), 1)).is_some());
    }

    #[test]
    fn first_write_wins() {
        let cache = SuggestionCache::default();
        let key = SuggestionCacheKey::all(deal(), 1);

        let first = entry();
        cache.insert(key.clone(), first.clone());

        let mut second = entry();
        second.source = TextSource::Llm;
        cache.insert(key.clone(), second);

        assert_eq!(cache.get(&key).map(|e| e.source), Some(TextSource::Fallback));
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        let key = SuggestionCacheKey::all(deal(), 1);
        let mut stale = entry();
        stale.created_at = Utc::now() - ChronoDuration::minutes(5);
        cache.insert(key.clone(), stale);

        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }
}

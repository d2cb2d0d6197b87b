//! Free-text offer extraction.
//!
//! Deterministic and idempotent: identical text always yields an identical
//! [`Offer`]. Fields the text does not mention stay `None`; nothing is
//! ever defaulted. No I/O.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::offer::Offer;

/// Payment-term catalog, worst to best day count. Non-catalog day counts
/// round up to the nearest entry; anything above 90 clamps to Net 90.
const NET_TERM_CATALOG: &[u32] = &[15, 30, 60, 90];

#[derive(Clone, Debug, Default)]
pub struct OfferExtractor;

impl OfferExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> Offer {
        let normalized = text.to_lowercase();
        let tokens = tokenize(&normalized);

        let unit_price = extract_price(&tokens);
        let payment_terms = extract_payment_terms(&tokens);
        let delivery_date = extract_absolute_date(&tokens);
        let delivery_days = if delivery_date.is_some() {
            // an absolute date is the more specific form; a bare relative
            // mention does not override it
            None
        } else {
            extract_relative_days(&tokens)
        };
        let quantity = extract_quantity(&tokens);

        Offer { unit_price, payment_terms, delivery_date, delivery_days, quantity }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| ",.;:!?()\"'".contains(c)).to_owned())
        .filter(|token| !token.is_empty())
        .collect()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    cleaned.parse().ok()
}

fn parse_integer(raw: &str) -> Option<u32> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// First monetary amount in the text: `$92`, `$1,250.50`, `usd 92`,
/// `92 dollars`.
fn extract_price(tokens: &[String]) -> Option<Decimal> {
    for (index, token) in tokens.iter().enumerate() {
        if let Some(rest) = token.strip_prefix('$') {
            // "$92/unit" style suffixes
            let amount = rest.split('/').next().unwrap_or(rest);
            if let Some(value) = parse_decimal(amount) {
                return Some(value);
            }
        }
        if token == "usd" {
            if let Some(value) = tokens.get(index + 1).and_then(|next| parse_decimal(next)) {
                return Some(value);
            }
        }
        if let Some(value) = parse_decimal(token) {
            if matches!(tokens.get(index + 1).map(String::as_str), Some("dollars") | Some("usd")) {
                return Some(value);
            }
        }
    }
    None
}

/// Payment-term phrasings: `net N` (also `netN`), `due on receipt`,
/// `cash on delivery`. Non-catalog day counts round up.
fn extract_payment_terms(tokens: &[String]) -> Option<String> {
    for (index, token) in tokens.iter().enumerate() {
        if token == "net" {
            if let Some(days) = tokens.get(index + 1).and_then(|next| parse_integer(next)) {
                return Some(catalog_terms(days));
            }
        }
        if let Some(rest) = token.strip_prefix("net") {
            if let Some(days) = parse_integer(rest) {
                return Some(catalog_terms(days));
            }
        }
        if token == "due" || token == "cash" {
            let next_two = (tokens.get(index + 1).map(String::as_str), tokens.get(index + 2).map(String::as_str));
            if matches!(next_two, (Some("on"), Some("receipt")) | (Some("on"), Some("delivery"))) {
                return Some("Due on receipt".to_owned());
            }
        }
    }
    None
}

fn catalog_terms(days: u32) -> String {
    let rounded = NET_TERM_CATALOG
        .iter()
        .copied()
        .find(|entry| days <= *entry)
        .unwrap_or(*NET_TERM_CATALOG.last().unwrap_or(&90));
    format!("Net {rounded}")
}

/// `in N days` / `within N days` relative delivery expressions.
fn extract_relative_days(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        if token != "in" && token != "within" {
            continue;
        }
        let Some(days) = tokens.get(index + 1).and_then(|next| parse_integer(next)) else {
            continue;
        };
        if tokens.get(index + 2).is_some_and(|unit| unit.starts_with("day")) {
            return Some(days);
        }
    }
    None
}

/// Absolute date expressions: ISO (`2026-09-15`), US slash
/// (`09/15/2026`), or month-name (`september 15 2026` after
/// punctuation stripping).
fn extract_absolute_date(tokens: &[String]) -> Option<NaiveDate> {
    for (index, token) in tokens.iter().enumerate() {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(token, "%m/%d/%Y") {
            return Some(date);
        }
        if let Some(month) = month_number(token) {
            let day = tokens.get(index + 1).and_then(|next| parse_integer(next));
            let year = tokens.get(index + 2).and_then(|next| parse_integer(next));
            if let (Some(day), Some(year)) = (day, year) {
                if (1..=31).contains(&day) && year >= 1970 {
                    if let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) {
                        return Some(date);
                    }
                }
            }
        }
    }
    None
}

fn month_number(token: &str) -> Option<u32> {
    let month = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

const QUANTITY_KEYWORDS: &[&str] = &["unit", "units", "pcs", "pieces", "qty", "quantity", "ea", "each"];

/// Integer adjacent to a unit keyword: `500 units`, `qty 500`,
/// `quantity of 500`.
fn extract_quantity(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        let Some(value) = parse_integer(token) else {
            continue;
        };
        let next_is_keyword = tokens
            .get(index + 1)
            .is_some_and(|next| QUANTITY_KEYWORDS.contains(&next.as_str()));
        let previous = index.checked_sub(1).and_then(|i| tokens.get(i));
        let previous_is_keyword = previous.is_some_and(|prev| {
            QUANTITY_KEYWORDS.contains(&prev.as_str())
                || (prev == "of"
                    && index
                        .checked_sub(2)
                        .and_then(|i| tokens.get(i))
                        .is_some_and(|back| QUANTITY_KEYWORDS.contains(&back.as_str())))
        });
        if next_is_keyword || previous_is_keyword {
            return Some(value);
        }
    }
    None
}

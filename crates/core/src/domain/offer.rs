use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A structured vendor offer extracted from free text. Every field is
/// independently optional: `None` means "not mentioned", never a guess.
/// Immutable once produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub unit_price: Option<Decimal>,
    pub payment_terms: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_days: Option<u32>,
    pub quantity: Option<u32>,
}

/// One observed value for a configured negotiation parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Numeric(Decimal),
    Categorical(String),
}

impl Offer {
    /// Whether the offer mentions anything the scorer could use.
    pub fn is_empty(&self) -> bool {
        self.unit_price.is_none()
            && self.payment_terms.is_none()
            && self.delivery_date.is_none()
            && self.delivery_days.is_none()
            && self.quantity.is_none()
    }

    /// Observed values keyed by canonical parameter name. Weighted-mode
    /// callers may extend the map with extra observations (lateness,
    /// warranty, penalty caps) before scoring; the scorer treats all
    /// entries uniformly.
    pub fn parameter_values(&self) -> BTreeMap<String, ParameterValue> {
        let mut values = BTreeMap::new();
        if let Some(price) = self.unit_price {
            values.insert("unit_price".to_owned(), ParameterValue::Numeric(price));
        }
        if let Some(terms) = &self.payment_terms {
            values.insert("payment_terms".to_owned(), ParameterValue::Categorical(terms.clone()));
        }
        if let Some(days) = self.delivery_days {
            values
                .insert("delivery_days".to_owned(), ParameterValue::Numeric(Decimal::from(days)));
        }
        values
    }

    /// Rebuild an offer shape from counter values produced by the decision
    /// engine. Parameter names outside the standard offer fields are
    /// dropped; they only exist for weighted scoring.
    pub fn from_parameter_values(values: &BTreeMap<String, ParameterValue>) -> Self {
        let mut offer = Offer::default();
        for (name, value) in values {
            match (name.as_str(), value) {
                ("unit_price", ParameterValue::Numeric(price)) => {
                    offer.unit_price = Some(*price);
                }
                ("payment_terms", ParameterValue::Categorical(terms)) => {
                    offer.payment_terms = Some(terms.clone());
                }
                ("delivery_days", ParameterValue::Numeric(days)) => {
                    offer.delivery_days = days.round().to_u32();
                }
                _ => {}
            }
        }
        offer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_offer_has_no_parameter_values() {
        let offer = Offer::default();
        assert!(offer.is_empty());
        assert!(offer.parameter_values().is_empty());
    }

    #[test]
    fn parameter_values_round_trip_standard_fields() {
        let offer = Offer {
            unit_price: Some(Decimal::from(92)),
            payment_terms: Some("Net 60".to_owned()),
            delivery_days: Some(20),
            delivery_date: None,
            quantity: Some(500),
        };

        let rebuilt = Offer::from_parameter_values(&offer.parameter_values());
        assert_eq!(rebuilt.unit_price, offer.unit_price);
        assert_eq!(rebuilt.payment_terms, offer.payment_terms);
        assert_eq!(rebuilt.delivery_days, offer.delivery_days);
        // quantity and absolute dates are not negotiation parameters
        assert_eq!(rebuilt.quantity, None);
    }
}

//! Canonical negotiation configuration.
//!
//! Historical deployments stored negotiation settings in three different
//! shapes (flat "legacy" price bounds, a "weighted" multi-parameter map,
//! and the setup-wizard step output). Each shape gets exactly one adapter
//! that normalizes into [`NegotiationConfig`] at the boundary; the engine
//! itself never branches on config shape.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Lower is better for our side (unit price, delivery days).
    Minimize,
    /// Higher is better for our side (warranty months, penalty cap).
    Maximize,
}

/// Numeric parameter bounds. `anchor` is the most favorable value for our
/// side (utility 1), `max_acceptable` the worst tolerable (utility 0),
/// `target` the midpoint that seeds counter-offers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericSpec {
    pub weight: f64,
    pub direction: Direction,
    pub anchor: Decimal,
    pub target: Decimal,
    pub max_acceptable: Decimal,
    pub concession_step: Decimal,
}

/// Categorical parameter: options ordered best-to-worst for our side, with
/// a utility table in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSpec {
    pub weight: f64,
    pub options: Vec<String>,
    pub utility: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterSpec {
    Numeric(NumericSpec),
    Categorical(CategoricalSpec),
}

impl ParameterSpec {
    pub fn weight(&self) -> f64 {
        match self {
            ParameterSpec::Numeric(spec) => spec.weight,
            ParameterSpec::Categorical(spec) => spec.weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub accept_threshold: f64,
    pub walkaway_threshold: f64,
    pub max_rounds: u32,
}

impl NegotiationConfig {
    /// Build and validate in one step. Configuration problems are fatal
    /// here so the decision engine can assume a well-formed config.
    pub fn new(
        parameters: BTreeMap<String, ParameterSpec>,
        accept_threshold: f64,
        walkaway_threshold: f64,
        max_rounds: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self { parameters, accept_threshold, walkaway_threshold, max_rounds };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accept_threshold <= self.walkaway_threshold {
            return Err(ConfigError::ThresholdOrder {
                accept: format!("{:.2}", self.accept_threshold),
                walkaway: format!("{:.2}", self.walkaway_threshold),
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::MaxRounds);
        }
        if self.parameters.is_empty() {
            return Err(ConfigError::Empty);
        }

        for (name, spec) in &self.parameters {
            match spec {
                ParameterSpec::Numeric(numeric) => validate_numeric(name, numeric)?,
                ParameterSpec::Categorical(categorical) => validate_categorical(name, categorical)?,
            }
        }
        Ok(())
    }

    /// Load the canonical shape from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: NegotiationConfig =
            toml::from_str(source).map_err(|err| ConfigError::Source(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Source(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Price-only config used across unit tests: anchor 85, target 100,
    /// max acceptable 120, thresholds 0.70 / 0.45, six rounds.
    pub fn sample() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "unit_price".to_owned(),
            ParameterSpec::Numeric(NumericSpec {
                weight: 1.0,
                direction: Direction::Minimize,
                anchor: Decimal::from(85),
                target: Decimal::from(100),
                max_acceptable: Decimal::from(120),
                concession_step: Decimal::from(5),
            }),
        );
        Self { parameters, accept_threshold: 0.70, walkaway_threshold: 0.45, max_rounds: 6 }
    }
}

fn validate_numeric(name: &str, spec: &NumericSpec) -> Result<(), ConfigError> {
    let err = |message: &str| ConfigError::Parameter {
        name: name.to_owned(),
        message: message.to_owned(),
    };

    if !(spec.weight > 0.0) {
        return Err(err("weight must be positive"));
    }
    if spec.concession_step <= Decimal::ZERO {
        return Err(err("concession_step must be positive"));
    }
    let ordered = match spec.direction {
        Direction::Minimize => {
            spec.anchor <= spec.target && spec.target <= spec.max_acceptable
                && spec.anchor < spec.max_acceptable
        }
        Direction::Maximize => {
            spec.anchor >= spec.target && spec.target >= spec.max_acceptable
                && spec.anchor > spec.max_acceptable
        }
    };
    if !ordered {
        return Err(err("anchor, target and max_acceptable are not ordered for the direction"));
    }
    Ok(())
}

fn validate_categorical(name: &str, spec: &CategoricalSpec) -> Result<(), ConfigError> {
    let err = |message: String| ConfigError::Parameter { name: name.to_owned(), message };

    if !(spec.weight > 0.0) {
        return Err(err("weight must be positive".to_owned()));
    }
    if spec.options.is_empty() {
        return Err(err("options must not be empty".to_owned()));
    }
    for option in &spec.options {
        match spec.utility.get(option) {
            Some(utility) if (0.0..=1.0).contains(utility) => {}
            Some(utility) => {
                return Err(err(format!("utility {utility} for option `{option}` outside [0, 1]")));
            }
            None => return Err(err(format!("option `{option}` has no utility entry"))),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Adapters for historical config sources
// ---------------------------------------------------------------------------

/// Flat price-only shape from the first deployment.
#[derive(Debug, Deserialize)]
pub struct LegacyConfig {
    pub anchor_price: Decimal,
    pub target_price: Decimal,
    pub max_price: Decimal,
    #[serde(default = "default_step")]
    pub step: Decimal,
    pub accept_score: f64,
    pub walkaway_score: f64,
    pub rounds: u32,
}

fn default_step() -> Decimal {
    Decimal::from(5)
}

impl LegacyConfig {
    pub fn into_config(self) -> Result<NegotiationConfig, ConfigError> {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "unit_price".to_owned(),
            ParameterSpec::Numeric(NumericSpec {
                weight: 1.0,
                direction: Direction::Minimize,
                anchor: self.anchor_price,
                target: self.target_price,
                max_acceptable: self.max_price,
                concession_step: self.step,
            }),
        );
        NegotiationConfig::new(parameters, self.accept_score, self.walkaway_score, self.rounds)
    }
}

/// Multi-parameter "weighted" shape: already close to canonical, but keys
/// weights separately from bounds.
#[derive(Debug, Deserialize)]
pub struct WeightedConfig {
    pub weights: BTreeMap<String, f64>,
    pub numeric: BTreeMap<String, WeightedNumericBounds>,
    #[serde(default)]
    pub categorical: BTreeMap<String, WeightedCategorical>,
    pub accept_threshold: f64,
    pub walkaway_threshold: f64,
    pub max_rounds: u32,
}

#[derive(Debug, Deserialize)]
pub struct WeightedNumericBounds {
    pub direction: Direction,
    pub anchor: Decimal,
    pub target: Decimal,
    pub max_acceptable: Decimal,
    pub concession_step: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WeightedCategorical {
    pub options: Vec<String>,
    pub utility: BTreeMap<String, f64>,
}

impl WeightedConfig {
    pub fn into_config(self) -> Result<NegotiationConfig, ConfigError> {
        let mut parameters = BTreeMap::new();
        for (name, bounds) in self.numeric {
            let weight = self.weights.get(&name).copied().ok_or_else(|| {
                ConfigError::Parameter {
                    name: name.clone(),
                    message: "missing weight entry".to_owned(),
                }
            })?;
            parameters.insert(
                name,
                ParameterSpec::Numeric(NumericSpec {
                    weight,
                    direction: bounds.direction,
                    anchor: bounds.anchor,
                    target: bounds.target,
                    max_acceptable: bounds.max_acceptable,
                    concession_step: bounds.concession_step,
                }),
            );
        }
        for (name, categorical) in self.categorical {
            let weight = self.weights.get(&name).copied().ok_or_else(|| {
                ConfigError::Parameter {
                    name: name.clone(),
                    message: "missing weight entry".to_owned(),
                }
            })?;
            parameters.insert(
                name,
                ParameterSpec::Categorical(CategoricalSpec {
                    weight,
                    options: categorical.options,
                    utility: categorical.utility,
                }),
            );
        }
        NegotiationConfig::new(
            parameters,
            self.accept_threshold,
            self.walkaway_threshold,
            self.max_rounds,
        )
    }
}

/// Output of the interactive setup wizard: pricing and terms answers keyed
/// by step name, with wizard defaults for anything the user skipped.
#[derive(Debug, Deserialize)]
pub struct WizardConfig {
    pub pricing: WizardPricing,
    #[serde(default)]
    pub terms: Option<WizardTerms>,
    #[serde(default)]
    pub delivery: Option<WizardDelivery>,
    #[serde(default = "WizardConfig::default_rounds")]
    pub rounds: u32,
}

#[derive(Debug, Deserialize)]
pub struct WizardPricing {
    pub best_price: Decimal,
    pub walk_away_price: Decimal,
    #[serde(default)]
    pub target_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct WizardTerms {
    pub preferred: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WizardDelivery {
    pub ideal_days: u32,
    pub latest_days: u32,
}

impl WizardConfig {
    fn default_rounds() -> u32 {
        6
    }

    pub fn into_config(self) -> Result<NegotiationConfig, ConfigError> {
        let anchor = self.pricing.best_price;
        let max_acceptable = self.pricing.walk_away_price;
        let target = self
            .pricing
            .target_price
            .unwrap_or_else(|| (anchor + max_acceptable) / Decimal::from(2));
        let step =
            ((target - anchor) / Decimal::from(4)).abs().max(Decimal::ONE);

        let mut parameters = BTreeMap::new();
        parameters.insert(
            "unit_price".to_owned(),
            ParameterSpec::Numeric(NumericSpec {
                weight: 0.6,
                direction: Direction::Minimize,
                anchor,
                target,
                max_acceptable,
                concession_step: step,
            }),
        );

        if let Some(terms) = self.terms {
            let count = terms.preferred.len().max(1);
            let utility = terms
                .preferred
                .iter()
                .enumerate()
                .map(|(index, option)| {
                    let value = if count == 1 {
                        1.0
                    } else {
                        1.0 - index as f64 / (count - 1) as f64
                    };
                    (option.clone(), value)
                })
                .collect();
            parameters.insert(
                "payment_terms".to_owned(),
                ParameterSpec::Categorical(CategoricalSpec {
                    weight: 0.25,
                    options: terms.preferred,
                    utility,
                }),
            );
        }

        if let Some(delivery) = self.delivery {
            let anchor = Decimal::from(delivery.ideal_days);
            let max_acceptable = Decimal::from(delivery.latest_days);
            let target = (anchor + max_acceptable) / Decimal::from(2);
            parameters.insert(
                "delivery_days".to_owned(),
                ParameterSpec::Numeric(NumericSpec {
                    weight: 0.15,
                    direction: Direction::Minimize,
                    anchor,
                    target,
                    max_acceptable,
                    concession_step: Decimal::from(3),
                }),
            );
        }

        NegotiationConfig::new(parameters, 0.70, 0.45, self.rounds)
    }
}

/// Parse one historical JSON source into the canonical config.
pub fn from_legacy_json(source: &str) -> Result<NegotiationConfig, ConfigError> {
    let legacy: LegacyConfig =
        serde_json::from_str(source).map_err(|err| ConfigError::Source(err.to_string()))?;
    legacy.into_config()
}

pub fn from_weighted_json(source: &str) -> Result<NegotiationConfig, ConfigError> {
    let weighted: WeightedConfig =
        serde_json::from_str(source).map_err(|err| ConfigError::Source(err.to_string()))?;
    weighted.into_config()
}

pub fn from_wizard_json(source: &str) -> Result<NegotiationConfig, ConfigError> {
    let wizard: WizardConfig =
        serde_json::from_str(source).map_err(|err| ConfigError::Source(err.to_string()))?;
    wizard.into_config()
}

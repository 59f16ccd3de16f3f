//! ATM configuration.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::atm::{Amount, Denomination, NoteCount};

/// Denominations loaded into the till on replenishment.
pub const DEFAULT_DENOMINATIONS: [Denomination; 4] = [5, 10, 20, 50];

/// Notes of each denomination loaded into the till on replenishment.
pub const DEFAULT_NOTES_PER_DENOMINATION: NoteCount = 20;

/// Dispensing limits and till baseline.
#[derive(Debug, Clone)]
pub struct AtmConfig {
    /// Smallest amount that can be withdrawn.
    pub min_amount: Amount,
    /// Largest amount that can be withdrawn.
    pub max_amount: Amount,
    /// Every withdrawal must be a multiple of this.
    pub step: Amount,
    /// Note the dispenser tries to include before falling back to plain greedy.
    pub preferred_note: Option<Denomination>,
    /// Till contents after a replenishment.
    pub baseline: BTreeMap<Denomination, NoteCount>,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            min_amount: 20,
            max_amount: 250,
            step: 5,
            preferred_note: Some(5),
            baseline: DEFAULT_DENOMINATIONS
                .iter()
                .map(|&note| (note, DEFAULT_NOTES_PER_DENOMINATION))
                .collect(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AtmConfig {
    /// Load configuration from environment variables, keeping defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(min) = parse_var("ATM_MIN_AMOUNT") {
            config.min_amount = min;
        }

        if let Some(max) = parse_var("ATM_MAX_AMOUNT") {
            config.max_amount = max;
        }

        if let Some(step) = parse_var("ATM_STEP") {
            config.step = step;
        }

        if let Some(count) = parse_var::<NoteCount>("ATM_NOTES_PER_DENOMINATION") {
            config.baseline.values_mut().for_each(|c| *c = count);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(json) = parse_var("LOG_JSON") {
            config.log_json = json;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.min_amount == 0 {
            return Err(ConfigError::ZeroMinimum);
        }
        if self.min_amount > self.max_amount {
            return Err(ConfigError::InvertedBounds {
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        if self.baseline.is_empty() {
            return Err(ConfigError::NoDenominations);
        }
        if self.baseline.contains_key(&0) {
            return Err(ConfigError::ZeroDenomination);
        }
        let unit = self.baseline.keys().copied().fold(0, gcd);
        if self.step % unit != 0 {
            return Err(ConfigError::StepMismatch {
                step: self.step,
                unit,
            });
        }
        if let Some(note) = self.preferred_note {
            if !self.baseline.contains_key(&note) {
                return Err(ConfigError::UnknownPreferredNote(note));
            }
        }
        Ok(())
    }
}

fn gcd(a: Denomination, b: Denomination) -> Denomination {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

/// Errors reported by [`AtmConfig::validate`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Step cannot be 0")]
    ZeroStep,
    #[error("Minimum amount cannot be 0")]
    ZeroMinimum,
    #[error("Minimum amount {min} exceeds maximum amount {max}")]
    InvertedBounds { min: Amount, max: Amount },
    #[error("Till baseline has no denominations")]
    NoDenominations,
    #[error("Denomination cannot be 0")]
    ZeroDenomination,
    #[error("Step {step} is not a multiple of {unit}, the smallest amount the till can pay")]
    StepMismatch { step: Amount, unit: Denomination },
    #[error("Preferred note {0} is not a till denomination")]
    UnknownPreferredNote(Denomination),
}

//! Rounding of statutory currency amounts.
//!
//! Calculators work on exact decimals; only the final employee and employer
//! amounts of each statutory type are rounded, using the rule configured for
//! that type in the snapshot.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::StatutoryType;

/// How a midpoint or fractional amount is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half away from zero (0.5 → 1).
    #[default]
    HalfUp,
    /// Round half to even, also known as banker's rounding (0.5 → 0, 1.5 → 2).
    HalfEven,
    /// Always round away from zero (0.01 → 1). ESI contributions use this.
    Up,
    /// Always truncate toward zero.
    Down,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
        }
    }
}

/// A rounding mode and the number of decimal places to keep.
///
/// # Example
///
/// ```
/// use statutory_engine::calculation::{RoundingMode, RoundingRule};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rule = RoundingRule { mode: RoundingMode::HalfEven, scale: 0 };
/// assert_eq!(rule.apply(Decimal::from_str("2.5").unwrap()), Decimal::from(2));
/// assert_eq!(rule.apply(Decimal::from_str("3.5").unwrap()), Decimal::from(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoundingRule {
    /// The rounding mode.
    #[serde(default)]
    pub mode: RoundingMode,
    /// Decimal places kept; 0 rounds to whole rupees.
    #[serde(default)]
    pub scale: u32,
}

impl RoundingRule {
    /// Rounds an amount.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount
            .round_dp_with_strategy(self.scale, self.mode.strategy())
            .normalize()
    }
}

/// The rounding rule for each statutory type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundingPolicy {
    /// Rule used for types without an override.
    #[serde(default)]
    pub default: RoundingRule,
    /// Per-type overrides.
    #[serde(default)]
    pub overrides: BTreeMap<StatutoryType, RoundingRule>,
}

impl RoundingPolicy {
    /// The rule in force for a statutory type.
    pub fn rule_for(&self, statutory_type: StatutoryType) -> RoundingRule {
        self.overrides
            .get(&statutory_type)
            .copied()
            .unwrap_or(self.default)
    }
}

//! Progressive bracket definitions.
//!
//! A [`BracketSet`] can only be built through [`BracketSet::new`], which
//! enforces the structural invariants (starts at zero, contiguous, strictly
//! increasing, exactly one unbounded final bracket, rates within 0-100).
//! Calculators can therefore apply a `BracketSet` without re-checking it.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The upper end of a bracket.
///
/// # Example
///
/// ```
/// use statutory_engine::models::UpperLimit;
/// use rust_decimal::Decimal;
///
/// let bounded = UpperLimit::Bounded(Decimal::from(300_000));
/// assert_eq!(bounded.cap(Decimal::from(750_000)), Decimal::from(300_000));
/// assert_eq!(UpperLimit::Unbounded.cap(Decimal::from(750_000)), Decimal::from(750_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpperLimit {
    /// The bracket ends (exclusive of further income) at this amount.
    Bounded(Decimal),
    /// The bracket extends indefinitely.
    Unbounded,
}

impl UpperLimit {
    /// Clamps `amount` to this limit.
    pub fn cap(self, amount: Decimal) -> Decimal {
        match self {
            UpperLimit::Bounded(limit) => amount.min(limit),
            UpperLimit::Unbounded => amount,
        }
    }

    /// The bound, if any.
    pub fn value(self) -> Option<Decimal> {
        match self {
            UpperLimit::Bounded(limit) => Some(limit),
            UpperLimit::Unbounded => None,
        }
    }
}

impl fmt::Display for UpperLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpperLimit::Bounded(limit) => write!(f, "{}", limit),
            UpperLimit::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// One bracket of a progressive schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Inclusive lower limit.
    pub lower_limit: Decimal,
    /// Upper limit; the taxed portion of this bracket stops here.
    pub upper_limit: UpperLimit,
    /// Rate applied to the portion of the amount inside this bracket, in percent.
    pub rate_percent: Decimal,
}

impl TaxBracket {
    /// Creates a bounded bracket.
    pub fn bounded(lower_limit: Decimal, upper_limit: Decimal, rate_percent: Decimal) -> Self {
        Self {
            lower_limit,
            upper_limit: UpperLimit::Bounded(upper_limit),
            rate_percent,
        }
    }

    /// Creates the open-ended final bracket.
    pub fn unbounded(lower_limit: Decimal, rate_percent: Decimal) -> Self {
        Self {
            lower_limit,
            upper_limit: UpperLimit::Unbounded,
            rate_percent,
        }
    }
}

/// A validated, ordered list of brackets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BracketSet {
    brackets: Vec<TaxBracket>,
}

impl BracketSet {
    /// Validates and wraps a bracket list.
    ///
    /// `owner_id` names the slab for error messages.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBrackets` if the list is empty, does not start at
    /// zero, has gaps or overlaps, has inverted limits, has a rate outside
    /// 0-100, or does not end with exactly one unbounded bracket.
    ///
    /// # Example
    ///
    /// ```
    /// use statutory_engine::models::{BracketSet, TaxBracket};
    /// use rust_decimal::Decimal;
    ///
    /// let set = BracketSet::new("new_regime", vec![
    ///     TaxBracket::bounded(Decimal::ZERO, Decimal::from(300_000), Decimal::ZERO),
    ///     TaxBracket::unbounded(Decimal::from(300_000), Decimal::from(5)),
    /// ]);
    /// assert!(set.is_ok());
    ///
    /// let gap = BracketSet::new("broken", vec![
    ///     TaxBracket::bounded(Decimal::ZERO, Decimal::from(300_000), Decimal::ZERO),
    ///     TaxBracket::unbounded(Decimal::from(400_000), Decimal::from(5)),
    /// ]);
    /// assert!(gap.is_err());
    /// ```
    pub fn new(owner_id: &str, brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        let malformed = |message: String| EngineError::MalformedBrackets {
            slab_id: owner_id.to_string(),
            message,
        };

        let Some(first) = brackets.first() else {
            return Err(malformed("no brackets defined".to_string()));
        };
        if first.lower_limit != Decimal::ZERO {
            return Err(malformed(format!(
                "first bracket starts at {} instead of 0",
                first.lower_limit
            )));
        }

        let last_index = brackets.len() - 1;
        let mut expected_lower = Decimal::ZERO;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate_percent < Decimal::ZERO || bracket.rate_percent > Decimal::ONE_HUNDRED
            {
                return Err(malformed(format!(
                    "bracket {} has rate {}% outside 0-100",
                    index + 1,
                    bracket.rate_percent
                )));
            }
            if bracket.lower_limit != expected_lower {
                let kind = if bracket.lower_limit > expected_lower {
                    "gap"
                } else {
                    "overlap"
                };
                return Err(malformed(format!(
                    "{} before bracket {}: expected lower limit {}, found {}",
                    kind,
                    index + 1,
                    expected_lower,
                    bracket.lower_limit
                )));
            }

            match bracket.upper_limit {
                UpperLimit::Bounded(upper) => {
                    if upper <= bracket.lower_limit {
                        return Err(malformed(format!(
                            "bracket {} has inverted limits {}..{}",
                            index + 1,
                            bracket.lower_limit,
                            upper
                        )));
                    }
                    if index == last_index {
                        return Err(malformed(
                            "final bracket must be unbounded".to_string(),
                        ));
                    }
                    expected_lower = upper;
                }
                UpperLimit::Unbounded => {
                    if index != last_index {
                        return Err(malformed(format!(
                            "bracket {} is unbounded but is not the final bracket",
                            index + 1
                        )));
                    }
                }
            }
        }

        Ok(Self { brackets })
    }

    /// The brackets in ascending order.
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Number of brackets.
    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    /// Always false for a validated set; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }
}

//! Pay period model.
//!
//! This module contains the [`PayPeriod`] type that defines the calculation
//! context for a statutory deduction run.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Represents a pay period with its date range.
///
/// The start date is the as-of date for slab resolution and supplies the
/// calendar month used by fiscal-month lookups.
///
/// # Example
///
/// ```
/// use statutory_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::month(2026, 1).unwrap();
///
/// assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
/// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
/// assert_eq!(period.calendar_month(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
}

impl PayPeriod {
    /// Creates a pay period covering a whole calendar month.
    pub fn month(year: i32, month: u32) -> EngineResult<Self> {
        let start_date =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(EngineError::InvalidMonth { month })?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end_date = next_month
            .and_then(|d| d.pred_opt())
            .ok_or(EngineError::InvalidMonth { month })?;

        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Checks if a given date falls within this pay period.
    ///
    /// The check is inclusive of both start and end dates.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// The date configuration is resolved against.
    pub fn as_of(&self) -> NaiveDate {
        self.start_date
    }

    /// The calendar month (1-12) of the period.
    pub fn calendar_month(&self) -> u32 {
        self.start_date.month()
    }

    /// Rejects periods that end before they start.
    pub fn validate(&self) -> EngineResult<()> {
        if self.end_date < self.start_date {
            return Err(EngineError::InvalidAmount {
                field: "pay_period".to_string(),
                message: format!(
                    "end date {} is before start date {}",
                    self.end_date, self.start_date
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_january_period() -> PayPeriod {
        PayPeriod {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        }
    }

    #[test]
    fn test_contains_date_within_period() {
        let period = create_january_period();
        let test_date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert!(period.contains_date(test_date));
    }

    #[test]
    fn test_contains_date_outside_period() {
        let period = create_january_period();
        let test_date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert!(!period.contains_date(test_date));
    }

    #[test]
    fn test_contains_date_on_boundaries() {
        let period = create_january_period();
        assert!(period.contains_date(period.start_date));
        assert!(period.contains_date(period.end_date));
    }

    #[test]
    fn test_month_constructor_handles_december_and_february() {
        let december = PayPeriod::month(2025, 12).unwrap();
        assert_eq!(
            december.end_date,
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );

        let february = PayPeriod::month(2028, 2).unwrap();
        assert_eq!(
            february.end_date,
            NaiveDate::from_ymd_opt(2028, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_month_constructor_rejects_invalid_month() {
        assert!(matches!(
            PayPeriod::month(2026, 13),
            Err(EngineError::InvalidMonth { month: 13 })
        ));
    }

    #[test]
    fn test_inverted_period_fails_validation() {
        let period = PayPeriod {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(period.validate().is_err());
        assert!(create_january_period().validate().is_ok());
    }

    #[test]
    fn test_deserialize_pay_period() {
        let json = r#"{
            "start_date": "2026-01-01",
            "end_date": "2026-01-31"
        }"#;
        let period: PayPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(period, create_january_period());
        assert_eq!(period.as_of(), period.start_date);
    }
}

//! Fiscal calendar types.
//!
//! Statutory slabs are versioned by financial year and PT/LWF amounts vary by
//! fiscal month. The [`FiscalCalendar`] maps calendar dates onto both, using a
//! configurable first month (April by default).

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The default first month of the financial year (April).
pub const DEFAULT_FISCAL_YEAR_START_MONTH: u32 = 4;

/// Number of months in a financial year.
pub const MONTHS_PER_YEAR: usize = 12;

/// A calendar month, keyed by its lower-case three-letter name in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarMonth {
    /// January.
    Jan,
    /// February.
    Feb,
    /// March.
    Mar,
    /// April.
    Apr,
    /// May.
    May,
    /// June.
    Jun,
    /// July.
    Jul,
    /// August.
    Aug,
    /// September.
    Sep,
    /// October.
    Oct,
    /// November.
    Nov,
    /// December.
    Dec,
}

impl CalendarMonth {
    /// All months in calendar order.
    pub const ALL: [CalendarMonth; 12] = [
        CalendarMonth::Jan,
        CalendarMonth::Feb,
        CalendarMonth::Mar,
        CalendarMonth::Apr,
        CalendarMonth::May,
        CalendarMonth::Jun,
        CalendarMonth::Jul,
        CalendarMonth::Aug,
        CalendarMonth::Sep,
        CalendarMonth::Oct,
        CalendarMonth::Nov,
        CalendarMonth::Dec,
    ];

    /// The month number, 1 for January through 12 for December.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Looks up a month by number.
    pub fn from_number(month: u32) -> EngineResult<Self> {
        month
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index as usize).copied())
            .ok_or(EngineError::InvalidMonth { month })
    }

    /// The configuration key for this month.
    pub fn key(self) -> &'static str {
        match self {
            CalendarMonth::Jan => "jan",
            CalendarMonth::Feb => "feb",
            CalendarMonth::Mar => "mar",
            CalendarMonth::Apr => "apr",
            CalendarMonth::May => "may",
            CalendarMonth::Jun => "jun",
            CalendarMonth::Jul => "jul",
            CalendarMonth::Aug => "aug",
            CalendarMonth::Sep => "sep",
            CalendarMonth::Oct => "oct",
            CalendarMonth::Nov => "nov",
            CalendarMonth::Dec => "dec",
        }
    }
}

/// A financial year, identified by the calendar year it starts in.
///
/// # Example
///
/// ```
/// use statutory_engine::models::FinancialYear;
///
/// assert_eq!(FinancialYear(2025).to_string(), "2025-26");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// The following financial year.
    pub fn next(self) -> Self {
        FinancialYear(self.0 + 1)
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }
}

/// Maps calendar dates to financial years and fiscal-month slots.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{FinancialYear, FiscalCalendar};
/// use chrono::NaiveDate;
///
/// let calendar = FiscalCalendar::default();
/// assert_eq!(calendar.slot(4).unwrap(), 0); // April
/// assert_eq!(calendar.slot(3).unwrap(), 11); // March
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// assert_eq!(calendar.financial_year_of(date), FinancialYear(2025));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiscalCalendar {
    start_month: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            start_month: DEFAULT_FISCAL_YEAR_START_MONTH,
        }
    }
}

impl FiscalCalendar {
    /// Creates a calendar whose financial year begins in `start_month` (1-12).
    pub fn new(start_month: u32) -> EngineResult<Self> {
        CalendarMonth::from_number(start_month)?;
        Ok(Self { start_month })
    }

    /// The first calendar month of the financial year.
    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// Converts a calendar month (1-12) into its fiscal slot (0-11).
    pub fn slot(&self, calendar_month: u32) -> EngineResult<usize> {
        CalendarMonth::from_number(calendar_month)?;
        Ok(((calendar_month + 12 - self.start_month) % 12) as usize)
    }

    /// The calendar month occupying a fiscal slot.
    pub fn month_at(&self, slot: usize) -> CalendarMonth {
        let number = (self.start_month - 1 + (slot % MONTHS_PER_YEAR) as u32) % 12 + 1;
        CalendarMonth::ALL[(number - 1) as usize]
    }

    /// The financial year containing `date`.
    pub fn financial_year_of(&self, date: NaiveDate) -> FinancialYear {
        if date.month() >= self.start_month {
            FinancialYear(date.year())
        } else {
            FinancialYear(date.year() - 1)
        }
    }

    /// The first day of a financial year.
    pub fn year_start(&self, year: FinancialYear) -> NaiveDate {
        NaiveDate::from_ymd_opt(year.0, self.start_month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of a financial year.
    pub fn year_end(&self, year: FinancialYear) -> NaiveDate {
        self.year_start(year.next())
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// Months left in the financial year, counting the month of `date`.
    pub fn months_remaining(&self, date: NaiveDate) -> u32 {
        let elapsed = (date.month() + 12 - self.start_month) % 12;
        12 - elapsed
    }
}

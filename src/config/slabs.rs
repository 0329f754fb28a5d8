//! Validated slab configuration types.
//!
//! These are the domain forms of the raw definitions in `types.rs`. Every
//! value here has already passed load-time validation: bracket sets are
//! well-formed, monthly maps are complete and validity windows per key do not
//! overlap.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditWarning, BracketSet, CalendarMonth, DeductionBasis, FinancialYear, FiscalCalendar,
    MONTHS_PER_YEAR, PersonType, SlabIdentity, StatutoryType, TaxRegime,
};

/// The financial years a record is valid for: `[start, end)`.
///
/// An absent end means the record stays in force until a later record for the
/// same key supersedes it.
///
/// # Example
///
/// ```
/// use statutory_engine::config::ValidityWindow;
/// use statutory_engine::models::FinancialYear;
///
/// let window = ValidityWindow::new(FinancialYear(2024), Some(FinancialYear(2025)));
/// assert!(window.contains(FinancialYear(2024)));
/// assert!(!window.contains(FinancialYear(2025)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First financial year in force (inclusive).
    pub start: FinancialYear,
    /// First financial year no longer in force (exclusive).
    pub end: Option<FinancialYear>,
}

impl ValidityWindow {
    /// Creates a window.
    pub fn new(start: FinancialYear, end: Option<FinancialYear>) -> Self {
        Self { start, end }
    }

    /// Creates an open-ended window.
    pub fn starting(start: FinancialYear) -> Self {
        Self { start, end: None }
    }

    /// Whether `year` falls inside the window.
    pub fn contains(&self, year: FinancialYear) -> bool {
        year >= self.start && self.end.is_none_or(|end| year < end)
    }

    /// Whether the two windows share at least one financial year.
    pub fn intersects(&self, other: &ValidityWindow) -> bool {
        self.end.is_none_or(|end| other.start < end) && other.end.is_none_or(|end| self.start < end)
    }
}

/// A configuration record versioned by validity window.
pub trait Versioned {
    /// The record id.
    fn id(&self) -> &str;
    /// The serial number used by the documented tie-break.
    fn serial_number(&self) -> u32;
    /// The validity window.
    fn validity(&self) -> ValidityWindow;
    /// Ends the validity window at `end`.
    fn close_at(&mut self, end: FinancialYear);

    /// The wage band narrowing the record; every wage when absent.
    fn wage_band(&self) -> Option<WageBand> {
        None
    }

    /// The identity recorded on results computed from this record.
    fn identity(&self) -> SlabIdentity {
        let validity = self.validity();
        SlabIdentity {
            id: self.id().to_string(),
            serial_number: self.serial_number(),
            valid_from: validity.start,
            valid_until: validity.end,
        }
    }
}

/// A monthly wage range `[min, max)` selecting a slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WageBand {
    /// Lowest monthly wage covered (inclusive).
    pub min: Decimal,
    /// First monthly wage not covered, if bounded.
    pub max: Option<Decimal>,
}

impl WageBand {
    /// Whether a monthly wage falls in the band.
    pub fn contains(&self, wage: Decimal) -> bool {
        wage >= self.min && self.max.is_none_or(|max| wage < max)
    }

    /// Whether some wage falls in both bands.
    pub fn intersects(&self, other: &WageBand) -> bool {
        self.max.is_none_or(|max| other.min < max) && other.max.is_none_or(|max| self.min < max)
    }
}

fn bands_intersect(a: Option<WageBand>, b: Option<WageBand>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => true,
    }
}

/// A rebate cancelling tax for incomes up to a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxRebate {
    /// Highest taxable income that qualifies (inclusive).
    pub income_limit: Decimal,
    /// Largest rebate allowed.
    pub max_rebate: Decimal,
}

/// An income-tax schedule for one regime and person type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxSlabSet {
    /// Record id.
    pub id: String,
    /// Serial number for tie-breaks.
    pub serial_number: u32,
    /// The regime this schedule belongs to.
    pub regime: TaxRegime,
    /// The people the schedule applies to.
    pub person_type: PersonType,
    /// The financial years in force.
    pub validity: ValidityWindow,
    /// The progressive brackets.
    pub brackets: BracketSet,
    /// Deducted from annual income before the brackets apply.
    pub standard_deduction: Decimal,
    /// Optional rebate for low incomes.
    pub rebate: Option<TaxRebate>,
    /// Cess in percent, applied to tax after rebate.
    pub cess_percent: Decimal,
}

impl Versioned for TaxSlabSet {
    fn id(&self) -> &str {
        &self.id
    }
    fn serial_number(&self) -> u32 {
        self.serial_number
    }
    fn validity(&self) -> ValidityWindow {
        self.validity
    }
    fn close_at(&mut self, end: FinancialYear) {
        self.validity.end = Some(end);
    }
}

/// Twelve fiscal-month amounts, indexed by fiscal slot (0 = first month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MonthlyAmounts {
    slots: [Option<Decimal>; MONTHS_PER_YEAR],
}

impl MonthlyAmounts {
    /// The same amount in every month.
    pub fn uniform(amount: Decimal) -> Self {
        Self {
            slots: [Some(amount); MONTHS_PER_YEAR],
        }
    }

    /// The amount for a fiscal slot, if defined.
    pub fn get(&self, slot: usize) -> Option<Decimal> {
        self.slots.get(slot).copied().flatten()
    }

    /// Sets the amount for a fiscal slot, returning the updated amounts.
    pub fn with_slot(mut self, slot: usize, amount: Option<Decimal>) -> Self {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = amount;
        }
        self
    }

    /// Overrides fiscal slots with month-keyed amounts.
    pub fn with_months(
        self,
        months: &BTreeMap<CalendarMonth, Decimal>,
        calendar: &FiscalCalendar,
    ) -> Self {
        months.iter().fold(self, |amounts, (month, amount)| {
            // CalendarMonth numbers are always 1-12.
            match calendar.slot(month.number()) {
                Ok(slot) => amounts.with_slot(slot, Some(*amount)),
                Err(_) => amounts,
            }
        })
    }

    /// The months without an amount, in fiscal order.
    pub fn missing_months(&self, calendar: &FiscalCalendar) -> Vec<CalendarMonth> {
        (0..MONTHS_PER_YEAR)
            .filter(|slot| self.slots[*slot].is_none())
            .map(|slot| calendar.month_at(slot))
            .collect()
    }

}

/// A PT or LWF slab with fiscal-month-varying amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySlab {
    /// Record id.
    pub id: String,
    /// Serial number for tie-breaks.
    pub serial_number: u32,
    /// `ProfessionalTax` or `LabourWelfareFund`.
    pub statutory_type: StatutoryType,
    /// The state the slab applies in (upper-case code).
    pub jurisdiction: String,
    /// The people the slab applies to.
    pub person_type: PersonType,
    /// Whether amounts are fixed values or percentages of the wage.
    pub deduction_basis: DeductionBasis,
    /// The monthly wage range the slab covers; every wage when absent.
    pub wage_band: Option<WageBand>,
    /// The financial years in force.
    pub validity: ValidityWindow,
    /// Employee amounts.
    pub employee: MonthlyAmounts,
    /// Employer amounts (LWF).
    pub employer: Option<MonthlyAmounts>,
}

impl Versioned for MonthlySlab {
    fn id(&self) -> &str {
        &self.id
    }
    fn serial_number(&self) -> u32 {
        self.serial_number
    }
    fn validity(&self) -> ValidityWindow {
        self.validity
    }
    fn close_at(&mut self, end: FinancialYear) {
        self.validity.end = Some(end);
    }
    fn wage_band(&self) -> Option<WageBand> {
        self.wage_band
    }
}

/// A rate-based PF or ESI contribution scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionScheme {
    /// Record id.
    pub id: String,
    /// Serial number for tie-breaks.
    pub serial_number: u32,
    /// `ProvidentFund` or `StateInsurance`.
    pub statutory_type: StatutoryType,
    /// The financial years in force.
    pub validity: ValidityWindow,
    /// Employee share in percent.
    pub employee_rate_percent: Decimal,
    /// Employer share in percent.
    pub employer_rate_percent: Decimal,
    /// Contribution wage is truncated to this amount (PF wage limit).
    pub wage_ceiling: Option<Decimal>,
    /// Employees earning more than this are not covered (ESI).
    pub eligibility_limit: Option<Decimal>,
}

impl Versioned for ContributionScheme {
    fn id(&self) -> &str {
        &self.id
    }
    fn serial_number(&self) -> u32 {
        self.serial_number
    }
    fn validity(&self) -> ValidityWindow {
        self.validity
    }
    fn close_at(&mut self, end: FinancialYear) {
        self.validity.end = Some(end);
    }
}

/// Validates the windows of records sharing one key, closing open ends.
///
/// An open-ended window is closed at the next later start among records
/// whose wage bands intersect it, so it never comes back into force after a
/// successor ends. Any two records with intersecting bands and intersecting
/// windows are an overlap, except exact duplicates (same window and band):
/// those load with a warning and are reported as ambiguous at resolution
/// time. Records end up sorted by start, then id.
pub fn validate_windows<T: Versioned>(records: &mut [T]) -> EngineResult<Vec<AuditWarning>> {
    records.sort_by(|a, b| {
        a.validity()
            .start
            .cmp(&b.validity().start)
            .then_with(|| a.id().cmp(b.id()))
    });

    let successor_starts: Vec<Option<FinancialYear>> = records
        .iter()
        .map(|record| {
            let window = record.validity();
            if window.end.is_some() {
                return None;
            }
            records
                .iter()
                .filter(|other| bands_intersect(record.wage_band(), other.wage_band()))
                .map(|other| other.validity().start)
                .filter(|start| *start > window.start)
                .min()
        })
        .collect();
    for (record, successor) in records.iter_mut().zip(successor_starts) {
        if let Some(end) = successor {
            record.close_at(end);
        }
    }

    let mut warnings = Vec::new();
    for (index, earlier) in records.iter().enumerate() {
        for later in &records[index + 1..] {
            let (a, b) = (earlier.validity(), later.validity());
            if !a.intersects(&b) || !bands_intersect(earlier.wage_band(), later.wage_band()) {
                continue;
            }
            if a == b && earlier.wage_band() == later.wage_band() {
                warnings.push(AuditWarning {
                    code: "DUPLICATE_VALIDITY".to_string(),
                    message: format!(
                        "Slabs '{}' and '{}' share validity from {}",
                        earlier.id(),
                        later.id(),
                        a.start
                    ),
                    severity: "high".to_string(),
                });
                continue;
            }
            return Err(EngineError::OverlappingValidity {
                first: earlier.id().to_string(),
                second: later.id().to_string(),
            });
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn scheme(id: &str, start: i32, end: Option<i32>) -> ContributionScheme {
        ContributionScheme {
            id: id.to_string(),
            serial_number: 1,
            statutory_type: StatutoryType::ProvidentFund,
            validity: ValidityWindow::new(FinancialYear(start), end.map(FinancialYear)),
            employee_rate_percent: dec("12"),
            employer_rate_percent: dec("12"),
            wage_ceiling: Some(dec("15000")),
            eligibility_limit: None,
        }
    }

    #[test]
    fn test_window_start_inclusive_end_exclusive() {
        let window = ValidityWindow::new(FinancialYear(2024), Some(FinancialYear(2026)));
        assert!(!window.contains(FinancialYear(2023)));
        assert!(window.contains(FinancialYear(2024)));
        assert!(window.contains(FinancialYear(2025)));
        assert!(!window.contains(FinancialYear(2026)));
        assert!(ValidityWindow::starting(FinancialYear(2024)).contains(FinancialYear(2090)));
    }

    #[test]
    fn test_wage_band() {
        let band = WageBand {
            min: dec("10000"),
            max: Some(dec("15000")),
        };
        assert!(band.contains(dec("10000")));
        assert!(band.contains(dec("14999.99")));
        assert!(!band.contains(dec("15000")));
        assert!(!band.contains(dec("9999")));
    }

    #[test]
    fn test_monthly_amounts_with_months_uses_fiscal_slots() {
        let calendar = FiscalCalendar::default();
        let mut months = BTreeMap::new();
        months.insert(CalendarMonth::Apr, dec("20"));
        months.insert(CalendarMonth::Mar, dec("5"));

        let amounts = MonthlyAmounts::default().with_months(&months, &calendar);
        assert_eq!(amounts.get(0), Some(dec("20")));
        assert_eq!(amounts.get(11), Some(dec("5")));
        assert_eq!(amounts.get(5), None);
        assert_eq!(amounts.missing_months(&calendar).len(), 10);
        assert_eq!(amounts.missing_months(&calendar)[0], CalendarMonth::May);
    }

    #[test]
    fn test_uniform_amounts_are_complete() {
        let calendar = FiscalCalendar::default();
        let amounts = MonthlyAmounts::uniform(dec("200")).with_slot(10, Some(dec("300")));
        assert!(amounts.missing_months(&calendar).is_empty());
        assert_eq!(amounts.get(10), Some(dec("300")));
        assert_eq!(amounts.get(9), Some(dec("200")));
    }

    fn pt_band(id: &str, start: i32, min: &str, max: Option<&str>) -> MonthlySlab {
        MonthlySlab {
            id: id.to_string(),
            serial_number: 1,
            statutory_type: StatutoryType::ProfessionalTax,
            jurisdiction: "KA".to_string(),
            person_type: PersonType::All,
            deduction_basis: DeductionBasis::Fixed,
            wage_band: Some(WageBand {
                min: dec(min),
                max: max.map(dec),
            }),
            validity: ValidityWindow::starting(FinancialYear(start)),
            employee: MonthlyAmounts::uniform(dec("200")),
            employer: None,
        }
    }

    #[test]
    fn test_successive_open_windows_are_valid() {
        let mut records = vec![scheme("pf_new", 2025, None), scheme("pf_old", 2020, None)];
        let warnings = validate_windows(&mut records).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(records[0].id, "pf_old");
        assert_eq!(records[0].validity.end, Some(FinancialYear(2025)));
        assert_eq!(records[1].validity.end, None);
    }

    #[test]
    fn test_open_window_does_not_revive_after_bounded_successor() {
        let mut records = vec![
            scheme("open_2020", 2020, None),
            scheme("bounded_2022", 2022, Some(2023)),
        ];
        validate_windows(&mut records).unwrap();

        let in_force = |year: i32| -> Vec<&str> {
            records
                .iter()
                .filter(|r| r.validity.contains(FinancialYear(year)))
                .map(|r| r.id.as_str())
                .collect()
        };
        assert_eq!(in_force(2021), vec!["open_2020"]);
        assert_eq!(in_force(2022), vec!["bounded_2022"]);
        assert!(in_force(2024).is_empty());
    }

    #[test]
    fn test_adjacent_bounded_windows_are_valid() {
        let mut records = vec![scheme("pf_old", 2020, Some(2025)), scheme("pf_new", 2025, None)];
        assert!(validate_windows(&mut records).is_ok());
    }

    #[test]
    fn test_bounded_window_past_next_start_overlaps() {
        let mut records = vec![scheme("pf_old", 2020, Some(2026)), scheme("pf_new", 2025, None)];
        match validate_windows(&mut records) {
            Err(EngineError::OverlappingValidity { first, second }) => {
                assert_eq!(first, "pf_old");
                assert_eq!(second, "pf_new");
            }
            other => panic!("Expected OverlappingValidity, got {:?}", other),
        }
    }

    #[test]
    fn test_same_start_different_end_overlaps() {
        let mut records = vec![scheme("pf_a", 2025, Some(2026)), scheme("pf_b", 2025, None)];
        assert!(matches!(
            validate_windows(&mut records),
            Err(EngineError::OverlappingValidity { .. })
        ));
    }

    #[test]
    fn test_identical_windows_warn() {
        let mut records = vec![scheme("pf_a", 2025, None), scheme("pf_b", 2025, None)];
        let warnings = validate_windows(&mut records).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "DUPLICATE_VALIDITY");
        assert!(warnings[0].message.contains("pf_a"));
    }

    #[test]
    fn test_disjoint_wage_bands_share_a_window() {
        let mut records = vec![
            pt_band("pt_low", 2025, "0", Some("25000")),
            pt_band("pt_high", 2025, "25000", None),
        ];
        let warnings = validate_windows(&mut records).unwrap();
        assert!(warnings.is_empty());
        assert!(records.iter().all(|r| r.validity.end.is_none()));
    }

    #[test]
    fn test_intersecting_wage_bands_overlap() {
        let mut records = vec![
            pt_band("pt_low", 2025, "0", Some("10000")),
            pt_band("pt_high", 2025, "5000", None),
        ];
        match validate_windows(&mut records) {
            Err(EngineError::OverlappingValidity { first, second }) => {
                assert_eq!(first, "pt_high");
                assert_eq!(second, "pt_low");
            }
            other => panic!("Expected OverlappingValidity, got {:?}", other),
        }
    }

    #[test]
    fn test_rebanded_successor_closes_intersecting_bands_only() {
        let mut records = vec![
            pt_band("pt_low_2023", 2023, "0", Some("25000")),
            pt_band("pt_high_2023", 2023, "25000", None),
            pt_band("pt_low_2025", 2025, "0", Some("20000")),
        ];
        validate_windows(&mut records).unwrap();

        let end_of = |id: &str| {
            records
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.validity.end)
        };
        assert_eq!(end_of("pt_low_2023"), Some(FinancialYear(2025)));
        assert_eq!(end_of("pt_high_2023"), None);
        assert_eq!(end_of("pt_low_2025"), None);
    }

    #[test]
    fn test_identity_reflects_window() {
        let record = scheme("pf_new", 2025, Some(2027));
        let identity = record.identity();
        assert_eq!(identity.id, "pf_new");
        assert_eq!(identity.valid_from, FinancialYear(2025));
        assert_eq!(identity.valid_until, Some(FinancialYear(2027)));
    }
}

//! Raw configuration types.
//!
//! This module contains the structures deserialized from the YAML files of a
//! configuration directory. Each definition converts into its validated
//! domain form in `slabs.rs` through a `build` method; nothing here is used by
//! the calculators directly.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::calculation::{RoundingPolicy, TieBreak};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditWarning, BracketSet, CalendarMonth, DEFAULT_FISCAL_YEAR_START_MONTH, DeductionBasis,
    FinancialYear, FiscalCalendar, PersonType, StatutoryType, TaxBracket, TaxRegime, UpperLimit,
};

use super::groups::StatutoryGroup;
use super::slabs::{
    ContributionScheme, MonthlyAmounts, MonthlySlab, TaxRebate, TaxSlabSet, ValidityWindow,
    WageBand,
};

/// Upper limits at or above this value are legacy "infinity" markers.
pub const LEGACY_UNBOUNDED_SENTINEL: i64 = 999_999_999;

fn default_fiscal_year_start_month() -> u32 {
    DEFAULT_FISCAL_YEAR_START_MONTH
}

/// Settings from `snapshot.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSettings {
    /// Version id recorded on every result computed from the snapshot.
    pub version: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// First calendar month of the financial year.
    #[serde(default = "default_fiscal_year_start_month")]
    pub fiscal_year_start_month: u32,
    /// Rounding rules for final amounts.
    #[serde(default)]
    pub rounding: RoundingPolicy,
    /// How equally ranked slabs are resolved.
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl SnapshotSettings {
    /// Settings with the given version and every other field defaulted.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            description: None,
            fiscal_year_start_month: DEFAULT_FISCAL_YEAR_START_MONTH,
            rounding: RoundingPolicy::default(),
            tie_break: TieBreak::default(),
        }
    }
}

fn validity(
    id: &str,
    valid_from: FinancialYear,
    valid_until: Option<FinancialYear>,
) -> EngineResult<ValidityWindow> {
    if let Some(end) = valid_until {
        if end <= valid_from {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "slab '{}' has valid_until {} not after valid_from {}",
                    id, end, valid_from
                ),
            });
        }
    }
    Ok(ValidityWindow::new(valid_from, valid_until))
}

fn require_type(id: &str, actual: StatutoryType, allowed: &[StatutoryType]) -> EngineResult<()> {
    if allowed.contains(&actual) {
        return Ok(());
    }
    let allowed: Vec<&str> = allowed.iter().map(|t| t.code()).collect();
    Err(EngineError::InvalidConfiguration {
        message: format!(
            "slab '{}' has statutory type {}, expected one of {}",
            id,
            actual,
            allowed.join(", ")
        ),
    })
}

fn require_percent(id: &str, field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(EngineError::InvalidConfiguration {
            message: format!("slab '{}' has {} {} outside 0-100", id, field, value),
        });
    }
    Ok(())
}

fn require_non_negative(id: &str, field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::InvalidConfiguration {
            message: format!("slab '{}' has negative {} {}", id, field, value),
        });
    }
    Ok(())
}

/// One bracket as written in configuration.
///
/// A missing `upper_limit` marks the final, unbounded bracket.
#[derive(Debug, Clone, Deserialize)]
pub struct BracketDefinition {
    /// Inclusive lower limit.
    pub lower_limit: Decimal,
    /// Upper limit, absent for the final bracket.
    #[serde(default)]
    pub upper_limit: Option<Decimal>,
    /// Rate in percent.
    pub rate_percent: Decimal,
}

impl BracketDefinition {
    fn build(&self, slab_id: &str, warnings: &mut Vec<AuditWarning>) -> TaxBracket {
        let upper_limit = match self.upper_limit {
            None => UpperLimit::Unbounded,
            Some(limit) if limit >= Decimal::from(LEGACY_UNBOUNDED_SENTINEL) => {
                warnings.push(AuditWarning {
                    code: "LEGACY_UNBOUNDED_LIMIT".to_string(),
                    message: format!(
                        "Slab '{}' bracket from {} uses upper limit {}; treated as unbounded",
                        slab_id, self.lower_limit, limit
                    ),
                    severity: "low".to_string(),
                });
                UpperLimit::Unbounded
            }
            Some(limit) => UpperLimit::Bounded(limit),
        };
        TaxBracket {
            lower_limit: self.lower_limit,
            upper_limit,
            rate_percent: self.rate_percent,
        }
    }
}

/// An income-tax schedule from `tax_slabs.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxSlabDefinition {
    /// Unique record id.
    pub id: String,
    /// Serial number for tie-breaks.
    #[serde(default)]
    pub serial_number: u32,
    /// Tax regime.
    pub regime: TaxRegime,
    /// Person type.
    #[serde(default)]
    pub person_type: PersonType,
    /// First financial year in force.
    pub valid_from: FinancialYear,
    /// First financial year no longer in force.
    #[serde(default)]
    pub valid_until: Option<FinancialYear>,
    /// Ordered brackets.
    pub brackets: Vec<BracketDefinition>,
    /// Standard deduction from annual income.
    #[serde(default)]
    pub standard_deduction: Decimal,
    /// Rebate for low incomes.
    #[serde(default)]
    pub rebate: Option<TaxRebate>,
    /// Cess in percent.
    #[serde(default)]
    pub cess_percent: Decimal,
}

impl TaxSlabDefinition {
    /// Validates the definition into a [`TaxSlabSet`].
    ///
    /// Legacy sentinel upper limits are normalized with a warning pushed
    /// onto `warnings`.
    pub fn build(self, warnings: &mut Vec<AuditWarning>) -> EngineResult<TaxSlabSet> {
        let validity = validity(&self.id, self.valid_from, self.valid_until)?;
        let brackets = self
            .brackets
            .iter()
            .map(|bracket| bracket.build(&self.id, warnings))
            .collect();
        let brackets = BracketSet::new(&self.id, brackets)?;

        require_non_negative(&self.id, "standard_deduction", self.standard_deduction)?;
        require_percent(&self.id, "cess_percent", self.cess_percent)?;
        if let Some(rebate) = &self.rebate {
            require_non_negative(&self.id, "rebate.income_limit", rebate.income_limit)?;
            require_non_negative(&self.id, "rebate.max_rebate", rebate.max_rebate)?;
        }

        Ok(TaxSlabSet {
            id: self.id,
            serial_number: self.serial_number,
            regime: self.regime,
            person_type: self.person_type,
            validity,
            brackets,
            standard_deduction: self.standard_deduction,
            rebate: self.rebate,
            cess_percent: self.cess_percent,
        })
    }
}

/// Fiscal-month amounts as written in configuration.
///
/// `every_month` fills all twelve months; entries under `months` override it.
///
/// ```yaml
/// employee:
///   every_month: "200"
///   months:
///     feb: "300"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyAmountsDefinition {
    /// Amount for every month not listed in `months`.
    #[serde(default)]
    pub every_month: Option<Decimal>,
    /// Per-month amounts keyed by three-letter month name.
    #[serde(default)]
    pub months: BTreeMap<CalendarMonth, Decimal>,
}

impl MonthlyAmountsDefinition {
    fn build(&self, calendar: &FiscalCalendar) -> MonthlyAmounts {
        let base = match self.every_month {
            Some(amount) => MonthlyAmounts::uniform(amount),
            None => MonthlyAmounts::default(),
        };
        base.with_months(&self.months, calendar)
    }

    fn values(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.every_month.into_iter().chain(self.months.values().copied())
    }
}

/// A PT or LWF slab from `monthly_slabs.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlySlabDefinition {
    /// Unique record id.
    pub id: String,
    /// Serial number for tie-breaks.
    #[serde(default)]
    pub serial_number: u32,
    /// `pt` or `lwf`.
    pub statutory_type: StatutoryType,
    /// State code.
    pub jurisdiction: String,
    /// Person type.
    #[serde(default)]
    pub person_type: PersonType,
    /// Fixed amounts or rates.
    #[serde(default)]
    pub deduction_basis: DeductionBasis,
    /// Monthly wage band.
    #[serde(default)]
    pub wage_band: Option<WageBand>,
    /// First financial year in force.
    pub valid_from: FinancialYear,
    /// First financial year no longer in force.
    #[serde(default)]
    pub valid_until: Option<FinancialYear>,
    /// Employee amounts.
    pub employee: MonthlyAmountsDefinition,
    /// Employer amounts (LWF only).
    #[serde(default)]
    pub employer: Option<MonthlyAmountsDefinition>,
}

impl MonthlySlabDefinition {
    /// Validates the definition into a [`MonthlySlab`].
    ///
    /// # Errors
    ///
    /// `IncompleteMonthlyMap` if a map leaves any month undefined, and
    /// `InvalidConfiguration` for a wrong statutory type, an employer map on
    /// a PT slab, negative amounts, rates above 100 or an inverted wage band.
    pub fn build(self, calendar: &FiscalCalendar) -> EngineResult<MonthlySlab> {
        require_type(
            &self.id,
            self.statutory_type,
            &[StatutoryType::ProfessionalTax, StatutoryType::LabourWelfareFund],
        )?;
        let validity = validity(&self.id, self.valid_from, self.valid_until)?;

        if self.jurisdiction.trim().is_empty() {
            return Err(EngineError::InvalidConfiguration {
                message: format!("slab '{}' has an empty jurisdiction", self.id),
            });
        }
        if self.employer.is_some() && self.statutory_type != StatutoryType::LabourWelfareFund {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "slab '{}' defines employer amounts, which only LWF slabs carry",
                    self.id
                ),
            });
        }
        if let Some(band) = &self.wage_band {
            require_non_negative(&self.id, "wage_band.min", band.min)?;
            if band.max.is_some_and(|max| max <= band.min) {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("slab '{}' has an empty wage band", self.id),
                });
            }
        }

        let definitions = std::iter::once(&self.employee).chain(self.employer.as_ref());
        for definition in definitions {
            for value in definition.values() {
                require_non_negative(&self.id, "monthly amount", value)?;
                if self.deduction_basis == DeductionBasis::Rate {
                    require_percent(&self.id, "monthly rate", value)?;
                }
            }
        }

        let employee = self.employee.build(calendar);
        let employer = self.employer.as_ref().map(|e| e.build(calendar));
        for amounts in std::iter::once(&employee).chain(employer.as_ref()) {
            let missing = amounts.missing_months(calendar);
            if !missing.is_empty() {
                return Err(EngineError::IncompleteMonthlyMap {
                    slab_id: self.id,
                    missing: missing.iter().map(|m| m.key().to_string()).collect(),
                });
            }
        }

        Ok(MonthlySlab {
            id: self.id,
            serial_number: self.serial_number,
            statutory_type: self.statutory_type,
            jurisdiction: self.jurisdiction.trim().to_uppercase(),
            person_type: self.person_type,
            deduction_basis: self.deduction_basis,
            wage_band: self.wage_band,
            validity,
            employee,
            employer,
        })
    }
}

/// A PF or ESI scheme from `contributions.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributionDefinition {
    /// Unique record id.
    pub id: String,
    /// Serial number for tie-breaks.
    #[serde(default)]
    pub serial_number: u32,
    /// `pf` or `esi`.
    pub statutory_type: StatutoryType,
    /// First financial year in force.
    pub valid_from: FinancialYear,
    /// First financial year no longer in force.
    #[serde(default)]
    pub valid_until: Option<FinancialYear>,
    /// Employee share in percent.
    pub employee_rate_percent: Decimal,
    /// Employer share in percent.
    pub employer_rate_percent: Decimal,
    /// Wage ceiling.
    #[serde(default)]
    pub wage_ceiling: Option<Decimal>,
    /// Eligibility limit.
    #[serde(default)]
    pub eligibility_limit: Option<Decimal>,
}

impl ContributionDefinition {
    /// Validates the definition into a [`ContributionScheme`].
    pub fn build(self) -> EngineResult<ContributionScheme> {
        require_type(
            &self.id,
            self.statutory_type,
            &[StatutoryType::ProvidentFund, StatutoryType::StateInsurance],
        )?;
        let validity = validity(&self.id, self.valid_from, self.valid_until)?;
        require_percent(&self.id, "employee_rate_percent", self.employee_rate_percent)?;
        require_percent(&self.id, "employer_rate_percent", self.employer_rate_percent)?;
        if let Some(ceiling) = self.wage_ceiling {
            require_non_negative(&self.id, "wage_ceiling", ceiling)?;
        }
        if let Some(limit) = self.eligibility_limit {
            require_non_negative(&self.id, "eligibility_limit", limit)?;
        }

        Ok(ContributionScheme {
            id: self.id,
            serial_number: self.serial_number,
            statutory_type: self.statutory_type,
            validity,
            employee_rate_percent: self.employee_rate_percent,
            employer_rate_percent: self.employer_rate_percent,
            wage_ceiling: self.wage_ceiling,
            eligibility_limit: self.eligibility_limit,
        })
    }
}

/// `tax_slabs.yaml` file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxSlabsFile {
    /// Income-tax schedules.
    #[serde(default)]
    pub tax_slabs: Vec<TaxSlabDefinition>,
}

/// `monthly_slabs.yaml` file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlySlabsFile {
    /// PT and LWF slabs.
    #[serde(default)]
    pub monthly_slabs: Vec<MonthlySlabDefinition>,
}

/// `contributions.yaml` file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributionsFile {
    /// PF and ESI schemes.
    #[serde(default)]
    pub contributions: Vec<ContributionDefinition>,
}

/// `groups.yaml` file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupsFile {
    /// Statutory groups.
    #[serde(default)]
    pub groups: Vec<StatutoryGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const NEW_REGIME: &str = r#"
id: new_fy2025
serial_number: 2
regime: new
valid_from: 2025
brackets:
  - { lower_limit: "0", upper_limit: "400000", rate_percent: "0" }
  - { lower_limit: "400000", upper_limit: "800000", rate_percent: "5" }
  - { lower_limit: "800000", rate_percent: "10" }
standard_deduction: "75000"
rebate: { income_limit: "1200000", max_rebate: "60000" }
cess_percent: "4"
"#;

    #[test]
    fn test_tax_slab_definition_builds() {
        let definition: TaxSlabDefinition = serde_yaml::from_str(NEW_REGIME).unwrap();
        let mut warnings = Vec::new();
        let slab = definition.build(&mut warnings).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(slab.person_type, PersonType::All);
        assert_eq!(slab.brackets.len(), 3);
        assert_eq!(slab.brackets.brackets()[2].upper_limit, UpperLimit::Unbounded);
        assert_eq!(slab.standard_deduction, dec("75000"));
        assert_eq!(slab.cess_percent, dec("4"));
        assert_eq!(slab.validity, ValidityWindow::starting(FinancialYear(2025)));
    }

    #[test]
    fn test_legacy_sentinel_normalized_with_warning() {
        let yaml = r#"
id: legacy
regime: old
valid_from: 2020
brackets:
  - { lower_limit: "0", upper_limit: "250000", rate_percent: "0" }
  - { lower_limit: "250000", upper_limit: "999999999", rate_percent: "5" }
"#;
        let definition: TaxSlabDefinition = serde_yaml::from_str(yaml).unwrap();
        let mut warnings = Vec::new();
        let slab = definition.build(&mut warnings).unwrap();

        assert_eq!(slab.brackets.brackets()[1].upper_limit, UpperLimit::Unbounded);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "LEGACY_UNBOUNDED_LIMIT");
    }

    #[test]
    fn test_inverted_validity_rejected() {
        let yaml = r#"
id: bad
regime: new
valid_from: 2025
valid_until: 2025
brackets:
  - { lower_limit: "0", rate_percent: "5" }
"#;
        let definition: TaxSlabDefinition = serde_yaml::from_str(yaml).unwrap();
        let result = definition.build(&mut Vec::new());
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_monthly_every_month_with_override() {
        let yaml = r#"
id: pt_ka
statutory_type: pt
jurisdiction: ka
valid_from: 2025
wage_band: { min: "25000" }
employee:
  every_month: "200"
  months:
    feb: "300"
"#;
        let definition: MonthlySlabDefinition = serde_yaml::from_str(yaml).unwrap();
        let calendar = FiscalCalendar::default();
        let slab = definition.build(&calendar).unwrap();

        assert_eq!(slab.jurisdiction, "KA");
        assert_eq!(slab.employee.get(calendar.slot(2).unwrap()), Some(dec("300")));
        assert_eq!(slab.employee.get(calendar.slot(4).unwrap()), Some(dec("200")));
        assert!(slab.employee.missing_months(&calendar).is_empty());
        assert!(slab.employer.is_none());
    }

    #[test]
    fn test_monthly_incomplete_map_lists_missing_months() {
        let yaml = r#"
id: lwf_mh
statutory_type: lwf
jurisdiction: MH
valid_from: 2025
employee:
  months: { jun: "12", dec: "12" }
employer:
  months: { jun: "36", dec: "36" }
"#;
        let definition: MonthlySlabDefinition = serde_yaml::from_str(yaml).unwrap();
        match definition.build(&FiscalCalendar::default()) {
            Err(EngineError::IncompleteMonthlyMap { slab_id, missing }) => {
                assert_eq!(slab_id, "lwf_mh");
                assert_eq!(missing.len(), 10);
                assert_eq!(missing[0], "apr");
                assert!(!missing.contains(&"jun".to_string()));
            }
            other => panic!("Expected IncompleteMonthlyMap, got {:?}", other),
        }
    }

    #[test]
    fn test_pt_employer_map_rejected() {
        let yaml = r#"
id: pt_bad
statutory_type: pt
jurisdiction: KA
valid_from: 2025
employee: { every_month: "200" }
employer: { every_month: "10" }
"#;
        let definition: MonthlySlabDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            definition.build(&FiscalCalendar::default()),
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_monthly_slab_with_wrong_type_rejected() {
        let yaml = r#"
id: pf_as_monthly
statutory_type: pf
jurisdiction: KA
valid_from: 2025
employee: { every_month: "200" }
"#;
        let definition: MonthlySlabDefinition = serde_yaml::from_str(yaml).unwrap();
        match definition.build(&FiscalCalendar::default()) {
            Err(EngineError::InvalidConfiguration { message }) => {
                assert!(message.contains("expected one of PT, LWF"));
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_contribution_definition_builds() {
        let yaml = r#"
id: esi_2025
statutory_type: esi
valid_from: 2025
employee_rate_percent: "0.75"
employer_rate_percent: "3.25"
eligibility_limit: "21000"
"#;
        let definition: ContributionDefinition = serde_yaml::from_str(yaml).unwrap();
        let scheme = definition.build().unwrap();
        assert_eq!(scheme.employee_rate_percent, dec("0.75"));
        assert_eq!(scheme.eligibility_limit, Some(dec("21000")));
        assert_eq!(scheme.wage_ceiling, None);
    }

    #[test]
    fn test_contribution_rate_out_of_range_rejected() {
        let yaml = r#"
id: pf_bad
statutory_type: pf
valid_from: 2025
employee_rate_percent: "112"
employer_rate_percent: "12"
"#;
        let definition: ContributionDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(definition.build().is_err());
    }

    #[test]
    fn test_snapshot_settings_defaults() {
        let settings: SnapshotSettings = serde_yaml::from_str("version: v1").unwrap();
        assert_eq!(settings.fiscal_year_start_month, 4);
        assert_eq!(settings.tie_break, TieBreak::Fail);
        assert_eq!(settings.rounding, RoundingPolicy::default());
    }
}

//! Employee statutory profile and pay inputs.
//!
//! This module defines the per-employee data the payroll system supplies to
//! the engine: enrollment flags, registration numbers, organizational
//! placement, and the gross pay components for a period.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::statutory::{PersonAttributes, TaxRegime, WageBasis};

/// Where an employee sits in the organization.
///
/// Each dimension is optional; group membership is checked across whichever
/// dimensions are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Cost center id.
    #[serde(default)]
    pub cost_center_id: Option<String>,
    /// Office location id.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Business unit id.
    #[serde(default)]
    pub unit_id: Option<String>,
}

impl fmt::Display for OrgUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("cost_center", &self.cost_center_id),
            ("location", &self.location_id),
            ("unit", &self.unit_id),
        ]
        .iter()
        .filter_map(|(name, id)| id.as_ref().map(|id| format!("{}={}", name, id)))
        .collect();

        if parts.is_empty() {
            f.write_str("(unassigned)")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Provident fund enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PfEnrollment {
    /// Whether PF is deducted.
    #[serde(default)]
    pub enabled: bool,
    /// The wage PF is computed on.
    #[serde(default)]
    pub wage_basis: WageBasis,
    /// Contribute on the full wage instead of truncating it to the wage ceiling.
    #[serde(default)]
    pub contribute_on_actual_wage: bool,
    /// PF member number.
    #[serde(default)]
    pub pf_number: Option<String>,
    /// Universal account number.
    #[serde(default)]
    pub uan: Option<String>,
}

/// ESI enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsiEnrollment {
    /// Whether ESI is deducted.
    #[serde(default)]
    pub enabled: bool,
    /// The wage ESI is computed on.
    #[serde(default = "gross_basis")]
    pub wage_basis: WageBasis,
    /// ESI insurance number.
    #[serde(default)]
    pub esi_number: Option<String>,
}

impl Default for EsiEnrollment {
    fn default() -> Self {
        Self {
            enabled: false,
            wage_basis: gross_basis(),
            esi_number: None,
        }
    }
}

fn gross_basis() -> WageBasis {
    WageBasis::Gross
}

/// Income tax (TDS) enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncomeTaxEnrollment {
    /// Whether TDS is deducted.
    #[serde(default)]
    pub enabled: bool,
    /// The elected regime.
    #[serde(default)]
    pub regime: TaxRegime,
    /// Projected annual taxable income; monthly gross × 12 when absent.
    #[serde(default)]
    pub projected_annual_income: Option<Decimal>,
    /// TDS already deducted in the current financial year.
    #[serde(default)]
    pub deducted_to_date: Decimal,
}

/// The statutory settings for one employee.
///
/// # Example
///
/// ```
/// use statutory_engine::models::EmployeeStatutoryProfile;
///
/// let profile: EmployeeStatutoryProfile = serde_json::from_str(r#"{
///     "employee_id": "emp_001",
///     "org_unit": { "cost_center_id": "cc_blr" },
///     "work_state": "KA",
///     "pf": { "enabled": true, "uan": "100200300400" },
///     "professional_tax": true
/// }"#).unwrap();
///
/// assert!(profile.pf.enabled);
/// assert!(!profile.esi.enabled);
/// assert!(profile.professional_tax);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmployeeStatutoryProfile {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// Age and gender used by slab selection.
    #[serde(flatten)]
    pub person: PersonAttributes,
    /// Organizational placement used for group mapping.
    #[serde(default)]
    pub org_unit: OrgUnit,
    /// State the employee works in (PT fallback and LWF jurisdiction).
    #[serde(default)]
    pub work_state: Option<String>,
    /// Provident fund enrollment.
    #[serde(default)]
    pub pf: PfEnrollment,
    /// ESI enrollment.
    #[serde(default)]
    pub esi: EsiEnrollment,
    /// Whether professional tax is deducted.
    #[serde(default)]
    pub professional_tax: bool,
    /// Whether labour welfare fund is deducted.
    #[serde(default)]
    pub labour_welfare_fund: bool,
    /// Income tax enrollment.
    #[serde(default)]
    pub income_tax: IncomeTaxEnrollment,
}

/// The gross pay components for one employee and pay period.
///
/// Allowances are kept in an ordered map so iteration, and therefore any
/// derived total, is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrossComponents {
    /// Basic pay.
    pub basic: Decimal,
    /// Named allowances (HRA, DA, special allowance, ...).
    #[serde(default)]
    pub allowances: BTreeMap<String, Decimal>,
}

impl GrossComponents {
    /// Creates components with basic pay only.
    pub fn basic_only(basic: Decimal) -> Self {
        Self {
            basic,
            allowances: BTreeMap::new(),
        }
    }

    /// Adds an allowance, returning the updated components.
    pub fn with_allowance(mut self, name: impl Into<String>, amount: Decimal) -> Self {
        self.allowances.insert(name.into(), amount);
        self
    }

    /// Basic plus every allowance.
    ///
    /// # Errors
    ///
    /// `CalculationOverflow` when the sum exceeds the decimal range.
    pub fn gross(&self) -> EngineResult<Decimal> {
        self.allowances
            .values()
            .try_fold(self.basic, |total, amount| total.checked_add(*amount))
            .ok_or_else(|| EngineError::CalculationOverflow {
                context: "gross pay".to_string(),
            })
    }

    /// The wage for a given basis.
    pub fn wage_for(&self, basis: WageBasis) -> EngineResult<Decimal> {
        match basis {
            WageBasis::Basic => Ok(self.basic),
            WageBasis::Gross => self.gross(),
        }
    }

    /// Rejects negative components.
    pub fn validate(&self) -> EngineResult<()> {
        if self.basic < Decimal::ZERO {
            return Err(EngineError::InvalidAmount {
                field: "basic".to_string(),
                message: format!("must not be negative, got {}", self.basic),
            });
        }
        if let Some((name, amount)) = self.allowances.iter().find(|(_, a)| **a < Decimal::ZERO) {
            return Err(EngineError::InvalidAmount {
                field: format!("allowances.{}", name),
                message: format!("must not be negative, got {}", amount),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_gross_sums_allowances() {
        let components = GrossComponents::basic_only(dec("15000"))
            .with_allowance("hra", dec("6000"))
            .with_allowance("special", dec("2500.50"));

        assert_eq!(components.gross().unwrap(), dec("23500.50"));
        assert_eq!(components.wage_for(WageBasis::Basic).unwrap(), dec("15000"));
        assert_eq!(components.wage_for(WageBasis::Gross).unwrap(), dec("23500.50"));
    }

    #[test]
    fn test_gross_overflow_is_an_error() {
        let components = GrossComponents::basic_only(Decimal::MAX).with_allowance("hra", dec("1"));

        match components.gross() {
            Err(EngineError::CalculationOverflow { context }) => {
                assert_eq!(context, "gross pay");
            }
            other => panic!("Expected CalculationOverflow, got {:?}", other),
        }
        assert_eq!(components.wage_for(WageBasis::Basic).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_negative_allowance_rejected() {
        let components =
            GrossComponents::basic_only(dec("15000")).with_allowance("hra", dec("-1"));

        match components.validate() {
            Err(EngineError::InvalidAmount { field, .. }) => {
                assert_eq!(field, "allowances.hra");
            }
            other => panic!("Expected InvalidAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_basic_rejected() {
        let components = GrossComponents::basic_only(dec("-100"));
        assert!(components.validate().is_err());
    }

    #[test]
    fn test_org_unit_display() {
        let unit = OrgUnit {
            cost_center_id: Some("cc1".to_string()),
            location_id: None,
            unit_id: Some("u9".to_string()),
        };
        assert_eq!(unit.to_string(), "cost_center=cc1, unit=u9");
        assert_eq!(OrgUnit::default().to_string(), "(unassigned)");
    }

    #[test]
    fn test_deserialize_profile_defaults() {
        let json = r#"{
            "employee_id": "emp_002",
            "date_of_birth": "1985-05-20",
            "gender": "female",
            "esi": { "enabled": true },
            "income_tax": { "enabled": true, "regime": "old", "deducted_to_date": "1200" }
        }"#;

        let profile: EmployeeStatutoryProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.employee_id, "emp_002");
        assert!(profile.person.date_of_birth.is_some());
        assert_eq!(profile.esi.wage_basis, WageBasis::Gross);
        assert_eq!(profile.pf.wage_basis, WageBasis::Basic);
        assert_eq!(profile.income_tax.regime, TaxRegime::Old);
        assert_eq!(profile.income_tax.deducted_to_date, dec("1200"));
        assert!(!profile.labour_welfare_fund);
    }
}

//! Fiscal-month fixed amount lookup for PT and LWF.

use rust_decimal::Decimal;

use crate::config::{MonthlyAmounts, MonthlySlab};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, DeductionBasis, FiscalCalendar};

/// The employee and employer amounts for one month.
#[derive(Debug, Clone)]
pub struct MonthlyFixedResult {
    /// The fiscal slot looked up (0 = first month of the financial year).
    pub fiscal_slot: usize,
    /// Employee amount, unrounded.
    pub employee_amount: Decimal,
    /// Employer amount, unrounded; zero when the slab has no employer map.
    pub employer_amount: Decimal,
    /// The audit step recording this lookup.
    pub audit_step: AuditStep,
}

/// The raw value configured for a calendar month.
///
/// A month without a value resolves to zero.
///
/// # Errors
///
/// Returns `InvalidMonth` if `calendar_month` is outside 1-12.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::amount_for;
/// use statutory_engine::config::MonthlyAmounts;
/// use statutory_engine::models::FiscalCalendar;
/// use rust_decimal::Decimal;
///
/// let calendar = FiscalCalendar::default();
/// let amounts = MonthlyAmounts::uniform(Decimal::ZERO)
///     .with_slot(calendar.slot(6).unwrap(), Some(Decimal::from(12)));
///
/// assert_eq!(amount_for(&amounts, &calendar, 6).unwrap(), Decimal::from(12));
/// assert_eq!(amount_for(&amounts, &calendar, 1).unwrap(), Decimal::ZERO);
/// assert!(amount_for(&amounts, &calendar, 13).is_err());
/// ```
pub fn amount_for(
    amounts: &MonthlyAmounts,
    calendar: &FiscalCalendar,
    calendar_month: u32,
) -> EngineResult<Decimal> {
    let slot = calendar.slot(calendar_month)?;
    Ok(amounts.get(slot).unwrap_or(Decimal::ZERO))
}

/// Looks up the employee and employer amounts of a monthly slab.
///
/// For `rate` slabs the configured values are percentages of `monthly_wage`;
/// for `fixed` slabs they are the amounts themselves.
///
/// # Arguments
///
/// * `slab` - The resolved PT or LWF slab
/// * `calendar` - The snapshot's fiscal calendar
/// * `calendar_month` - The pay period's calendar month (1-12)
/// * `monthly_wage` - The wage a `rate` slab applies to
/// * `step_number` - The step number for audit trail sequencing
pub fn lookup_monthly(
    slab: &MonthlySlab,
    calendar: &FiscalCalendar,
    calendar_month: u32,
    monthly_wage: Decimal,
    step_number: u32,
) -> EngineResult<MonthlyFixedResult> {
    let fiscal_slot = calendar.slot(calendar_month)?;
    let employee_value = amount_for(&slab.employee, calendar, calendar_month)?;
    let employer_value = match &slab.employer {
        Some(employer) => amount_for(employer, calendar, calendar_month)?,
        None => Decimal::ZERO,
    };

    let apply = |value: Decimal| -> EngineResult<Decimal> {
        match slab.deduction_basis {
            DeductionBasis::Fixed => Ok(value),
            DeductionBasis::Rate => monthly_wage
                .checked_mul(value)
                .map(|product| product / Decimal::ONE_HUNDRED)
                .ok_or_else(|| EngineError::CalculationOverflow {
                    context: format!("{} rate on wage {}", slab.statutory_type, monthly_wage),
                }),
        }
    };
    let employee_amount = apply(employee_value)?;
    let employer_amount = apply(employer_value)?;

    let month = calendar.month_at(fiscal_slot);
    let basis = match slab.deduction_basis {
        DeductionBasis::Fixed => "fixed",
        DeductionBasis::Rate => "rate",
    };

    let reasoning = match slab.deduction_basis {
        DeductionBasis::Fixed => format!(
            "{} {} (fiscal month {}): employee {}, employer {}",
            slab.statutory_type,
            month.key(),
            fiscal_slot + 1,
            employee_amount.normalize(),
            employer_amount.normalize()
        ),
        DeductionBasis::Rate => format!(
            "{} {} (fiscal month {}): wage {} × {}% = {}",
            slab.statutory_type,
            month.key(),
            fiscal_slot + 1,
            monthly_wage.normalize(),
            employee_value.normalize(),
            employee_amount.normalize()
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "monthly_fixed_lookup".to_string(),
        rule_name: "Fiscal Month Amount Lookup".to_string(),
        source_ref: slab.id.clone(),
        input: serde_json::json!({
            "calendar_month": calendar_month,
            "fiscal_slot": fiscal_slot,
            "deduction_basis": basis,
            "monthly_wage": monthly_wage.normalize().to_string()
        }),
        output: serde_json::json!({
            "employee_amount": employee_amount.normalize().to_string(),
            "employer_amount": employer_amount.normalize().to_string()
        }),
        reasoning,
    };

    Ok(MonthlyFixedResult {
        fiscal_slot,
        employee_amount,
        employer_amount,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ValidityWindow, WageBand};
    use crate::models::{FinancialYear, PersonType, StatutoryType};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lwf_slab(calendar: &FiscalCalendar) -> MonthlySlab {
        let jun = calendar.slot(6).unwrap();
        let dec_slot = calendar.slot(12).unwrap();
        let employee = MonthlyAmounts::uniform(dec("0"))
            .with_slot(jun, Some(dec("12")))
            .with_slot(dec_slot, Some(dec("12")));
        let employer = MonthlyAmounts::uniform(dec("0"))
            .with_slot(jun, Some(dec("36")))
            .with_slot(dec_slot, Some(dec("36")));
        MonthlySlab {
            id: "lwf_mh".to_string(),
            serial_number: 1,
            statutory_type: StatutoryType::LabourWelfareFund,
            jurisdiction: "MH".to_string(),
            person_type: PersonType::All,
            deduction_basis: DeductionBasis::Fixed,
            wage_band: None,
            validity: ValidityWindow::starting(FinancialYear(2025)),
            employee,
            employer: Some(employer),
        }
    }

    #[test]
    fn test_lwf_january_explicit_zero() {
        let calendar = FiscalCalendar::default();
        let result = lookup_monthly(&lwf_slab(&calendar), &calendar, 1, dec("50000"), 3).unwrap();

        assert_eq!(result.fiscal_slot, 9);
        assert_eq!(result.employee_amount, dec("0"));
        assert_eq!(result.employer_amount, dec("0"));
    }

    #[test]
    fn test_lwf_june_employee_and_employer() {
        let calendar = FiscalCalendar::default();
        let result = lookup_monthly(&lwf_slab(&calendar), &calendar, 6, dec("50000"), 3).unwrap();

        assert_eq!(result.fiscal_slot, 2);
        assert_eq!(result.employee_amount, dec("12"));
        assert_eq!(result.employer_amount, dec("36"));
        assert_eq!(result.audit_step.rule_id, "monthly_fixed_lookup");
        assert_eq!(result.audit_step.output["employer_amount"], "36");
    }

    #[test]
    fn test_missing_month_resolves_to_zero() {
        let calendar = FiscalCalendar::default();
        let amounts = MonthlyAmounts::default().with_slot(0, Some(dec("200")));
        assert_eq!(amount_for(&amounts, &calendar, 4).unwrap(), dec("200"));
        assert_eq!(amount_for(&amounts, &calendar, 5).unwrap(), dec("0"));
    }

    #[test]
    fn test_missing_employer_map_resolves_to_zero() {
        let calendar = FiscalCalendar::default();
        let mut slab = lwf_slab(&calendar);
        slab.employer = None;
        let result = lookup_monthly(&slab, &calendar, 6, dec("50000"), 1).unwrap();
        assert_eq!(result.employer_amount, dec("0"));
    }

    #[test]
    fn test_invalid_month_rejected() {
        let calendar = FiscalCalendar::default();
        let result = lookup_monthly(&lwf_slab(&calendar), &calendar, 0, dec("50000"), 1);
        assert!(matches!(result, Err(EngineError::InvalidMonth { month: 0 })));
    }

    #[test]
    fn test_custom_fiscal_start() {
        let calendar = FiscalCalendar::new(1).unwrap();
        let amounts = MonthlyAmounts::default().with_slot(0, Some(dec("5")));
        assert_eq!(amount_for(&amounts, &calendar, 1).unwrap(), dec("5"));
        assert_eq!(amount_for(&amounts, &calendar, 4).unwrap(), dec("0"));
    }

    #[test]
    fn test_rate_basis_applies_to_wage() {
        let calendar = FiscalCalendar::default();
        let slab = MonthlySlab {
            id: "lwf_rate".to_string(),
            serial_number: 1,
            statutory_type: StatutoryType::LabourWelfareFund,
            jurisdiction: "KL".to_string(),
            person_type: PersonType::All,
            deduction_basis: DeductionBasis::Rate,
            wage_band: Some(WageBand {
                min: dec("0"),
                max: None,
            }),
            validity: ValidityWindow::starting(FinancialYear(2025)),
            employee: MonthlyAmounts::uniform(dec("0.2")),
            employer: Some(MonthlyAmounts::uniform(dec("0.4"))),
        };

        let result = lookup_monthly(&slab, &calendar, 8, dec("25000"), 1).unwrap();
        assert_eq!(result.employee_amount, dec("50"));
        assert_eq!(result.employer_amount, dec("100"));
        assert!(result.audit_step.reasoning.contains("25000 × 0.2%"));
    }
}

//! Income tax (TDS) calculation.
//!
//! Annual tax is computed on projected annual income using the resolved
//! schedule; the monthly deduction spreads whatever is still owed over the
//! months left in the financial year.

use rust_decimal::Decimal;

use crate::config::TaxSlabSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BracketContribution};

use super::progressive::compute_progressive;

/// The annual tax liability on projected income.
#[derive(Debug, Clone)]
pub struct AnnualTaxResult {
    /// Projected annual income before the standard deduction.
    pub annual_income: Decimal,
    /// Income the brackets apply to.
    pub taxable_income: Decimal,
    /// Tax from the brackets.
    pub bracket_tax: Decimal,
    /// Rebate subtracted from the bracket tax.
    pub rebate: Decimal,
    /// Cess added after the rebate.
    pub cess: Decimal,
    /// Total annual liability.
    pub annual_tax: Decimal,
    /// Per-bracket breakdown.
    pub breakdown: Vec<BracketContribution>,
    /// The audit steps recording this calculation.
    pub audit_steps: Vec<AuditStep>,
}

/// Calculates annual income tax.
///
/// `taxable = max(0, annual_income - standard_deduction)`; the brackets are
/// applied to `taxable`; a configured rebate of up to `max_rebate` cancels
/// tax when `taxable` is within the rebate's income limit; cess is then
/// charged on the remaining tax.
///
/// Steps are numbered from `first_step`.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::calculate_annual_tax;
/// use statutory_engine::config::{TaxSlabSet, ValidityWindow};
/// use statutory_engine::models::{BracketSet, FinancialYear, PersonType, TaxBracket, TaxRegime};
/// use rust_decimal::Decimal;
///
/// let slab = TaxSlabSet {
///     id: "new_fy2025".to_string(),
///     serial_number: 1,
///     regime: TaxRegime::New,
///     person_type: PersonType::All,
///     validity: ValidityWindow::starting(FinancialYear(2025)),
///     brackets: BracketSet::new("new_fy2025", vec![
///         TaxBracket::bounded(Decimal::ZERO, Decimal::from(300_000), Decimal::ZERO),
///         TaxBracket::bounded(Decimal::from(300_000), Decimal::from(600_000), Decimal::from(5)),
///         TaxBracket::unbounded(Decimal::from(600_000), Decimal::from(10)),
///     ]).unwrap(),
///     standard_deduction: Decimal::ZERO,
///     rebate: None,
///     cess_percent: Decimal::ZERO,
/// };
///
/// let result = calculate_annual_tax(&slab, Decimal::from(750_000), 1).unwrap();
/// assert_eq!(result.annual_tax, Decimal::from(30_000));
/// ```
pub fn calculate_annual_tax(
    slab: &TaxSlabSet,
    annual_income: Decimal,
    first_step: u32,
) -> EngineResult<AnnualTaxResult> {
    if annual_income < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            field: "annual_income".to_string(),
            message: format!("projected annual income {} is negative", annual_income),
        });
    }

    let taxable_income = (annual_income - slab.standard_deduction).max(Decimal::ZERO);
    let progressive = compute_progressive(taxable_income, &slab.brackets, &slab.id, first_step)?;
    let bracket_tax = progressive.total;

    let rebate = match &slab.rebate {
        Some(rebate) if taxable_income <= rebate.income_limit => bracket_tax.min(rebate.max_rebate),
        _ => Decimal::ZERO,
    };
    let after_rebate = bracket_tax - rebate;
    let cess = after_rebate
        .checked_mul(slab.cess_percent)
        .map(|product| product / Decimal::ONE_HUNDRED)
        .ok_or_else(|| EngineError::CalculationOverflow {
            context: format!("cess on {}", after_rebate),
        })?;
    let annual_tax = after_rebate + cess;

    let adjustment_step = AuditStep {
        step_number: first_step + 1,
        rule_id: "annual_tax_adjustments".to_string(),
        rule_name: "Standard Deduction, Rebate and Cess".to_string(),
        source_ref: slab.id.clone(),
        input: serde_json::json!({
            "annual_income": annual_income.normalize().to_string(),
            "standard_deduction": slab.standard_deduction.normalize().to_string(),
            "bracket_tax": bracket_tax.normalize().to_string(),
            "cess_percent": slab.cess_percent.normalize().to_string()
        }),
        output: serde_json::json!({
            "taxable_income": taxable_income.normalize().to_string(),
            "rebate": rebate.normalize().to_string(),
            "cess": cess.normalize().to_string(),
            "annual_tax": annual_tax.normalize().to_string()
        }),
        reasoning: format!(
            "Taxable {} = {} − {}; tax {} − rebate {} + cess {} = {}",
            taxable_income.normalize(),
            annual_income.normalize(),
            slab.standard_deduction.normalize(),
            bracket_tax.normalize(),
            rebate.normalize(),
            cess.normalize(),
            annual_tax.normalize()
        ),
    };

    Ok(AnnualTaxResult {
        annual_income,
        taxable_income,
        bracket_tax,
        rebate,
        cess,
        annual_tax,
        breakdown: progressive.breakdown,
        audit_steps: vec![progressive.audit_step, adjustment_step],
    })
}

/// The deduction for the current month.
#[derive(Debug, Clone)]
pub struct MonthlyTdsResult {
    /// Tax still owed for the year.
    pub remaining_tax: Decimal,
    /// Amount to deduct this month, unrounded.
    pub monthly_amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Spreads the remaining annual tax over the months left in the year.
///
/// `monthly = max(0, annual_tax - deducted_to_date) / months_remaining`.
/// `months_remaining` counts the current month, so it is at least 1.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::calculate_monthly_tds;
/// use rust_decimal::Decimal;
///
/// let result = calculate_monthly_tds(Decimal::from(30_000), Decimal::from(6_000), 3, "new_fy2025", 1).unwrap();
/// assert_eq!(result.monthly_amount, Decimal::from(8_000));
/// ```
pub fn calculate_monthly_tds(
    annual_tax: Decimal,
    deducted_to_date: Decimal,
    months_remaining: u32,
    source_ref: &str,
    step_number: u32,
) -> EngineResult<MonthlyTdsResult> {
    if deducted_to_date < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            field: "deducted_to_date".to_string(),
            message: format!("TDS deducted to date {} is negative", deducted_to_date),
        });
    }
    if months_remaining == 0 {
        return Err(EngineError::InvalidAmount {
            field: "months_remaining".to_string(),
            message: "no months remain in the financial year".to_string(),
        });
    }

    let remaining_tax = (annual_tax - deducted_to_date).max(Decimal::ZERO);
    let monthly_amount = remaining_tax / Decimal::from(months_remaining);

    let audit_step = AuditStep {
        step_number,
        rule_id: "monthly_tds".to_string(),
        rule_name: "Monthly TDS Spread".to_string(),
        source_ref: source_ref.to_string(),
        input: serde_json::json!({
            "annual_tax": annual_tax.normalize().to_string(),
            "deducted_to_date": deducted_to_date.normalize().to_string(),
            "months_remaining": months_remaining
        }),
        output: serde_json::json!({
            "remaining_tax": remaining_tax.normalize().to_string(),
            "monthly_amount": monthly_amount.normalize().to_string()
        }),
        reasoning: format!(
            "({} − {} already deducted) ÷ {} month(s) = {}",
            annual_tax.normalize(),
            deducted_to_date.normalize(),
            months_remaining,
            monthly_amount.normalize()
        ),
    };

    Ok(MonthlyTdsResult {
        remaining_tax,
        monthly_amount,
        audit_step,
    })
}

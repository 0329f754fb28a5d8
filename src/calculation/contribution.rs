//! Rate-based PF and ESI contribution calculation.

use rust_decimal::Decimal;

use crate::config::ContributionScheme;
use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

/// Computed employee and employer shares.
#[derive(Debug, Clone)]
pub struct ContributionAmounts {
    /// The wage the rates were applied to, after any ceiling.
    pub wage_base: Decimal,
    /// Whether the wage ceiling reduced the base.
    pub ceiling_applied: bool,
    /// Employee share, unrounded.
    pub employee_amount: Decimal,
    /// Employer share, unrounded.
    pub employer_amount: Decimal,
}

/// The outcome of a contribution calculation.
#[derive(Debug, Clone)]
pub enum ContributionResult {
    /// Contributions are due.
    Computed {
        /// The computed shares.
        amounts: ContributionAmounts,
        /// The audit step recording this calculation.
        audit_step: AuditStep,
    },
    /// The wage exceeds the scheme's eligibility limit.
    NotEligible {
        /// Why the employee is not covered.
        reason: String,
        /// The audit step recording the check.
        audit_step: AuditStep,
    },
}

/// Calculates PF or ESI contributions on a monthly wage.
///
/// When the scheme has an eligibility limit and the wage exceeds it, the
/// employee is not covered. Otherwise the wage is truncated to the scheme's
/// wage ceiling (unless `contribute_on_actual_wage` is set) and both rates
/// are applied to the result.
///
/// # Arguments
///
/// * `scheme` - The resolved contribution scheme
/// * `wage` - The monthly wage on the employee's wage basis
/// * `contribute_on_actual_wage` - Whether the employee opted out of the ceiling
/// * `step_number` - The step number for audit trail sequencing
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::{calculate_contribution, ContributionResult};
/// use statutory_engine::config::{ContributionScheme, ValidityWindow};
/// use statutory_engine::models::{FinancialYear, StatutoryType};
/// use rust_decimal::Decimal;
///
/// let scheme = ContributionScheme {
///     id: "pf_2014".to_string(),
///     serial_number: 1,
///     statutory_type: StatutoryType::ProvidentFund,
///     validity: ValidityWindow::starting(FinancialYear(2014)),
///     employee_rate_percent: Decimal::from(12),
///     employer_rate_percent: Decimal::from(12),
///     wage_ceiling: Some(Decimal::from(15_000)),
///     eligibility_limit: None,
/// };
///
/// match calculate_contribution(&scheme, Decimal::from(40_000), false, 1).unwrap() {
///     ContributionResult::Computed { amounts, .. } => {
///         // 12% of the 15000 ceiling
///         assert_eq!(amounts.employee_amount, Decimal::from(1_800));
///         assert!(amounts.ceiling_applied);
///     }
///     ContributionResult::NotEligible { .. } => unreachable!(),
/// }
/// ```
pub fn calculate_contribution(
    scheme: &ContributionScheme,
    wage: Decimal,
    contribute_on_actual_wage: bool,
    step_number: u32,
) -> EngineResult<ContributionResult> {
    if wage < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            field: "contribution_wage".to_string(),
            message: format!("wage {} is negative", wage),
        });
    }

    if let Some(limit) = scheme.eligibility_limit {
        if wage > limit {
            let reason = format!(
                "Wage {} exceeds {} eligibility limit {}",
                wage.normalize(),
                scheme.statutory_type,
                limit.normalize()
            );
            let audit_step = AuditStep {
                step_number,
                rule_id: "contribution_eligibility".to_string(),
                rule_name: "Contribution Eligibility".to_string(),
                source_ref: scheme.id.clone(),
                input: serde_json::json!({
                    "wage": wage.normalize().to_string(),
                    "eligibility_limit": limit.normalize().to_string()
                }),
                output: serde_json::json!({ "eligible": false }),
                reasoning: reason.clone(),
            };
            return Ok(ContributionResult::NotEligible { reason, audit_step });
        }
    }

    let (wage_base, ceiling_applied) = match scheme.wage_ceiling {
        Some(ceiling) if wage > ceiling && !contribute_on_actual_wage => (ceiling, true),
        _ => (wage, false),
    };

    let share = |rate: Decimal| -> EngineResult<Decimal> {
        wage_base
            .checked_mul(rate)
            .map(|product| product / Decimal::ONE_HUNDRED)
            .ok_or_else(|| EngineError::CalculationOverflow {
                context: format!("{} contribution on {}", scheme.statutory_type, wage_base),
            })
    };
    let employee_amount = share(scheme.employee_rate_percent)?;
    let employer_amount = share(scheme.employer_rate_percent)?;

    let base_note = if ceiling_applied {
        format!(
            "wage {} capped at ceiling {}",
            wage.normalize(),
            wage_base.normalize()
        )
    } else {
        format!("wage {}", wage_base.normalize())
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "contribution_rate".to_string(),
        rule_name: "Contribution Rate".to_string(),
        source_ref: scheme.id.clone(),
        input: serde_json::json!({
            "wage": wage.normalize().to_string(),
            "wage_ceiling": scheme.wage_ceiling.map(|c| c.normalize().to_string()),
            "contribute_on_actual_wage": contribute_on_actual_wage,
            "employee_rate_percent": scheme.employee_rate_percent.normalize().to_string(),
            "employer_rate_percent": scheme.employer_rate_percent.normalize().to_string()
        }),
        output: serde_json::json!({
            "wage_base": wage_base.normalize().to_string(),
            "employee_amount": employee_amount.normalize().to_string(),
            "employer_amount": employer_amount.normalize().to_string()
        }),
        reasoning: format!(
            "{}: {}; employee {}% = {}, employer {}% = {}",
            scheme.statutory_type,
            base_note,
            scheme.employee_rate_percent.normalize(),
            employee_amount.normalize(),
            scheme.employer_rate_percent.normalize(),
            employer_amount.normalize()
        ),
    };

    Ok(ContributionResult::Computed {
        amounts: ContributionAmounts {
            wage_base,
            ceiling_applied,
            employee_amount,
            employer_amount,
        },
        audit_step,
    })
}

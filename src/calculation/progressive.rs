//! Progressive bracket calculation.
//!
//! This module applies a validated [`BracketSet`] to an amount, taxing each
//! portion of the amount at the rate of the bracket it falls in.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, BracketContribution, BracketSet};

/// The result of a progressive calculation.
#[derive(Debug, Clone)]
pub struct ProgressiveResult {
    /// Sum of all bracket contributions, unrounded.
    pub total: Decimal,
    /// One entry per bracket the amount reached, in ascending order.
    pub breakdown: Vec<BracketContribution>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Applies progressive brackets to an amount.
///
/// For each bracket whose lower limit is below `amount`, the portion
/// `min(amount, upper) - lower` is taxed at the bracket's rate. Iteration
/// stops at the first bracket whose lower limit is at or above the amount,
/// so an amount exactly equal to an upper limit is taxed entirely within
/// that bracket.
///
/// # Arguments
///
/// * `amount` - The amount to tax (must not be negative)
/// * `brackets` - The validated bracket set
/// * `source_ref` - The slab id recorded on the audit step
/// * `step_number` - The step number for audit trail sequencing
///
/// # Errors
///
/// Returns `InvalidAmount` for a negative amount and `CalculationOverflow`
/// if decimal arithmetic overflows.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::compute_progressive;
/// use statutory_engine::models::{BracketSet, TaxBracket};
/// use rust_decimal::Decimal;
///
/// let brackets = BracketSet::new("new_regime", vec![
///     TaxBracket::bounded(Decimal::ZERO, Decimal::from(300_000), Decimal::ZERO),
///     TaxBracket::bounded(Decimal::from(300_000), Decimal::from(600_000), Decimal::from(5)),
///     TaxBracket::unbounded(Decimal::from(600_000), Decimal::from(10)),
/// ]).unwrap();
///
/// let result = compute_progressive(Decimal::from(750_000), &brackets, "new_regime", 1).unwrap();
/// // 300000 × 5% + 150000 × 10% = 30000
/// assert_eq!(result.total, Decimal::from(30_000));
/// assert_eq!(result.breakdown.len(), 3);
/// ```
pub fn compute_progressive(
    amount: Decimal,
    brackets: &BracketSet,
    source_ref: &str,
    step_number: u32,
) -> EngineResult<ProgressiveResult> {
    if amount < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            field: "taxable_amount".to_string(),
            message: format!("cannot apply brackets to negative amount {}", amount),
        });
    }

    let overflow = || EngineError::CalculationOverflow {
        context: format!("progressive tax on {}", amount),
    };

    let mut total = Decimal::ZERO;
    let mut breakdown = Vec::new();

    for (index, bracket) in brackets.brackets().iter().enumerate() {
        if bracket.lower_limit >= amount {
            break;
        }
        let taxable_portion = bracket.upper_limit.cap(amount) - bracket.lower_limit;
        let contribution = taxable_portion
            .checked_mul(bracket.rate_percent)
            .ok_or_else(overflow)?
            / Decimal::ONE_HUNDRED;
        total = total.checked_add(contribution).ok_or_else(overflow)?;

        breakdown.push(BracketContribution {
            bracket_index: index,
            lower_limit: bracket.lower_limit,
            upper_limit: bracket.upper_limit,
            rate_percent: bracket.rate_percent,
            taxable_portion,
            amount: contribution,
        });
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "progressive_brackets".to_string(),
        rule_name: "Progressive Bracket Calculation".to_string(),
        source_ref: source_ref.to_string(),
        input: serde_json::json!({
            "amount": amount.normalize().to_string(),
            "bracket_count": brackets.len()
        }),
        output: serde_json::json!({
            "total": total.normalize().to_string(),
            "brackets_applied": breakdown.len()
        }),
        reasoning: describe(&breakdown, total),
    };

    Ok(ProgressiveResult {
        total,
        breakdown,
        audit_step,
    })
}

fn describe(breakdown: &[BracketContribution], total: Decimal) -> String {
    let taxed: Vec<String> = breakdown
        .iter()
        .filter(|c| c.rate_percent > Decimal::ZERO)
        .map(|c| {
            format!(
                "{} × {}%",
                c.taxable_portion.normalize(),
                c.rate_percent.normalize()
            )
        })
        .collect();
    if taxed.is_empty() {
        format!("No taxable portion above zero-rate brackets; total {}", total.normalize())
    } else {
        format!("{} = {}", taxed.join(" + "), total.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaxBracket, UpperLimit};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn three_brackets() -> BracketSet {
        BracketSet::new(
            "slab_1",
            vec![
                TaxBracket::bounded(dec("0"), dec("300000"), dec("0")),
                TaxBracket::bounded(dec("300000"), dec("600000"), dec("5")),
                TaxBracket::unbounded(dec("600000"), dec("10")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_regime_example_750000() {
        let result = compute_progressive(dec("750000"), &three_brackets(), "slab_1", 1).unwrap();

        assert_eq!(result.total, dec("30000"));
        assert_eq!(result.breakdown.len(), 3);
        assert_eq!(result.breakdown[0].amount, dec("0"));
        assert_eq!(result.breakdown[1].taxable_portion, dec("300000"));
        assert_eq!(result.breakdown[1].amount, dec("15000"));
        assert_eq!(result.breakdown[2].taxable_portion, dec("150000"));
        assert_eq!(result.breakdown[2].amount, dec("15000"));
        assert_eq!(result.breakdown[2].upper_limit, UpperLimit::Unbounded);
    }

    #[test]
    fn test_amount_at_upper_limit_stays_in_bracket() {
        let result = compute_progressive(dec("600000"), &three_brackets(), "slab_1", 1).unwrap();

        assert_eq!(result.total, dec("15000"));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[1].taxable_portion, dec("300000"));
    }

    #[test]
    fn test_amount_just_above_upper_limit_enters_next_bracket() {
        let result = compute_progressive(dec("600001"), &three_brackets(), "slab_1", 1).unwrap();

        assert_eq!(result.breakdown.len(), 3);
        assert_eq!(result.breakdown[2].taxable_portion, dec("1"));
        assert_eq!(result.total, dec("15000.1"));
    }

    #[test]
    fn test_zero_amount_has_no_breakdown() {
        let result = compute_progressive(dec("0"), &three_brackets(), "slab_1", 1).unwrap();
        assert_eq!(result.total, dec("0"));
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_fractional_amounts_are_exact() {
        let result = compute_progressive(dec("300000.10"), &three_brackets(), "slab_1", 1).unwrap();
        assert_eq!(result.total, dec("0.005"));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = compute_progressive(dec("-1"), &three_brackets(), "slab_1", 1);
        match result {
            Err(EngineError::InvalidAmount { field, .. }) => {
                assert_eq!(field, "taxable_amount");
            }
            other => panic!("Expected InvalidAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_audit_step_records_calculation() {
        let result = compute_progressive(dec("750000"), &three_brackets(), "slab_1", 4).unwrap();
        let step = &result.audit_step;

        assert_eq!(step.step_number, 4);
        assert_eq!(step.rule_id, "progressive_brackets");
        assert_eq!(step.source_ref, "slab_1");
        assert_eq!(step.input["amount"], "750000");
        assert_eq!(step.output["total"], "30000");
        assert!(step.reasoning.contains("300000 × 5%"));
    }
}

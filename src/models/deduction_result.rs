//! Deduction result models.
//!
//! This module contains the [`DeductionResult`] type and its associated
//! structures that capture all outputs of a statutory calculation: the
//! matched slab and group, the computed amounts, the bracket breakdown and an
//! audit trail for every decision.
//!
//! Results contain no timestamps, random ids or hash-ordered collections, so
//! identical inputs always serialize to identical bytes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorCategory};

use super::bracket::UpperLimit;
use super::fiscal::FinancialYear;
use super::pay_period::PayPeriod;
use super::statutory::StatutoryType;

/// A single step in the audit trail recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number within one statutory type.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The configuration record (slab, scheme or group id) the rule used.
    pub source_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The portion of an amount that fell inside one bracket.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{BracketContribution, UpperLimit};
/// use rust_decimal::Decimal;
///
/// let contribution = BracketContribution {
///     bracket_index: 1,
///     lower_limit: Decimal::from(300_000),
///     upper_limit: UpperLimit::Bounded(Decimal::from(600_000)),
///     rate_percent: Decimal::from(5),
///     taxable_portion: Decimal::from(300_000),
///     amount: Decimal::from(15_000),
/// };
/// assert_eq!(contribution.amount, Decimal::from(15_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketContribution {
    /// Zero-based position of the bracket in its set.
    pub bracket_index: usize,
    /// The bracket's lower limit.
    pub lower_limit: Decimal,
    /// The bracket's upper limit.
    pub upper_limit: UpperLimit,
    /// The bracket's rate in percent.
    pub rate_percent: Decimal,
    /// How much of the amount fell inside the bracket.
    pub taxable_portion: Decimal,
    /// `taxable_portion × rate_percent / 100`.
    pub amount: Decimal,
}

/// Identifies the configuration record a deduction was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabIdentity {
    /// The record id.
    pub id: String,
    /// The record's serial number.
    pub serial_number: u32,
    /// First financial year the record is valid for.
    pub valid_from: FinancialYear,
    /// First financial year the record is no longer valid for, if bounded.
    pub valid_until: Option<FinancialYear>,
}

/// Identifies the statutory group a deduction is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupIdentity {
    /// The group id.
    pub id: String,
    /// The group name.
    pub name: String,
    /// The government registration number shared by the group.
    pub registration_number: String,
}

/// A successfully computed deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedDeduction {
    /// The amount fed into the calculation (wage or annual income).
    pub input_amount: Decimal,
    /// The amount the rate or slab was applied to, after basis, ceiling and deductions.
    pub wage_base: Decimal,
    /// The slab, schedule or scheme used.
    pub slab: SlabIdentity,
    /// The statutory group, for group-scoped deductions.
    pub group: Option<GroupIdentity>,
    /// The rounded amount deducted from the employee.
    pub employee_amount: Decimal,
    /// The rounded amount contributed by the employer.
    pub employer_amount: Decimal,
    /// Per-bracket breakdown for progressive calculations.
    pub breakdown: Vec<BracketContribution>,
    /// The decisions made while computing the deduction.
    pub audit_steps: Vec<AuditStep>,
    /// Any warnings raised along the way.
    pub warnings: Vec<AuditWarning>,
}

/// A deduction that could not be computed.
///
/// Carries enough context to diagnose the problem without re-deriving state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionFailure {
    /// The error category.
    pub category: ErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Configuration ids involved (competing slabs or groups).
    pub candidate_ids: Vec<String>,
    /// The employee the failure belongs to.
    pub employee_id: String,
    /// The statutory type that failed.
    pub statutory_type: StatutoryType,
    /// The configuration snapshot version in force.
    pub config_version: String,
}

impl DeductionFailure {
    /// Captures an engine error with its employee and configuration context.
    pub fn from_error(
        error: &EngineError,
        employee_id: &str,
        statutory_type: StatutoryType,
        config_version: &str,
    ) -> Self {
        Self {
            category: error.category(),
            code: error.code().to_string(),
            message: error.to_string(),
            candidate_ids: error.candidate_ids(),
            employee_id: employee_id.to_string(),
            statutory_type,
            config_version: config_version.to_string(),
        }
    }
}

/// The outcome of one statutory type for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeductionOutcome {
    /// The deduction was computed.
    Computed(ComputedDeduction),
    /// The deduction is not enabled on the employee's profile.
    Disabled,
    /// The deduction is enabled but does not apply this period.
    NotApplicable {
        /// Why the deduction does not apply.
        reason: String,
    },
    /// The deduction could not be computed.
    Failed(DeductionFailure),
}

impl DeductionOutcome {
    /// The computed deduction, if any.
    pub fn computed(&self) -> Option<&ComputedDeduction> {
        match self {
            DeductionOutcome::Computed(computed) => Some(computed),
            _ => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&DeductionFailure> {
        match self {
            DeductionOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// The employee amount, zero unless computed.
    pub fn employee_amount(&self) -> Decimal {
        self.computed()
            .map(|c| c.employee_amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// The employer amount, zero unless computed.
    pub fn employer_amount(&self) -> Decimal {
        self.computed()
            .map(|c| c.employer_amount)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Aggregated totals over the computed deductions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionTotals {
    /// Sum of employee deductions.
    pub employee_total: Decimal,
    /// Sum of employer contributions.
    pub employer_total: Decimal,
    /// The statutory types that failed, in reporting order.
    pub failed_types: Vec<StatutoryType>,
}

/// The complete statutory result for one employee and pay period.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{DeductionOutcome, DeductionResult, PayPeriod, StatutoryType};
///
/// let result = DeductionResult::new(
///     "emp_001",
///     PayPeriod::month(2026, 1).unwrap(),
///     "2025-04-v1",
///     [
///         DeductionOutcome::Disabled,
///         DeductionOutcome::Disabled,
///         DeductionOutcome::Disabled,
///         DeductionOutcome::Disabled,
///         DeductionOutcome::Disabled,
///     ],
/// );
/// assert!(result.is_complete());
/// assert_eq!(result.outcome(StatutoryType::IncomeTax), &DeductionOutcome::Disabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionResult {
    /// The employee the result belongs to.
    pub employee_id: String,
    /// The pay period computed.
    pub pay_period: PayPeriod,
    /// The configuration snapshot version used.
    pub config_version: String,
    /// Provident fund.
    pub pf: DeductionOutcome,
    /// Employee state insurance.
    pub esi: DeductionOutcome,
    /// Professional tax.
    pub pt: DeductionOutcome,
    /// Labour welfare fund.
    pub lwf: DeductionOutcome,
    /// Income tax deducted at source.
    pub tds: DeductionOutcome,
    /// Totals across the computed deductions.
    pub totals: DeductionTotals,
}

impl DeductionResult {
    /// Assembles a result from outcomes in [`StatutoryType::ALL`] order and derives the totals.
    pub fn new(
        employee_id: impl Into<String>,
        pay_period: PayPeriod,
        config_version: impl Into<String>,
        outcomes: [DeductionOutcome; 5],
    ) -> Self {
        let [pf, esi, pt, lwf, tds] = outcomes;
        let mut result = Self {
            employee_id: employee_id.into(),
            pay_period,
            config_version: config_version.into(),
            pf,
            esi,
            pt,
            lwf,
            tds,
            totals: DeductionTotals {
                employee_total: Decimal::ZERO,
                employer_total: Decimal::ZERO,
                failed_types: Vec::new(),
            },
        };
        result.settle_totals();
        result
    }

    /// The outcome for one statutory type.
    pub fn outcome(&self, statutory_type: StatutoryType) -> &DeductionOutcome {
        match statutory_type {
            StatutoryType::ProvidentFund => &self.pf,
            StatutoryType::StateInsurance => &self.esi,
            StatutoryType::ProfessionalTax => &self.pt,
            StatutoryType::LabourWelfareFund => &self.lwf,
            StatutoryType::IncomeTax => &self.tds,
        }
    }

    /// Every outcome paired with its type, in reporting order.
    pub fn outcomes(&self) -> impl Iterator<Item = (StatutoryType, &DeductionOutcome)> {
        StatutoryType::ALL
            .into_iter()
            .map(move |statutory_type| (statutory_type, self.outcome(statutory_type)))
    }

    /// The failures recorded for this employee.
    pub fn failures(&self) -> impl Iterator<Item = &DeductionFailure> {
        self.outcomes().filter_map(|(_, outcome)| outcome.failure())
    }

    /// True when no statutory type failed.
    pub fn is_complete(&self) -> bool {
        self.totals.failed_types.is_empty()
    }

    fn outcome_mut(&mut self, statutory_type: StatutoryType) -> &mut DeductionOutcome {
        match statutory_type {
            StatutoryType::ProvidentFund => &mut self.pf,
            StatutoryType::StateInsurance => &mut self.esi,
            StatutoryType::ProfessionalTax => &mut self.pt,
            StatutoryType::LabourWelfareFund => &mut self.lwf,
            StatutoryType::IncomeTax => &mut self.tds,
        }
    }

    /// Derives the totals. An outcome whose amounts would push a total past
    /// the decimal range is replaced by a `CalculationOverflow` failure.
    fn settle_totals(&mut self) {
        let mut totals = DeductionTotals {
            employee_total: Decimal::ZERO,
            employer_total: Decimal::ZERO,
            failed_types: Vec::new(),
        };
        for statutory_type in StatutoryType::ALL {
            let outcome = self.outcome(statutory_type);
            let sums = totals
                .employee_total
                .checked_add(outcome.employee_amount())
                .zip(totals.employer_total.checked_add(outcome.employer_amount()));
            match sums {
                Some((employee_total, employer_total)) => {
                    totals.employee_total = employee_total;
                    totals.employer_total = employer_total;
                }
                None => {
                    let error = EngineError::CalculationOverflow {
                        context: "deduction totals".to_string(),
                    };
                    let failure = DeductionFailure::from_error(
                        &error,
                        &self.employee_id,
                        statutory_type,
                        &self.config_version,
                    );
                    *self.outcome_mut(statutory_type) = DeductionOutcome::Failed(failure);
                }
            }
            if self.outcome(statutory_type).failure().is_some() {
                totals.failed_types.push(statutory_type);
            }
        }
        self.totals = totals;
    }
}

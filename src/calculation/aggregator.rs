//! Per-employee orchestration of every statutory deduction.
//!
//! The aggregator resolves groups and slabs, delegates to the progressive,
//! monthly-fixed and contribution calculators, and rounds the final amounts.
//! Each statutory type is computed independently; a failure on one becomes
//! a [`DeductionOutcome::Failed`] and never prevents the others.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{ConfigSnapshot, Versioned};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, BracketContribution, ComputedDeduction, DeductionFailure,
    DeductionOutcome, DeductionResult, EmployeeStatutoryProfile, GroupIdentity, GroupType,
    GrossComponents, PayPeriod, SlabIdentity, StatutoryType, WageBasis,
};

use super::contribution::{calculate_contribution, ContributionResult};
use super::group_membership::resolve_group;
use super::income_tax::{calculate_annual_tax, calculate_monthly_tds};
use super::monthly_fixed::lookup_monthly;
use super::rounding::RoundingRule;
use super::slab_resolver::{SlabResolver, TieBreak};

/// Jurisdiction reported when neither the group nor the profile names a state.
pub const UNSPECIFIED_JURISDICTION: &str = "unspecified";

/// Months in a year, for annualizing monthly gross.
const ANNUALIZATION_FACTOR: u32 = 12;

/// Computes all statutory deductions for employees against one snapshot.
///
/// # Example
///
/// ```no_run
/// use statutory_engine::calculation::StatutoryAggregator;
/// use statutory_engine::config::ConfigLoader;
/// use statutory_engine::models::{EmployeeStatutoryProfile, GrossComponents, PayPeriod};
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/sample").unwrap();
/// let aggregator = StatutoryAggregator::new(loader.shared());
///
/// let profile: EmployeeStatutoryProfile = serde_json::from_str(
///     r#"{"employee_id": "emp_001", "work_state": "KA", "professional_tax": true}"#,
/// ).unwrap();
/// let gross = GrossComponents::basic_only(Decimal::from(40_000));
/// let period = PayPeriod::month(2026, 1).unwrap();
///
/// let result = aggregator.compute_deductions(&profile, &gross, &period);
/// println!("Employee deductions: {}", result.totals.employee_total);
/// ```
#[derive(Debug, Clone)]
pub struct StatutoryAggregator {
    snapshot: Arc<ConfigSnapshot>,
    tie_break: TieBreak,
}

struct Inputs<'p> {
    profile: &'p EmployeeStatutoryProfile,
    gross: &'p GrossComponents,
    pay_period: &'p PayPeriod,
}

/// The pieces of a computed deduction before rounding.
struct Unrounded {
    input_amount: Decimal,
    wage_base: Decimal,
    slab: SlabIdentity,
    group: Option<GroupIdentity>,
    employee_amount: Decimal,
    employer_amount: Decimal,
    breakdown: Vec<BracketContribution>,
    audit_steps: Vec<AuditStep>,
    warnings: Vec<AuditWarning>,
}

impl StatutoryAggregator {
    /// Creates an aggregator pinned to a snapshot.
    pub fn new(snapshot: Arc<ConfigSnapshot>) -> Self {
        let tie_break = snapshot.tie_break();
        Self {
            snapshot,
            tie_break,
        }
    }

    /// Overrides the snapshot's tie-break policy.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// The pinned snapshot.
    pub fn snapshot(&self) -> &Arc<ConfigSnapshot> {
        &self.snapshot
    }

    /// Computes every statutory deduction for one employee and pay period.
    ///
    /// The result depends only on the inputs and the snapshot, so repeated
    /// calls with the same inputs return equal results.
    pub fn compute_deductions(
        &self,
        profile: &EmployeeStatutoryProfile,
        gross: &GrossComponents,
        pay_period: &PayPeriod,
    ) -> DeductionResult {
        let inputs = Inputs {
            profile,
            gross,
            pay_period,
        };
        let input_check = gross.validate().and_then(|_| pay_period.validate());

        let outcomes = StatutoryType::ALL.map(|statutory_type| {
            if !is_enabled(profile, statutory_type) {
                return DeductionOutcome::Disabled;
            }
            let outcome = match &input_check {
                Err(error) => Err(clone_input_error(error)),
                Ok(()) => self.compute_type(statutory_type, &inputs),
            };
            match outcome {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(
                        employee_id = %profile.employee_id,
                        statutory_type = %statutory_type,
                        config_version = %self.snapshot.version(),
                        code = error.code(),
                        "Statutory deduction failed: {}", error
                    );
                    DeductionOutcome::Failed(DeductionFailure::from_error(
                        &error,
                        &profile.employee_id,
                        statutory_type,
                        self.snapshot.version(),
                    ))
                }
            }
        });

        let result = DeductionResult::new(
            profile.employee_id.clone(),
            *pay_period,
            self.snapshot.version(),
            outcomes,
        );
        debug!(
            employee_id = %profile.employee_id,
            config_version = %self.snapshot.version(),
            employee_total = %result.totals.employee_total,
            employer_total = %result.totals.employer_total,
            failed = result.totals.failed_types.len(),
            "Computed statutory deductions"
        );
        result
    }

    fn compute_type(
        &self,
        statutory_type: StatutoryType,
        inputs: &Inputs<'_>,
    ) -> EngineResult<DeductionOutcome> {
        match statutory_type {
            StatutoryType::ProvidentFund => self.compute_contribution(
                statutory_type,
                GroupType::Pf,
                inputs.profile.pf.wage_basis,
                inputs.profile.pf.contribute_on_actual_wage,
                inputs,
            ),
            StatutoryType::StateInsurance => self.compute_contribution(
                statutory_type,
                GroupType::Esi,
                inputs.profile.esi.wage_basis,
                false,
                inputs,
            ),
            StatutoryType::ProfessionalTax => self.compute_professional_tax(inputs),
            StatutoryType::LabourWelfareFund => self.compute_labour_welfare(inputs),
            StatutoryType::IncomeTax => self.compute_income_tax(inputs),
        }
    }

    fn resolver(&self) -> SlabResolver<'_> {
        SlabResolver::new(&self.snapshot).with_tie_break(self.tie_break)
    }

    fn compute_contribution(
        &self,
        statutory_type: StatutoryType,
        group_type: GroupType,
        wage_basis: WageBasis,
        contribute_on_actual_wage: bool,
        inputs: &Inputs<'_>,
    ) -> EngineResult<DeductionOutcome> {
        let group = resolve_group(
            self.snapshot.groups(),
            group_type,
            &inputs.profile.org_unit,
            1,
        )?;
        let resolved =
            self.resolver()
                .resolve_contribution(statutory_type, inputs.pay_period.as_of(), 2)?;
        let wage = inputs.gross.wage_for(wage_basis)?;

        match calculate_contribution(resolved.record, wage, contribute_on_actual_wage, 3)? {
            ContributionResult::NotEligible { reason, .. } => {
                Ok(DeductionOutcome::NotApplicable { reason })
            }
            ContributionResult::Computed {
                amounts,
                audit_step,
            } => Ok(self.finish(
                statutory_type,
                Unrounded {
                    input_amount: wage,
                    wage_base: amounts.wage_base,
                    slab: resolved.record.identity(),
                    group: Some(group.group.identity()),
                    employee_amount: amounts.employee_amount,
                    employer_amount: amounts.employer_amount,
                    breakdown: Vec::new(),
                    audit_steps: vec![group.audit_step, resolved.audit_step, audit_step],
                    warnings: resolved.warnings,
                },
            )),
        }
    }

    fn compute_professional_tax(&self, inputs: &Inputs<'_>) -> EngineResult<DeductionOutcome> {
        let group = resolve_group(
            self.snapshot.groups(),
            GroupType::Pt,
            &inputs.profile.org_unit,
            1,
        )?;
        let jurisdiction = group
            .group
            .state
            .as_deref()
            .or(inputs.profile.work_state.as_deref());
        let wage = inputs.gross.gross()?;
        let as_of = inputs.pay_period.as_of();

        let Some(jurisdiction) = jurisdiction else {
            return Err(EngineError::NoApplicableSlab {
                statutory_type: StatutoryType::ProfessionalTax,
                jurisdiction: UNSPECIFIED_JURISDICTION.to_string(),
                date: as_of,
            });
        };

        let resolved = self.resolver().resolve_monthly(
            StatutoryType::ProfessionalTax,
            jurisdiction,
            &inputs.profile.person,
            wage,
            as_of,
            2,
        )?;
        let lookup = lookup_monthly(
            resolved.record,
            self.snapshot.calendar(),
            inputs.pay_period.calendar_month(),
            wage,
            3,
        )?;

        Ok(self.finish(
            StatutoryType::ProfessionalTax,
            Unrounded {
                input_amount: wage,
                wage_base: wage,
                slab: resolved.record.identity(),
                group: Some(group.group.identity()),
                employee_amount: lookup.employee_amount,
                employer_amount: lookup.employer_amount,
                breakdown: Vec::new(),
                audit_steps: vec![group.audit_step, resolved.audit_step, lookup.audit_step],
                warnings: resolved.warnings,
            },
        ))
    }

    fn compute_labour_welfare(&self, inputs: &Inputs<'_>) -> EngineResult<DeductionOutcome> {
        let wage = inputs.gross.gross()?;
        let as_of = inputs.pay_period.as_of();
        let Some(jurisdiction) = inputs.profile.work_state.as_deref() else {
            return Err(EngineError::NoApplicableSlab {
                statutory_type: StatutoryType::LabourWelfareFund,
                jurisdiction: UNSPECIFIED_JURISDICTION.to_string(),
                date: as_of,
            });
        };

        let resolved = self.resolver().resolve_monthly(
            StatutoryType::LabourWelfareFund,
            jurisdiction,
            &inputs.profile.person,
            wage,
            as_of,
            1,
        )?;
        let lookup = lookup_monthly(
            resolved.record,
            self.snapshot.calendar(),
            inputs.pay_period.calendar_month(),
            wage,
            2,
        )?;

        Ok(self.finish(
            StatutoryType::LabourWelfareFund,
            Unrounded {
                input_amount: wage,
                wage_base: wage,
                slab: resolved.record.identity(),
                group: None,
                employee_amount: lookup.employee_amount,
                employer_amount: lookup.employer_amount,
                breakdown: Vec::new(),
                audit_steps: vec![resolved.audit_step, lookup.audit_step],
                warnings: resolved.warnings,
            },
        ))
    }

    fn compute_income_tax(&self, inputs: &Inputs<'_>) -> EngineResult<DeductionOutcome> {
        let enrollment = &inputs.profile.income_tax;
        let as_of = inputs.pay_period.as_of();
        let resolved =
            self.resolver()
                .resolve_tax(enrollment.regime, &inputs.profile.person, as_of, 1)?;

        let mut warnings = resolved.warnings;
        let annual_income = match enrollment.projected_annual_income {
            Some(projected) => projected,
            None => {
                let gross = inputs.gross.gross()?;
                warnings.push(AuditWarning {
                    code: "ANNUALIZED_GROSS".to_string(),
                    message: format!(
                        "No projected annual income; using monthly gross {} × {}",
                        gross.normalize(),
                        ANNUALIZATION_FACTOR
                    ),
                    severity: "low".to_string(),
                });
                gross
                    .checked_mul(Decimal::from(ANNUALIZATION_FACTOR))
                    .ok_or_else(|| EngineError::CalculationOverflow {
                        context: "annualized gross".to_string(),
                    })?
            }
        };

        let annual = calculate_annual_tax(resolved.record, annual_income, 2)?;
        let months_remaining = self.snapshot.calendar().months_remaining(as_of);
        let step_number = 2 + annual.audit_steps.len() as u32;
        let monthly = calculate_monthly_tds(
            annual.annual_tax,
            enrollment.deducted_to_date,
            months_remaining,
            &resolved.record.id,
            step_number,
        )?;

        let mut audit_steps = vec![resolved.audit_step];
        audit_steps.extend(annual.audit_steps);
        audit_steps.push(monthly.audit_step);

        Ok(self.finish(
            StatutoryType::IncomeTax,
            Unrounded {
                input_amount: annual_income,
                wage_base: annual.taxable_income,
                slab: resolved.record.identity(),
                group: None,
                employee_amount: monthly.monthly_amount,
                employer_amount: Decimal::ZERO,
                breakdown: annual.breakdown,
                audit_steps,
                warnings,
            },
        ))
    }

    /// Rounds the final amounts and appends the rounding step.
    fn finish(&self, statutory_type: StatutoryType, mut unrounded: Unrounded) -> DeductionOutcome {
        let rule = self.snapshot.rounding().rule_for(statutory_type);
        let employee_amount = rule.apply(unrounded.employee_amount);
        let employer_amount = rule.apply(unrounded.employer_amount);

        let step_number = unrounded.audit_steps.len() as u32 + 1;
        unrounded.audit_steps.push(rounding_step(
            rule,
            unrounded.slab.id.as_str(),
            (unrounded.employee_amount, employee_amount),
            (unrounded.employer_amount, employer_amount),
            step_number,
        ));

        DeductionOutcome::Computed(ComputedDeduction {
            input_amount: unrounded.input_amount,
            wage_base: unrounded.wage_base,
            slab: unrounded.slab,
            group: unrounded.group,
            employee_amount,
            employer_amount,
            breakdown: unrounded.breakdown,
            audit_steps: unrounded.audit_steps,
            warnings: unrounded.warnings,
        })
    }
}

fn rounding_step(
    rule: RoundingRule,
    source_ref: &str,
    employee: (Decimal, Decimal),
    employer: (Decimal, Decimal),
    step_number: u32,
) -> AuditStep {
    let mode = serde_json::to_value(rule.mode).unwrap_or(serde_json::Value::Null);
    AuditStep {
        step_number,
        rule_id: "rounding".to_string(),
        rule_name: "Statutory Rounding".to_string(),
        source_ref: source_ref.to_string(),
        input: serde_json::json!({
            "employee_amount": employee.0.normalize().to_string(),
            "employer_amount": employer.0.normalize().to_string(),
            "mode": mode,
            "scale": rule.scale
        }),
        output: serde_json::json!({
            "employee_amount": employee.1.to_string(),
            "employer_amount": employer.1.to_string()
        }),
        reasoning: format!(
            "Rounded employee {} → {}, employer {} → {}",
            employee.0.normalize(),
            employee.1,
            employer.0.normalize(),
            employer.1
        ),
    }
}

fn is_enabled(profile: &EmployeeStatutoryProfile, statutory_type: StatutoryType) -> bool {
    match statutory_type {
        StatutoryType::ProvidentFund => profile.pf.enabled,
        StatutoryType::StateInsurance => profile.esi.enabled,
        StatutoryType::ProfessionalTax => profile.professional_tax,
        StatutoryType::LabourWelfareFund => profile.labour_welfare_fund,
        StatutoryType::IncomeTax => profile.income_tax.enabled,
    }
}

/// Input validation only produces `InvalidAmount`; copy it for each type.
fn clone_input_error(error: &EngineError) -> EngineError {
    match error {
        EngineError::InvalidAmount { field, message } => EngineError::InvalidAmount {
            field: field.clone(),
            message: message.clone(),
        },
        other => EngineError::InvalidAmount {
            field: "input".to_string(),
            message: other.to_string(),
        },
    }
}

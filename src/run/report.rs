use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DeductionResult, EmployeeStatutoryProfile, GrossComponents, PayPeriod};

/// One employee's input to a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInput {
    /// The employee's statutory profile.
    pub profile: EmployeeStatutoryProfile,
    /// The employee's gross pay for the period.
    pub gross: GrossComponents,
}

/// The outcome of a payroll run over many employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The configuration version every result was computed against.
    pub config_version: String,
    /// The pay period of the run.
    pub pay_period: PayPeriod,
    /// Per-employee results in input order.
    pub results: Vec<DeductionResult>,
    /// Number of employees submitted.
    pub total_employees: usize,
    /// Number of employees computed.
    pub completed: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    /// Employees with at least one failed statutory type, in input order.
    pub failed_employees: Vec<String>,
    /// Sum of employee deductions over all results; `None` if the sum
    /// exceeds the decimal range.
    pub employee_total: Option<Decimal>,
    /// Sum of employer contributions over all results; `None` if the sum
    /// exceeds the decimal range.
    pub employer_total: Option<Decimal>,
}

impl RunReport {
    pub(crate) fn new(
        run_id: Uuid,
        config_version: impl Into<String>,
        pay_period: PayPeriod,
        total_employees: usize,
        results: Vec<DeductionResult>,
        cancelled: bool,
    ) -> Self {
        let failed_employees = results
            .iter()
            .filter(|result| !result.is_complete())
            .map(|result| result.employee_id.clone())
            .collect();
        let employee_total = checked_sum(results.iter().map(|r| r.totals.employee_total));
        let employer_total = checked_sum(results.iter().map(|r| r.totals.employer_total));

        Self {
            run_id,
            config_version: config_version.into(),
            pay_period,
            completed: results.len(),
            results,
            total_employees,
            cancelled,
            failed_employees,
            employee_total,
            employer_total,
        }
    }

    /// Employees submitted but not computed because of cancellation.
    pub fn skipped(&self) -> usize {
        self.total_employees - self.completed
    }

    /// The result for one employee, if it was computed.
    pub fn result_for(&self, employee_id: &str) -> Option<&DeductionResult> {
        self.results.iter().find(|r| r.employee_id == employee_id)
    }
}

fn checked_sum(amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.fold(Some(Decimal::ZERO), |total, amount| total?.checked_add(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sum_reports_overflow() {
        let amounts = [Decimal::ONE, Decimal::TWO];
        assert_eq!(checked_sum(amounts.into_iter()), Some(Decimal::from(3)));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE].into_iter()), None);
        assert_eq!(checked_sum(std::iter::empty()), Some(Decimal::ZERO));
    }
}

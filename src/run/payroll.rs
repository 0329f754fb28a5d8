use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::calculation::StatutoryAggregator;
use crate::config::ConfigSnapshot;
use crate::error::{EngineError, EngineResult};
use crate::models::{DeductionResult, PayPeriod};

use super::cancellation::CancellationFlag;
use super::report::{EmployeeInput, RunReport};

/// A payroll run for one pay period, pinned to one configuration snapshot.
///
/// Per-employee failures are recorded in that employee's result and never
/// stop the run. Cancellation is checked before each employee.
///
/// # Example
///
/// ```no_run
/// use statutory_engine::config::ConfigLoader;
/// use statutory_engine::models::PayPeriod;
/// use statutory_engine::run::PayrollRun;
///
/// let loader = ConfigLoader::load("./config/sample").unwrap();
/// let run = PayrollRun::new(loader.shared(), PayPeriod::month(2026, 1).unwrap()).unwrap();
///
/// let report = run.run(&[]);
/// assert_eq!(report.completed, 0);
/// ```
#[derive(Debug, Clone)]
pub struct PayrollRun {
    run_id: Uuid,
    aggregator: StatutoryAggregator,
    pay_period: PayPeriod,
    cancellation: CancellationFlag,
}

impl PayrollRun {
    /// Creates a run with a fresh run id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the pay period is inverted.
    pub fn new(snapshot: Arc<ConfigSnapshot>, pay_period: PayPeriod) -> EngineResult<Self> {
        pay_period.validate()?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            aggregator: StatutoryAggregator::new(snapshot),
            pay_period,
            cancellation: CancellationFlag::new(),
        })
    }

    /// Uses a caller-owned cancellation flag.
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The run id.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// A handle that cancels this run.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// The configuration version every result is computed against.
    pub fn config_version(&self) -> &str {
        self.aggregator.snapshot().version()
    }

    /// Computes every employee sequentially.
    pub fn run(&self, employees: &[EmployeeInput]) -> RunReport {
        self.log_start(employees.len());
        let (results, cancelled) =
            compute_all(&self.aggregator, &self.pay_period, &self.cancellation, employees);
        self.finish(employees.len(), results, cancelled)
    }

    /// Computes employees in chunks on tokio's blocking pool.
    ///
    /// Results are reassembled in input order. On cancellation, every
    /// employee computed before a worker observed the flag is kept.
    ///
    /// # Errors
    ///
    /// Returns `WorkerFailed` if a worker task panics.
    pub async fn run_parallel(
        &self,
        employees: Vec<EmployeeInput>,
        chunk_size: usize,
    ) -> EngineResult<RunReport> {
        let total = employees.len();
        self.log_start(total);

        let chunk_size = chunk_size.max(1);
        let mut handles = Vec::new();
        let mut remaining = employees.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<EmployeeInput> = remaining.by_ref().take(chunk_size).collect();
            let aggregator = self.aggregator.clone();
            let pay_period = self.pay_period;
            let cancellation = self.cancellation.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                compute_all(&aggregator, &pay_period, &cancellation, &chunk)
            }));
        }

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;
        for handle in handles {
            let (chunk_results, chunk_cancelled) =
                handle.await.map_err(|e| EngineError::WorkerFailed {
                    message: e.to_string(),
                })?;
            results.extend(chunk_results);
            cancelled |= chunk_cancelled;
        }

        Ok(self.finish(total, results, cancelled))
    }

    fn log_start(&self, employees: usize) {
        info!(
            run_id = %self.run_id,
            config_version = %self.config_version(),
            pay_period_start = %self.pay_period.start_date,
            employees,
            "Starting payroll run"
        );
    }

    fn finish(&self, total: usize, results: Vec<DeductionResult>, cancelled: bool) -> RunReport {
        let report = RunReport::new(
            self.run_id,
            self.config_version(),
            self.pay_period,
            total,
            results,
            cancelled,
        );
        if cancelled {
            info!(
                run_id = %self.run_id,
                completed = report.completed,
                skipped = report.skipped(),
                "Payroll run cancelled"
            );
        }
        info!(
            run_id = %self.run_id,
            config_version = %report.config_version,
            completed = report.completed,
            failed_employees = report.failed_employees.len(),
            employee_total = ?report.employee_total,
            employer_total = ?report.employer_total,
            "Payroll run finished"
        );
        report
    }
}

fn compute_all(
    aggregator: &StatutoryAggregator,
    pay_period: &PayPeriod,
    cancellation: &CancellationFlag,
    employees: &[EmployeeInput],
) -> (Vec<DeductionResult>, bool) {
    let mut results = Vec::with_capacity(employees.len());
    for employee in employees {
        if cancellation.is_cancelled() {
            return (results, true);
        }
        results.push(aggregator.compute_deductions(&employee.profile, &employee.gross, pay_period));
    }
    (results, false)
}

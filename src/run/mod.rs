//! Payroll runs over many employees.
//!
//! A run pins one configuration snapshot and pay period, computes each
//! employee through the [`StatutoryAggregator`](crate::calculation::StatutoryAggregator),
//! and collects the results into a [`RunReport`].

mod cancellation;
mod payroll;
mod report;

pub use cancellation::CancellationFlag;
pub use payroll::PayrollRun;
pub use report::{EmployeeInput, RunReport};

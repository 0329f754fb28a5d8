//! Core data models for the statutory deduction engine.
//!
//! This module contains the domain models shared by configuration,
//! calculation and results.

mod bracket;
mod deduction_result;
mod fiscal;
mod pay_period;
mod profile;
mod statutory;

pub use bracket::{BracketSet, TaxBracket, UpperLimit};
pub use deduction_result::{
    AuditStep, AuditWarning, BracketContribution, ComputedDeduction, DeductionFailure,
    DeductionOutcome, DeductionResult, DeductionTotals, GroupIdentity, SlabIdentity,
};
pub use fiscal::{
    CalendarMonth, DEFAULT_FISCAL_YEAR_START_MONTH, FinancialYear, FiscalCalendar,
    MONTHS_PER_YEAR,
};
pub use pay_period::PayPeriod;
pub use profile::{
    EmployeeStatutoryProfile, EsiEnrollment, GrossComponents, IncomeTaxEnrollment, OrgUnit,
    PfEnrollment,
};
pub use statutory::{
    DeductionBasis, Gender, GroupType, PersonAttributes, PersonType, SENIOR_CITIZEN_AGE,
    SUPER_SENIOR_CITIZEN_AGE, StatutoryType, TaxRegime, WageBasis,
};

//! Calculation logic for the Statutory Deduction Engine.
//!
//! This module contains the calculators for each deduction family:
//! slab resolution against validity windows, progressive bracket tax,
//! fiscal-month fixed amounts for PT and LWF, rate-based PF and ESI
//! contributions, statutory group membership, rounding, and the
//! aggregator that ties them together per employee.

mod aggregator;
mod contribution;
mod group_membership;
mod income_tax;
mod monthly_fixed;
mod progressive;
mod rounding;
mod slab_resolver;

pub use aggregator::{StatutoryAggregator, UNSPECIFIED_JURISDICTION};
pub use contribution::{ContributionAmounts, ContributionResult, calculate_contribution};
pub use group_membership::{GroupResolution, resolve_group};
pub use income_tax::{
    AnnualTaxResult, MonthlyTdsResult, calculate_annual_tax, calculate_monthly_tds,
};
pub use monthly_fixed::{MonthlyFixedResult, amount_for, lookup_monthly};
pub use progressive::{ProgressiveResult, compute_progressive};
pub use rounding::{RoundingMode, RoundingPolicy, RoundingRule};
pub use slab_resolver::{
    NATIONAL_JURISDICTION, Resolved, SlabQuery, SlabResolver, SlabSet, TieBreak,
};

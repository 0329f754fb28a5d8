//! Error types for the statutory deduction engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! Every variant belongs to one [`ErrorCategory`]: configuration errors block
//! a whole payroll run, while resolution and calculation errors are scoped to
//! a single employee and statutory type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{GroupType, StatutoryType};

/// The broad class an [`EngineError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed, overlapping or incomplete configuration. Fails the run.
    Configuration,
    /// No slab or group could be chosen for one employee.
    Resolution,
    /// Invalid numeric input for one employee.
    Calculation,
}

/// The main error type for the statutory deduction engine.
///
/// # Example
///
/// ```
/// use statutory_engine::error::{EngineError, ErrorCategory};
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/tax_slabs.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/tax_slabs.yaml");
/// assert_eq!(error.category(), ErrorCategory::Configuration);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A bracket set has gaps, overlaps, inverted limits or a bad final bracket.
    #[error("Malformed brackets in slab '{slab_id}': {message}")]
    MalformedBrackets {
        /// The slab carrying the brackets.
        slab_id: String,
        /// What is wrong with the brackets.
        message: String,
    },

    /// Two slabs for the same key have overlapping validity windows.
    #[error("Validity windows of slabs '{first}' and '{second}' overlap")]
    OverlappingValidity {
        /// The earlier-starting slab.
        first: String,
        /// The slab whose window starts inside the first.
        second: String,
    },

    /// A monthly slab does not define every fiscal month.
    #[error("Monthly slab '{slab_id}' is missing months: {}", .missing.join(", "))]
    IncompleteMonthlyMap {
        /// The incomplete slab.
        slab_id: String,
        /// Lower-case month keys that are absent.
        missing: Vec<String>,
    },

    /// One org-unit id is mapped to more than one group of the same type.
    #[error("{dimension} '{member_id}' is mapped to {group_type} groups '{first}' and '{second}'")]
    DuplicateGroupMapping {
        /// The group type both groups share.
        group_type: GroupType,
        /// Which mapping dimension (cost center, location, unit).
        dimension: String,
        /// The id mapped twice.
        member_id: String,
        /// The first group claiming the id.
        first: String,
        /// The second group claiming the id.
        second: String,
    },

    /// Any other configuration defect.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// A description of the defect.
        message: String,
    },

    /// No slab matched the statutory type, jurisdiction, person and date.
    #[error("No applicable {statutory_type} slab for jurisdiction '{jurisdiction}' on {date}")]
    NoApplicableSlab {
        /// The statutory type being resolved.
        statutory_type: StatutoryType,
        /// The jurisdiction searched (`national` when not state-scoped).
        jurisdiction: String,
        /// The as-of date.
        date: NaiveDate,
    },

    /// Two equally ranked slabs share an identical validity window.
    #[error("Ambiguous {statutory_type} slab: '{first}' and '{second}' have identical validity")]
    AmbiguousSlab {
        /// The statutory type being resolved.
        statutory_type: StatutoryType,
        /// The first candidate id.
        first: String,
        /// The second candidate id.
        second: String,
    },

    /// The org unit is not mapped to any group of the requested type.
    #[error("No {group_type} group mapped for org unit {org_unit}")]
    NoGroupMapped {
        /// The group type being resolved.
        group_type: GroupType,
        /// Description of the org unit.
        org_unit: String,
    },

    /// The org unit maps to different groups of one type through different dimensions.
    #[error("Org unit {org_unit} maps to conflicting {group_type} groups: {}", .group_ids.join(", "))]
    ConflictingGroupMapping {
        /// The group type being resolved.
        group_type: GroupType,
        /// Description of the org unit.
        org_unit: String,
        /// Every distinct group id matched.
        group_ids: Vec<String>,
    },

    /// A numeric input was negative or otherwise unusable.
    #[error("Invalid amount for '{field}': {message}")]
    InvalidAmount {
        /// The input field.
        field: String,
        /// A description of the problem.
        message: String,
    },

    /// A calendar month outside 1..=12.
    #[error("Invalid calendar month: {month}")]
    InvalidMonth {
        /// The rejected month number.
        month: u32,
    },

    /// Decimal arithmetic overflowed.
    #[error("Calculation overflow while computing {context}")]
    CalculationOverflow {
        /// What was being computed.
        context: String,
    },

    /// A payroll run worker panicked or was aborted.
    #[error("Payroll worker failed: {message}")]
    WorkerFailed {
        /// The join error reported by the runtime.
        message: String,
    },
}

impl EngineError {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::MalformedBrackets { .. }
            | EngineError::OverlappingValidity { .. }
            | EngineError::IncompleteMonthlyMap { .. }
            | EngineError::DuplicateGroupMapping { .. }
            | EngineError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            EngineError::NoApplicableSlab { .. }
            | EngineError::AmbiguousSlab { .. }
            | EngineError::NoGroupMapped { .. }
            | EngineError::ConflictingGroupMapping { .. } => ErrorCategory::Resolution,
            EngineError::InvalidAmount { .. }
            | EngineError::InvalidMonth { .. }
            | EngineError::CalculationOverflow { .. }
            | EngineError::WorkerFailed { .. } => ErrorCategory::Calculation,
        }
    }

    /// Returns a stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            EngineError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            EngineError::MalformedBrackets { .. } => "MALFORMED_BRACKETS",
            EngineError::OverlappingValidity { .. } => "OVERLAPPING_VALIDITY",
            EngineError::IncompleteMonthlyMap { .. } => "INCOMPLETE_MONTHLY_MAP",
            EngineError::DuplicateGroupMapping { .. } => "DUPLICATE_GROUP_MAPPING",
            EngineError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            EngineError::NoApplicableSlab { .. } => "NO_APPLICABLE_SLAB",
            EngineError::AmbiguousSlab { .. } => "AMBIGUOUS_SLAB",
            EngineError::NoGroupMapped { .. } => "NO_GROUP_MAPPED",
            EngineError::ConflictingGroupMapping { .. } => "CONFLICTING_GROUP_MAPPING",
            EngineError::InvalidAmount { .. } => "INVALID_AMOUNT",
            EngineError::InvalidMonth { .. } => "INVALID_MONTH",
            EngineError::CalculationOverflow { .. } => "CALCULATION_OVERFLOW",
            EngineError::WorkerFailed { .. } => "WORKER_FAILED",
        }
    }

    /// Returns the configuration ids the error refers to, if any.
    ///
    /// These are the matched candidates an administrator needs to inspect.
    pub fn candidate_ids(&self) -> Vec<String> {
        match self {
            EngineError::AmbiguousSlab { first, second, .. }
            | EngineError::OverlappingValidity { first, second }
            | EngineError::DuplicateGroupMapping { first, second, .. } => {
                vec![first.clone(), second.clone()]
            }
            EngineError::ConflictingGroupMapping { group_ids, .. } => group_ids.clone(),
            EngineError::MalformedBrackets { slab_id, .. }
            | EngineError::IncompleteMonthlyMap { slab_id, .. } => vec![slab_id.clone()],
            _ => Vec::new(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_incomplete_monthly_map_lists_missing_months() {
        let error = EngineError::IncompleteMonthlyMap {
            slab_id: "lwf_mh".to_string(),
            missing: vec!["jan".to_string(), "feb".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Monthly slab 'lwf_mh' is missing months: jan, feb"
        );
    }

    #[test]
    fn test_no_applicable_slab_displays_type_and_date() {
        let error = EngineError::NoApplicableSlab {
            statutory_type: StatutoryType::ProfessionalTax,
            jurisdiction: "KA".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        assert_eq!(
            error.to_string(),
            "No applicable PT slab for jurisdiction 'KA' on 2025-01-01"
        );
    }

    #[test]
    fn test_conflicting_group_mapping_lists_groups() {
        let error = EngineError::ConflictingGroupMapping {
            group_type: GroupType::Pf,
            org_unit: "cost_center=cc1".to_string(),
            group_ids: vec!["grp_a".to_string(), "grp_b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Org unit cost_center=cc1 maps to conflicting PF groups: grp_a, grp_b"
        );
        assert_eq!(error.candidate_ids(), vec!["grp_a", "grp_b"]);
    }

    #[test]
    fn test_categories() {
        let config = EngineError::MalformedBrackets {
            slab_id: "s".to_string(),
            message: "gap".to_string(),
        };
        let resolution = EngineError::AmbiguousSlab {
            statutory_type: StatutoryType::IncomeTax,
            first: "a".to_string(),
            second: "b".to_string(),
        };
        let calculation = EngineError::InvalidMonth { month: 13 };

        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(resolution.category(), ErrorCategory::Resolution);
        assert_eq!(calculation.category(), ErrorCategory::Calculation);
        assert_eq!(resolution.code(), "AMBIGUOUS_SLAB");
        assert_eq!(resolution.candidate_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_invalid_month() -> EngineResult<()> {
            Err(EngineError::InvalidMonth { month: 0 })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_invalid_month()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}

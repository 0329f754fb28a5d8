//! The immutable, validated configuration snapshot.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::calculation::{RoundingPolicy, TieBreak};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditWarning, FiscalCalendar, StatutoryType, TaxRegime};

use super::groups::{GroupIndex, StatutoryGroup};
use super::slabs::{validate_windows, ContributionScheme, MonthlySlab, TaxSlabSet, Versioned};
use super::types::{
    ContributionDefinition, MonthlySlabDefinition, SnapshotSettings, TaxSlabDefinition,
};

/// One version of the statutory configuration, validated and indexed.
///
/// A snapshot is built once and shared read-only (`Arc<ConfigSnapshot>`) by
/// every calculation of a payroll run. Candidate lists are sorted by validity
/// start (latest first) and then id, so resolution never depends on the
/// order records appeared in the files.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    version: String,
    description: Option<String>,
    calendar: FiscalCalendar,
    rounding: RoundingPolicy,
    tie_break: TieBreak,
    tax_slabs: HashMap<TaxRegime, Vec<TaxSlabSet>>,
    monthly_slabs: HashMap<(StatutoryType, String), Vec<MonthlySlab>>,
    contributions: HashMap<StatutoryType, Vec<ContributionScheme>>,
    groups: GroupIndex,
    warnings: Vec<AuditWarning>,
}

impl ConfigSnapshot {
    /// Validates raw definitions and builds the lookup indexes.
    ///
    /// # Errors
    ///
    /// Any configuration error: malformed brackets, incomplete monthly
    /// maps, overlapping validity windows, duplicate ids, duplicate group
    /// mappings or an invalid fiscal-year start month.
    pub fn new(
        settings: SnapshotSettings,
        tax_slabs: Vec<TaxSlabDefinition>,
        monthly_slabs: Vec<MonthlySlabDefinition>,
        contributions: Vec<ContributionDefinition>,
        groups: Vec<StatutoryGroup>,
    ) -> EngineResult<Self> {
        if settings.version.trim().is_empty() {
            return Err(EngineError::InvalidConfiguration {
                message: "snapshot version must not be empty".to_string(),
            });
        }
        let calendar = FiscalCalendar::new(settings.fiscal_year_start_month).map_err(|_| {
            EngineError::InvalidConfiguration {
                message: format!(
                    "fiscal_year_start_month {} is not a calendar month",
                    settings.fiscal_year_start_month
                ),
            }
        })?;

        let mut warnings = Vec::new();

        let tax_slabs = tax_slabs
            .into_iter()
            .map(|definition| definition.build(&mut warnings))
            .collect::<EngineResult<Vec<_>>>()?;
        let monthly_slabs = monthly_slabs
            .into_iter()
            .map(|definition| definition.build(&calendar))
            .collect::<EngineResult<Vec<_>>>()?;
        let contributions = contributions
            .into_iter()
            .map(ContributionDefinition::build)
            .collect::<EngineResult<Vec<_>>>()?;

        Self::check_unique_ids(&tax_slabs, &monthly_slabs, &contributions)?;

        let tax_slabs = Self::check_windows(tax_slabs, &mut warnings, |s| (s.regime, s.person_type))?;
        // Wage bands are not part of the key: intersecting bands are compared.
        let monthly_slabs = Self::check_windows(monthly_slabs, &mut warnings, |s| {
            (s.statutory_type, s.jurisdiction.clone(), s.person_type)
        })?;
        let contributions =
            Self::check_windows(contributions, &mut warnings, |s| s.statutory_type)?;

        let groups = GroupIndex::new(groups)?;

        for warning in &warnings {
            warn!(
                config_version = %settings.version,
                code = %warning.code,
                "{}", warning.message
            );
        }
        info!(
            config_version = %settings.version,
            tax_slabs = tax_slabs.len(),
            monthly_slabs = monthly_slabs.len(),
            contributions = contributions.len(),
            groups = groups.groups().len(),
            warnings = warnings.len(),
            "Built configuration snapshot"
        );

        Ok(Self {
            version: settings.version,
            description: settings.description,
            calendar,
            rounding: settings.rounding,
            tie_break: settings.tie_break,
            tax_slabs: index_by(tax_slabs, |s| s.regime),
            monthly_slabs: index_by(monthly_slabs, |s| {
                (s.statutory_type, s.jurisdiction.clone())
            }),
            contributions: index_by(contributions, |s| s.statutory_type),
            groups,
            warnings,
        })
    }

    fn check_unique_ids(
        tax_slabs: &[TaxSlabSet],
        monthly_slabs: &[MonthlySlab],
        contributions: &[ContributionScheme],
    ) -> EngineResult<()> {
        let mut seen = HashSet::new();
        let ids = tax_slabs
            .iter()
            .map(|s| s.id.as_str())
            .chain(monthly_slabs.iter().map(|s| s.id.as_str()))
            .chain(contributions.iter().map(|s| s.id.as_str()));
        for id in ids {
            if !seen.insert(id) {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("duplicate slab id '{}'", id),
                });
            }
        }
        Ok(())
    }

    /// Validates windows per key, returning the records with open windows
    /// closed at their successors.
    fn check_windows<T, K, F>(
        records: Vec<T>,
        warnings: &mut Vec<AuditWarning>,
        key: F,
    ) -> EngineResult<Vec<T>>
    where
        T: Versioned,
        K: PartialEq,
        F: Fn(&T) -> K,
    {
        // Groups in first-appearance order so the reported overlap is stable.
        let mut groups: Vec<(K, Vec<T>)> = Vec::new();
        for record in records {
            let k = key(&record);
            match groups.iter_mut().find(|(existing, _)| *existing == k) {
                Some((_, members)) => members.push(record),
                None => groups.push((k, vec![record])),
            }
        }

        let mut checked = Vec::new();
        for (_, mut members) in groups {
            warnings.extend(validate_windows(&mut members)?);
            checked.extend(members);
        }
        Ok(checked)
    }

    /// The version id.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The optional description from `snapshot.yaml`.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The fiscal calendar.
    pub fn calendar(&self) -> &FiscalCalendar {
        &self.calendar
    }

    /// The rounding policy.
    pub fn rounding(&self) -> &RoundingPolicy {
        &self.rounding
    }

    /// The default tie-break for slab resolution.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Income-tax schedules for a regime, latest first.
    pub fn tax_slabs(&self, regime: TaxRegime) -> &[TaxSlabSet] {
        self.tax_slabs.get(&regime).map(Vec::as_slice).unwrap_or(&[])
    }

    /// PT or LWF slabs for a jurisdiction, latest first.
    pub fn monthly_slabs(&self, statutory_type: StatutoryType, jurisdiction: &str) -> &[MonthlySlab] {
        self.monthly_slabs
            .get(&(statutory_type, jurisdiction.trim().to_uppercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// PF or ESI schemes, latest first.
    pub fn contributions(&self, statutory_type: StatutoryType) -> &[ContributionScheme] {
        self.contributions
            .get(&statutory_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The statutory group index.
    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    /// Warnings raised while loading.
    pub fn warnings(&self) -> &[AuditWarning] {
        &self.warnings
    }
}

fn index_by<T, K, F>(records: Vec<T>, key: F) -> HashMap<K, Vec<T>>
where
    T: Versioned,
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, Vec<T>> = HashMap::new();
    for record in records {
        index.entry(key(&record)).or_default().push(record);
    }
    for candidates in index.values_mut() {
        candidates.sort_by(|a, b| {
            b.validity()
                .start
                .cmp(&a.validity().start)
                .then_with(|| a.id().cmp(b.id()))
        });
    }
    index
}

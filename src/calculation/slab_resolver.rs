//! Slab resolution.
//!
//! Selects the one configuration record in force for a statutory type,
//! jurisdiction, person and date. Candidates come pre-indexed from the
//! [`ConfigSnapshot`], sorted latest-first, so resolution is a filter and a
//! rank over a short slice.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigSnapshot, ContributionScheme, MonthlySlab, TaxSlabSet, Versioned};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, FinancialYear, PersonAttributes, PersonType, StatutoryType, TaxRegime,
};

/// Jurisdiction reported for types that are not state-scoped.
pub const NATIONAL_JURISDICTION: &str = "national";

/// How two equally ranked candidates with identical windows are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Fail with `AmbiguousSlab`.
    #[default]
    Fail,
    /// Pick the highest serial number (then the smallest id) and warn.
    HighestSerialNumber,
}

/// The record kinds a resolution can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabSet<'a> {
    /// An income-tax schedule.
    Tax(&'a TaxSlabSet),
    /// A PT or LWF slab.
    Monthly(&'a MonthlySlab),
    /// A PF or ESI scheme.
    Contribution(&'a ContributionScheme),
}

impl SlabSet<'_> {
    /// The record id.
    pub fn id(&self) -> &str {
        match self {
            SlabSet::Tax(slab) => &slab.id,
            SlabSet::Monthly(slab) => &slab.id,
            SlabSet::Contribution(scheme) => &scheme.id,
        }
    }
}

/// What to resolve.
#[derive(Debug, Clone, Copy)]
pub struct SlabQuery<'a> {
    /// The statutory type.
    pub statutory_type: StatutoryType,
    /// State code for PT and LWF; ignored otherwise.
    pub jurisdiction: Option<&'a str>,
    /// Regime for income tax; ignored otherwise.
    pub regime: TaxRegime,
    /// Attributes matched against each candidate's person type.
    pub person: &'a PersonAttributes,
    /// Monthly wage matched against PT wage bands.
    pub monthly_wage: Decimal,
    /// The as-of date.
    pub as_of: NaiveDate,
}

/// A resolved record plus the audit trail of its selection.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The selected record.
    pub record: T,
    /// The audit step recording the selection.
    pub audit_step: AuditStep,
    /// Warnings raised by the selection (tie-breaks).
    pub warnings: Vec<AuditWarning>,
}

/// Resolves configuration records against a snapshot.
///
/// # Example
///
/// ```no_run
/// use statutory_engine::calculation::SlabResolver;
/// use statutory_engine::config::ConfigLoader;
/// use statutory_engine::models::{PersonAttributes, TaxRegime};
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/sample").unwrap();
/// let resolver = SlabResolver::new(loader.snapshot());
/// let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let resolved = resolver
///     .resolve_tax(TaxRegime::New, &PersonAttributes::default(), as_of, 1)
///     .unwrap();
/// println!("Using {}", resolved.record.id);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SlabResolver<'a> {
    snapshot: &'a ConfigSnapshot,
    tie_break: TieBreak,
}

impl<'a> SlabResolver<'a> {
    /// Creates a resolver using the snapshot's tie-break policy.
    pub fn new(snapshot: &'a ConfigSnapshot) -> Self {
        Self {
            snapshot,
            tie_break: snapshot.tie_break(),
        }
    }

    /// Overrides the tie-break policy.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Resolves any statutory type, returning the record kind it uses.
    ///
    /// # Errors
    ///
    /// `NoApplicableSlab` when nothing matches, `AmbiguousSlab` when the
    /// best candidates tie and the policy is [`TieBreak::Fail`].
    pub fn resolve(
        &self,
        query: &SlabQuery<'_>,
        step_number: u32,
    ) -> EngineResult<Resolved<SlabSet<'a>>> {
        match query.statutory_type {
            StatutoryType::IncomeTax => self
                .resolve_tax(query.regime, query.person, query.as_of, step_number)
                .map(|r| map_record(r, SlabSet::Tax)),
            StatutoryType::ProfessionalTax | StatutoryType::LabourWelfareFund => {
                let jurisdiction = query.jurisdiction.unwrap_or_default();
                self.resolve_monthly(
                    query.statutory_type,
                    jurisdiction,
                    query.person,
                    query.monthly_wage,
                    query.as_of,
                    step_number,
                )
                .map(|r| map_record(r, SlabSet::Monthly))
            }
            StatutoryType::ProvidentFund | StatutoryType::StateInsurance => self
                .resolve_contribution(query.statutory_type, query.as_of, step_number)
                .map(|r| map_record(r, SlabSet::Contribution)),
        }
    }

    /// Resolves the income-tax schedule for a regime.
    pub fn resolve_tax(
        &self,
        regime: TaxRegime,
        person: &PersonAttributes,
        as_of: NaiveDate,
        step_number: u32,
    ) -> EngineResult<Resolved<&'a TaxSlabSet>> {
        let year = self.snapshot.calendar().financial_year_of(as_of);
        let age_reference = self.snapshot.calendar().year_end(year);
        let candidates = self.snapshot.tax_slabs(regime).iter().filter_map(|slab| {
            (slab.validity.contains(year) && slab.person_type.matches(person, age_reference))
                .then(|| (slab, specificity(slab.person_type, false)))
        });
        let jurisdiction = match regime {
            TaxRegime::New => "new regime",
            TaxRegime::Old => "old regime",
        };
        self.select(
            StatutoryType::IncomeTax,
            jurisdiction,
            as_of,
            year,
            candidates,
            step_number,
        )
    }

    /// Resolves the PT or LWF slab for a state, person and monthly wage.
    pub fn resolve_monthly(
        &self,
        statutory_type: StatutoryType,
        jurisdiction: &str,
        person: &PersonAttributes,
        monthly_wage: Decimal,
        as_of: NaiveDate,
        step_number: u32,
    ) -> EngineResult<Resolved<&'a MonthlySlab>> {
        let year = self.snapshot.calendar().financial_year_of(as_of);
        let age_reference = self.snapshot.calendar().year_end(year);
        let candidates = self
            .snapshot
            .monthly_slabs(statutory_type, jurisdiction)
            .iter()
            .filter_map(|slab| {
                let band_matches = slab
                    .wage_band
                    .is_none_or(|band| band.contains(monthly_wage));
                (slab.validity.contains(year)
                    && band_matches
                    && slab.person_type.matches(person, age_reference))
                .then(|| (slab, specificity(slab.person_type, slab.wage_band.is_some())))
            });
        self.select(
            statutory_type,
            &jurisdiction.trim().to_uppercase(),
            as_of,
            year,
            candidates,
            step_number,
        )
    }

    /// Resolves the PF or ESI scheme in force.
    pub fn resolve_contribution(
        &self,
        statutory_type: StatutoryType,
        as_of: NaiveDate,
        step_number: u32,
    ) -> EngineResult<Resolved<&'a ContributionScheme>> {
        let year = self.snapshot.calendar().financial_year_of(as_of);
        let candidates = self
            .snapshot
            .contributions(statutory_type)
            .iter()
            .filter_map(|scheme| scheme.validity.contains(year).then_some((scheme, 0)));
        self.select(
            statutory_type,
            NATIONAL_JURISDICTION,
            as_of,
            year,
            candidates,
            step_number,
        )
    }

    /// Ranks matching candidates by (validity start, specificity) and
    /// applies the tie-break among the best. The most recently started
    /// record wins; specificity only separates records starting together.
    fn select<T: Versioned>(
        &self,
        statutory_type: StatutoryType,
        jurisdiction: &str,
        as_of: NaiveDate,
        year: FinancialYear,
        candidates: impl Iterator<Item = (&'a T, u8)>,
        step_number: u32,
    ) -> EngineResult<Resolved<&'a T>> {
        let candidates: Vec<(&'a T, u8)> = candidates.collect();
        let rank = |(record, specificity): &(&'a T, u8)| (record.validity().start, *specificity);

        let Some(best_rank) = candidates.iter().map(rank).max() else {
            return Err(EngineError::NoApplicableSlab {
                statutory_type,
                jurisdiction: jurisdiction.to_string(),
                date: as_of,
            });
        };

        let mut best: Vec<&'a T> = candidates
            .iter()
            .filter(|candidate| rank(*candidate) == best_rank)
            .map(|(record, _)| *record)
            .collect();
        best.sort_by(|a, b| a.id().cmp(b.id()));

        let mut warnings = Vec::new();
        let chosen = match best.as_slice() {
            [only] => *only,
            [first, second, ..] => match self.tie_break {
                TieBreak::Fail => {
                    return Err(EngineError::AmbiguousSlab {
                        statutory_type,
                        first: first.id().to_string(),
                        second: second.id().to_string(),
                    });
                }
                TieBreak::HighestSerialNumber => {
                    let winner = best
                        .iter()
                        .copied()
                        .min_by(|a, b| {
                            b.serial_number()
                                .cmp(&a.serial_number())
                                .then_with(|| a.id().cmp(b.id()))
                        })
                        .unwrap_or(*first);
                    let ids: Vec<&str> = best.iter().map(|r| r.id()).collect();
                    warnings.push(AuditWarning {
                        code: "TIE_BREAK_APPLIED".to_string(),
                        message: format!(
                            "{} slabs {} share validity; selected '{}' by highest serial number",
                            statutory_type,
                            ids.join(", "),
                            winner.id()
                        ),
                        severity: "medium".to_string(),
                    });
                    winner
                }
            },
            [] => {
                return Err(EngineError::NoApplicableSlab {
                    statutory_type,
                    jurisdiction: jurisdiction.to_string(),
                    date: as_of,
                });
            }
        };

        let validity = chosen.validity();
        let audit_step = AuditStep {
            step_number,
            rule_id: "slab_resolution".to_string(),
            rule_name: "Slab Resolution".to_string(),
            source_ref: chosen.id().to_string(),
            input: serde_json::json!({
                "statutory_type": statutory_type.code(),
                "jurisdiction": jurisdiction,
                "as_of": as_of.to_string(),
                "financial_year": year.to_string(),
                "candidates": candidates.len()
            }),
            output: serde_json::json!({
                "slab_id": chosen.id(),
                "serial_number": chosen.serial_number(),
                "valid_from": validity.start.to_string(),
                "valid_until": validity.end.map(|end| end.to_string())
            }),
            reasoning: format!(
                "Selected {} slab '{}' in force for FY {} ({} matching candidate(s))",
                statutory_type,
                chosen.id(),
                year,
                candidates.len()
            ),
        };

        Ok(Resolved {
            record: chosen,
            audit_step,
            warnings,
        })
    }
}

/// Person-type specificity, plus one when a wage band narrows the slab.
fn specificity(person_type: PersonType, banded: bool) -> u8 {
    person_type.specificity() + u8::from(banded)
}

fn map_record<T, U>(resolved: Resolved<T>, f: impl FnOnce(T) -> U) -> Resolved<U> {
    Resolved {
        record: f(resolved.record),
        audit_step: resolved.audit_step,
        warnings: resolved.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ContributionDefinition, MonthlySlabDefinition, SnapshotSettings, TaxSlabDefinition,
    };
    use crate::models::Gender;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tax(id: &str, serial: u32, person_type: &str, from: i32, until: Option<i32>) -> TaxSlabDefinition {
        let until = until
            .map(|u| format!("valid_until: {}\n", u))
            .unwrap_or_default();
        serde_yaml::from_str(&format!(
            "id: {id}\nserial_number: {serial}\nregime: new\nperson_type: {person_type}\nvalid_from: {from}\n{until}brackets:\n  - {{ lower_limit: \"0\", rate_percent: \"10\" }}\n"
        ))
        .unwrap()
    }

    fn pt(id: &str, person_type: &str, band: &str) -> MonthlySlabDefinition {
        serde_yaml::from_str(&format!(
            "id: {id}\nstatutory_type: pt\njurisdiction: MH\nperson_type: {person_type}\nvalid_from: 2025\n{band}employee: {{ every_month: \"200\" }}\n"
        ))
        .unwrap()
    }

    fn pf(id: &str, from: i32) -> ContributionDefinition {
        serde_yaml::from_str(&format!(
            "id: {id}\nstatutory_type: pf\nvalid_from: {from}\nemployee_rate_percent: \"12\"\nemployer_rate_percent: \"12\"\n"
        ))
        .unwrap()
    }

    fn snapshot(
        tax_slabs: Vec<TaxSlabDefinition>,
        monthly: Vec<MonthlySlabDefinition>,
        contributions: Vec<ContributionDefinition>,
    ) -> ConfigSnapshot {
        ConfigSnapshot::new(
            SnapshotSettings::with_version("test"),
            tax_slabs,
            monthly,
            contributions,
            vec![],
        )
        .unwrap()
    }

    fn person(dob: Option<NaiveDate>, gender: Option<Gender>) -> PersonAttributes {
        PersonAttributes {
            date_of_birth: dob,
            gender,
        }
    }

    #[test]
    fn test_boundary_start_selects_new_slab() {
        let snapshot = snapshot(
            vec![tax("fy2024", 1, "all", 2024, None), tax("fy2025", 1, "all", 2025, None)],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);
        let anyone = PersonAttributes::default();

        let on_start = resolver
            .resolve_tax(TaxRegime::New, &anyone, date(2025, 4, 1), 1)
            .unwrap();
        assert_eq!(on_start.record.id, "fy2025");

        let day_before = resolver
            .resolve_tax(TaxRegime::New, &anyone, date(2025, 3, 31), 1)
            .unwrap();
        assert_eq!(day_before.record.id, "fy2024");
    }

    #[test]
    fn test_bounded_window_end_is_exclusive() {
        let snapshot = snapshot(vec![tax("fy2024", 1, "all", 2024, Some(2025))], vec![], vec![]);
        let resolver = SlabResolver::new(&snapshot);

        let result = resolver.resolve_tax(
            TaxRegime::New,
            &PersonAttributes::default(),
            date(2025, 4, 1),
            1,
        );
        match result {
            Err(EngineError::NoApplicableSlab {
                statutory_type,
                date: d,
                ..
            }) => {
                assert_eq!(statutory_type, StatutoryType::IncomeTax);
                assert_eq!(d, date(2025, 4, 1));
            }
            other => panic!("Expected NoApplicableSlab, got {:?}", other),
        }
    }

    #[test]
    fn test_no_slab_for_other_regime() {
        let snapshot = snapshot(vec![tax("fy2025", 1, "all", 2025, None)], vec![], vec![]);
        let resolver = SlabResolver::new(&snapshot);
        let result = resolver.resolve_tax(
            TaxRegime::Old,
            &PersonAttributes::default(),
            date(2025, 6, 1),
            1,
        );
        assert!(matches!(result, Err(EngineError::NoApplicableSlab { .. })));
    }

    #[test]
    fn test_later_general_schedule_supersedes_older_specific_one() {
        let snapshot = snapshot(
            vec![
                tax("all_2025", 1, "all", 2025, None),
                tax("senior_2020", 1, "senior_citizen", 2020, None),
            ],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);
        let senior = person(Some(date(1960, 1, 1)), None);

        let before = resolver
            .resolve_tax(TaxRegime::New, &senior, date(2024, 6, 1), 1)
            .unwrap();
        assert_eq!(before.record.id, "senior_2020");

        let after = resolver
            .resolve_tax(TaxRegime::New, &senior, date(2025, 6, 1), 1)
            .unwrap();
        assert_eq!(after.record.id, "all_2025");
    }

    #[test]
    fn test_person_type_more_specific_wins_at_same_start() {
        let snapshot = snapshot(
            vec![
                tax("all_2025", 1, "all", 2025, None),
                tax("senior_2025", 1, "senior_citizen", 2025, None),
            ],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);

        let senior = person(Some(date(1960, 1, 1)), None);
        let resolved = resolver
            .resolve_tax(TaxRegime::New, &senior, date(2025, 6, 1), 1)
            .unwrap();
        assert_eq!(resolved.record.id, "senior_2025");

        let young = person(Some(date(1990, 1, 1)), None);
        let resolved = resolver
            .resolve_tax(TaxRegime::New, &young, date(2025, 6, 1), 1)
            .unwrap();
        assert_eq!(resolved.record.id, "all_2025");
    }

    #[test]
    fn test_age_measured_at_financial_year_end() {
        let snapshot = snapshot(
            vec![
                tax("general", 1, "general", 2025, None),
                tax("senior", 1, "senior_citizen", 2025, None),
            ],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);
        // Turns 60 in February 2026, inside FY 2025-26.
        let turning_sixty = person(Some(date(1966, 2, 10)), None);
        let resolved = resolver
            .resolve_tax(TaxRegime::New, &turning_sixty, date(2025, 4, 1), 1)
            .unwrap();
        assert_eq!(resolved.record.id, "senior");
    }

    #[test]
    fn test_identical_windows_are_ambiguous() {
        let snapshot = snapshot(
            vec![tax("slab_b", 2, "all", 2025, None), tax("slab_a", 1, "all", 2025, None)],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);

        let result = resolver.resolve_tax(
            TaxRegime::New,
            &PersonAttributes::default(),
            date(2025, 6, 1),
            1,
        );
        match result {
            Err(EngineError::AmbiguousSlab { first, second, .. }) => {
                assert_eq!(first, "slab_a");
                assert_eq!(second, "slab_b");
            }
            other => panic!("Expected AmbiguousSlab, got {:?}", other),
        }
    }

    #[test]
    fn test_highest_serial_tie_break() {
        let snapshot = snapshot(
            vec![tax("slab_b", 2, "all", 2025, None), tax("slab_a", 1, "all", 2025, None)],
            vec![],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot).with_tie_break(TieBreak::HighestSerialNumber);

        let resolved = resolver
            .resolve_tax(
                TaxRegime::New,
                &PersonAttributes::default(),
                date(2025, 6, 1),
                1,
            )
            .unwrap();
        assert_eq!(resolved.record.id, "slab_b");
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.warnings[0].code, "TIE_BREAK_APPLIED");
        assert!(resolved.warnings[0].message.contains("slab_a, slab_b"));
    }

    #[test]
    fn test_monthly_wage_band_and_gender() {
        let snapshot = snapshot(
            vec![],
            vec![
                pt("mh_low", "all", "wage_band: { min: \"0\", max: \"7500\" }\n"),
                pt("mh_male", "male", "wage_band: { min: \"7500\" }\n"),
                pt("mh_female", "female", "wage_band: { min: \"25000\" }\n"),
            ],
            vec![],
        );
        let resolver = SlabResolver::new(&snapshot);
        let as_of = date(2025, 7, 1);
        let male = person(None, Some(Gender::Male));
        let female = person(None, Some(Gender::Female));

        let low = resolver
            .resolve_monthly(StatutoryType::ProfessionalTax, "mh", &male, dec("5000"), as_of, 1)
            .unwrap();
        assert_eq!(low.record.id, "mh_low");

        let banded = resolver
            .resolve_monthly(StatutoryType::ProfessionalTax, "MH", &male, dec("30000"), as_of, 1)
            .unwrap();
        assert_eq!(banded.record.id, "mh_male");

        let result = resolver.resolve_monthly(
            StatutoryType::ProfessionalTax,
            "MH",
            &female,
            dec("10000"),
            as_of,
            1,
        );
        match result {
            Err(EngineError::NoApplicableSlab { jurisdiction, .. }) => {
                assert_eq!(jurisdiction, "MH");
            }
            other => panic!("Expected NoApplicableSlab, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_dispatches_by_type() {
        let snapshot = snapshot(vec![], vec![], vec![pf("pf_2014", 2014), pf("pf_2025", 2025)]);
        let resolver = SlabResolver::new(&snapshot);
        let anyone = PersonAttributes::default();
        let query = SlabQuery {
            statutory_type: StatutoryType::ProvidentFund,
            jurisdiction: None,
            regime: TaxRegime::New,
            person: &anyone,
            monthly_wage: dec("30000"),
            as_of: date(2024, 11, 1),
        };

        let resolved = resolver.resolve(&query, 2).unwrap();
        assert!(matches!(resolved.record, SlabSet::Contribution(_)));
        assert_eq!(resolved.record.id(), "pf_2014");
        assert_eq!(resolved.audit_step.step_number, 2);
        assert_eq!(resolved.audit_step.output["slab_id"], "pf_2014");
        assert_eq!(resolved.audit_step.input["financial_year"], "2024-25");
    }
}

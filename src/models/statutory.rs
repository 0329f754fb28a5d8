//! Statutory deduction kinds and the enumerations shared by configuration
//! and profiles.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The statutory deductions the engine computes.
///
/// # Example
///
/// ```
/// use statutory_engine::models::{GroupType, StatutoryType};
///
/// assert_eq!(StatutoryType::ProvidentFund.to_string(), "PF");
/// assert_eq!(StatutoryType::ProvidentFund.group_type(), Some(GroupType::Pf));
/// assert_eq!(StatutoryType::IncomeTax.group_type(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatutoryType {
    /// Employees' provident fund.
    #[serde(rename = "pf")]
    ProvidentFund,
    /// Employees' state insurance.
    #[serde(rename = "esi")]
    StateInsurance,
    /// State professional tax.
    #[serde(rename = "pt")]
    ProfessionalTax,
    /// State labour welfare fund.
    #[serde(rename = "lwf")]
    LabourWelfareFund,
    /// Income tax deducted at source.
    #[serde(rename = "tds")]
    IncomeTax,
}

impl StatutoryType {
    /// All statutory types in the order results are reported.
    pub const ALL: [StatutoryType; 5] = [
        StatutoryType::ProvidentFund,
        StatutoryType::StateInsurance,
        StatutoryType::ProfessionalTax,
        StatutoryType::LabourWelfareFund,
        StatutoryType::IncomeTax,
    ];

    /// The registration group type this deduction is filed under, if any.
    pub fn group_type(self) -> Option<GroupType> {
        match self {
            StatutoryType::ProvidentFund => Some(GroupType::Pf),
            StatutoryType::StateInsurance => Some(GroupType::Esi),
            StatutoryType::ProfessionalTax => Some(GroupType::Pt),
            StatutoryType::LabourWelfareFund | StatutoryType::IncomeTax => None,
        }
    }

    /// Short code used in logs, rule ids and error messages.
    pub fn code(self) -> &'static str {
        match self {
            StatutoryType::ProvidentFund => "PF",
            StatutoryType::StateInsurance => "ESI",
            StatutoryType::ProfessionalTax => "PT",
            StatutoryType::LabourWelfareFund => "LWF",
            StatutoryType::IncomeTax => "TDS",
        }
    }
}

impl fmt::Display for StatutoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The legal registration group types an org unit is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    /// Provident fund establishment.
    Pf,
    /// ESI registration.
    Esi,
    /// Professional tax registration.
    Pt,
}

impl GroupType {
    /// The statutory deduction filed under this group type.
    pub fn statutory_type(self) -> StatutoryType {
        match self {
            GroupType::Pf => StatutoryType::ProvidentFund,
            GroupType::Esi => StatutoryType::StateInsurance,
            GroupType::Pt => StatutoryType::ProfessionalTax,
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.statutory_type().code())
    }
}

/// An income-tax regime an employee elects for a financial year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// The concessional regime with fewer exemptions. Default for new employees.
    #[default]
    New,
    /// The older regime with exemptions and deductions.
    Old,
}

/// Gender, as required by state PT slabs that differ by gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other gender; matches only `all` slabs.
    Other,
}

/// The people a slab applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonType {
    /// Everyone.
    #[default]
    All,
    /// Under 60 at the end of the financial year.
    General,
    /// 60 to 79 at the end of the financial year.
    SeniorCitizen,
    /// 80 or older at the end of the financial year.
    SuperSeniorCitizen,
    /// Male employees.
    Male,
    /// Female employees.
    Female,
}

/// Age at which an individual is a senior citizen.
pub const SENIOR_CITIZEN_AGE: u32 = 60;

/// Age at which an individual is a super senior citizen.
pub const SUPER_SENIOR_CITIZEN_AGE: u32 = 80;

/// The attributes of a person that slab selection depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonAttributes {
    /// Date of birth, if known.
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Gender, if known.
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl PersonAttributes {
    /// Age in completed years on `date`, or `None` without a date of birth.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        date.years_since(dob)
    }
}

impl PersonType {
    /// Whether a person with `attributes` falls under this person type.
    ///
    /// Age-based types are evaluated on `age_reference`, normally the last
    /// day of the financial year. A person without a date of birth is treated
    /// as `General`.
    ///
    /// # Example
    ///
    /// ```
    /// use statutory_engine::models::{PersonAttributes, PersonType};
    /// use chrono::NaiveDate;
    ///
    /// let person = PersonAttributes {
    ///     date_of_birth: NaiveDate::from_ymd_opt(1960, 6, 1),
    ///     gender: None,
    /// };
    /// let fy_end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
    /// assert!(PersonType::SeniorCitizen.matches(&person, fy_end));
    /// assert!(!PersonType::General.matches(&person, fy_end));
    /// ```
    pub fn matches(self, attributes: &PersonAttributes, age_reference: NaiveDate) -> bool {
        let age = attributes.age_on(age_reference).unwrap_or(0);
        match self {
            PersonType::All => true,
            PersonType::General => age < SENIOR_CITIZEN_AGE,
            PersonType::SeniorCitizen => {
                (SENIOR_CITIZEN_AGE..SUPER_SENIOR_CITIZEN_AGE).contains(&age)
            }
            PersonType::SuperSeniorCitizen => age >= SUPER_SENIOR_CITIZEN_AGE,
            PersonType::Male => attributes.gender == Some(Gender::Male),
            PersonType::Female => attributes.gender == Some(Gender::Female),
        }
    }

    /// Ranks how narrowly the type targets people; `All` is least specific.
    pub fn specificity(self) -> u8 {
        match self {
            PersonType::All => 0,
            _ => 1,
        }
    }
}

/// Which wage a contribution is computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WageBasis {
    /// Basic pay only.
    #[default]
    Basic,
    /// Basic plus every allowance.
    Gross,
}

/// How the amounts in a monthly slab are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionBasis {
    /// Amounts are fixed currency values.
    #[default]
    Fixed,
    /// Amounts are percentages of the monthly wage.
    Rate,
}

//! Statutory groups and their membership index.
//!
//! Groups are configured as rows listing the cost centers, locations and
//! units they cover. At load time those lists are inverted into a reverse
//! index so resolving an employee's group is a handful of hash lookups.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{GroupIdentity, GroupType};

/// A dimension of an employee's org unit that a group can map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgDimension {
    /// Cost center.
    CostCenter,
    /// Office location.
    Location,
    /// Business unit.
    Unit,
}

impl OrgDimension {
    /// All dimensions in lookup order.
    pub const ALL: [OrgDimension; 3] = [
        OrgDimension::CostCenter,
        OrgDimension::Location,
        OrgDimension::Unit,
    ];
}

impl fmt::Display for OrgDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrgDimension::CostCenter => "cost center",
            OrgDimension::Location => "location",
            OrgDimension::Unit => "unit",
        })
    }
}

/// A legal registration entity shared by the org units mapped to it.
///
/// # Example
///
/// ```
/// use statutory_engine::config::StatutoryGroup;
/// use statutory_engine::models::GroupType;
///
/// let group: StatutoryGroup = serde_yaml::from_str(r#"
/// id: pf_blr
/// name: Bengaluru PF establishment
/// group_type: pf
/// registration_number: KNBNG0012345000
/// cost_centers: [cc_blr_eng, cc_blr_ops]
/// "#).unwrap();
///
/// assert_eq!(group.group_type, GroupType::Pf);
/// assert_eq!(group.cost_centers.len(), 2);
/// assert!(group.locations.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryGroup {
    /// Group id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// PF, ESI or PT.
    pub group_type: GroupType,
    /// The government registration number.
    pub registration_number: String,
    /// Establishment or branch code, where the authority issues one.
    #[serde(default)]
    pub establishment_code: Option<String>,
    /// State of registration (PT groups).
    #[serde(default)]
    pub state: Option<String>,
    /// Mapped cost center ids.
    #[serde(default)]
    pub cost_centers: Vec<String>,
    /// Mapped office location ids.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Mapped business unit ids.
    #[serde(default)]
    pub units: Vec<String>,
}

impl StatutoryGroup {
    /// The member ids for one dimension.
    pub fn members(&self, dimension: OrgDimension) -> &[String] {
        match dimension {
            OrgDimension::CostCenter => &self.cost_centers,
            OrgDimension::Location => &self.locations,
            OrgDimension::Unit => &self.units,
        }
    }

    /// The identity recorded on results filed under this group.
    pub fn identity(&self) -> GroupIdentity {
        GroupIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            registration_number: self.registration_number.clone(),
        }
    }
}

type MemberKey = (GroupType, OrgDimension, String);

/// Groups plus the reverse index from org-unit ids to groups.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    groups: Vec<StatutoryGroup>,
    by_member: HashMap<MemberKey, usize>,
}

impl GroupIndex {
    /// Builds the reverse index.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` if two groups share an id.
    /// - `DuplicateGroupMapping` if one id in one dimension is mapped to two
    ///   groups of the same type.
    pub fn new(groups: Vec<StatutoryGroup>) -> EngineResult<Self> {
        let mut seen_ids: HashMap<&str, ()> = HashMap::new();
        for group in &groups {
            if seen_ids.insert(group.id.as_str(), ()).is_some() {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("duplicate group id '{}'", group.id),
                });
            }
        }

        let mut by_member: HashMap<MemberKey, usize> = HashMap::new();
        for (position, group) in groups.iter().enumerate() {
            for dimension in OrgDimension::ALL {
                for member in group.members(dimension) {
                    let key = (group.group_type, dimension, member.clone());
                    if let Some(existing) = by_member.insert(key, position) {
                        if existing != position {
                            return Err(EngineError::DuplicateGroupMapping {
                                group_type: group.group_type,
                                dimension: dimension.to_string(),
                                member_id: member.clone(),
                                first: groups[existing].id.clone(),
                                second: group.id.clone(),
                            });
                        }
                    }
                }
            }
        }

        debug!(
            groups = groups.len(),
            mappings = by_member.len(),
            "Built statutory group index"
        );

        Ok(Self { groups, by_member })
    }

    /// The group a single dimension id is mapped to.
    pub fn lookup(
        &self,
        group_type: GroupType,
        dimension: OrgDimension,
        member_id: &str,
    ) -> Option<&StatutoryGroup> {
        self.by_member
            .get(&(group_type, dimension, member_id.to_string()))
            .map(|position| &self.groups[*position])
    }

    /// A group by id.
    pub fn get(&self, id: &str) -> Option<&StatutoryGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// All groups in configuration order.
    pub fn groups(&self) -> &[StatutoryGroup] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, group_type: GroupType, cost_centers: &[&str], locations: &[&str]) -> StatutoryGroup {
        StatutoryGroup {
            id: id.to_string(),
            name: id.to_uppercase(),
            group_type,
            registration_number: format!("REG-{}", id),
            establishment_code: None,
            state: None,
            cost_centers: cost_centers.iter().map(|s| s.to_string()).collect(),
            locations: locations.iter().map(|s| s.to_string()).collect(),
            units: vec![],
        }
    }

    #[test]
    fn test_lookup_by_dimension() {
        let index = GroupIndex::new(vec![
            group("pf_a", GroupType::Pf, &["cc1"], &["loc1"]),
            group("esi_a", GroupType::Esi, &["cc1"], &[]),
        ])
        .unwrap();

        assert_eq!(
            index.lookup(GroupType::Pf, OrgDimension::CostCenter, "cc1").unwrap().id,
            "pf_a"
        );
        assert_eq!(
            index.lookup(GroupType::Esi, OrgDimension::CostCenter, "cc1").unwrap().id,
            "esi_a"
        );
        assert!(index.lookup(GroupType::Pt, OrgDimension::CostCenter, "cc1").is_none());
        assert!(index.lookup(GroupType::Pf, OrgDimension::Location, "cc1").is_none());
    }

    #[test]
    fn test_same_id_in_different_dimensions_is_independent() {
        let index = GroupIndex::new(vec![
            group("pf_a", GroupType::Pf, &["x"], &[]),
            group("pf_b", GroupType::Pf, &[], &["x"]),
        ])
        .unwrap();

        assert_eq!(
            index.lookup(GroupType::Pf, OrgDimension::Location, "x").unwrap().id,
            "pf_b"
        );
    }

    #[test]
    fn test_duplicate_mapping_in_one_dimension_rejected() {
        let result = GroupIndex::new(vec![
            group("pf_a", GroupType::Pf, &["cc1"], &[]),
            group("pf_b", GroupType::Pf, &["cc1"], &[]),
        ]);

        match result {
            Err(EngineError::DuplicateGroupMapping {
                dimension,
                member_id,
                first,
                second,
                ..
            }) => {
                assert_eq!(dimension, "cost center");
                assert_eq!(member_id, "cc1");
                assert_eq!(first, "pf_a");
                assert_eq!(second, "pf_b");
            }
            other => panic!("Expected DuplicateGroupMapping, got {:?}", other),
        }
    }

    #[test]
    fn test_id_listed_twice_in_one_group_is_fine() {
        let index = GroupIndex::new(vec![group("pf_a", GroupType::Pf, &["cc1", "cc1"], &[])]);
        assert!(index.is_ok());
    }

    #[test]
    fn test_duplicate_group_id_rejected() {
        let result = GroupIndex::new(vec![
            group("pf_a", GroupType::Pf, &["cc1"], &[]),
            group("pf_a", GroupType::Esi, &["cc2"], &[]),
        ]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_identity() {
        let g = group("pf_a", GroupType::Pf, &[], &[]);
        let identity = g.identity();
        assert_eq!(identity.id, "pf_a");
        assert_eq!(identity.registration_number, "REG-pf_a");
    }
}

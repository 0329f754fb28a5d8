//! Statutory group membership resolution.

use crate::config::{GroupIndex, OrgDimension, StatutoryGroup};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, GroupType, OrgUnit};

/// The resolved group and the audit step recording the match.
#[derive(Debug, Clone)]
pub struct GroupResolution<'a> {
    /// The matched group.
    pub group: &'a StatutoryGroup,
    /// The dimensions that matched it.
    pub matched_dimensions: Vec<OrgDimension>,
    /// The audit step recording this resolution.
    pub audit_step: AuditStep,
}

/// Maps an org unit to its registration group of one type.
///
/// Each of the org unit's cost center, location and unit ids is looked up in
/// the reverse index. Every dimension that matches must point at the same
/// group; there is no precedence between dimensions.
///
/// # Errors
///
/// - `NoGroupMapped` if no dimension matches a group of `group_type`.
/// - `ConflictingGroupMapping` if dimensions match different groups; all
///   distinct group ids are carried, sorted.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::resolve_group;
/// use statutory_engine::config::{GroupIndex, StatutoryGroup};
/// use statutory_engine::models::{GroupType, OrgUnit};
///
/// let group: StatutoryGroup = serde_yaml::from_str(
///     "id: pf_blr\nname: Bengaluru\ngroup_type: pf\nregistration_number: KN1\ncost_centers: [cc1]\n",
/// ).unwrap();
/// let index = GroupIndex::new(vec![group]).unwrap();
/// let org_unit = OrgUnit {
///     cost_center_id: Some("cc1".to_string()),
///     location_id: None,
///     unit_id: None,
/// };
///
/// let resolution = resolve_group(&index, GroupType::Pf, &org_unit, 1).unwrap();
/// assert_eq!(resolution.group.id, "pf_blr");
/// ```
pub fn resolve_group<'a>(
    index: &'a GroupIndex,
    group_type: GroupType,
    org_unit: &OrgUnit,
    step_number: u32,
) -> EngineResult<GroupResolution<'a>> {
    let dimension_ids = [
        (OrgDimension::CostCenter, org_unit.cost_center_id.as_deref()),
        (OrgDimension::Location, org_unit.location_id.as_deref()),
        (OrgDimension::Unit, org_unit.unit_id.as_deref()),
    ];

    let matches: Vec<(OrgDimension, &'a StatutoryGroup)> = dimension_ids
        .iter()
        .filter_map(|(dimension, id)| {
            id.and_then(|id| index.lookup(group_type, *dimension, id))
                .map(|group| (*dimension, group))
        })
        .collect();

    let Some((_, first)) = matches.first() else {
        return Err(EngineError::NoGroupMapped {
            group_type,
            org_unit: org_unit.to_string(),
        });
    };

    let mut group_ids: Vec<String> = matches.iter().map(|(_, g)| g.id.clone()).collect();
    group_ids.sort();
    group_ids.dedup();
    if group_ids.len() > 1 {
        return Err(EngineError::ConflictingGroupMapping {
            group_type,
            org_unit: org_unit.to_string(),
            group_ids,
        });
    }

    let group: &'a StatutoryGroup = *first;
    let matched_dimensions: Vec<OrgDimension> = matches.iter().map(|(d, _)| *d).collect();
    let dimension_names: Vec<String> = matched_dimensions.iter().map(|d| d.to_string()).collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "group_membership".to_string(),
        rule_name: "Statutory Group Membership".to_string(),
        source_ref: group.id.clone(),
        input: serde_json::json!({
            "group_type": group_type.to_string(),
            "cost_center_id": org_unit.cost_center_id,
            "location_id": org_unit.location_id,
            "unit_id": org_unit.unit_id
        }),
        output: serde_json::json!({
            "group_id": group.id,
            "registration_number": group.registration_number,
            "matched_dimensions": dimension_names
        }),
        reasoning: format!(
            "{} {} mapped to {} group '{}' ({})",
            dimension_names.join(" and "),
            if dimension_names.len() == 1 { "is" } else { "are" },
            group_type,
            group.id,
            group.registration_number
        ),
    };

    Ok(GroupResolution {
        group,
        matched_dimensions,
        audit_step,
    })
}

//! Capability model: resources, permission levels, and capability aggregation.

use std::collections::BTreeMap;
use std::str::FromStr;

use gatehouse_core::AppError;
use serde::{Deserialize, Serialize};

use crate::RoleId;

/// Protected entity types enforced by route policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// User account records.
    Users,
    /// Role records and their assignments.
    Roles,
}

impl Resource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Roles => "roles",
        }
    }

    /// Returns all known resources.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Resource] = &[Resource::Users, Resource::Roles];

        ALL
    }

    /// Parses a transport value into a resource.
    ///
    /// Unknown keys are rejected rather than ignored.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "users" => Ok(Self::Users),
            "roles" => Ok(Self::Roles),
            _ => Err(AppError::Validation(format!(
                "unknown resource value '{value}'"
            ))),
        }
    }
}

/// One of the four CRUD actions a capability can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create new records.
    Create,
    /// Read existing records.
    Read,
    /// Update existing records.
    Update,
    /// Archive or delete records.
    Delete,
}

/// Coarse grant tier supplied when a role is created or updated.
///
/// A level is translated into a [`CapabilitySet`] at write time and never
/// stored; the derived flags are the durable representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// No access.
    None,
    /// Read-only access.
    View,
    /// Read and update access.
    Partial,
    /// Full CRUD access.
    FullAccess,
}

impl PermissionLevel {
    /// Returns a stable transport value for this level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::View => "view",
            Self::Partial => "partial",
            Self::FullAccess => "full_access",
        }
    }

    /// Parses a transport value into a level.
    ///
    /// Unrecognized values map to [`PermissionLevel::None`] so that a bad
    /// level can never widen access.
    #[must_use]
    pub fn from_transport(value: &str) -> Self {
        match value {
            "view" => Self::View,
            "partial" => Self::Partial,
            "full_access" => Self::FullAccess,
            _ => Self::None,
        }
    }

    /// Translates this level into its capability flags.
    ///
    /// This table is the single definition of what a level means.
    #[must_use]
    pub fn encode(self) -> CapabilitySet {
        match self {
            Self::FullAccess => CapabilitySet {
                create: true,
                read: true,
                update: true,
                delete: true,
            },
            Self::Partial => CapabilitySet {
                create: false,
                read: true,
                update: true,
                delete: false,
            },
            Self::View => CapabilitySet {
                create: false,
                read: true,
                update: false,
                delete: false,
            },
            Self::None => CapabilitySet::NONE,
        }
    }
}

/// The four independent action flags for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Create access.
    pub create: bool,
    /// Read access.
    pub read: bool,
    /// Update access.
    pub update: bool,
    /// Delete access.
    pub delete: bool,
}

impl CapabilitySet {
    /// The all-false capability set.
    pub const NONE: Self = Self {
        create: false,
        read: false,
        update: false,
        delete: false,
    };

    /// Returns whether this set grants the given action.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.create,
            Action::Read => self.read,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    /// Merges another set into this one, keeping every granted flag.
    pub fn merge(&mut self, other: Self) {
        self.create |= other.create;
        self.read |= other.read;
        self.update |= other.update;
        self.delete |= other.delete;
    }
}

/// Capability flags keyed by resource.
///
/// A resource absent from the map is treated as all-false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityMap(BTreeMap<Resource, CapabilitySet>);

impl CapabilityMap {
    /// Creates an empty capability map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns whether the map grants the given action on the resource.
    #[must_use]
    pub fn grants(&self, resource: Resource, action: Action) -> bool {
        self.0
            .get(&resource)
            .is_some_and(|capabilities| capabilities.allows(action))
    }

    /// Returns the capability set stored for a resource, if any.
    #[must_use]
    pub fn get(&self, resource: Resource) -> Option<CapabilitySet> {
        self.0.get(&resource).copied()
    }

    /// Sets the capability flags for a resource, replacing any prior value.
    pub fn set(&mut self, resource: Resource, capabilities: CapabilitySet) {
        self.0.insert(resource, capabilities);
    }

    /// ORs every flag of another map into this one.
    pub fn merge(&mut self, other: &Self) {
        for (resource, capabilities) in &other.0 {
            self.0.entry(*resource).or_default().merge(*capabilities);
        }
    }

    /// Iterates the stored resource/capability pairs in resource order.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, CapabilitySet)> + '_ {
        self.0.iter().map(|(resource, set)| (*resource, *set))
    }

    /// Returns whether the map holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Resource, CapabilitySet)> for CapabilityMap {
    fn from_iter<I: IntoIterator<Item = (Resource, CapabilitySet)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One role assignment resolved for aggregation.
///
/// `capabilities` is `None` when the referenced role row is missing or
/// archived; such grants are skipped rather than failing the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentGrant {
    /// Referenced role identifier.
    pub role_id: RoleId,
    /// Soft-delete flag of the assignment edge itself.
    pub archived: bool,
    /// The role's capability map, when the role resolved to an active row.
    pub capabilities: Option<CapabilityMap>,
}

/// Folds the capability maps of a principal's assignments into one
/// effective map.
///
/// The fold is commutative, associative, and idempotent: input order never
/// affects the result, and a duplicated assignment contributes nothing
/// beyond its first occurrence. Archived assignments and assignments whose
/// role did not resolve contribute nothing.
#[must_use]
pub fn aggregate_capabilities<'a>(
    grants: impl IntoIterator<Item = &'a AssignmentGrant>,
) -> CapabilityMap {
    let mut effective = CapabilityMap::new();

    for grant in grants {
        if grant.archived {
            continue;
        }

        let Some(capabilities) = grant.capabilities.as_ref() else {
            continue;
        };

        effective.merge(capabilities);
    }

    effective
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        Action, AssignmentGrant, CapabilityMap, CapabilitySet, PermissionLevel, Resource,
        aggregate_capabilities,
    };
    use crate::RoleId;

    #[test]
    fn full_access_encodes_all_flags() {
        assert_eq!(
            PermissionLevel::FullAccess.encode(),
            CapabilitySet {
                create: true,
                read: true,
                update: true,
                delete: true,
            }
        );
    }

    #[test]
    fn partial_encodes_read_and_update() {
        assert_eq!(
            PermissionLevel::Partial.encode(),
            CapabilitySet {
                create: false,
                read: true,
                update: true,
                delete: false,
            }
        );
    }

    #[test]
    fn view_encodes_read_only() {
        assert_eq!(
            PermissionLevel::View.encode(),
            CapabilitySet {
                create: false,
                read: true,
                update: false,
                delete: false,
            }
        );
    }

    #[test]
    fn none_encodes_all_false() {
        assert_eq!(PermissionLevel::None.encode(), CapabilitySet::NONE);
    }

    #[test]
    fn unknown_level_value_falls_back_to_none() {
        let level = PermissionLevel::from_transport("superuser");
        assert_eq!(level, PermissionLevel::None);
        assert_eq!(level.encode(), CapabilitySet::NONE);
    }

    #[test]
    fn unknown_resource_value_is_rejected() {
        assert!(Resource::from_transport("invoices").is_err());
    }

    #[test]
    fn resource_roundtrip_storage_value() {
        for resource in Resource::all() {
            let restored = Resource::from_transport(resource.as_str());
            assert_eq!(restored.ok(), Some(*resource));
        }
    }

    #[test]
    fn absent_resource_grants_nothing() {
        let map = CapabilityMap::new();
        assert!(!map.grants(Resource::Users, Action::Read));
    }

    fn grant(archived: bool, capabilities: Option<CapabilityMap>) -> AssignmentGrant {
        AssignmentGrant {
            role_id: RoleId::new(),
            archived,
            capabilities,
        }
    }

    fn users_map(level: PermissionLevel) -> CapabilityMap {
        CapabilityMap::from_iter([(Resource::Users, level.encode())])
    }

    #[test]
    fn aggregation_ors_flags_across_roles() {
        let grants = vec![
            grant(false, Some(users_map(PermissionLevel::View))),
            grant(
                false,
                Some(CapabilityMap::from_iter([(
                    Resource::Roles,
                    PermissionLevel::Partial.encode(),
                )])),
            ),
        ];

        let effective = aggregate_capabilities(&grants);
        assert!(effective.grants(Resource::Users, Action::Read));
        assert!(effective.grants(Resource::Roles, Action::Update));
        assert!(!effective.grants(Resource::Users, Action::Delete));
    }

    #[test]
    fn aggregation_is_idempotent_under_duplicates() {
        let single = vec![grant(false, Some(users_map(PermissionLevel::Partial)))];
        let doubled = vec![single[0].clone(), single[0].clone()];

        assert_eq!(
            aggregate_capabilities(&single),
            aggregate_capabilities(&doubled)
        );
    }

    #[test]
    fn archived_assignments_contribute_nothing() {
        let active = vec![
            grant(false, Some(users_map(PermissionLevel::View))),
            grant(false, Some(users_map(PermissionLevel::FullAccess))),
        ];
        let mut one_archived = active.clone();
        one_archived[1].archived = true;

        let full = aggregate_capabilities(&active);
        let reduced = aggregate_capabilities(&one_archived);

        assert!(full.grants(Resource::Users, Action::Delete));
        assert!(!reduced.grants(Resource::Users, Action::Delete));
        assert!(reduced.grants(Resource::Users, Action::Read));
    }

    #[test]
    fn dangling_role_is_skipped_not_fatal() {
        let grants = vec![
            grant(false, None),
            grant(false, Some(users_map(PermissionLevel::View))),
        ];

        let effective = aggregate_capabilities(&grants);
        assert!(effective.grants(Resource::Users, Action::Read));
        assert!(!effective.grants(Resource::Users, Action::Update));
    }

    fn arbitrary_capability_set() -> impl Strategy<Value = CapabilitySet> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(create, read, update, delete)| CapabilitySet {
                create,
                read,
                update,
                delete,
            },
        )
    }

    fn arbitrary_grant() -> impl Strategy<Value = AssignmentGrant> {
        (
            any::<bool>(),
            proptest::option::of((arbitrary_capability_set(), arbitrary_capability_set())),
        )
            .prop_map(|(archived, capabilities)| AssignmentGrant {
                role_id: RoleId::new(),
                archived,
                capabilities: capabilities.map(|(users, roles)| {
                    CapabilityMap::from_iter([(Resource::Users, users), (Resource::Roles, roles)])
                }),
            })
    }

    proptest! {
        #[test]
        fn aggregation_is_order_independent(
            grants in proptest::collection::vec(arbitrary_grant(), 0..8),
            seed in any::<u64>(),
        ) {
            let mut shuffled = grants.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed;
            for index in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let swap_with = (state % (index as u64 + 1)) as usize;
                shuffled.swap(index, swap_with);
            }

            prop_assert_eq!(
                aggregate_capabilities(&grants),
                aggregate_capabilities(&shuffled)
            );
        }
    }
}

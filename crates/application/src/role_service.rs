//! Role and assignment lifecycle ports and application service.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use gatehouse_core::{AppError, AppResult, NonEmptyString};
use gatehouse_domain::{CapabilityMap, PermissionLevel, Resource, RoleId, UserId};

/// Role definition returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Stable role identifier.
    pub role_id: RoleId,
    /// Role name, unique among non-archived roles.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Indicates a system-managed role that cannot be changed or archived.
    pub is_system: bool,
    /// Soft-delete flag.
    pub archived: bool,
    /// Derived capability flags keyed by resource.
    pub capabilities: CapabilityMap,
}

/// Assignment projection mapping a user to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentRecord {
    /// Assigned user identifier.
    pub user_id: UserId,
    /// Role identifier.
    pub role_id: RoleId,
    /// Role name.
    pub role_name: String,
    /// Assignment timestamp.
    pub assigned_at: chrono::DateTime<chrono::Utc>,
}

/// Input payload for role creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Permission level per resource; omitted resources stay all-false.
    pub levels: BTreeMap<Resource, PermissionLevel>,
}

/// Input payload for role updates. Omitted fields are unchanged; a present
/// `levels` map replaces the stored capability flags wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New role name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement permission levels.
    pub levels: Option<BTreeMap<Resource, PermissionLevel>>,
}

/// Field changes handed to the role repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    /// New role name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement capability map, already encoded.
    pub capabilities: Option<CapabilityMap>,
}

/// Query parameters for paginated role listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleListQuery {
    /// Maximum rows returned.
    pub take: i64,
    /// 1-based page number.
    pub page_no: i64,
    /// Optional case-insensitive name/description filter.
    pub search_text: Option<String>,
}

/// Filter selecting assignments for bulk operations. At least one field must
/// be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    /// Restrict to assignments of this user.
    pub user_id: Option<UserId>,
    /// Restrict to assignments of this role.
    pub role_id: Option<RoleId>,
}

impl AssignmentFilter {
    /// Filter matching every assignment of one user.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role_id: None,
        }
    }

    /// Filter matching every assignment of one role.
    #[must_use]
    pub fn for_role(role_id: RoleId) -> Self {
        Self {
            user_id: None,
            role_id: Some(role_id),
        }
    }

    /// Returns whether the filter selects nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.role_id.is_none()
    }
}

/// Repository port for role persistence.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists non-archived roles with pagination and optional search.
    async fn list(&self, query: RoleListQuery) -> AppResult<(Vec<RoleRecord>, u64)>;

    /// Finds a non-archived role by id.
    async fn find_active_by_id(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>>;

    /// Finds non-archived roles matching the given names.
    async fn find_active_by_names(&self, names: &[String]) -> AppResult<Vec<RoleRecord>>;

    /// Persists a new role and its capability flags.
    ///
    /// Fails with `Conflict` when a non-archived role with the same name
    /// exists.
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        capabilities: &CapabilityMap,
    ) -> AppResult<RoleRecord>;

    /// Applies field changes to a non-archived role.
    ///
    /// Fails with `NotFound` when the role does not exist or is archived,
    /// and with `Conflict` on an active-name collision.
    async fn update(&self, role_id: RoleId, changes: RoleChanges) -> AppResult<RoleRecord>;

    /// Archives a role and cascades to its assignments in one transaction.
    ///
    /// Fails with `Conflict` while any non-archived assignment references
    /// the role, and with `NotFound` when no active role matches.
    async fn archive(&self, role_id: RoleId) -> AppResult<()>;
}

/// Repository port for assignment persistence.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Creates an assignment edge between a user and a role.
    ///
    /// Duplicate active edges are tolerated; aggregation is idempotent.
    async fn create(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Archives every assignment matching the filter. Returns the number of
    /// rows affected.
    async fn archive(&self, filter: &AssignmentFilter) -> AppResult<u64>;

    /// Lists non-archived assignments matching the filter.
    async fn list(&self, filter: &AssignmentFilter) -> AppResult<Vec<RoleAssignmentRecord>>;

    /// Lists role ids of a user's non-archived assignments.
    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>>;
}

/// Application service for role and assignment administration.
#[derive(Clone)]
pub struct RoleService {
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
}

impl RoleService {
    /// Creates a new service from required repositories.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            role_repository,
            assignment_repository,
        }
    }

    /// Returns non-archived roles matching the query.
    pub async fn list_roles(&self, query: RoleListQuery) -> AppResult<(Vec<RoleRecord>, u64)> {
        self.role_repository.list(query).await
    }

    /// Returns one non-archived role.
    pub async fn get_role(&self, role_id: RoleId) -> AppResult<RoleRecord> {
        self.role_repository
            .find_active_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Creates a role, encoding the supplied permission levels into
    /// capability flags.
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleRecord> {
        let name = NonEmptyString::new(input.name)?;
        let capabilities = encode_levels(&input.levels);

        self.role_repository
            .create(name.as_str(), input.description.as_deref(), &capabilities)
            .await
    }

    /// Updates a role. A present `levels` map is re-encoded and replaces the
    /// stored capability flags wholesale.
    pub async fn update_role(
        &self,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<RoleRecord> {
        let existing = self.get_role(role_id).await?;
        if existing.is_system {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be modified",
                existing.name
            )));
        }

        if let Some(ref name) = input.name {
            NonEmptyString::new(name.clone())?;
        }

        let changes = RoleChanges {
            name: input.name,
            description: input.description,
            capabilities: input.levels.as_ref().map(encode_levels),
        };

        self.role_repository.update(role_id, changes).await
    }

    /// Archives a role.
    ///
    /// Fails with `Conflict` while non-archived assignments reference the
    /// role; the repository archives the role and its remaining assignment
    /// edges atomically once the check passes.
    pub async fn archive_role(&self, role_id: RoleId) -> AppResult<()> {
        let existing = self.get_role(role_id).await?;
        if existing.is_system {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be archived",
                existing.name
            )));
        }

        self.role_repository.archive(role_id).await
    }

    /// Assigns a role to a user.
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.get_role(role_id).await?;
        self.assignment_repository.create(user_id, role_id).await
    }

    /// Bulk-archives assignments matching the filter. Returns the number of
    /// archived edges.
    pub async fn archive_assignments(&self, filter: AssignmentFilter) -> AppResult<u64> {
        if filter.is_empty() {
            return Err(AppError::Validation(
                "assignment filter must name a user or a role".to_owned(),
            ));
        }

        self.assignment_repository.archive(&filter).await
    }

    /// Lists non-archived assignments matching the filter.
    pub async fn list_assignments(
        &self,
        filter: AssignmentFilter,
    ) -> AppResult<Vec<RoleAssignmentRecord>> {
        self.assignment_repository.list(&filter).await
    }
}

fn encode_levels(levels: &BTreeMap<Resource, PermissionLevel>) -> CapabilityMap {
    levels
        .iter()
        .map(|(resource, level)| (*resource, level.encode()))
        .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use gatehouse_application::{RoleAssignmentRecord, RoleRecord};

use super::common::{CapabilityFlagsResponse, capability_map_response};

/// Incoming payload for role creation. `levels` maps resource keys to
/// permission level values.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub levels: BTreeMap<String, String>,
}

/// Incoming payload for role updates. A present `levels` map replaces the
/// stored capability flags wholesale.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub levels: Option<BTreeMap<String, String>>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role_id: String,
}

/// Incoming payload for bulk assignment archival. At least one filter field
/// must be set.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/archive-assignments-request.ts"
)]
pub struct ArchiveAssignmentsRequest {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
}

/// Result of a bulk assignment archival.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/archive-assignments-response.ts"
)]
pub struct ArchiveAssignmentsResponse {
    pub archived_count: u64,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../packages/api-types/src/generated/role-response.ts")]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub capabilities: BTreeMap<String, CapabilityFlagsResponse>,
}

/// Paginated role listing.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/role-list-response.ts"
)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
    pub total_count: u64,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub role_id: String,
    pub role_name: String,
    pub assigned_at: String,
}

impl From<RoleRecord> for RoleResponse {
    fn from(value: RoleRecord) -> Self {
        Self {
            role_id: value.role_id.to_string(),
            name: value.name,
            description: value.description,
            is_system: value.is_system,
            capabilities: capability_map_response(&value.capabilities),
        }
    }
}

impl From<RoleAssignmentRecord> for RoleAssignmentResponse {
    fn from(value: RoleAssignmentRecord) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            role_id: value.role_id.to_string(),
            role_name: value.role_name,
            assigned_at: value.assigned_at.to_rfc3339(),
        }
    }
}

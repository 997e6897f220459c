use serde::{Deserialize, Serialize};
use ts_rs::TS;

use gatehouse_application::{RoleSummary, UserWithRoles};

/// Incoming payload for admin-driven user creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-user-request.ts"
)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone_no: Option<String>,
    pub role_id: String,
    pub password: Option<String>,
}

/// Incoming payload for updating another user. Omitted fields are unchanged;
/// a present `roles` list replaces the user's role set.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-user-request.ts"
)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_no: Option<String>,
    pub status: Option<String>,
    pub roles: Option<Vec<String>>,
}

/// Incoming payload for a self-service password change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-password-request.ts"
)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Compact role projection embedded in user responses.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/role-summary-response.ts"
)]
pub struct RoleSummaryResponse {
    pub role_id: String,
    pub name: String,
}

/// API representation of a user with its roles.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../packages/api-types/src/generated/user-response.ts")]
pub struct UserResponse {
    pub user_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone_no: Option<String>,
    pub status: String,
    pub roles: Vec<RoleSummaryResponse>,
    pub created_at: String,
    pub updated_at: String,
}

/// Paginated user listing.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/user-list-response.ts"
)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total_count: u64,
}

impl From<RoleSummary> for RoleSummaryResponse {
    fn from(value: RoleSummary) -> Self {
        Self {
            role_id: value.role_id.to_string(),
            name: value.name,
        }
    }
}

impl From<UserWithRoles> for UserResponse {
    fn from(value: UserWithRoles) -> Self {
        Self {
            user_id: value.user.id.to_string(),
            first_name: value.user.first_name,
            last_name: value.user.last_name,
            email: value.user.email,
            phone_no: value.user.phone_no,
            status: value.user.status.as_str().to_owned(),
            roles: value
                .roles
                .into_iter()
                .map(RoleSummaryResponse::from)
                .collect(),
            created_at: value.user.created_at.to_rfc3339(),
            updated_at: value.user.updated_at.to_rfc3339(),
        }
    }
}

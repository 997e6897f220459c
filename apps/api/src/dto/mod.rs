mod auth;
mod common;
mod roles;
mod users;

pub use auth::{AuthLoginRequest, PrincipalSessionResponse};
pub use common::{CapabilityFlagsResponse, HealthResponse, capability_map_response};
pub use roles::{
    ArchiveAssignmentsRequest, ArchiveAssignmentsResponse, AssignRoleRequest, CreateRoleRequest,
    RoleAssignmentResponse, RoleListResponse, RoleResponse, UpdateRoleRequest,
};
pub use users::{
    CreateUserRequest, RoleSummaryResponse, UpdatePasswordRequest, UpdateUserRequest,
    UserListResponse, UserResponse,
};

#[cfg(test)]
mod tests {
    use super::{
        ArchiveAssignmentsRequest, ArchiveAssignmentsResponse, AssignRoleRequest,
        AuthLoginRequest, CapabilityFlagsResponse, CreateRoleRequest, CreateUserRequest,
        HealthResponse, PrincipalSessionResponse, RoleAssignmentResponse, RoleListResponse,
        RoleResponse, RoleSummaryResponse, UpdatePasswordRequest, UpdateRoleRequest,
        UpdateUserRequest, UserListResponse, UserResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        AuthLoginRequest::export(&config)?;
        PrincipalSessionResponse::export(&config)?;
        CapabilityFlagsResponse::export(&config)?;
        HealthResponse::export(&config)?;
        CreateUserRequest::export(&config)?;
        UpdateUserRequest::export(&config)?;
        UpdatePasswordRequest::export(&config)?;
        RoleSummaryResponse::export(&config)?;
        UserResponse::export(&config)?;
        UserListResponse::export(&config)?;
        CreateRoleRequest::export(&config)?;
        UpdateRoleRequest::export(&config)?;
        AssignRoleRequest::export(&config)?;
        ArchiveAssignmentsRequest::export(&config)?;
        ArchiveAssignmentsResponse::export(&config)?;
        RoleResponse::export(&config)?;
        RoleListResponse::export(&config)?;
        RoleAssignmentResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }
}

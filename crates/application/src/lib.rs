//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_service;
mod role_service;
mod user_service;

pub use authorization_service::{
    AccessDecision, AccessDenial, AuthorizationRepository, AuthorizationService, CapabilityClause,
    RoutePolicy,
};
pub use role_service::{
    AssignmentFilter, AssignmentRepository, CreateRoleInput, RoleAssignmentRecord, RoleChanges,
    RoleListQuery, RoleRecord, RoleRepository, RoleService, UpdateRoleInput,
};
pub use user_service::{
    CreateUserInput, NewUserRecord, PasswordHasher, RoleSummary, UpdateUserInput, UserChanges,
    UserListQuery, UserRecord, UserRepository, UserService, UserWithRoles,
};

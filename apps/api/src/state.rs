use gatehouse_application::{AuthorizationService, RoleService, UserService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub role_service: RoleService,
    pub user_service: UserService,
    pub frontend_url: String,
}

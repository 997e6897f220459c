use std::collections::BTreeMap;

use gatehouse_core::PrincipalIdentity;
use gatehouse_domain::CapabilityMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::{CapabilityFlagsResponse, capability_map_response};

/// Incoming payload for email/password login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/auth-login-request.ts"
)]
pub struct AuthLoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticated principal with its effective capability map.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/principal-session-response.ts"
)]
pub struct PrincipalSessionResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub permissions: BTreeMap<String, CapabilityFlagsResponse>,
}

impl PrincipalSessionResponse {
    /// Builds the response from a session identity and its aggregated
    /// capabilities.
    pub fn new(identity: &PrincipalIdentity, permissions: &CapabilityMap) -> Self {
        Self {
            user_id: identity.principal_id().to_string(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().to_owned(),
            permissions: capability_map_response(permissions),
        }
    }
}

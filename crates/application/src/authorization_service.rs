//! Per-request authorization: route policies and the access decision.

use std::sync::Arc;

use async_trait::async_trait;
use gatehouse_core::{AppError, AppResult, PrincipalIdentity};
use gatehouse_domain::{
    Action, AssignmentGrant, CapabilityMap, Resource, UserId, aggregate_capabilities,
};

/// One required capability for a route: a single resource/action pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityClause {
    /// The protected resource.
    pub resource: Resource,
    /// The action the route performs on it.
    pub action: Action,
}

/// Route metadata declared at registration time and read at dispatch time.
///
/// A public route is allowed without any checks. A protected route with an
/// empty clause list is open to any authenticated principal. Clauses are
/// combined disjunctively: holding any one of them authorizes the request.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public: bool,
    clauses: Vec<CapabilityClause>,
}

impl RoutePolicy {
    /// A route that requires no authentication at all.
    #[must_use]
    pub fn public() -> Self {
        Self {
            public: true,
            clauses: Vec::new(),
        }
    }

    /// A protected route open to any authenticated principal.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            public: false,
            clauses: Vec::new(),
        }
    }

    /// A protected route requiring a single capability.
    #[must_use]
    pub fn require(resource: Resource, action: Action) -> Self {
        Self::any_of(vec![CapabilityClause { resource, action }])
    }

    /// A protected route satisfied by any one of the given clauses.
    #[must_use]
    pub fn any_of(clauses: Vec<CapabilityClause>) -> Self {
        Self {
            public: false,
            clauses,
        }
    }

    /// Returns whether the route skips authentication entirely.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Returns the declared capability clauses.
    #[must_use]
    pub fn clauses(&self) -> &[CapabilityClause] {
        self.clauses.as_slice()
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// No principal was resolved for a protected route.
    Unauthenticated,
    /// The principal holds none of the required capabilities.
    Forbidden,
}

/// Outcome of the per-request access decision.
///
/// An allowed decision carries the principal's effective capability map when
/// it was computed along the way, so the request context can reuse it
/// without a second aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Request may proceed.
    Allow(Option<CapabilityMap>),
    /// Request must be rejected.
    Deny(AccessDenial),
}

/// Repository port resolving a principal's role assignments for aggregation.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the principal's assignments, each resolved with its role's
    /// capability map when the role row exists and is active.
    async fn list_assignment_grants(&self, principal_id: UserId)
    -> AppResult<Vec<AssignmentGrant>>;
}

/// Application service evaluating route policies against principals.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Computes the principal's effective capability map from its active
    /// assignments.
    pub async fn effective_capabilities(&self, principal_id: UserId) -> AppResult<CapabilityMap> {
        let grants = self.repository.list_assignment_grants(principal_id).await?;
        Ok(aggregate_capabilities(&grants))
    }

    /// Evaluates the access decision for one inbound request.
    ///
    /// The checks run in a fixed order: public bypass, principal presence,
    /// self-target bypass, empty-requirement shortcut, and finally the
    /// disjunctive clause check against the aggregated capability map.
    pub async fn decide(
        &self,
        policy: &RoutePolicy,
        principal: Option<&PrincipalIdentity>,
        self_target: Option<&str>,
    ) -> AppResult<AccessDecision> {
        if policy.is_public() {
            return Ok(AccessDecision::Allow(None));
        }

        let Some(principal) = principal else {
            return Ok(AccessDecision::Deny(AccessDenial::Unauthenticated));
        };

        // A principal may always act on its own record.
        if let Some(target) = self_target
            && target == principal.principal_id().to_string()
        {
            return Ok(AccessDecision::Allow(None));
        }

        if policy.clauses().is_empty() {
            return Ok(AccessDecision::Allow(None));
        }

        let capabilities = self
            .effective_capabilities(UserId::from_uuid(principal.principal_id()))
            .await?;

        if satisfies_any_clause(policy.clauses(), &capabilities) {
            return Ok(AccessDecision::Allow(Some(capabilities)));
        }

        Ok(AccessDecision::Deny(AccessDenial::Forbidden))
    }

    /// Evaluates the decision and converts denials into application errors.
    ///
    /// Returns the effective capability map when the decision computed one,
    /// for reuse by downstream handlers.
    pub async fn authorize(
        &self,
        policy: &RoutePolicy,
        principal: Option<&PrincipalIdentity>,
        self_target: Option<&str>,
    ) -> AppResult<Option<CapabilityMap>> {
        match self.decide(policy, principal, self_target).await? {
            AccessDecision::Allow(capabilities) => Ok(capabilities),
            AccessDecision::Deny(AccessDenial::Unauthenticated) => Err(AppError::Unauthorized(
                "authentication required".to_owned(),
            )),
            AccessDecision::Deny(AccessDenial::Forbidden) => {
                let principal_id = principal
                    .map(|identity| identity.principal_id().to_string())
                    .unwrap_or_default();
                Err(AppError::Forbidden(format!(
                    "principal '{principal_id}' holds none of the capabilities required by this route"
                )))
            }
        }
    }
}

fn satisfies_any_clause(clauses: &[CapabilityClause], capabilities: &CapabilityMap) -> bool {
    clauses
        .iter()
        .any(|clause| capabilities.grants(clause.resource, clause.action))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use gatehouse_core::{AppError, AppResult, PrincipalIdentity};
    use gatehouse_domain::{
        Action, AssignmentGrant, CapabilityMap, PermissionLevel, Resource, RoleId, UserId,
    };

    use super::{
        AccessDecision, AccessDenial, AuthorizationRepository, AuthorizationService,
        CapabilityClause, RoutePolicy,
    };

    struct FakeAuthorizationRepository {
        grants: HashMap<UserId, Vec<AssignmentGrant>>,
    }

    #[async_trait]
    impl AuthorizationRepository for FakeAuthorizationRepository {
        async fn list_assignment_grants(
            &self,
            principal_id: UserId,
        ) -> AppResult<Vec<AssignmentGrant>> {
            Ok(self.grants.get(&principal_id).cloned().unwrap_or_default())
        }
    }

    fn principal(user_id: UserId) -> PrincipalIdentity {
        PrincipalIdentity::new(user_id.as_uuid(), "Test Principal", "principal@example.com")
    }

    fn service_with_grants(user_id: UserId, grants: Vec<AssignmentGrant>) -> AuthorizationService {
        AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            grants: HashMap::from([(user_id, grants)]),
        }))
    }

    fn users_grant(level: PermissionLevel) -> AssignmentGrant {
        AssignmentGrant {
            role_id: RoleId::new(),
            archived: false,
            capabilities: Some(CapabilityMap::from_iter([(Resource::Users, level.encode())])),
        }
    }

    #[tokio::test]
    async fn public_route_allows_without_principal() {
        let service = service_with_grants(UserId::new(), Vec::new());

        let decision = service.decide(&RoutePolicy::public(), None, None).await;
        assert_eq!(decision.ok(), Some(AccessDecision::Allow(None)));
    }

    #[tokio::test]
    async fn protected_route_without_principal_is_unauthenticated() {
        let service = service_with_grants(UserId::new(), Vec::new());

        let decision = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Read),
                None,
                None,
            )
            .await;
        assert_eq!(
            decision.ok(),
            Some(AccessDecision::Deny(AccessDenial::Unauthenticated))
        );
    }

    #[tokio::test]
    async fn self_target_bypasses_capability_check() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, Vec::new());
        let target = user_id.to_string();

        let decision = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Update),
                Some(&principal(user_id)),
                Some(target.as_str()),
            )
            .await;
        assert_eq!(decision.ok(), Some(AccessDecision::Allow(None)));
    }

    #[tokio::test]
    async fn self_bypass_does_not_cover_other_principals() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, Vec::new());
        let other = UserId::new().to_string();

        let decision = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Update),
                Some(&principal(user_id)),
                Some(other.as_str()),
            )
            .await;
        assert_eq!(
            decision.ok(),
            Some(AccessDecision::Deny(AccessDenial::Forbidden))
        );
    }

    #[tokio::test]
    async fn route_without_clauses_allows_any_authenticated_principal() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, Vec::new());

        let decision = service
            .decide(&RoutePolicy::authenticated(), Some(&principal(user_id)), None)
            .await;
        assert_eq!(decision.ok(), Some(AccessDecision::Allow(None)));
    }

    #[tokio::test]
    async fn any_single_satisfied_clause_allows() {
        let user_id = UserId::new();
        let service =
            service_with_grants(user_id, vec![users_grant(PermissionLevel::FullAccess)]);

        let policy = RoutePolicy::any_of(vec![
            CapabilityClause {
                resource: Resource::Users,
                action: Action::Create,
            },
            CapabilityClause {
                resource: Resource::Roles,
                action: Action::Delete,
            },
        ]);

        let decision = service.decide(&policy, Some(&principal(user_id)), None).await;
        assert!(matches!(decision, Ok(AccessDecision::Allow(Some(_)))));
    }

    #[tokio::test]
    async fn no_satisfied_clause_is_forbidden() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, vec![users_grant(PermissionLevel::View)]);

        let policy = RoutePolicy::any_of(vec![
            CapabilityClause {
                resource: Resource::Users,
                action: Action::Create,
            },
            CapabilityClause {
                resource: Resource::Roles,
                action: Action::Delete,
            },
        ]);

        let decision = service.decide(&policy, Some(&principal(user_id)), None).await;
        assert_eq!(
            decision.ok(),
            Some(AccessDecision::Deny(AccessDenial::Forbidden))
        );
    }

    #[tokio::test]
    async fn archived_assignment_does_not_authorize() {
        let user_id = UserId::new();
        let mut grant = users_grant(PermissionLevel::FullAccess);
        grant.archived = true;
        let service = service_with_grants(user_id, vec![grant]);

        let decision = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Read),
                Some(&principal(user_id)),
                None,
            )
            .await;
        assert_eq!(
            decision.ok(),
            Some(AccessDecision::Deny(AccessDenial::Forbidden))
        );
    }

    #[tokio::test]
    async fn editor_role_allows_update_but_not_delete() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, vec![users_grant(PermissionLevel::Partial)]);

        let update = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Update),
                Some(&principal(user_id)),
                None,
            )
            .await;
        assert!(matches!(update, Ok(AccessDecision::Allow(Some(_)))));

        let delete = service
            .decide(
                &RoutePolicy::require(Resource::Users, Action::Delete),
                Some(&principal(user_id)),
                None,
            )
            .await;
        assert_eq!(
            delete.ok(),
            Some(AccessDecision::Deny(AccessDenial::Forbidden))
        );
    }

    #[tokio::test]
    async fn allow_returns_effective_map_for_request_reuse() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, vec![users_grant(PermissionLevel::Partial)]);

        let capabilities = service
            .authorize(
                &RoutePolicy::require(Resource::Users, Action::Update),
                Some(&principal(user_id)),
                None,
            )
            .await;

        let map = capabilities.ok().flatten();
        assert!(map.is_some_and(|map| map.grants(Resource::Users, Action::Read)));
    }

    #[tokio::test]
    async fn authorize_maps_denials_to_distinct_errors() {
        let user_id = UserId::new();
        let service = service_with_grants(user_id, Vec::new());
        let policy = RoutePolicy::require(Resource::Roles, Action::Read);

        let unauthenticated = service.authorize(&policy, None, None).await;
        assert!(matches!(unauthenticated, Err(AppError::Unauthorized(_))));

        let forbidden = service
            .authorize(&policy, Some(&principal(user_id)), None)
            .await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    }
}

//! PostgreSQL-backed assignment resolution for authorization decisions.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use gatehouse_application::AuthorizationRepository;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{AssignmentGrant, CapabilityMap, CapabilitySet, Resource, RoleId, UserId};

/// PostgreSQL implementation of the authorization repository port.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentGrantRow {
    assignment_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assignment_archived: bool,
    resolved_role_id: Option<uuid::Uuid>,
    resource: Option<String>,
    can_create: Option<bool>,
    can_read: Option<bool>,
    can_update: Option<bool>,
    can_delete: Option<bool>,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_assignment_grants(
        &self,
        principal_id: UserId,
    ) -> AppResult<Vec<AssignmentGrant>> {
        // One row per assignment and capability resource. The joins are
        // outer so that an assignment pointing at a missing or archived
        // role still comes back, with a NULL resolved role.
        let rows = sqlx::query_as::<_, AssignmentGrantRow>(
            r#"
            SELECT
                assignments.id AS assignment_id,
                assignments.role_id,
                assignments.is_archived AS assignment_archived,
                roles.id AS resolved_role_id,
                capabilities.resource,
                capabilities.can_create,
                capabilities.can_read,
                capabilities.can_update,
                capabilities.can_delete
            FROM role_assignments AS assignments
            LEFT JOIN roles
                ON roles.id = assignments.role_id
                AND NOT roles.is_archived
            LEFT JOIN role_capabilities AS capabilities
                ON capabilities.role_id = roles.id
            WHERE assignments.user_id = $1
                AND NOT assignments.is_archived
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve assignment grants: {error}"))
        })?;

        let mut grants: HashMap<uuid::Uuid, AssignmentGrant> = HashMap::new();

        for row in rows {
            let grant = grants
                .entry(row.assignment_id)
                .or_insert_with(|| AssignmentGrant {
                    role_id: RoleId::from_uuid(row.role_id),
                    archived: row.assignment_archived,
                    capabilities: row.resolved_role_id.map(|_| CapabilityMap::new()),
                });

            let (Some(resource), Some(capabilities)) =
                (row.resource.as_deref(), grant.capabilities.as_mut())
            else {
                continue;
            };

            let Ok(resource) = Resource::from_str(resource) else {
                tracing::warn!(resource, "skipping capability row with unknown resource");
                continue;
            };

            capabilities.set(
                resource,
                CapabilitySet {
                    create: row.can_create.unwrap_or(false),
                    read: row.can_read.unwrap_or(false),
                    update: row.can_update.unwrap_or(false),
                    delete: row.can_delete.unwrap_or(false),
                },
            );
        }

        Ok(grants.into_values().collect())
    }
}

//! PostgreSQL-backed role repository.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use gatehouse_application::{RoleChanges, RoleListQuery, RoleRecord, RoleRepository};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{CapabilityMap, CapabilitySet, PermissionLevel, Resource, RoleId};

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    is_system: bool,
    is_archived: bool,
}

#[derive(Debug, FromRow)]
struct CapabilityRow {
    role_id: uuid::Uuid,
    resource: String,
    can_create: bool,
    can_read: bool,
    can_update: bool,
    can_delete: bool,
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list(&self, query: RoleListQuery) -> AppResult<(Vec<RoleRecord>, u64)> {
        let search = query
            .search_text
            .as_deref()
            .map(|text| format!("%{text}%"));
        let take = query.take.max(1);
        let offset = (query.page_no.max(1) - 1) * take;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM roles
            WHERE NOT is_archived
                AND ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
            "#,
        )
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count roles: {error}")))?;

        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, is_system, is_archived
            FROM roles
            WHERE NOT is_archived
                AND ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search.as_deref())
        .bind(take)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        let roles = self.attach_capabilities(rows).await?;
        Ok((roles, total as u64))
    }

    async fn find_active_by_id(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, is_system, is_archived
            FROM roles
            WHERE id = $1 AND NOT is_archived
            LIMIT 1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.attach_capabilities(vec![row]).await?.into_iter().next())
    }

    async fn find_active_by_names(&self, names: &[String]) -> AppResult<Vec<RoleRecord>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, is_system, is_archived
            FROM roles
            WHERE name = ANY($1) AND NOT is_archived
            ORDER BY name
            "#,
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find roles by name: {error}")))?;

        self.attach_capabilities(rows).await
    }

    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        capabilities: &CapabilityMap,
    ) -> AppResult<RoleRecord> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO roles (name, description, is_system)
            VALUES ($1, $2, false)
            RETURNING id
            "#,
        )
        .bind(name.trim())
        .bind(description)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, name))?;

        insert_capability_rows(&mut transaction, role_id, capabilities).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(RoleRecord {
            role_id: RoleId::from_uuid(role_id),
            name: name.trim().to_owned(),
            description: description.map(str::to_owned),
            is_system: false,
            archived: false,
            capabilities: capabilities.clone(),
        })
    }

    async fn update(&self, role_id: RoleId, changes: RoleChanges) -> AppResult<RoleRecord> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let updated = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1 AND NOT is_archived
            RETURNING id
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.description.as_deref())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            map_role_conflict(error, changes.name.as_deref().unwrap_or_default())
        })?;

        if updated.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        // A present capability map replaces the stored flags wholesale.
        if let Some(ref capabilities) = changes.capabilities {
            sqlx::query("DELETE FROM role_capabilities WHERE role_id = $1")
                .bind(role_id.as_uuid())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to clear role capabilities: {error}"))
                })?;

            insert_capability_rows(&mut transaction, role_id.as_uuid(), capabilities).await?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        self.find_active_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn archive(&self, role_id: RoleId) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let existing = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE id = $1 AND NOT is_archived
            FOR UPDATE
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        if existing.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        let active_assignments = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM role_assignments
            WHERE role_id = $1 AND NOT is_archived
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))?;

        if active_assignments > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is still referenced by {active_assignments} active assignments"
            )));
        }

        sqlx::query(
            r#"
            UPDATE roles
            SET is_archived = true, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to archive role: {error}")))?;

        // Sweep any edge created between the count and the flag flip; the
        // transaction makes check and cascade a single atomic step.
        sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_archived = true
            WHERE role_id = $1 AND NOT is_archived
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to archive role assignments: {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }
}

impl PostgresRoleRepository {
    async fn attach_capabilities(&self, rows: Vec<RoleRow>) -> AppResult<Vec<RoleRecord>> {
        let role_ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();

        let capability_rows = sqlx::query_as::<_, CapabilityRow>(
            r#"
            SELECT role_id, resource, can_create, can_read, can_update, can_delete
            FROM role_capabilities
            WHERE role_id = ANY($1)
            ORDER BY role_id, resource
            "#,
        )
        .bind(role_ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role capabilities: {error}"))
        })?;

        let mut by_role: HashMap<uuid::Uuid, CapabilityMap> = HashMap::new();
        for row in capability_rows {
            let Ok(resource) = Resource::from_str(row.resource.as_str()) else {
                tracing::warn!(resource = %row.resource, "skipping capability row with unknown resource");
                continue;
            };

            by_role.entry(row.role_id).or_default().set(
                resource,
                CapabilitySet {
                    create: row.can_create,
                    read: row.can_read,
                    update: row.can_update,
                    delete: row.can_delete,
                },
            );
        }

        Ok(rows
            .into_iter()
            .map(|row| RoleRecord {
                role_id: RoleId::from_uuid(row.id),
                name: row.name,
                description: row.description,
                is_system: row.is_system,
                archived: row.is_archived,
                capabilities: by_role.remove(&row.id).unwrap_or_default(),
            })
            .collect())
    }
}

async fn insert_capability_rows(
    transaction: &mut Transaction<'_, Postgres>,
    role_id: uuid::Uuid,
    capabilities: &CapabilityMap,
) -> AppResult<()> {
    for (resource, flags) in capabilities.iter() {
        sqlx::query(
            r#"
            INSERT INTO role_capabilities (role_id, resource, can_create, can_read, can_update, can_delete)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (role_id, resource) DO UPDATE
            SET can_create = EXCLUDED.can_create,
                can_read = EXCLUDED.can_read,
                can_update = EXCLUDED.can_update,
                can_delete = EXCLUDED.can_delete
            "#,
        )
        .bind(role_id)
        .bind(resource.as_str())
        .bind(flags.create)
        .bind(flags.read)
        .bind(flags.update)
        .bind(flags.delete)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist role capabilities: {error}"))
        })?;
    }

    Ok(())
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}

/// Ensures the system administrator role exists with full grants on every
/// resource. Returns the role id for bootstrap assignment.
pub async fn ensure_administrator_role(pool: &PgPool) -> AppResult<RoleId> {
    let mut transaction = pool
        .begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

    let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        INSERT INTO roles (name, description, is_system)
        VALUES ($1, $2, true)
        ON CONFLICT (name) WHERE NOT is_archived DO UPDATE
        SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind("administrator")
    .bind("system role with full access to every resource")
    .fetch_one(&mut *transaction)
    .await
    .map_err(|error| {
        AppError::Internal(format!("failed to ensure administrator role: {error}"))
    })?;

    let full_access: CapabilityMap = Resource::all()
        .iter()
        .map(|resource| (*resource, PermissionLevel::FullAccess.encode()))
        .collect();

    insert_capability_rows(&mut transaction, role_id, &full_access).await?;

    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

    Ok(RoleId::from_uuid(role_id))
}

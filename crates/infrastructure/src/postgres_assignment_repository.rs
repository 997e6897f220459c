//! PostgreSQL-backed role assignment repository.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use gatehouse_application::{AssignmentFilter, AssignmentRepository, RoleAssignmentRecord};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{RoleId, UserId};

/// PostgreSQL implementation of the assignment repository port.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    role_name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn create(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let user_exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve user: {error}")))?;

        if user_exists == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' was not found"
            )));
        }

        let role_exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM roles
            WHERE id = $1 AND NOT is_archived
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        if role_exists == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO role_assignments (user_id, role_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create assignment: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn archive(&self, filter: &AssignmentFilter) -> AppResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_archived = true
            WHERE NOT is_archived
                AND ($1::uuid IS NULL OR user_id = $1)
                AND ($2::uuid IS NULL OR role_id = $2)
            "#,
        )
        .bind(filter.user_id.map(|user_id| user_id.as_uuid()))
        .bind(filter.role_id.map(|role_id| role_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to archive assignments: {error}")))?
        .rows_affected();

        Ok(rows_affected)
    }

    async fn list(&self, filter: &AssignmentFilter) -> AppResult<Vec<RoleAssignmentRecord>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                assignments.user_id,
                assignments.role_id,
                roles.name AS role_name,
                assignments.created_at
            FROM role_assignments AS assignments
            INNER JOIN roles
                ON roles.id = assignments.role_id
            WHERE NOT assignments.is_archived
                AND ($1::uuid IS NULL OR assignments.user_id = $1)
                AND ($2::uuid IS NULL OR assignments.role_id = $2)
            ORDER BY assignments.user_id, roles.name
            "#,
        )
        .bind(filter.user_id.map(|user_id| user_id.as_uuid()))
        .bind(filter.role_id.map(|role_id| role_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| RoleAssignmentRecord {
                user_id: UserId::from_uuid(row.user_id),
                role_id: RoleId::from_uuid(row.role_id),
                role_name: row.role_name,
                assigned_at: row.created_at,
            })
            .collect())
    }

    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        let role_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT DISTINCT role_id
            FROM role_assignments
            WHERE user_id = $1 AND NOT is_archived
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list assignment role ids: {error}"))
        })?;

        Ok(role_ids.into_iter().map(RoleId::from_uuid).collect())
    }
}

use std::collections::HashMap;

use sqlx::FromRow;

use gatehouse_application::RoleSummary;
use gatehouse_domain::RoleId;

use super::*;

#[derive(Debug, FromRow)]
struct UserRoleRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    role_name: String,
}

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, email, phone_no, status,
    password_hash, created_at, updated_at
"#;

impl PostgresUserRepository {
    pub(super) async fn find_by_email_impl(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = LOWER($1)
            LIMIT 1
            "#,
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by email: {error}")))?;

        row.map(user_record_from_row).transpose()
    }

    pub(super) async fn find_by_email_or_phone_impl(
        &self,
        email: &str,
        phone_no: Option<&str>,
    ) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = LOWER($1)
                OR ($2::text IS NOT NULL AND phone_no = $2)
            LIMIT 1
            "#,
        ))
        .bind(email)
        .bind(phone_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find user by email or phone: {error}"))
        })?;

        row.map(user_record_from_row).transpose()
    }

    pub(super) async fn find_active_by_id_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND status = 'active'
            LIMIT 1
            "#,
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by id: {error}")))?;

        row.map(user_record_from_row).transpose()
    }

    pub(super) async fn find_active_with_roles_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Option<UserWithRoles>> {
        let Some(user) = self.find_active_by_id_impl(user_id).await? else {
            return Ok(None);
        };

        let mut roles_by_user = self.roles_for_users(&[user_id.as_uuid()]).await?;

        Ok(Some(UserWithRoles {
            roles: roles_by_user.remove(&user_id.as_uuid()).unwrap_or_default(),
            user,
        }))
    }

    pub(super) async fn list_impl(
        &self,
        query: UserListQuery,
    ) -> AppResult<(Vec<UserWithRoles>, u64)> {
        let search = query
            .search_text
            .as_deref()
            .map(|text| format!("%{text}%"));
        let take = query.take.max(1);
        let offset = (query.page_no.max(1) - 1) * take;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE status <> 'deleted'
                AND ($1::text IS NULL
                    OR first_name ILIKE $1
                    OR last_name ILIKE $1
                    OR email ILIKE $1
                    OR first_name || ' ' || COALESCE(last_name, '') ILIKE $1)
            "#,
        )
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count users: {error}")))?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE status <> 'deleted'
                AND ($1::text IS NULL
                    OR first_name ILIKE $1
                    OR last_name ILIKE $1
                    OR email ILIKE $1
                    OR first_name || ' ' || COALESCE(last_name, '') ILIKE $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(search.as_deref())
        .bind(take)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        let user_ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
        let mut roles_by_user = self.roles_for_users(&user_ids).await?;

        let users = rows
            .into_iter()
            .map(|row| {
                let roles = roles_by_user.remove(&row.id).unwrap_or_default();
                user_record_from_row(row).map(|user| UserWithRoles { user, roles })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((users, total as u64))
    }

    async fn roles_for_users(
        &self,
        user_ids: &[uuid::Uuid],
    ) -> AppResult<HashMap<uuid::Uuid, Vec<RoleSummary>>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT
                assignments.user_id,
                roles.id AS role_id,
                roles.name AS role_name
            FROM role_assignments AS assignments
            INNER JOIN roles
                ON roles.id = assignments.role_id
                AND NOT roles.is_archived
            WHERE assignments.user_id = ANY($1)
                AND NOT assignments.is_archived
            ORDER BY assignments.user_id, roles.name
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user roles: {error}")))?;

        let mut by_user: HashMap<uuid::Uuid, Vec<RoleSummary>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(RoleSummary {
                role_id: RoleId::from_uuid(row.role_id),
                name: row.role_name,
            });
        }

        Ok(by_user)
    }
}

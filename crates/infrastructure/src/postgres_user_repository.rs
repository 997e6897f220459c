//! PostgreSQL-backed user repository.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use gatehouse_application::{
    NewUserRecord, UserChanges, UserListQuery, UserRecord, UserRepository, UserWithRoles,
};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{UserId, UserStatus};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    first_name: String,
    last_name: Option<String>,
    email: String,
    phone_no: Option<String>,
    status: String,
    password_hash: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

fn user_record_from_row(row: UserRow) -> AppResult<UserRecord> {
    let status = UserStatus::from_str(row.status.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "invalid stored status for user '{}': {error}",
            row.id
        ))
    })?;

    Ok(UserRecord {
        id: UserId::from_uuid(row.id),
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        phone_no: row.phone_no,
        status,
        password_hash: row.password_hash,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

mod account;
mod lookup;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.find_by_email_impl(email).await
    }

    async fn find_by_email_or_phone(
        &self,
        email: &str,
        phone_no: Option<&str>,
    ) -> AppResult<Option<UserRecord>> {
        self.find_by_email_or_phone_impl(email, phone_no).await
    }

    async fn find_active_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        self.find_active_by_id_impl(user_id).await
    }

    async fn find_active_with_roles(&self, user_id: UserId) -> AppResult<Option<UserWithRoles>> {
        self.find_active_with_roles_impl(user_id).await
    }

    async fn list(&self, query: UserListQuery) -> AppResult<(Vec<UserWithRoles>, u64)> {
        self.list_impl(query).await
    }

    async fn create(&self, record: NewUserRecord) -> AppResult<UserRecord> {
        self.create_impl(record).await
    }

    async fn update_profile(&self, user_id: UserId, changes: UserChanges) -> AppResult<()> {
        self.update_profile_impl(user_id, changes).await
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        self.update_password_impl(user_id, password_hash).await
    }

    async fn set_status(&self, user_id: UserId, status: UserStatus) -> AppResult<()> {
        self.set_status_impl(user_id, status).await
    }
}

fn contact_conflict_or_internal(error: sqlx::Error, operation: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(
            "a user with this email or phone number already exists".to_owned(),
        );
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}

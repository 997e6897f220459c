use super::*;

impl PostgresUserRepository {
    pub(super) async fn create_impl(&self, record: NewUserRecord) -> AppResult<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (first_name, last_name, email, phone_no, status, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, email, phone_no, status,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(record.first_name.trim())
        .bind(record.last_name.as_deref().map(str::trim))
        .bind(record.email.as_str())
        .bind(record.phone_no.as_deref())
        .bind(record.status.as_str())
        .bind(record.password_hash.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| contact_conflict_or_internal(error, "create user"))?;

        user_record_from_row(row)
    }

    pub(super) async fn update_profile_impl(
        &self,
        user_id: UserId,
        changes: UserChanges,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_no = COALESCE($4, phone_no),
                status = COALESCE($5, status),
                updated_at = now()
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(changes.first_name.as_deref().map(str::trim))
        .bind(changes.last_name.as_deref().map(str::trim))
        .bind(changes.phone_no.as_deref())
        .bind(changes.status.map(|status| status.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|error| contact_conflict_or_internal(error, "update user profile"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn update_password_impl(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update password: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn set_status_impl(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET status = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update user status: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' was not found"
            )));
        }

        Ok(())
    }
}

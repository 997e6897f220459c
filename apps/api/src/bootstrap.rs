//! Startup provisioning: system role and administrator account.

use gatehouse_application::{AssignmentRepository, PasswordHasher, UserRepository};
use gatehouse_application::NewUserRecord;
use gatehouse_core::AppResult;
use gatehouse_domain::{EmailAddress, UserStatus, validate_password};
use gatehouse_infrastructure::{
    Argon2PasswordHasher, PostgresAssignmentRepository, PostgresUserRepository,
    ensure_administrator_role,
};
use sqlx::PgPool;
use tracing::info;

/// Ensures the administrator role exists and, when credentials are
/// configured, an administrator account holding it.
pub async fn run(
    pool: &PgPool,
    admin_email: Option<String>,
    admin_password: Option<String>,
) -> AppResult<()> {
    let role_id = ensure_administrator_role(pool).await?;

    let (Some(email), Some(password)) = (admin_email, admin_password) else {
        return Ok(());
    };

    let email = EmailAddress::new(email)?;
    let user_repository = PostgresUserRepository::new(pool.clone());

    if user_repository.find_by_email(email.as_str()).await?.is_some() {
        return Ok(());
    }

    validate_password(password.as_str())?;
    let password_hash = Argon2PasswordHasher::new().hash_password(password.as_str())?;

    let user = user_repository
        .create(NewUserRecord {
            first_name: "Administrator".to_owned(),
            last_name: None,
            email: email.as_str().to_owned(),
            phone_no: None,
            status: UserStatus::Active,
            password_hash: Some(password_hash),
        })
        .await?;

    PostgresAssignmentRepository::new(pool.clone())
        .create(user.id, role_id)
        .await?;

    info!(email = email.as_str(), "bootstrapped administrator account");

    Ok(())
}

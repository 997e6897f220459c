use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use gatehouse_core::{AppError, PrincipalIdentity};
use gatehouse_domain::UserId;
use tower_sessions::Session;

use crate::dto::{AuthLoginRequest, PrincipalSessionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{SESSION_CREATED_AT_KEY, SESSION_PRINCIPAL_KEY};

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AuthLoginRequest>,
) -> ApiResult<Json<PrincipalSessionResponse>> {
    let user = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;

    let display_name = match user.last_name.as_deref() {
        Some(last_name) => format!("{} {last_name}", user.first_name),
        None => user.first_name.clone(),
    };
    let identity = PrincipalIdentity::new(user.id.as_uuid(), display_name, user.email.clone());

    // OWASP Session Management: regenerate session ID on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_PRINCIPAL_KEY, &identity)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session identity: {error}"))
        })?;

    session
        .insert(SESSION_CREATED_AT_KEY, chrono::Utc::now().timestamp())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session creation time: {error}"))
        })?;

    let permissions = state
        .authorization_service
        .effective_capabilities(user.id)
        .await?;

    Ok(Json(PrincipalSessionResponse::new(&identity, &permissions)))
}

/// POST /auth/logout - Drop the server-side session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Current principal with its effective capabilities.
pub async fn me_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<PrincipalSessionResponse>> {
    let identity = session
        .get::<PrincipalIdentity>(SESSION_PRINCIPAL_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let permissions = state
        .authorization_service
        .effective_capabilities(UserId::from_uuid(identity.principal_id()))
        .await?;

    Ok(Json(PrincipalSessionResponse::new(&identity, &permissions)))
}

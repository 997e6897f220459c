use super::*;

use std::str::FromStr;

use gatehouse_application::{CreateUserInput, UpdateUserInput, UserListQuery};
use gatehouse_domain::UserStatus;

use crate::dto::{
    CreateUserRequest, UpdatePasswordRequest, UpdateUserRequest, UserListResponse, UserResponse,
};

pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let role_id = parse_role_id(payload.role_id.as_str())?;

    let created = state
        .user_service
        .create_user(CreateUserInput {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            phone_no: payload.phone_no,
            role_id,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<Json<UserListResponse>> {
    let (users, total_count) = state
        .user_service
        .list_users(UserListQuery {
            take: params.take.unwrap_or(DEFAULT_PAGE_SIZE),
            page_no: params.page_no.unwrap_or(1),
            search_text: params.search_text,
        })
        .await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total_count,
    }))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = parse_user_id(id.as_str())?;
    let user = state.user_service.get_user(user_id).await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = parse_user_id(id.as_str())?;

    let status = payload
        .status
        .as_deref()
        .map(UserStatus::from_str)
        .transpose()?;
    if status == Some(UserStatus::Deleted) {
        return Err(AppError::Validation(
            "users are archived through the archive endpoint".to_owned(),
        )
        .into());
    }

    let updated = state
        .user_service
        .update_user(
            user_id,
            UpdateUserInput {
                first_name: payload.first_name,
                last_name: payload.last_name,
                phone_no: payload.phone_no,
                status,
                roles: payload.roles,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(updated)))
}

pub async fn update_password_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<PrincipalIdentity>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(id.as_str())?;

    state
        .user_service
        .update_password(
            user_id,
            &principal,
            payload.old_password.as_str(),
            payload.new_password.as_str(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(id.as_str())?;
    state.user_service.archive_user(user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

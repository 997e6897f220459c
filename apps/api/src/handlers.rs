use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use gatehouse_core::{AppError, PrincipalIdentity};
use gatehouse_domain::{RoleId, UserId};

use crate::error::ApiResult;
use crate::state::AppState;

pub mod health;
pub mod roles;
pub mod users;

/// Query parameters shared by paginated listings.
#[derive(Debug, Deserialize)]
pub struct ListQueryParams {
    take: Option<i64>,
    page_no: Option<i64>,
    search_text: Option<String>,
}

const DEFAULT_PAGE_SIZE: i64 = 10;

fn parse_user_id(value: &str) -> Result<UserId, AppError> {
    uuid::Uuid::parse_str(value)
        .map(UserId::from_uuid)
        .map_err(|error| AppError::Validation(format!("invalid user id '{value}': {error}")))
}

fn parse_role_id(value: &str) -> Result<RoleId, AppError> {
    uuid::Uuid::parse_str(value)
        .map(RoleId::from_uuid)
        .map_err(|error| AppError::Validation(format!("invalid role id '{value}': {error}")))
}

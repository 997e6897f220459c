use super::*;

use std::collections::BTreeMap;

use gatehouse_application::{
    AssignmentFilter, CreateRoleInput, RoleListQuery, UpdateRoleInput,
};
use gatehouse_domain::{PermissionLevel, Resource};

use crate::dto::{
    ArchiveAssignmentsRequest, ArchiveAssignmentsResponse, AssignRoleRequest, CreateRoleRequest,
    RoleAssignmentResponse, RoleListResponse, RoleResponse, UpdateRoleRequest,
};

pub async fn create_role_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let levels = parse_levels(&payload.levels)?;

    let role = state
        .role_service
        .create_role(CreateRoleInput {
            name: payload.name,
            description: payload.description,
            levels,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<Json<RoleListResponse>> {
    let (roles, total_count) = state
        .role_service
        .list_roles(RoleListQuery {
            take: params.take.unwrap_or(DEFAULT_PAGE_SIZE),
            page_no: params.page_no.unwrap_or(1),
            search_text: params.search_text,
        })
        .await?;

    Ok(Json(RoleListResponse {
        roles: roles.into_iter().map(RoleResponse::from).collect(),
        total_count,
    }))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let role_id = parse_role_id(id.as_str())?;
    let role = state.role_service.get_role(role_id).await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role_id = parse_role_id(id.as_str())?;
    let levels = payload
        .levels
        .as_ref()
        .map(|levels| parse_levels(levels))
        .transpose()?;

    let role = state
        .role_service
        .update_role(
            role_id,
            UpdateRoleInput {
                name: payload.name,
                description: payload.description,
                levels,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn archive_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let role_id = parse_role_id(id.as_str())?;
    state.role_service.archive_role(role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(payload.user_id.as_str())?;
    let role_id = parse_role_id(payload.role_id.as_str())?;

    state.role_service.assign_role(user_id, role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters filtering assignment listings.
#[derive(Debug, Deserialize)]
pub struct AssignmentListParams {
    user_id: Option<String>,
    role_id: Option<String>,
}

pub async fn list_assignments_handler(
    State(state): State<AppState>,
    Query(params): Query<AssignmentListParams>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let filter = AssignmentFilter {
        user_id: params
            .user_id
            .as_deref()
            .map(parse_user_id)
            .transpose()?,
        role_id: params
            .role_id
            .as_deref()
            .map(parse_role_id)
            .transpose()?,
    };

    let assignments = state
        .role_service
        .list_assignments(filter)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn archive_assignments_handler(
    State(state): State<AppState>,
    Json(payload): Json<ArchiveAssignmentsRequest>,
) -> ApiResult<Json<ArchiveAssignmentsResponse>> {
    let filter = AssignmentFilter {
        user_id: payload
            .user_id
            .as_deref()
            .map(parse_user_id)
            .transpose()?,
        role_id: payload
            .role_id
            .as_deref()
            .map(parse_role_id)
            .transpose()?,
    };

    let archived_count = state.role_service.archive_assignments(filter).await?;

    Ok(Json(ArchiveAssignmentsResponse { archived_count }))
}

fn parse_levels(
    levels: &BTreeMap<String, String>,
) -> Result<BTreeMap<Resource, PermissionLevel>, AppError> {
    levels
        .iter()
        .map(|(resource, level)| {
            let resource = Resource::from_transport(resource.as_str())?;
            Ok((resource, PermissionLevel::from_transport(level.as_str())))
        })
        .collect()
}

//! Assignment management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        assignment::{
            Assignment, AssignmentDetail, AssignmentEditView, AssignmentFilter, AssignmentSummary,
            NewAssignment, UpdateAssignment,
        },
        enums::AssignmentStatus,
        page::{Page, PageRequest},
    },
};

use super::{parse_states, Actor};

/// Query parameters for the assignment list
#[derive(Deserialize, IntoParams)]
pub struct ListAssignmentsQuery {
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
    /// Search term matched against asset code, asset name and assignee
    pub search: Option<String>,
    /// Comma-separated status labels, e.g. `ACCEPTED,DECLINED`
    pub states: Option<String>,
    /// Only assignments belonging to this user
    pub user_id: Option<Uuid>,
    pub assigned_date_from: Option<NaiveDate>,
    pub assigned_date_to: Option<NaiveDate>,
}

/// Accept or decline request
#[derive(Deserialize, ToSchema)]
pub struct UpdateAssignmentStatus {
    pub status: AssignmentStatus,
    /// Version observed by the caller
    pub version: i64,
}

/// Query parameters for assignment deletion
#[derive(Deserialize, IntoParams)]
pub struct DeleteAssignmentQuery {
    /// Version observed by the caller
    pub version: i64,
}

/// List assignments with paging and filters
#[utoipa::path(
    get,
    path = "/assignments",
    tag = "assignments",
    params(ListAssignmentsQuery),
    responses(
        (status = 200, description = "One page of assignments", body = Page<AssignmentSummary>),
        (status = 400, description = "Invalid status filter")
    )
)]
pub async fn list_assignments(
    State(state): State<crate::AppState>,
    Query(query): Query<ListAssignmentsQuery>,
) -> AppResult<Json<Page<AssignmentSummary>>> {
    let filter = AssignmentFilter {
        search: query.search,
        states: parse_states(query.states.as_deref())?,
        user_id: query.user_id,
        assigned_date_from: query.assigned_date_from,
        assigned_date_to: query.assigned_date_to,
    };
    let page = PageRequest::new(query.page.unwrap_or(0), query.size.unwrap_or(20));

    let assignments = state
        .services
        .assignments
        .list_assignments(filter, page)
        .await?;
    Ok(Json(assignments))
}

/// Get one assignment with its asset and user
#[utoipa::path(
    get,
    path = "/assignments/{id}",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment details", body = AssignmentDetail),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn get_assignment(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AssignmentDetail>> {
    let detail = state.services.assignments.get_assignment_detail(id).await?;
    Ok(Json(detail))
}

/// Get the editable fields of an assignment, with the version an update
/// must carry
#[utoipa::path(
    get,
    path = "/assignments/{id}/edit",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Editable view", body = AssignmentEditView),
        (status = 404, description = "Assignment not found"),
        (status = 422, description = "Assignment is no longer editable")
    )
)]
pub async fn get_assignment_edit_view(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AssignmentEditView>> {
    let view = state
        .services
        .assignments
        .get_assignment_edit_view(id)
        .await?;
    Ok(Json(view))
}

/// Create an assignment, reserving the asset
#[utoipa::path(
    post,
    path = "/assignments",
    tag = "assignments",
    request_body = NewAssignment,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 404, description = "User or asset not found"),
        (status = 409, description = "Asset is being modified by another user"),
        (status = 422, description = "Asset is not available")
    )
)]
pub async fn create_assignment(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewAssignment>,
) -> AppResult<(StatusCode, Json<Assignment>)> {
    let assignment = state
        .services
        .assignments
        .create_assignment(request, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Edit a waiting assignment
#[utoipa::path(
    put,
    path = "/assignments/{id}",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = UpdateAssignment,
    responses(
        (status = 200, description = "Assignment updated", body = Assignment),
        (status = 404, description = "Assignment, user or asset not found"),
        (status = 409, description = "Assignment is being modified by another user"),
        (status = 422, description = "Assignment is no longer editable or the asset is not available")
    )
)]
pub async fn update_assignment(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssignment>,
) -> AppResult<Json<Assignment>> {
    let assignment = state
        .services
        .assignments
        .update_assignment(id, request, &actor)
        .await?;
    Ok(Json(assignment))
}

/// Accept or decline a waiting assignment
#[utoipa::path(
    patch,
    path = "/assignments/{id}/status",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentStatus,
    responses(
        (status = 200, description = "Status updated", body = Assignment),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Assignment is being modified by another user"),
        (status = 422, description = "Status can no longer be changed")
    )
)]
pub async fn update_assignment_status(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssignmentStatus>,
) -> AppResult<Json<Assignment>> {
    let assignment = state
        .services
        .assignments
        .update_status(id, request.status, request.version, &actor)
        .await?;
    Ok(Json(assignment))
}

/// Delete a waiting or declined assignment
#[utoipa::path(
    delete,
    path = "/assignments/{id}",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID"), DeleteAssignmentQuery),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Assignment is being modified by another user"),
        (status = 422, description = "Assignment can no longer be deleted")
    )
)]
pub async fn delete_assignment(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteAssignmentQuery>,
) -> AppResult<StatusCode> {
    state
        .services
        .assignments
        .delete_assignment(id, query.version, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

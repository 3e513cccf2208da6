//! Staff member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        enums::UserStatus,
        user::{NewUser, User},
    },
};

use super::Actor;

/// Activate or deactivate a staff member
#[derive(Deserialize, ToSchema)]
pub struct UpdateUserStatus {
    pub status: UserStatus,
    /// Version observed by the caller
    pub version: i64,
}

/// Get one staff member
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(user))
}

/// Create a staff member with a generated staff code
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Unknown location")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.create_user(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Change a staff member's account status
#[utoipa::path(
    patch,
    path = "/users/{id}/status",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserStatus,
    responses(
        (status = 200, description = "Status updated", body = User),
        (status = 404, description = "User not found"),
        (status = 409, description = "User is being modified by another user"),
        (status = 422, description = "User still has live assignments")
    )
)]
pub async fn update_user_status(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserStatus>,
) -> AppResult<Json<User>> {
    let user = state
        .services
        .users
        .update_user_status(id, request.status, request.version, &actor)
        .await?;
    Ok(Json(user))
}

//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::{asset_returns, assets, assignments, health, users};
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OAM API",
        version = "1.0.0",
        description = "Online Asset Management REST API",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Assets
        assets::list_assets,
        assets::get_asset,
        assets::create_asset,
        assets::update_asset,
        assets::delete_asset,
        // Assignments
        assignments::list_assignments,
        assignments::get_assignment,
        assignments::get_assignment_edit_view,
        assignments::create_assignment,
        assignments::update_assignment,
        assignments::update_assignment_status,
        assignments::delete_assignment,
        // Returns
        asset_returns::list_returns,
        asset_returns::create_return,
        asset_returns::update_return,
        // Users
        users::get_user,
        users::create_user,
        users::update_user_status,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::error::ErrorResponse,
            // Assets
            crate::models::asset::Asset,
            crate::models::asset::NewAsset,
            crate::models::asset::UpdateAsset,
            // Assignments
            crate::models::assignment::Assignment,
            crate::models::assignment::NewAssignment,
            crate::models::assignment::UpdateAssignment,
            crate::models::assignment::AssignmentDetail,
            crate::models::assignment::AssignmentEditView,
            crate::models::assignment::AssignmentSummary,
            assignments::UpdateAssignmentStatus,
            // Returns
            crate::models::asset_return::AssetReturn,
            crate::models::asset_return::ReturnSummary,
            asset_returns::CreateReturn,
            asset_returns::UpdateReturn,
            // Users
            crate::models::user::User,
            crate::models::user::NewUser,
            users::UpdateUserStatus,
            // Enums
            crate::models::enums::AssetState,
            crate::models::enums::AssignmentStatus,
            crate::models::enums::ReturnState,
            crate::models::enums::UserStatus,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "assets", description = "Asset lifecycle"),
        (name = "assignments", description = "Assignment workflow"),
        (name = "returns", description = "Return requests"),
        (name = "users", description = "Staff members")
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document
pub fn create_openapi_router() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

//! Return request endpoints

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
        asset_return::{AssetReturn, ReturnFilter, ReturnSummary},
        enums::ReturnState,
        page::{Page, PageRequest},
    },
};

use super::{parse_states, Actor};

/// Query parameters for the return list
#[derive(Deserialize, IntoParams)]
pub struct ListReturnsQuery {
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
    /// Search term matched against asset code, asset name and assignee
    pub search: Option<String>,
    /// Comma-separated state labels, e.g. `WAITING_FOR_RETURNING,COMPLETED`
    pub states: Option<String>,
    pub returned_date_from: Option<NaiveDate>,
    pub returned_date_to: Option<NaiveDate>,
}

/// Open a return request for an assignment
#[derive(Deserialize, ToSchema)]
pub struct CreateReturn {
    pub assignment_id: Uuid,
}

/// Complete or cancel a return request
#[derive(Deserialize, ToSchema)]
pub struct UpdateReturn {
    pub state: ReturnState,
    /// Version observed by the caller
    pub version: i64,
}

/// List return requests with paging and filters
#[utoipa::path(
    get,
    path = "/returns",
    tag = "returns",
    params(ListReturnsQuery),
    responses(
        (status = 200, description = "One page of return requests", body = Page<ReturnSummary>),
        (status = 400, description = "Invalid state filter")
    )
)]
pub async fn list_returns(
    State(state): State<crate::AppState>,
    Query(query): Query<ListReturnsQuery>,
) -> AppResult<Json<Page<ReturnSummary>>> {
    let filter = ReturnFilter {
        search: query.search,
        states: parse_states(query.states.as_deref())?,
        returned_date_from: query.returned_date_from,
        returned_date_to: query.returned_date_to,
    };
    let page = PageRequest::new(query.page.unwrap_or(0), query.size.unwrap_or(20));

    let returns = state
        .services
        .asset_returns
        .list_returns(filter, page)
        .await?;
    Ok(Json(returns))
}

/// Request the return of an assigned asset
#[utoipa::path(
    post,
    path = "/returns",
    tag = "returns",
    request_body = CreateReturn,
    responses(
        (status = 201, description = "Return requested", body = AssetReturn),
        (status = 404, description = "Assignment not found"),
        (status = 422, description = "Assignment not accepted or already returned")
    )
)]
pub async fn create_return(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateReturn>,
) -> AppResult<(StatusCode, Json<AssetReturn>)> {
    let asset_return = state
        .services
        .asset_returns
        .create_return(request.assignment_id, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(asset_return)))
}

/// Complete or cancel a waiting return request
#[utoipa::path(
    patch,
    path = "/returns/{id}",
    tag = "returns",
    params(("id" = Uuid, Path, description = "Return request ID")),
    request_body = UpdateReturn,
    responses(
        (status = 200, description = "Return request updated", body = AssetReturn),
        (status = 404, description = "Return request not found"),
        (status = 409, description = "Return request is being modified by another user"),
        (status = 422, description = "Return request is no longer waiting")
    )
)]
pub async fn update_return(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReturn>,
) -> AppResult<Json<AssetReturn>> {
    let asset_return = state
        .services
        .asset_returns
        .update_return(id, request.state, request.version, &actor)
        .await?;
    Ok(Json(asset_return))
}

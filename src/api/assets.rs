//! Asset management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        asset::{Asset, AssetFilter, NewAsset, UpdateAsset},
        page::{Page, PageRequest},
    },
};

use super::{parse_states, Actor};

/// Query parameters for the asset list
#[derive(Deserialize, IntoParams)]
pub struct ListAssetsQuery {
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
    /// Search term matched against asset code and name
    pub search: Option<String>,
    /// Comma-separated state labels, e.g. `AVAILABLE,ASSIGNED`
    pub states: Option<String>,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
}

/// Query parameters for asset deletion
#[derive(Deserialize, IntoParams)]
pub struct DeleteAssetQuery {
    /// Version observed by the caller
    pub version: i64,
}

/// List assets with paging and filters
#[utoipa::path(
    get,
    path = "/assets",
    tag = "assets",
    params(ListAssetsQuery),
    responses(
        (status = 200, description = "One page of assets", body = Page<Asset>),
        (status = 400, description = "Invalid state filter")
    )
)]
pub async fn list_assets(
    State(state): State<crate::AppState>,
    Query(query): Query<ListAssetsQuery>,
) -> AppResult<Json<Page<Asset>>> {
    let filter = AssetFilter {
        search: query.search,
        states: parse_states(query.states.as_deref())?,
        category_id: query.category_id,
        location_id: query.location_id,
    };
    let page = PageRequest::new(query.page.unwrap_or(0), query.size.unwrap_or(20));

    let assets = state.services.assets.list_assets(filter, page).await?;
    Ok(Json(assets))
}

/// Get one asset
#[utoipa::path(
    get,
    path = "/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "The asset", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn get_asset(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.get_asset(id).await?;
    Ok(Json(asset))
}

/// Create an asset
#[utoipa::path(
    post,
    path = "/assets",
    tag = "assets",
    request_body = NewAsset,
    responses(
        (status = 201, description = "Asset created", body = Asset),
        (status = 400, description = "Unknown category or location")
    )
)]
pub async fn create_asset(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Json(request): Json<NewAsset>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    let asset = state.services.assets.create_asset(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Update an asset
#[utoipa::path(
    put,
    path = "/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = UpdateAsset,
    responses(
        (status = 200, description = "Asset updated", body = Asset),
        (status = 404, description = "Asset not found"),
        (status = 409, description = "Asset is being modified by another user"),
        (status = 422, description = "Asset is assigned or the state change is not allowed")
    )
)]
pub async fn update_asset(
    State(state): State<crate::AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAsset>,
) -> AppResult<Json<Asset>> {
    let asset = state
        .services
        .assets
        .update_asset(id, request, &actor)
        .await?;
    Ok(Json(asset))
}

/// Delete an asset
#[utoipa::path(
    delete,
    path = "/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset ID"), DeleteAssetQuery),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 404, description = "Asset not found"),
        (status = 409, description = "Asset is being modified by another user"),
        (status = 422, description = "Asset has assignment history")
    )
)]
pub async fn delete_asset(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteAssetQuery>,
) -> AppResult<StatusCode> {
    state.services.assets.delete_asset(id, query.version).await?;
    Ok(StatusCode::NO_CONTENT)
}

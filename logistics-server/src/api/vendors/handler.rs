//! Vendor API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::vendor;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
use shared::models::{Pagination, Vendor, VendorCreate, VendorUpdate};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// GET /api/vendors
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Vendor>>>> {
    let (vendors, total) = vendor::find_all(&state.pool, query.page, query.limit).await?;
    Ok(paginated(
        vendors,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}

/// GET /api/vendors/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let v = vendor::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor not found"))?;
    Ok(ok(v))
}

/// GET /api/vendors/city/:city
pub async fn get_by_city(
    State(state): State<ServerState>,
    Path(city): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Vendor>>>> {
    let vendors = vendor::find_by_city(&state.pool, &city).await?;
    Ok(ok(vendors))
}

/// POST /api/vendors
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<VendorCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vendor>>)> {
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AppError::validation("Vendor name and email are required"));
    }
    let v = vendor::create(&state.pool, payload).await?;
    Ok(created(v, "Vendor created successfully"))
}

/// PUT /api/vendors/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<VendorUpdate>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let v = vendor::update(&state.pool, id, payload).await?;
    Ok(ok_with_message(v, "Vendor updated successfully"))
}

/// DELETE /api/vendors/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let deleted = vendor::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Vendor not found"));
    }
    Ok(ok_with_message(true, "Vendor deleted successfully"))
}

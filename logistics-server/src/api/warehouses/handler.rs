//! Warehouse API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::warehouse;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
use shared::models::{Pagination, Warehouse, WarehouseCreate, WarehouseUpdate};

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

/// GET /api/warehouses
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Warehouse>>>> {
    let (warehouses, total) = warehouse::find_all(&state.pool, query.page, query.limit).await?;
    Ok(paginated(
        warehouses,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}

/// GET /api/warehouses/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Warehouse>>> {
    let w = warehouse::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Warehouse not found"))?;
    Ok(ok(w))
}

/// POST /api/warehouses
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<WarehouseCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<Warehouse>>)> {
    if payload.name.trim().is_empty() || payload.city.trim().is_empty() {
        return Err(AppError::validation("Warehouse name and city are required"));
    }
    let w = warehouse::create(&state.pool, payload).await?;
    Ok(created(w, "Warehouse created successfully"))
}

/// PUT /api/warehouses/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<WarehouseUpdate>,
) -> AppResult<Json<ApiResponse<Warehouse>>> {
    let w = warehouse::update(&state.pool, id, payload).await?;
    Ok(ok_with_message(w, "Warehouse updated successfully"))
}

/// DELETE /api/warehouses/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let deleted = warehouse::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Warehouse not found"));
    }
    Ok(ok_with_message(true, "Warehouse deleted successfully"))
}

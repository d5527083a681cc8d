//! Fare API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::fare;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
use shared::models::{Fare, FareCreate, FareUpdate, Pagination};

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

/// GET /api/fares
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Fare>>>> {
    let (fares, total) = fare::find_all(&state.pool, query.page, query.limit).await?;
    Ok(paginated(
        fares,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}

/// GET /api/fares/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Fare>>> {
    let f = fare::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Fare not found"))?;
    Ok(ok(f))
}

/// GET /api/fares/route/:from_city/:to_city
pub async fn get_by_route(
    State(state): State<ServerState>,
    Path((from_city, to_city)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Fare>>> {
    let f = fare::find_by_route(&state.pool, &from_city, &to_city)
        .await?
        .ok_or_else(|| AppError::not_found("Fare not found"))?;
    Ok(ok(f))
}

/// POST /api/fares
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<FareCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<Fare>>)> {
    validate_fare(
        &payload.from_city,
        &payload.to_city,
        &[
            payload.branch_delivery_price,
            payload.cod_branch_price,
            payload.door_delivery_price,
        ],
    )?;
    let f = fare::create(&state.pool, payload).await?;
    Ok(created(f, "Fare created successfully"))
}

/// PUT /api/fares/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<FareUpdate>,
) -> AppResult<Json<ApiResponse<Fare>>> {
    let prices: Vec<f64> = [
        payload.branch_delivery_price,
        payload.cod_branch_price,
        payload.door_delivery_price,
    ]
    .into_iter()
    .flatten()
    .collect();
    if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(AppError::validation("Fare prices must be non-negative"));
    }
    let f = fare::update(&state.pool, id, payload).await?;
    Ok(ok_with_message(f, "Fare updated successfully"))
}

/// DELETE /api/fares/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let deleted = fare::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Fare not found"));
    }
    Ok(ok_with_message(true, "Fare deleted successfully"))
}

fn validate_fare(from_city: &str, to_city: &str, prices: &[f64]) -> AppResult<()> {
    if from_city.trim().is_empty() || to_city.trim().is_empty() {
        return Err(AppError::validation("Fare cities are required"));
    }
    if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(AppError::validation("Fare prices must be non-negative"));
    }
    Ok(())
}

//! Shipment API Handlers
//!
//! Creation validates the referenced order first, then the warehouse, and
//! always starts the shipment at PREPARING. Events are emitted strictly
//! after persistence.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::db::repository::shipment::{self, ShipmentListFilter};
use crate::db::repository::{order, user as user_repo, warehouse};
use crate::events::types as events;
use crate::pricing;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
use shared::models::{
    Pagination, Shipment, ShipmentCreate, ShipmentStatus, ShipmentUpdate, ShipmentWithRelations,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<ShipmentStatus>,
    pub order_id: Option<i64>,
    pub warehouse_id: Option<i64>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// GET /api/shipments
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Shipment>>>> {
    let filter = ShipmentListFilter {
        status: query.status,
        order_id: query.order_id,
        warehouse_id: query.warehouse_id,
    };
    let (shipments, total) =
        shipment::find_many(&state.pool, &filter, query.page, query.limit).await?;
    Ok(paginated(
        shipments,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}

/// GET /api/shipments/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ShipmentWithRelations>>> {
    let s = shipment::find_by_id_with_relations(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Shipment not found"))?;
    Ok(ok(s))
}

/// GET /api/shipments/tracking/:tracking_number
pub async fn get_by_tracking(
    State(state): State<ServerState>,
    Path(tracking_number): Path<String>,
) -> AppResult<Json<ApiResponse<ShipmentWithRelations>>> {
    let s = shipment::find_by_tracking_number(&state.pool, &tracking_number)
        .await?
        .ok_or_else(|| AppError::not_found("Shipment not found"))?;
    Ok(ok(s))
}

/// POST /api/shipments
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ShipmentCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<Shipment>>)> {
    // Referenced rows are checked independently: order first, then warehouse
    order::find_by_id(&state.pool, payload.order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    warehouse::find_by_id(&state.pool, payload.warehouse_id)
        .await?
        .ok_or_else(|| AppError::not_found("Warehouse not found"))?;

    // Same number contract as orders: no retry, unique index backstop
    let tracking_number = pricing::generate_tracking_number();
    let s = shipment::create(&state.pool, &payload, &tracking_number).await?;

    state
        .events
        .emit(events::SHIPMENT_CREATED, json!({ "shipment": s }));

    tracing::info!(
        tracking_number = %s.tracking_number,
        order_id = s.order_id,
        "Shipment created"
    );

    Ok(created(s, "Shipment created successfully"))
}

/// PUT /api/shipments/:id
///
/// Status transitions are free-form: any enumerated value is accepted.
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ShipmentUpdate>,
) -> AppResult<Json<ApiResponse<Shipment>>> {
    let s = shipment::update(&state.pool, id, &payload).await?;

    // The notification observer needs the order's user, when one is linked
    let user = shipment_user(&state, id).await;
    state.events.emit(
        events::SHIPMENT_UPDATED,
        json!({ "shipment": s, "user": user }),
    );

    Ok(ok_with_message(s, "Shipment updated successfully"))
}

/// DELETE /api/shipments/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let deleted = shipment::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Shipment not found"));
    }
    Ok(ok_with_message(true, "Shipment deleted successfully"))
}

/// The user linked to the shipment's order, as an event payload fragment
async fn shipment_user(state: &ServerState, shipment_id: i64) -> Value {
    let user_id = match shipment::find_by_id_with_relations(&state.pool, shipment_id).await {
        Ok(Some(with_relations)) => with_relations.user_id,
        _ => None,
    };
    let Some(user_id) = user_id else {
        return Value::Null;
    };
    match user_repo::find_by_id(&state.pool, user_id).await {
        Ok(Some(user)) => json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
        }),
        _ => Value::Null,
    }
}

//! Order API Handlers
//!
//! Order creation is the pricing flow: validate the vendor, resolve the
//! fare for the route, compute the total, allocate the order number,
//! persist, then emit `order.created`. Emission happens strictly after
//! persistence and is non-transactional: a failed observer never rolls
//! back the order.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::db::repository::order::{self, OrderListFilter};
use crate::db::repository::vendor;
use crate::events::types as events;
use crate::pricing;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
use shared::models::{
    DeliveryType, Order, OrderCreate, OrderStatus, OrderUpdate, OrderWithRelations, Pagination,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<OrderStatus>,
    pub vendor_id: Option<i64>,
    pub user_id: Option<i64>,
    pub delivery_city: Option<String>,
    pub delivery_type: Option<DeliveryType>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// GET /api/orders
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let filter = OrderListFilter {
        status: query.status,
        vendor_id: query.vendor_id,
        user_id: query.user_id,
        delivery_city: query.delivery_city,
        delivery_type: query.delivery_type,
    };
    let (orders, total) = order::find_many(&state.pool, &filter, query.page, query.limit).await?;
    Ok(paginated(
        orders,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OrderWithRelations>>> {
    let o = order::find_by_id_with_relations(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(ok(o))
}

/// POST /api/orders
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    if let Some(amount) = payload.amount_to_be_collected
        && (!amount.is_finite() || amount < 0.0)
    {
        return Err(AppError::validation(
            "amount_to_be_collected must be non-negative",
        ));
    }

    // 1. Vendor must exist
    vendor::find_by_id(&state.pool, payload.vendor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor not found"))?;

    // 2-4. Resolve fare and price the order
    let fare = pricing::resolve_fare(&state.pool, &state.config.hub_city, &payload.delivery_city)
        .await?;
    let total_amount = pricing::total_amount(
        &fare,
        payload.delivery_type,
        payload.amount_to_be_collected.unwrap_or(0.0),
    );

    // 5-6. Allocate the order number and persist (PENDING by default).
    // No collision retry: the unique index surfaces a 409 if the number
    // already exists.
    let order_number = pricing::generate_order_number();
    let o = order::create(&state.pool, &payload, &order_number, fare.id, total_amount).await?;

    // 7. Emit after persistence succeeded, carrying the linked user when
    // one exists
    let user = order_user(&state, o.id).await;
    state.events.emit(
        events::ORDER_CREATED,
        json!({ "order": o, "user": user }),
    );

    tracing::info!(
        order_number = %o.order_number,
        vendor_id = o.vendor_id,
        total_amount = o.total_amount,
        "Order created"
    );

    Ok(created(o, "Order created successfully"))
}

/// PUT /api/orders/:id
///
/// Accepts any enumerated status (no transition graph) and never re-prices,
/// even when pricing inputs change.
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderUpdate>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let o = order::update(&state.pool, id, &payload).await?;

    state
        .events
        .emit(events::ORDER_UPDATED, json!({ "order": o }));

    Ok(ok_with_message(o, "Order updated successfully"))
}

/// DELETE /api/orders/:id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let deleted = order::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Order not found"));
    }
    Ok(ok_with_message(true, "Order deleted successfully"))
}

/// The order's linked user as an event payload fragment, or null
async fn order_user(state: &ServerState, order_id: i64) -> Value {
    match order::find_by_id_with_relations(&state.pool, order_id).await {
        Ok(Some(with_relations)) => match (
            with_relations.order.user_id,
            with_relations.user_name,
            with_relations.user_email,
        ) {
            (Some(id), name, Some(email)) => json!({
                "id": id,
                "name": name,
                "email": email,
            }),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

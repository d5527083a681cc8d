//! Shipment Repository

use super::{RepoError, RepoResult, page_bounds};
use shared::models::{Shipment, ShipmentCreate, ShipmentStatus, ShipmentUpdate, ShipmentWithRelations};
use shared::util::{now_millis, snowflake_id};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const SELECT: &str = "SELECT id, tracking_number, order_id, warehouse_id, status, carrier, estimated_delivery, actual_delivery, notes, created_at, updated_at FROM shipment";

const SELECT_WITH_RELATIONS: &str = "SELECT s.*, o.order_number AS order_number, o.delivery_city AS delivery_city, \
     o.vendor_id AS vendor_id, o.user_id AS user_id, w.name AS warehouse_name \
     FROM shipment s \
     JOIN \"order\" o ON s.order_id = o.id \
     JOIN warehouse w ON s.warehouse_id = w.id";

/// List filter: every field is optional
#[derive(Debug, Default, Clone)]
pub struct ShipmentListFilter {
    pub status: Option<ShipmentStatus>,
    pub order_id: Option<i64>,
    pub warehouse_id: Option<i64>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Shipment>> {
    let sql = format!("{SELECT} WHERE id = ?");
    let shipment = sqlx::query_as::<_, Shipment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(shipment)
}

pub async fn find_by_id_with_relations(
    pool: &SqlitePool,
    id: i64,
) -> RepoResult<Option<ShipmentWithRelations>> {
    let sql = format!("{SELECT_WITH_RELATIONS} WHERE s.id = ?");
    let shipment = sqlx::query_as::<_, ShipmentWithRelations>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(shipment)
}

pub async fn find_by_tracking_number(
    pool: &SqlitePool,
    tracking_number: &str,
) -> RepoResult<Option<ShipmentWithRelations>> {
    let sql = format!("{SELECT_WITH_RELATIONS} WHERE s.tracking_number = ? LIMIT 1");
    let shipment = sqlx::query_as::<_, ShipmentWithRelations>(&sql)
        .bind(tracking_number)
        .fetch_optional(pool)
        .await?;
    Ok(shipment)
}

pub async fn find_many(
    pool: &SqlitePool,
    filter: &ShipmentListFilter,
    page: i64,
    limit: i64,
) -> RepoResult<(Vec<Shipment>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM shipment WHERE 1=1");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("{SELECT} WHERE 1=1"));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let shipments = qb.build_query_as::<Shipment>().fetch_all(pool).await?;

    Ok((shipments, total))
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ShipmentListFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(order_id) = filter.order_id {
        qb.push(" AND order_id = ").push_bind(order_id);
    }
    if let Some(warehouse_id) = filter.warehouse_id {
        qb.push(" AND warehouse_id = ").push_bind(warehouse_id);
    }
}

/// Persist a new shipment. Status always starts PREPARING regardless of any
/// status in the input.
pub async fn create(
    pool: &SqlitePool,
    data: &ShipmentCreate,
    tracking_number: &str,
) -> RepoResult<Shipment> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO shipment (id, tracking_number, order_id, warehouse_id, carrier, \
         estimated_delivery, notes, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    )
    .bind(id)
    .bind(tracking_number)
    .bind(data.order_id)
    .bind(data.warehouse_id)
    .bind(&data.carrier)
    .bind(data.estimated_delivery)
    .bind(&data.notes)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create shipment".into()))
}

/// Partial update; status transitions are free-form
pub async fn update(pool: &SqlitePool, id: i64, data: &ShipmentUpdate) -> RepoResult<Shipment> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE shipment SET status = COALESCE(?1, status), carrier = COALESCE(?2, carrier), \
         estimated_delivery = COALESCE(?3, estimated_delivery), \
         actual_delivery = COALESCE(?4, actual_delivery), notes = COALESCE(?5, notes), \
         updated_at = ?6 WHERE id = ?7",
    )
    .bind(data.status)
    .bind(&data.carrier)
    .bind(data.estimated_delivery)
    .bind(data.actual_delivery)
    .bind(&data.notes)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Shipment {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Shipment {id} not found")))
}

/// Hard delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM shipment WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

//! Order Repository

use super::{RepoError, RepoResult, page_bounds};
use shared::models::{DeliveryType, Order, OrderCreate, OrderStatus, OrderUpdate, OrderWithRelations};
use shared::util::{now_millis, snowflake_id};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const SELECT: &str = "SELECT id, order_number, vendor_id, user_id, fare_id, status, delivery_city, delivery_address, contact_number, name, alternate_contact_number, delivery_type, amount_to_be_collected, total_amount, product_weight, product_type, notes, created_at, updated_at FROM \"order\"";

/// List filter: every field is optional
#[derive(Debug, Default, Clone)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub vendor_id: Option<i64>,
    pub user_id: Option<i64>,
    pub delivery_city: Option<String>,
    pub delivery_type: Option<DeliveryType>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{SELECT} WHERE id = ?");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

pub async fn find_by_id_with_relations(
    pool: &SqlitePool,
    id: i64,
) -> RepoResult<Option<OrderWithRelations>> {
    let order = sqlx::query_as::<_, OrderWithRelations>(
        "SELECT o.*, v.name AS vendor_name, u.name AS user_name, u.email AS user_email \
         FROM \"order\" o \
         JOIN vendor v ON o.vendor_id = v.id \
         LEFT JOIN user u ON o.user_id = u.id \
         WHERE o.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(order)
}

pub async fn find_many(
    pool: &SqlitePool,
    filter: &OrderListFilter,
    page: i64,
    limit: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM \"order\" WHERE 1=1");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("{SELECT} WHERE 1=1"));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let orders = qb.build_query_as::<Order>().fetch_all(pool).await?;

    Ok((orders, total))
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderListFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(vendor_id) = filter.vendor_id {
        qb.push(" AND vendor_id = ").push_bind(vendor_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(city) = &filter.delivery_city {
        qb.push(" AND delivery_city LIKE '%' || ")
            .push_bind(city.clone())
            .push(" || '%'");
    }
    if let Some(delivery_type) = filter.delivery_type {
        qb.push(" AND delivery_type = ").push_bind(delivery_type);
    }
}

/// Persist a priced order. `order_number`, `fare_id` and `total_amount` are
/// computed by the pricing flow; status starts at the store default PENDING.
pub async fn create(
    pool: &SqlitePool,
    data: &OrderCreate,
    order_number: &str,
    fare_id: i64,
    total_amount: f64,
) -> RepoResult<Order> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO \"order\" (id, order_number, vendor_id, user_id, fare_id, delivery_city, delivery_address, \
         contact_number, name, alternate_contact_number, delivery_type, amount_to_be_collected, total_amount, \
         product_weight, product_type, notes, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
    )
    .bind(id)
    .bind(order_number)
    .bind(data.vendor_id)
    .bind(data.user_id)
    .bind(fare_id)
    .bind(&data.delivery_city)
    .bind(&data.delivery_address)
    .bind(&data.contact_number)
    .bind(&data.name)
    .bind(&data.alternate_contact_number)
    .bind(data.delivery_type)
    .bind(data.amount_to_be_collected.unwrap_or(0.0))
    .bind(total_amount)
    .bind(data.product_weight)
    .bind(&data.product_type)
    .bind(&data.notes)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Partial update. No re-pricing happens here even if pricing inputs change.
pub async fn update(pool: &SqlitePool, id: i64, data: &OrderUpdate) -> RepoResult<Order> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE \"order\" SET status = COALESCE(?1, status), \
         delivery_address = COALESCE(?2, delivery_address), \
         contact_number = COALESCE(?3, contact_number), name = COALESCE(?4, name), \
         alternate_contact_number = COALESCE(?5, alternate_contact_number), \
         product_weight = COALESCE(?6, product_weight), product_type = COALESCE(?7, product_type), \
         notes = COALESCE(?8, notes), updated_at = ?9 WHERE id = ?10",
    )
    .bind(data.status)
    .bind(&data.delivery_address)
    .bind(&data.contact_number)
    .bind(&data.name)
    .bind(&data.alternate_contact_number)
    .bind(data.product_weight)
    .bind(&data.product_type)
    .bind(&data.notes)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}

/// Hard delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM \"order\" WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

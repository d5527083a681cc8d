//! Fare Repository

use super::{RepoError, RepoResult, page_bounds};
use shared::models::{Fare, FareCreate, FareUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const SELECT: &str = "SELECT id, from_city, to_city, branch_delivery_price, cod_branch_price, door_delivery_price, is_active, created_at, updated_at FROM fare";

pub async fn find_all(pool: &SqlitePool, page: i64, limit: i64) -> RepoResult<(Vec<Fare>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM fare WHERE is_active = 1")
        .fetch_one(pool)
        .await?;
    let sql = format!("{SELECT} WHERE is_active = 1 ORDER BY from_city, to_city LIMIT ? OFFSET ?");
    let fares = sqlx::query_as::<_, Fare>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok((fares, total))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Fare>> {
    let sql = format!("{SELECT} WHERE id = ?");
    let fare = sqlx::query_as::<_, Fare>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(fare)
}

/// Exact route lookup (duplicate check on create)
pub async fn find_by_route(
    pool: &SqlitePool,
    from_city: &str,
    to_city: &str,
) -> RepoResult<Option<Fare>> {
    let sql = format!("{SELECT} WHERE from_city = ? AND to_city = ? LIMIT 1");
    let fare = sqlx::query_as::<_, Fare>(&sql)
        .bind(from_city)
        .bind(to_city)
        .fetch_optional(pool)
        .await?;
    Ok(fare)
}

/// Active fare for a route, matching `to_city` by case-insensitive substring.
///
/// SQLite's LIKE is case-insensitive for ASCII, which mirrors the original
/// store's insensitive `contains` filter.
pub async fn find_active_for_route(
    pool: &SqlitePool,
    from_city: &str,
    to_city: &str,
) -> RepoResult<Option<Fare>> {
    let sql = format!(
        "{SELECT} WHERE from_city = ?1 AND to_city LIKE '%' || ?2 || '%' AND is_active = 1 LIMIT 1"
    );
    let fare = sqlx::query_as::<_, Fare>(&sql)
        .bind(from_city)
        .bind(to_city)
        .fetch_optional(pool)
        .await?;
    Ok(fare)
}

pub async fn create(pool: &SqlitePool, data: FareCreate) -> RepoResult<Fare> {
    if find_by_route(pool, &data.from_city, &data.to_city)
        .await?
        .is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Fare route {} -> {} already exists",
            data.from_city, data.to_city
        )));
    }

    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO fare (id, from_city, to_city, branch_delivery_price, cod_branch_price, door_delivery_price, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
    )
    .bind(id)
    .bind(&data.from_city)
    .bind(&data.to_city)
    .bind(data.branch_delivery_price)
    .bind(data.cod_branch_price)
    .bind(data.door_delivery_price)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create fare".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: FareUpdate) -> RepoResult<Fare> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE fare SET from_city = COALESCE(?1, from_city), to_city = COALESCE(?2, to_city), \
         branch_delivery_price = COALESCE(?3, branch_delivery_price), \
         cod_branch_price = COALESCE(?4, cod_branch_price), \
         door_delivery_price = COALESCE(?5, door_delivery_price), \
         is_active = COALESCE(?6, is_active), updated_at = ?7 WHERE id = ?8",
    )
    .bind(&data.from_city)
    .bind(&data.to_city)
    .bind(data.branch_delivery_price)
    .bind(data.cod_branch_price)
    .bind(data.door_delivery_price)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Fare {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Fare {id} not found")))
}

/// Soft delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query("UPDATE fare SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

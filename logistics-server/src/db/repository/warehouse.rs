//! Warehouse Repository

use super::{RepoError, RepoResult, page_bounds};
use shared::models::{Warehouse, WarehouseCreate, WarehouseUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const SELECT: &str =
    "SELECT id, name, city, address, capacity, is_active, created_at, updated_at FROM warehouse";

pub async fn find_all(
    pool: &SqlitePool,
    page: i64,
    limit: i64,
) -> RepoResult<(Vec<Warehouse>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM warehouse WHERE is_active = 1")
        .fetch_one(pool)
        .await?;
    let sql = format!("{SELECT} WHERE is_active = 1 ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let warehouses = sqlx::query_as::<_, Warehouse>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok((warehouses, total))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Warehouse>> {
    let sql = format!("{SELECT} WHERE id = ?");
    let warehouse = sqlx::query_as::<_, Warehouse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(warehouse)
}

pub async fn create(pool: &SqlitePool, data: WarehouseCreate) -> RepoResult<Warehouse> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO warehouse (id, name, city, address, capacity, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.city)
    .bind(&data.address)
    .bind(data.capacity)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create warehouse".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: WarehouseUpdate) -> RepoResult<Warehouse> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE warehouse SET name = COALESCE(?1, name), city = COALESCE(?2, city), \
         address = COALESCE(?3, address), capacity = COALESCE(?4, capacity), \
         is_active = COALESCE(?5, is_active), updated_at = ?6 WHERE id = ?7",
    )
    .bind(&data.name)
    .bind(&data.city)
    .bind(&data.address)
    .bind(data.capacity)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Warehouse {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Warehouse {id} not found")))
}

/// Soft delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows =
        sqlx::query("UPDATE warehouse SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(rows.rows_affected() > 0)
}

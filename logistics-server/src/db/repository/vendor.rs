//! Vendor Repository

use super::{RepoError, RepoResult, page_bounds};
use shared::models::{Vendor, VendorCreate, VendorUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const SELECT: &str = "SELECT id, name, email, contact_number, address, city, is_active, created_at, updated_at FROM vendor";

pub async fn find_all(pool: &SqlitePool, page: i64, limit: i64) -> RepoResult<(Vec<Vendor>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vendor WHERE is_active = 1")
        .fetch_one(pool)
        .await?;
    let sql = format!("{SELECT} WHERE is_active = 1 ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let vendors = sqlx::query_as::<_, Vendor>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok((vendors, total))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Vendor>> {
    let sql = format!("{SELECT} WHERE id = ?");
    let vendor = sqlx::query_as::<_, Vendor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(vendor)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<Vendor>> {
    let sql = format!("{SELECT} WHERE email = ? LIMIT 1");
    let vendor = sqlx::query_as::<_, Vendor>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(vendor)
}

pub async fn create(pool: &SqlitePool, data: VendorCreate) -> RepoResult<Vendor> {
    // Check duplicate email first for a friendly message; the unique index
    // is the real backstop
    if find_by_email(pool, &data.email).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Vendor with email '{}' already exists",
            data.email
        )));
    }

    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO vendor (id, name, email, contact_number, address, city, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.contact_number)
    .bind(&data.address)
    .bind(&data.city)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create vendor".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: VendorUpdate) -> RepoResult<Vendor> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE vendor SET name = COALESCE(?1, name), email = COALESCE(?2, email), \
         contact_number = COALESCE(?3, contact_number), address = COALESCE(?4, address), \
         city = COALESCE(?5, city), is_active = COALESCE(?6, is_active), updated_at = ?7 \
         WHERE id = ?8",
    )
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.contact_number)
    .bind(&data.address)
    .bind(&data.city)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Vendor {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Vendor {id} not found")))
}

pub async fn find_by_city(pool: &SqlitePool, city: &str) -> RepoResult<Vec<Vendor>> {
    let sql = format!(
        "{SELECT} WHERE is_active = 1 AND city LIKE '%' || ? || '%' ORDER BY created_at DESC"
    );
    let vendors = sqlx::query_as::<_, Vendor>(&sql)
        .bind(city)
        .fetch_all(pool)
        .await?;
    Ok(vendors)
}

/// Soft delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = now_millis();
    let rows = sqlx::query("UPDATE vendor SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

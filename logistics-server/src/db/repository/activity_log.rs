//! Activity Log Repository
//!
//! Append-only. Insertion is called from the activity writer task only;
//! queries back the admin activity endpoint.

use super::{RepoResult, page_bounds};
use shared::models::{ActivityLog, ActivityLogCreate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const SELECT: &str = "SELECT id, user_id, user_email, method, path, route, status_code, duration_ms, ip, user_agent, referer, query, body, created_at FROM activity_log";

/// Query filter for the admin listing
#[derive(Debug, Default, Clone)]
pub struct ActivityLogFilter {
    pub user_id: Option<i64>,
    pub method: Option<String>,
    pub status_code: Option<i64>,
    pub path: Option<String>,
    pub ip: Option<String>,
    pub date_from: Option<i64>,
    pub date_to: Option<i64>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
}

pub async fn insert(pool: &SqlitePool, entry: &ActivityLogCreate) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO activity_log (id, user_id, user_email, method, path, route, status_code, \
         duration_ms, ip, user_agent, referer, query, body, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(snowflake_id())
    .bind(entry.user_id)
    .bind(&entry.user_email)
    .bind(&entry.method)
    .bind(&entry.path)
    .bind(&entry.route)
    .bind(entry.status_code)
    .bind(entry.duration_ms)
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(&entry.referer)
    .bind(&entry.query)
    .bind(&entry.body)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_many(
    pool: &SqlitePool,
    filter: &ActivityLogFilter,
    page: i64,
    limit: i64,
) -> RepoResult<(Vec<ActivityLog>, i64)> {
    let (_, limit, offset) = page_bounds(page, limit);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM activity_log WHERE 1=1");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("{SELECT} WHERE 1=1"));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let logs = qb.build_query_as::<ActivityLog>().fetch_all(pool).await?;

    Ok((logs, total))
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ActivityLogFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(method) = &filter.method {
        qb.push(" AND method = ").push_bind(method.to_uppercase());
    }
    if let Some(status_code) = filter.status_code {
        qb.push(" AND status_code = ").push_bind(status_code);
    }
    if let Some(path) = &filter.path {
        qb.push(" AND path LIKE '%' || ")
            .push_bind(path.clone())
            .push(" || '%'");
    }
    if let Some(ip) = &filter.ip {
        qb.push(" AND ip LIKE '%' || ")
            .push_bind(ip.clone())
            .push(" || '%'");
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(min) = filter.min_duration_ms {
        qb.push(" AND duration_ms >= ").push_bind(min);
    }
    if let Some(max) = filter.max_duration_ms {
        qb.push(" AND duration_ms <= ").push_bind(max);
    }
}

//! Dashboard Aggregation
//!
//! Time-bucketed counts and sums over orders and shipments. Day buckets are
//! computed in SQL (`date(created_at/1000,'unixepoch')`); per-day series are
//! pre-seeded with a zero for every calendar day in range so gaps are
//! explicit zeros, not missing keys. USER-role callers are scoped to their
//! linked vendor.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::auth::CurrentUser;
use crate::db::repository::{RepoError, user as user_repo};
use crate::utils::time::{day_keys_between, trailing_window};
use crate::utils::{AppError, AppResult};
use shared::models::Role;

/// Per-day series, keyed `YYYY-MM-DD`
pub type DaySeries = BTreeMap<String, i64>;

#[derive(Debug, Serialize)]
pub struct DashboardTotals {
    pub orders_total: i64,
    pub shipments_total: i64,
    pub vendors_total: i64,
    pub warehouses_total: i64,
    pub revenue_total: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardTrends {
    pub orders_created_per_day: DaySeries,
    pub shipments_created_per_day: DaySeries,
    pub shipments_delivered_per_day: DaySeries,
}

#[derive(Debug, Serialize)]
pub struct CityCount {
    pub city: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub totals: DashboardTotals,
    pub orders_by_status: BTreeMap<String, i64>,
    pub shipments_by_status: BTreeMap<String, i64>,
    pub trends: DashboardTrends,
    pub top_cities: Vec<CityCount>,
}

#[derive(Debug, Serialize)]
pub struct TrendSeries {
    pub metric: String,
    pub range: String,
    pub series: DaySeries,
}

/// `7d | 14d | 30d | 90d`, anything else falls back to 30d
fn range_days(range: &str) -> i64 {
    match range {
        "7d" => 7,
        "14d" => 14,
        "90d" => 90,
        _ => 30,
    }
}

/// Vendor scoping: USER-role callers see only their linked vendor's data
async fn vendor_scope(pool: &SqlitePool, user: &CurrentUser) -> AppResult<Option<i64>> {
    if user.role != Role::User {
        return Ok(None);
    }
    let row = user_repo::find_by_id(pool, user.id).await?;
    Ok(row.and_then(|u| u.vendor_id))
}

#[derive(sqlx::FromRow)]
struct KeyCount {
    key: String,
    n: i64,
}

async fn grouped_counts(
    pool: &SqlitePool,
    base: &str,
    scope_column: Option<&str>,
    scope: Option<i64>,
    from: i64,
    to: i64,
    time_column: &str,
    extra: &str,
) -> AppResult<Vec<KeyCount>> {
    let mut qb = QueryBuilder::<Sqlite>::new(base);
    qb.push(" AND ").push(time_column).push(" >= ").push_bind(from);
    qb.push(" AND ").push(time_column).push(" <= ").push_bind(to);
    if let (Some(column), Some(vendor_id)) = (scope_column, scope) {
        qb.push(" AND ").push(column).push(" = ").push_bind(vendor_id);
    }
    qb.push(extra);
    let rows = qb
        .build_query_as::<KeyCount>()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;
    Ok(rows)
}

fn seeded_series(from: i64, to: i64, counts: &[KeyCount]) -> DaySeries {
    let mut series: DaySeries = day_keys_between(from, to)
        .into_iter()
        .map(|key| (key, 0))
        .collect();
    for row in counts {
        // Only days inside the seeded window are kept
        if let Some(slot) = series.get_mut(&row.key) {
            *slot = row.n;
        }
    }
    series
}

pub async fn summary(
    pool: &SqlitePool,
    user: &CurrentUser,
    range: &str,
) -> AppResult<DashboardSummary> {
    let range_key = range.to_string();
    let (from, to) = trailing_window(range_days(&range_key));
    let scope = vendor_scope(pool, user).await?;

    // Totals are all-time; revenue windows on the range
    let orders_total: i64 = scoped_count(pool, "SELECT COUNT(*) FROM \"order\" WHERE 1=1", "vendor_id", scope).await?;
    let shipments_total: i64 = scoped_count(
        pool,
        "SELECT COUNT(*) FROM shipment s JOIN \"order\" o ON s.order_id = o.id WHERE 1=1",
        "o.vendor_id",
        scope,
    )
    .await?;
    let vendors_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vendor")
        .fetch_one(pool)
        .await
        .map_err(RepoError::from)?;
    let warehouses_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warehouse")
        .fetch_one(pool)
        .await
        .map_err(RepoError::from)?;

    let mut revenue_qb = QueryBuilder::<Sqlite>::new(
        "SELECT COALESCE(SUM(total_amount), 0.0) FROM \"order\" WHERE created_at >= ",
    );
    revenue_qb.push_bind(from);
    revenue_qb.push(" AND created_at <= ").push_bind(to);
    if let Some(vendor_id) = scope {
        revenue_qb.push(" AND vendor_id = ").push_bind(vendor_id);
    }
    let revenue_total: f64 = revenue_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(RepoError::from)?;

    // Status distributions within the range
    let orders_by_status = grouped_counts(
        pool,
        "SELECT status AS key, COUNT(*) AS n FROM \"order\" WHERE 1=1",
        Some("vendor_id"),
        scope,
        from,
        to,
        "created_at",
        " GROUP BY status",
    )
    .await?
    .into_iter()
    .map(|row| (row.key, row.n))
    .collect();

    let shipments_by_status = grouped_counts(
        pool,
        "SELECT s.status AS key, COUNT(*) AS n FROM shipment s JOIN \"order\" o ON s.order_id = o.id WHERE 1=1",
        Some("o.vendor_id"),
        scope,
        from,
        to,
        "s.created_at",
        " GROUP BY s.status",
    )
    .await?
    .into_iter()
    .map(|row| (row.key, row.n))
    .collect();

    // Per-day trends, zero-seeded
    let orders_per_day = grouped_counts(
        pool,
        "SELECT date(created_at / 1000, 'unixepoch') AS key, COUNT(*) AS n FROM \"order\" WHERE 1=1",
        Some("vendor_id"),
        scope,
        from,
        to,
        "created_at",
        " GROUP BY key",
    )
    .await?;
    let shipments_per_day = grouped_counts(
        pool,
        "SELECT date(s.created_at / 1000, 'unixepoch') AS key, COUNT(*) AS n FROM shipment s JOIN \"order\" o ON s.order_id = o.id WHERE 1=1",
        Some("o.vendor_id"),
        scope,
        from,
        to,
        "s.created_at",
        " GROUP BY key",
    )
    .await?;
    let delivered_per_day = grouped_counts(
        pool,
        "SELECT date(s.actual_delivery / 1000, 'unixepoch') AS key, COUNT(*) AS n \
         FROM shipment s JOIN \"order\" o ON s.order_id = o.id \
         WHERE s.status = 'DELIVERED' AND s.actual_delivery IS NOT NULL",
        Some("o.vendor_id"),
        scope,
        from,
        to,
        "s.actual_delivery",
        " GROUP BY key",
    )
    .await?;

    let top_cities = grouped_counts(
        pool,
        "SELECT delivery_city AS key, COUNT(*) AS n FROM \"order\" WHERE 1=1",
        Some("vendor_id"),
        scope,
        from,
        to,
        "created_at",
        " GROUP BY delivery_city ORDER BY n DESC LIMIT 10",
    )
    .await?
    .into_iter()
    .map(|row| CityCount {
        city: row.key,
        count: row.n,
    })
    .collect();

    Ok(DashboardSummary {
        totals: DashboardTotals {
            orders_total,
            shipments_total,
            vendors_total,
            warehouses_total,
            revenue_total,
        },
        orders_by_status,
        shipments_by_status,
        trends: DashboardTrends {
            orders_created_per_day: seeded_series(from, to, &orders_per_day),
            shipments_created_per_day: seeded_series(from, to, &shipments_per_day),
            shipments_delivered_per_day: seeded_series(from, to, &delivered_per_day),
        },
        top_cities,
    })
}

pub async fn trends(
    pool: &SqlitePool,
    user: &CurrentUser,
    metric: &str,
    range: &str,
) -> AppResult<TrendSeries> {
    let (from, to) = trailing_window(range_days(range));
    let scope = vendor_scope(pool, user).await?;

    let counts = match metric {
        "orders" => {
            grouped_counts(
                pool,
                "SELECT date(created_at / 1000, 'unixepoch') AS key, COUNT(*) AS n FROM \"order\" WHERE 1=1",
                Some("vendor_id"),
                scope,
                from,
                to,
                "created_at",
                " GROUP BY key",
            )
            .await?
        }
        "shipments" => {
            grouped_counts(
                pool,
                "SELECT date(s.created_at / 1000, 'unixepoch') AS key, COUNT(*) AS n FROM shipment s JOIN \"order\" o ON s.order_id = o.id WHERE 1=1",
                Some("o.vendor_id"),
                scope,
                from,
                to,
                "s.created_at",
                " GROUP BY key",
            )
            .await?
        }
        "delivered" => {
            grouped_counts(
                pool,
                "SELECT date(s.actual_delivery / 1000, 'unixepoch') AS key, COUNT(*) AS n \
                 FROM shipment s JOIN \"order\" o ON s.order_id = o.id \
                 WHERE s.status = 'DELIVERED' AND s.actual_delivery IS NOT NULL",
                Some("o.vendor_id"),
                scope,
                from,
                to,
                "s.actual_delivery",
                " GROUP BY key",
            )
            .await?
        }
        other => {
            return Err(AppError::validation(format!("Invalid metric: {other}")));
        }
    };

    Ok(TrendSeries {
        metric: metric.to_string(),
        range: range.to_string(),
        series: seeded_series(from, to, &counts),
    })
}

async fn scoped_count(
    pool: &SqlitePool,
    base: &str,
    scope_column: &str,
    scope: Option<i64>,
) -> AppResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(base);
    if let Some(vendor_id) = scope {
        qb.push(" AND ").push(scope_column).push(" = ").push_bind(vendor_id);
    }
    let n = qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(RepoError::from)?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_range_defaults_to_30_days() {
        assert_eq!(range_days("7d"), 7);
        assert_eq!(range_days("90d"), 90);
        assert_eq!(range_days("365d"), 30);
        assert_eq!(range_days(""), 30);
    }

    #[test]
    fn series_seeds_zeros_and_applies_counts() {
        let (from, to) = trailing_window(3);
        let keys = day_keys_between(from, to);
        let counts = vec![KeyCount {
            key: keys[1].clone(),
            n: 4,
        }];
        let series = seeded_series(from, to, &counts);
        assert_eq!(series.len(), 3);
        assert_eq!(series[&keys[0]], 0);
        assert_eq!(series[&keys[1]], 4);
        assert_eq!(series[&keys[2]], 0);
    }
}

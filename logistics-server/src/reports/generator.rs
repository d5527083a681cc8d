//! Report Generators
//!
//! One generator per report type, sharing the same shape: count matching
//! rows, then page through them (page size from config) writing CSV lines.
//! Progress is reported per page; the queue pins it to 100 on completion.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::csv::{csv_line, csv_timestamp};
use super::{ReportConfig, ReportFilters, ReportJobPayload, ReportResult, ReportType};
use crate::utils::time::parse_date_bound;
use crate::utils::{AppError, AppResult};
use shared::models::Role;
use shared::util::now_millis;

/// Progress callback (0–100)
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Generate a CSV report into the configured reports directory.
///
/// Role policy is blanket: only MANAGER and ADMIN may export, re-checked
/// here even though the route layer already enforces it.
pub async fn generate(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    payload: &ReportJobPayload,
    progress: ProgressFn<'_>,
) -> AppResult<ReportResult> {
    if !matches!(payload.requester.role, Role::Admin | Role::Manager) {
        return Err(AppError::forbidden(
            "Insufficient permissions for report export",
        ));
    }

    tokio::fs::create_dir_all(&cfg.reports_dir)
        .await
        .map_err(|e| AppError::internal(format!("Failed to create reports dir: {e}")))?;

    let file_name = format!("{}_{}.csv", payload.report_type.file_stem(), now_millis());
    let file_path = cfg.reports_dir.join(&file_name);
    let mut file = File::create(&file_path)
        .await
        .map_err(|e| AppError::internal(format!("Failed to create report file: {e}")))?;

    let filters = DateBounds::resolve(&payload.filters)?;
    let rows = match payload.report_type {
        ReportType::ShipmentsStatus => {
            shipments_status(pool, cfg, &payload.filters, &filters, &mut file, progress).await?
        }
        ReportType::OrdersSummary => {
            orders_summary(pool, cfg, &payload.filters, &filters, &mut file, progress).await?
        }
        ReportType::CodReconciliation => {
            cod_reconciliation(pool, cfg, &payload.filters, &filters, &mut file, progress).await?
        }
        ReportType::WarehouseUtilization => {
            warehouse_utilization(pool, cfg, &payload.filters, &filters, &mut file, progress)
                .await?
        }
        ReportType::UserActivity => user_activity(pool, cfg, &mut file, progress).await?,
    };

    file.flush()
        .await
        .map_err(|e| AppError::internal(format!("Failed to flush report file: {e}")))?;

    Ok(ReportResult {
        file_path: file_path.to_string_lossy().into_owned(),
        file_name,
        rows,
    })
}

/// Parsed date-range bounds (millis)
struct DateBounds {
    from: Option<i64>,
    to: Option<i64>,
}

impl DateBounds {
    fn resolve(filters: &ReportFilters) -> AppResult<Self> {
        let from = filters
            .date_from
            .as_deref()
            .map(|d| parse_date_bound(d, false))
            .transpose()?;
        let to = filters
            .date_to
            .as_deref()
            .map(|d| parse_date_bound(d, true))
            .transpose()?;
        Ok(Self { from, to })
    }
}

fn push_in_list<'a, T>(qb: &mut QueryBuilder<'a, Sqlite>, column: &str, values: &'a [T])
where
    T: 'a + Clone + Send + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    qb.push(format!(" AND {column} IN ("));
    let mut sep = qb.separated(", ");
    for value in values {
        sep.push_bind(value.clone());
    }
    qb.push(")");
}

async fn write_page(file: &mut File, buf: &str) -> AppResult<()> {
    file.write_all(buf.as_bytes())
        .await
        .map_err(|e| AppError::internal(format!("Failed to write report page: {e}")))
}

fn page_progress(written: u64, total: i64) -> u8 {
    if total <= 0 {
        return 99;
    }
    (((written as i64 * 100) / total).clamp(0, 99)) as u8
}

// ---------------------------------------------------------------------------
// SHIPMENTS_STATUS
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ShipmentExportRow {
    tracking_number: String,
    order_number: String,
    vendor_id: i64,
    warehouse_name: String,
    status: String,
    carrier: Option<String>,
    estimated_delivery: Option<i64>,
    actual_delivery: Option<i64>,
    delivery_city: String,
    created_at: i64,
    updated_at: i64,
}

fn push_shipment_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    filters: &'a ReportFilters,
    bounds: &DateBounds,
) {
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "s.status", status);
    }
    if let Some(ids) = filters.warehouse_ids.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "s.warehouse_id", ids);
    }
    if let Some(ids) = filters.vendor_ids.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "o.vendor_id", ids);
    }
    if let Some(from) = bounds.from {
        qb.push(" AND s.created_at >= ").push_bind(from);
    }
    if let Some(to) = bounds.to {
        qb.push(" AND s.created_at <= ").push_bind(to);
    }
}

async fn shipments_status(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    filters: &ReportFilters,
    bounds: &DateBounds,
    file: &mut File,
    progress: ProgressFn<'_>,
) -> AppResult<u64> {
    write_page(
        file,
        &csv_line([
            "tracking_number",
            "order_number",
            "vendor_id",
            "warehouse",
            "status",
            "carrier",
            "estimated_delivery",
            "actual_delivery",
            "delivery_city",
            "created_at",
            "updated_at",
        ]),
    )
    .await?;

    const FROM: &str = "FROM shipment s \
         JOIN \"order\" o ON s.order_id = o.id \
         JOIN warehouse w ON s.warehouse_id = w.id WHERE 1=1";

    let mut count_qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) {FROM}"));
    push_shipment_filters(&mut count_qb, filters, bounds);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(repo_err)?;

    let mut written: u64 = 0;
    let mut offset: i64 = 0;
    loop {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT s.tracking_number, o.order_number, o.vendor_id, w.name AS warehouse_name, \
             s.status, s.carrier, s.estimated_delivery, s.actual_delivery, o.delivery_city, \
             s.created_at, s.updated_at {FROM}"
        ));
        push_shipment_filters(&mut qb, filters, bounds);
        qb.push(" ORDER BY s.created_at DESC, s.id DESC LIMIT ");
        qb.push_bind(cfg.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let page: Vec<ShipmentExportRow> = qb
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(repo_err)?;
        if page.is_empty() {
            break;
        }

        let mut buf = String::new();
        for row in &page {
            buf.push_str(&csv_line([
                row.tracking_number.as_str(),
                row.order_number.as_str(),
                &row.vendor_id.to_string(),
                row.warehouse_name.as_str(),
                row.status.as_str(),
                row.carrier.as_deref().unwrap_or(""),
                &csv_timestamp(row.estimated_delivery),
                &csv_timestamp(row.actual_delivery),
                row.delivery_city.as_str(),
                &csv_timestamp(Some(row.created_at)),
                &csv_timestamp(Some(row.updated_at)),
            ]));
        }
        write_page(file, &buf).await?;

        written += page.len() as u64;
        progress(page_progress(written, total));
        if (page.len() as i64) < cfg.page_size {
            break;
        }
        offset += cfg.page_size;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// ORDERS_SUMMARY
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct OrderExportRow {
    order_number: String,
    vendor_id: i64,
    user_id: Option<i64>,
    status: String,
    delivery_type: String,
    delivery_city: String,
    total_amount: f64,
    created_at: i64,
    updated_at: i64,
}

fn push_order_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    filters: &'a ReportFilters,
    bounds: &DateBounds,
) {
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "status", status);
    }
    if let Some(ids) = filters.vendor_ids.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "vendor_id", ids);
    }
    if let Some(cities) = filters.cities.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "delivery_city", cities);
    }
    if let Some(types) = filters.delivery_types.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "delivery_type", types);
    }
    if let Some(from) = bounds.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = bounds.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

async fn orders_summary(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    filters: &ReportFilters,
    bounds: &DateBounds,
    file: &mut File,
    progress: ProgressFn<'_>,
) -> AppResult<u64> {
    write_page(
        file,
        &csv_line([
            "order_number",
            "vendor_id",
            "user_id",
            "status",
            "delivery_type",
            "delivery_city",
            "total_amount",
            "created_at",
            "updated_at",
        ]),
    )
    .await?;

    let mut count_qb =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM \"order\" WHERE 1=1");
    push_order_filters(&mut count_qb, filters, bounds);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(repo_err)?;

    let mut written: u64 = 0;
    let mut offset: i64 = 0;
    loop {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT order_number, vendor_id, user_id, status, delivery_type, delivery_city, \
             total_amount, created_at, updated_at FROM \"order\" WHERE 1=1",
        );
        push_order_filters(&mut qb, filters, bounds);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(cfg.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let page: Vec<OrderExportRow> = qb
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(repo_err)?;
        if page.is_empty() {
            break;
        }

        let mut buf = String::new();
        for row in &page {
            buf.push_str(&csv_line([
                row.order_number.as_str(),
                &row.vendor_id.to_string(),
                &row.user_id.map(|id| id.to_string()).unwrap_or_default(),
                row.status.as_str(),
                row.delivery_type.as_str(),
                row.delivery_city.as_str(),
                &row.total_amount.to_string(),
                &csv_timestamp(Some(row.created_at)),
                &csv_timestamp(Some(row.updated_at)),
            ]));
        }
        write_page(file, &buf).await?;

        written += page.len() as u64;
        progress(page_progress(written, total));
        if (page.len() as i64) < cfg.page_size {
            break;
        }
        offset += cfg.page_size;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// COD_RECONCILIATION
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CodExportRow {
    order_number: String,
    tracking_number: String,
    vendor_id: i64,
    amount_to_be_collected: f64,
    status: String,
    actual_delivery: Option<i64>,
    notes: Option<String>,
}

fn push_cod_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    filters: &'a ReportFilters,
    bounds: &DateBounds,
) {
    if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "s.status", status);
    }
    if let Some(ids) = filters.vendor_ids.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "o.vendor_id", ids);
    }
    // COD reconciliation windows on the delivery date, not creation
    if let Some(from) = bounds.from {
        qb.push(" AND s.actual_delivery >= ").push_bind(from);
    }
    if let Some(to) = bounds.to {
        qb.push(" AND s.actual_delivery <= ").push_bind(to);
    }
}

async fn cod_reconciliation(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    filters: &ReportFilters,
    bounds: &DateBounds,
    file: &mut File,
    progress: ProgressFn<'_>,
) -> AppResult<u64> {
    write_page(
        file,
        &csv_line([
            "order_number",
            "tracking_number",
            "vendor_id",
            "amount_to_be_collected",
            "delivered",
            "actual_delivery",
            "notes",
        ]),
    )
    .await?;

    const FROM: &str = "FROM shipment s JOIN \"order\" o ON s.order_id = o.id WHERE 1=1";

    let mut count_qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) {FROM}"));
    push_cod_filters(&mut count_qb, filters, bounds);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(repo_err)?;

    let mut written: u64 = 0;
    let mut offset: i64 = 0;
    loop {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT o.order_number, s.tracking_number, o.vendor_id, o.amount_to_be_collected, \
             s.status, s.actual_delivery, s.notes {FROM}"
        ));
        push_cod_filters(&mut qb, filters, bounds);
        qb.push(" ORDER BY s.actual_delivery DESC, s.id DESC LIMIT ");
        qb.push_bind(cfg.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let page: Vec<CodExportRow> = qb
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(repo_err)?;
        if page.is_empty() {
            break;
        }

        let mut buf = String::new();
        for row in &page {
            let delivered = if row.status == "DELIVERED" { "YES" } else { "NO" };
            buf.push_str(&csv_line([
                row.order_number.as_str(),
                row.tracking_number.as_str(),
                &row.vendor_id.to_string(),
                &row.amount_to_be_collected.to_string(),
                delivered,
                &csv_timestamp(row.actual_delivery),
                row.notes.as_deref().unwrap_or(""),
            ]));
        }
        write_page(file, &buf).await?;

        written += page.len() as u64;
        progress(page_progress(written, total));
        if (page.len() as i64) < cfg.page_size {
            break;
        }
        offset += cfg.page_size;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// WAREHOUSE_UTILIZATION
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct WarehouseUtilRow {
    warehouse_name: String,
    day: String,
    outbound: i64,
}

fn push_util_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    filters: &'a ReportFilters,
    bounds: &DateBounds,
) {
    if let Some(ids) = filters.warehouse_ids.as_deref().filter(|s| !s.is_empty()) {
        push_in_list(qb, "s.warehouse_id", ids);
    }
    if let Some(from) = bounds.from {
        qb.push(" AND s.created_at >= ").push_bind(from);
    }
    if let Some(to) = bounds.to {
        qb.push(" AND s.created_at <= ").push_bind(to);
    }
}

async fn warehouse_utilization(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    filters: &ReportFilters,
    bounds: &DateBounds,
    file: &mut File,
    progress: ProgressFn<'_>,
) -> AppResult<u64> {
    write_page(
        file,
        &csv_line(["warehouse", "date", "inbound_count", "outbound_count"]),
    )
    .await?;

    const FROM: &str = "FROM shipment s JOIN warehouse w ON s.warehouse_id = w.id WHERE 1=1";
    const GROUP: &str = " GROUP BY w.name, day";

    let mut count_qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT COUNT(*) FROM (SELECT 1 AS one, date(s.created_at / 1000, 'unixepoch') AS day {FROM}"
    ));
    push_util_filters(&mut count_qb, filters, bounds);
    count_qb.push(GROUP);
    count_qb.push(")");
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(repo_err)?;

    let mut written: u64 = 0;
    let mut offset: i64 = 0;
    loop {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT w.name AS warehouse_name, date(s.created_at / 1000, 'unixepoch') AS day, \
             COUNT(*) AS outbound {FROM}"
        ));
        push_util_filters(&mut qb, filters, bounds);
        qb.push(GROUP);
        qb.push(" ORDER BY day DESC, w.name LIMIT ");
        qb.push_bind(cfg.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let page: Vec<WarehouseUtilRow> = qb
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(repo_err)?;
        if page.is_empty() {
            break;
        }

        let mut buf = String::new();
        for row in &page {
            // Inbound flows are not tracked against warehouses; exported as 0
            buf.push_str(&csv_line([
                row.warehouse_name.as_str(),
                row.day.as_str(),
                "0",
                &row.outbound.to_string(),
            ]));
        }
        write_page(file, &buf).await?;

        written += page.len() as u64;
        progress(page_progress(written, total));
        if (page.len() as i64) < cfg.page_size {
            break;
        }
        offset += cfg.page_size;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// USER_ACTIVITY
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct UserExportRow {
    id: i64,
    email: String,
    role: String,
    created_at: i64,
    updated_at: i64,
}

async fn user_activity(
    pool: &SqlitePool,
    cfg: &ReportConfig,
    file: &mut File,
    progress: ProgressFn<'_>,
) -> AppResult<u64> {
    write_page(
        file,
        &csv_line(["user_id", "email", "role", "created_at", "updated_at"]),
    )
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
        .fetch_one(pool)
        .await
        .map_err(repo_err)?;

    let mut written: u64 = 0;
    let mut offset: i64 = 0;
    loop {
        let page: Vec<UserExportRow> = sqlx::query_as(
            "SELECT id, email, role, created_at, updated_at FROM user \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(cfg.page_size)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(repo_err)?;
        if page.is_empty() {
            break;
        }

        let mut buf = String::new();
        for row in &page {
            buf.push_str(&csv_line([
                &row.id.to_string(),
                row.email.as_str(),
                row.role.as_str(),
                &csv_timestamp(Some(row.created_at)),
                &csv_timestamp(Some(row.updated_at)),
            ]));
        }
        write_page(file, &buf).await?;

        written += page.len() as u64;
        progress(page_progress(written, total));
        if (page.len() as i64) < cfg.page_size {
            break;
        }
        offset += cfg.page_size;
    }
    Ok(written)
}

fn repo_err(err: sqlx::Error) -> AppError {
    crate::db::repository::RepoError::from(err).into()
}

//! Report job pipeline: enqueue → worker → poll → download.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

use common::{TestApp, spawn_app_with};
use logistics_server::db::repository::shipment;
use logistics_server::jobs::{JobOptions, JobQueue, JobState, ReportWorker};
use logistics_server::reports::ReportConfig;
use shared::models::ShipmentCreate;

/// Page size used by these suites: small enough to cross several page
/// boundaries without thousands of fixture rows
const PAGE_SIZE: i64 = 50;

async fn seed_shipments(app: &TestApp, admin: &str, warehouse_name: &str, count: usize) -> i64 {
    let vendor_id = app.create_vendor(admin, "vendor@example.com").await;
    app.create_fare(admin, "Kathmandu", 300.0).await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/warehouses",
            Some(admin),
            Some(json!({ "name": warehouse_name, "city": "Pokhara" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let warehouse_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(admin),
            Some(json!({
                "vendor_id": vendor_id,
                "delivery_city": "Kathmandu",
                "delivery_address": "Thamel",
                "contact_number": "9800000001",
                "name": "Ram Sharma",
                "delivery_type": "DOOR_DELIVERY",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["id"].as_i64().unwrap();

    // Bulk-create shipments through the repository; the HTTP path adds
    // nothing to what this suite exercises
    for i in 0..count {
        let data = ShipmentCreate {
            order_id,
            warehouse_id,
            carrier: None,
            estimated_delivery: None,
            notes: None,
        };
        shipment::create(&app.state.pool, &data, &format!("TRK-{i}-SEEDED00{i}"))
            .await
            .expect("seed shipment");
    }
    order_id
}

async fn poll_until_state(app: &TestApp, admin: &str, job_id: &str, wanted: &str) -> Value {
    for _ in 0..400 {
        let (status, body) = app
            .request_json(
                "GET",
                &format!("/api/reports/{job_id}/status"),
                Some(admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        if body["data"]["state"] == wanted {
            return body["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} never reached state {wanted}");
}

#[tokio::test]
async fn shipments_export_is_complete_across_page_boundaries() {
    let app = spawn_app_with(|config| config.report_page_size = PAGE_SIZE).await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;

    // 2 full pages + 1: the tail page must not be dropped
    let n = (PAGE_SIZE * 2 + 1) as usize;
    seed_shipments(&app, &admin, "Main, Hub", n).await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/reports/export",
            Some(&admin),
            Some(json!({ "type": "SHIPMENTS_STATUS" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "enqueue failed: {body}");
    let job_id = body["data"]["job_id"].as_str().unwrap().to_string();

    let done = poll_until_state(&app, &admin, &job_id, "completed").await;
    assert_eq!(done["progress"], 100);
    assert_eq!(done["result"]["rows"], n as u64);

    let (status, bytes) = app
        .request(
            "GET",
            &format!("/api/reports/{job_id}/download"),
            Some(&admin),
            None,
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let csv = String::from_utf8(bytes).expect("csv is utf-8");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), n + 1, "header + one line per shipment");
    assert!(lines[0].starts_with("tracking_number,order_number"));
    // The comma-bearing warehouse name must be quoted
    assert!(
        lines[1].contains("\"Main, Hub\""),
        "expected quoted warehouse name in: {}",
        lines[1]
    );
}

#[tokio::test]
async fn status_filter_limits_exported_rows() {
    let app = spawn_app_with(|config| config.report_page_size = PAGE_SIZE).await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    seed_shipments(&app, &admin, "Filter Hub", 5).await;

    // Everything seeds as PREPARING; a DELIVERED filter matches nothing
    let (_, body) = app
        .request_json(
            "POST",
            "/api/reports/export",
            Some(&admin),
            Some(json!({
                "type": "SHIPMENTS_STATUS",
                "filters": { "status": ["DELIVERED"] }
            })),
        )
        .await;
    let job_id = body["data"]["job_id"].as_str().unwrap().to_string();
    let done = poll_until_state(&app, &admin, &job_id, "completed").await;
    assert_eq!(done["result"]["rows"], 0);

    let (_, body) = app
        .request_json(
            "POST",
            "/api/reports/export",
            Some(&admin),
            Some(json!({
                "type": "SHIPMENTS_STATUS",
                "filters": { "status": ["PREPARING"] }
            })),
        )
        .await;
    let job_id = body["data"]["job_id"].as_str().unwrap().to_string();
    let done = poll_until_state(&app, &admin, &job_id, "completed").await;
    assert_eq!(done["result"]["rows"], 5);
}

#[tokio::test]
async fn orders_summary_export_round_trips() {
    let app = spawn_app_with(|config| config.report_page_size = PAGE_SIZE).await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    seed_shipments(&app, &admin, "Hub", 1).await;

    let (_, body) = app
        .request_json(
            "POST",
            "/api/reports/export",
            Some(&admin),
            Some(json!({ "type": "ORDERS_SUMMARY" })),
        )
        .await;
    let job_id = body["data"]["job_id"].as_str().unwrap().to_string();
    let done = poll_until_state(&app, &admin, &job_id, "completed").await;
    assert_eq!(done["result"]["rows"], 1);

    let file_name = done["result"]["file_name"].as_str().unwrap();
    assert!(file_name.starts_with("orders_summary_"));
    assert!(file_name.ends_with(".csv"));
}

#[tokio::test]
async fn unknown_jobs_poll_as_unknown_and_download_as_missing() {
    let app = spawn_app_with(|_| {}).await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;

    let (status, body) = app
        .request_json("GET", "/api/reports/424242/status", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "unknown");
    assert_eq!(body["data"]["progress"], 0);
    assert_eq!(body["data"]["result"], Value::Null);

    let (status, _) = app
        .request_json("GET", "/api/reports/424242/download", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Non-numeric ids behave the same, not as a parse error
    let (status, body) = app
        .request_json("GET", "/api/reports/not-a-job/status", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "unknown");
}

#[tokio::test]
async fn generator_enforces_the_role_policy_even_off_the_http_path() {
    let app = spawn_app_with(|_| {}).await;

    // A queue wired straight to a worker, bypassing the route-layer check
    let (queue, rx) = JobQueue::new(
        8,
        JobOptions {
            attempts: 1,
            backoff_base_ms: 1,
            ..Default::default()
        },
    );
    let worker = ReportWorker::new(
        queue.clone(),
        app.state.pool.clone(),
        ReportConfig {
            reports_dir: app.state.config.reports_dir(),
            page_size: 10,
        },
    );
    tokio::spawn(worker.run(rx));

    let job_id = queue
        .enqueue(
            "report-export",
            json!({
                "requester": { "id": 1, "role": "USER" },
                "type": "ORDERS_SUMMARY"
            }),
            None,
        )
        .await
        .unwrap();

    for _ in 0..400 {
        if let Some(status) = queue.status(job_id)
            && status.state == JobState::Failed
        {
            let reason = status.failed_reason.unwrap_or_default();
            assert!(
                reason.contains("Insufficient permissions"),
                "unexpected failure reason: {reason}"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job never failed");
}

//! End-to-end flows through the full router: auth, pricing, idempotency,
//! shipments, dashboard and activity logging.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{spawn_app, wait_until};

#[tokio::test]
async fn happy_path_order_is_priced_from_the_fare() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": vendor_id,
                "delivery_city": "Kathmandu",
                "delivery_address": "Thamel, Kathmandu",
                "contact_number": "9800000001",
                "name": "Ram Sharma",
                "delivery_type": "DOOR_DELIVERY",
                "amount_to_be_collected": 5000.0,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "order create failed: {body}");
    let order = &body["data"];
    assert_eq!(order["total_amount"], 5300.0);
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["delivery_type"], "DOOR_DELIVERY");
    let order_number = order["order_number"].as_str().unwrap();
    assert!(order_number.starts_with("ORD-"), "got {order_number}");
}

#[tokio::test]
async fn missing_fare_is_a_business_error_and_nothing_is_persisted() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": vendor_id,
                "delivery_city": "Nowhereville",
                "delivery_address": "Nowhere 1",
                "contact_number": "9800000001",
                "name": "No One",
                "delivery_type": "DOOR_DELIVERY",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().unwrap().contains("No fare found"),
        "unexpected message: {body}"
    );

    let (_, list) = app
        .request_json("GET", "/api/orders", Some(&admin), None)
        .await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[tokio::test]
async fn unknown_vendor_is_not_found() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": 999_999,
                "delivery_city": "Kathmandu",
                "delivery_address": "Somewhere",
                "contact_number": "9800000001",
                "name": "X",
                "delivery_type": "BRANCH_DELIVERY",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Vendor not found");
}

#[tokio::test]
async fn idempotent_replay_returns_identical_response_without_reexecuting() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;

    let payload = json!({
        "vendor_id": vendor_id,
        "delivery_city": "Kathmandu",
        "delivery_address": "Thamel",
        "contact_number": "9800000001",
        "name": "Ram Sharma",
        "delivery_type": "COD_BRANCH",
        "amount_to_be_collected": 1000.0,
    });
    let headers = [("Idempotency-Key", "retry-abc-123")];

    let (first_status, first_bytes) = app
        .request(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(payload.clone()),
            &headers,
        )
        .await;
    assert_eq!(first_status, StatusCode::CREATED);

    let (second_status, second_headers, second_bytes) = app
        .request_full("POST", "/api/orders", Some(&admin), Some(payload), &headers)
        .await;
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first_bytes, second_bytes, "replay must be byte-identical");
    assert_eq!(
        second_headers
            .get("Idempotent-Replay")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );

    // Only one order was actually created
    let (_, list) = app
        .request_json("GET", "/api/orders", Some(&admin), None)
        .await;
    assert_eq!(list["pagination"]["total"], 1);
}

#[tokio::test]
async fn order_with_user_dispatches_exactly_one_confirmation_email() {
    let app = spawn_app().await;
    let (admin, _, user_id) = app.register("buyer@example.com", "ADMIN").await;

    // Registration itself fires a welcome email; let it land first
    let transport = app.transport.clone();
    wait_until(|| transport.sent_count() == 1, "welcome dispatch").await;
    assert!(transport.sent()[0].subject.contains("Welcome"));

    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;

    let (status, _) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": vendor_id,
                "user_id": user_id,
                "delivery_city": "Kathmandu",
                "delivery_address": "Thamel",
                "contact_number": "9800000001",
                "name": "Ram Sharma",
                "delivery_type": "DOOR_DELIVERY",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Exactly one confirmation attempt, to the order's user
    let transport = app.transport.clone();
    wait_until(
        || transport.sent_count() == 2,
        "order confirmation dispatch",
    )
    .await;
    let sent = transport.sent();
    assert_eq!(sent[1].to, "buyer@example.com");
    assert!(sent[1].subject.starts_with("Order confirmation"));
}

#[tokio::test]
async fn shipment_lifecycle_tracks_and_notifies() {
    let app = spawn_app().await;
    let (admin, _, user_id) = app.register("buyer@example.com", "ADMIN").await;
    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;
    let warehouse_id = app.create_warehouse(&admin, "Central Hub").await;

    let (_, order_body) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": vendor_id,
                "user_id": user_id,
                "delivery_city": "Kathmandu",
                "delivery_address": "Thamel",
                "contact_number": "9800000001",
                "name": "Ram Sharma",
                "delivery_type": "DOOR_DELIVERY",
            })),
        )
        .await;
    let order_id = order_body["data"]["id"].as_i64().unwrap();

    // welcome + order confirmation both land before the shipment flow
    let transport = app.transport.clone();
    wait_until(|| transport.sent_count() == 2, "welcome + confirmation").await;

    // Create: status is forced to PREPARING regardless of input
    let (status, body) = app
        .request_json(
            "POST",
            "/api/shipments",
            Some(&admin),
            Some(json!({
                "order_id": order_id,
                "warehouse_id": warehouse_id,
                "carrier": "Gandaki Express",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "shipment create failed: {body}");
    let shipment = &body["data"];
    assert_eq!(shipment["status"], "PREPARING");
    let tracking = shipment["tracking_number"].as_str().unwrap().to_string();
    assert!(tracking.starts_with("TRK-"));
    let shipment_id = shipment["id"].as_i64().unwrap();

    // Lookup by tracking number joins order + warehouse context
    let (status, body) = app
        .request_json(
            "GET",
            &format!("/api/shipments/tracking/{tracking}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["warehouse_name"], "Central Hub");
    assert_eq!(body["data"]["delivery_city"], "Kathmandu");

    // Update to DELIVERED with a delivery timestamp
    let delivered_at = shared::util::now_millis();
    let (status, body) = app
        .request_json(
            "PUT",
            &format!("/api/shipments/{shipment_id}"),
            Some(&admin),
            Some(json!({
                "status": "DELIVERED",
                "actual_delivery": delivered_at,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "DELIVERED");
    assert_eq!(body["data"]["actual_delivery"], delivered_at);

    // The linked user gets a shipment notification attempt
    let transport = app.transport.clone();
    wait_until(
        || transport.sent_count() == 3,
        "shipment notification dispatch",
    )
    .await;
    let sent = transport.sent();
    assert!(sent[2].subject.contains(&tracking));
    assert_eq!(sent[2].to, "buyer@example.com");

    // Unknown tracking numbers are 404
    let (status, _) = app
        .request_json("GET", "/api/shipments/tracking/TRK-0-NOPE", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_token_rotation_is_single_use() {
    let app = spawn_app().await;
    let (_, refresh_token, _) = app.register("someone@example.com", "USER").await;

    let (status, body) = app
        .request_json(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "first rotation failed: {body}");
    let rotated = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh_token);

    // Replaying the consumed token always fails
    let (status, body) = app
        .request_json(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    // The rotated token still works
    let (status, _) = app
        .request_json(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": rotated })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn auth_and_roles_are_enforced() {
    let app = spawn_app().await;

    // No token: uniform error envelope
    let (status, body) = app.request_json("GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["statusCode"], 401);

    // USER role cannot touch manager/admin surfaces
    let (user_token, _, _) = app.register("plain@example.com", "USER").await;
    let (status, _) = app
        .request_json(
            "POST",
            "/api/vendors",
            Some(&user_token),
            Some(json!({ "name": "V", "email": "v@e.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request_json(
            "POST",
            "/api/reports/export",
            Some(&user_token),
            Some(json!({ "type": "ORDERS_SUMMARY" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Wrong password and unknown email are indistinguishable
    let (s1, b1) = app
        .request_json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "plain@example.com", "password": "wrong-password" })),
        )
        .await;
    let (s2, b2) = app
        .request_json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1["message"], b2["message"]);
}

#[tokio::test]
async fn duplicate_email_and_route_conflict() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;

    let (status, _) = app
        .request_json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Dup",
                "email": "admin@example.com",
                "password": "sup3r-secret-pw",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.create_fare(&admin, "Kathmandu", 300.0).await;
    let (status, body) = app
        .request_json(
            "POST",
            "/api/fares",
            Some(&admin),
            Some(json!({
                "from_city": "Pokhara",
                "to_city": "Kathmandu",
                "branch_delivery_price": 1.0,
                "cod_branch_price": 2.0,
                "door_delivery_price": 3.0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "duplicate route: {body}");
}

#[tokio::test]
async fn dashboard_summary_seeds_every_day_with_zeros() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;
    let vendor_id = app.create_vendor(&admin, "vendor@example.com").await;
    app.create_fare(&admin, "Kathmandu", 300.0).await;

    let (status, _) = app
        .request_json(
            "POST",
            "/api/orders",
            Some(&admin),
            Some(json!({
                "vendor_id": vendor_id,
                "delivery_city": "Kathmandu",
                "delivery_address": "Thamel",
                "contact_number": "9800000001",
                "name": "Ram",
                "delivery_type": "BRANCH_DELIVERY",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request_json("GET", "/api/dashboard/summary?range=7d", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["totals"]["orders_total"], 1);
    assert_eq!(data["totals"]["vendors_total"], 1);
    assert_eq!(data["totals"]["revenue_total"], 150.0);

    let series = data["trends"]["orders_created_per_day"].as_object().unwrap();
    assert_eq!(series.len(), 7, "one bucket per calendar day");
    let total_in_series: i64 = series.values().map(|v| v.as_i64().unwrap()).sum();
    assert_eq!(total_in_series, 1);
    assert_eq!(data["top_cities"][0]["city"], "Kathmandu");

    // Unknown trend metrics are a 400
    let (status, _) = app
        .request_json(
            "GET",
            "/api/dashboard/trends?metric=revenue",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_log_records_requests_with_redacted_bodies() {
    let app = spawn_app().await;
    let (admin, _, _) = app.register("admin@example.com", "ADMIN").await;

    // The writer task persists asynchronously; poll until entries land
    let mut logged: i64 = 0;
    for _ in 0..200 {
        logged = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&app.state.pool)
            .await
            .unwrap_or(0);
        if logged > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert!(logged > 0, "no activity entries were written");

    let (status, body) = app
        .request_json(
            "GET",
            "/api/activity?path=/api/auth/register",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["data"].as_array().unwrap();
    assert!(!logs.is_empty(), "register call should be logged");
    let entry = &logs[0];
    assert_eq!(entry["method"], "POST");
    assert_eq!(entry["status_code"], 201);
    let snapshot = entry["body"].as_str().unwrap();
    assert!(snapshot.contains("***REDACTED***"), "body: {snapshot}");
    assert!(!snapshot.contains("sup3r-secret-pw"));

    // USER role cannot read the audit trail
    let (user_token, _, _) = app.register("plain@example.com", "USER").await;
    let (status, _) = app
        .request_json("GET", "/api/activity", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

//! Router-level tests: every request goes through the real handlers and an
//! in-memory database.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Datelike, Utc};
use portal_api::{router, AppState};
use portal_core::TariffBook;
use portal_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.tariffs()
        .seed(&TariffBook::standard().unwrap(), 2000, Utc::now())
        .await
        .unwrap();
    router(AppState::new(db))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn year() -> i32 {
    Utc::now().year()
}

fn new_connection_body() -> Value {
    json!({
        "serviceType": "electricity",
        "applicationType": "new_connection",
        "payload": {
            "applicant": { "fullName": "Asha Rao", "phone": "+91 98765 43210" },
            "premises": {
                "line1": "12 MG Road",
                "city": "Bengaluru",
                "pinCode": "560001"
            },
            "category": "residential",
            "requestedLoadKw": "5"
        },
        "documents": [{
            "name": "id-proof.pdf",
            "mimeType": "application/pdf",
            "sizeBytes": 120000,
            "storageRef": "uploads/id-proof"
        }]
    })
}

fn gas_leak_body() -> Value {
    json!({
        "serviceType": "gas",
        "category": "gas_leak",
        "requestedPriority": "low",
        "description": "Strong smell of gas near the kitchen pipeline",
        "contact": {
            "name": "Meera Nair",
            "phone": "9123456780",
            "address": "4 Lake View, Kochi"
        }
    })
}

#[tokio::test]
async fn submit_transition_and_track() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/v1/applications", Some(new_connection_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let reference = format!("NC{}000001", year());
    assert_eq!(body["referenceNumber"], reference.as_str());
    assert_eq!(body["status"], "submitted");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/applications/{}/stages", reference),
        Some(json!({ "newStatus": "approved", "remarks": "Load sanctioned", "expectedVersion": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["version"], 2);
    assert_eq!(body["stageHistory"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/api/v1/track/{}", reference.to_lowercase()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["referenceNumber"], reference.as_str());
    assert_eq!(body["kind"], "new_connection");
    assert_eq!(body["status"], "approved");
    let history = body["stageHistory"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["stageName"], "Application Submitted");
    assert_eq!(history[1]["status"], "approved");
    assert_eq!(history[1]["remarks"], "Load sanctioned");
}

#[tokio::test]
async fn application_errors_map_to_status_codes() {
    let app = app().await;
    send(&app, "POST", "/api/v1/applications", Some(new_connection_body())).await;
    let stages = format!("/api/v1/applications/NC{}000001/stages", year());

    // Same status again is not a transition
    let (status, body) = send(&app, "POST", &stages, Some(json!({ "newStatus": "submitted" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    // Stale version
    let (status, body) = send(
        &app,
        "POST",
        &stages,
        Some(json!({ "newStatus": "site_inspection", "expectedVersion": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONCURRENT_MODIFICATION");

    // Terminal
    send(&app, "POST", &stages, Some(json!({ "newStatus": "rejected" }))).await;
    let (status, body) = send(&app, "POST", &stages, Some(json!({ "newStatus": "approved" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TERMINAL_STATE");

    // Unknown status string
    let (status, body) = send(&app, "POST", &stages, Some(json!({ "newStatus": "teleported" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Unknown reference
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/applications/NC2025999999/stages",
        Some(json!({ "newStatus": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let app = app().await;

    let mut wrong_service = new_connection_body();
    wrong_service["applicationType"] = json!("cylinder_booking");
    let (status, body) = send(&app, "POST", "/api/v1/applications", Some(wrong_service)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut bad_phone = new_connection_body();
    bad_phone["payload"]["applicant"]["phone"] = json!("12345");
    let (status, _) = send(&app, "POST", "/api/v1/applications", Some(bad_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/applications")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was issued
    let (status, body) = send(&app, "GET", "/api/v1/applications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn staff_queue_filters_and_limits() {
    let app = app().await;
    for _ in 0..3 {
        send(&app, "POST", "/api/v1/applications", Some(new_connection_body())).await;
    }
    send(
        &app,
        "POST",
        &format!("/api/v1/applications/NC{}000002/stages", year()),
        Some(json!({ "newStatus": "document_verification" })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/v1/applications?status=submitted", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/api/v1/applications?limit=1", None).await;
    let queue = body.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["applicantName"], "Asha Rao");

    let (status, _) = send(&app, "GET", "/api/v1/applications?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/v1/applications?status=lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn complaint_priority_close_and_reopen() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/v1/complaints", Some(gas_leak_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let reference = format!("CMP{}000001", year());
    assert_eq!(body["referenceNumber"], reference.as_str());
    assert_eq!(body["status"], "open");
    assert_eq!(body["priority"], "urgent");

    let stages = format!("/api/v1/complaints/{}/stages", reference);
    let reopen = format!("/api/v1/complaints/{}/reopen", reference);

    let (status, body) = send(&app, "POST", &reopen, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    send(&app, "POST", &stages, Some(json!({ "newStatus": "resolved" }))).await;
    let (status, body) = send(&app, "POST", &stages, Some(json!({ "newStatus": "closed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 3);

    let (status, body) = send(&app, "POST", &stages, Some(json!({ "newStatus": "assigned" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TERMINAL_STATE");

    let (status, body) = send(
        &app,
        "POST",
        &reopen,
        Some(json!({ "remarks": "Smell is back", "expectedVersion": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "open");
    assert_eq!(body["version"], 4);
    let history = body["stageHistory"].as_array().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3]["stageName"], "Reopened");

    let (_, body) = send(&app, "GET", &format!("/api/v1/track/{}", reference), None).await;
    assert_eq!(body["kind"], "complaint");
    assert_eq!(body["status"], "open");
}

#[tokio::test]
async fn complaint_category_must_match_service() {
    let app = app().await;
    let mut body = gas_leak_body();
    body["serviceType"] = json!("electricity");

    let (status, body) = send(&app, "POST", "/api/v1/complaints", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn bill_computation_matches_worked_example() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/bills/compute",
        Some(json!({
            "serviceType": "electricity",
            "category": "residential",
            "unitsConsumed": "350",
            "serviceYear": 2025
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["energyCharges"], 237500);
    assert_eq!(body["fixedCharges"], 5000);
    assert_eq!(body["subtotal"], 242500);
    assert_eq!(body["taxAmount"], 12125);
    assert_eq!(body["totalAmount"], 254625);
    assert_eq!(body["slabCharges"].as_array().unwrap().len(), 3);

    // Same units from a meter reading
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/bills/compute",
        Some(json!({
            "serviceType": "electricity",
            "category": "residential",
            "meterReading": { "previousReading": "1200", "currentReading": "1550" },
            "serviceYear": 2025
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalAmount"], 254625);
}

#[tokio::test]
async fn bill_computation_rejects_bad_input() {
    let app = app().await;

    let cases = [
        // Both inputs
        json!({
            "serviceType": "electricity", "category": "residential",
            "unitsConsumed": "10",
            "meterReading": { "previousReading": "0", "currentReading": "10" }
        }),
        // Negative units
        json!({ "serviceType": "electricity", "category": "residential", "unitsConsumed": "-1" }),
        // Meter ran backwards
        json!({
            "serviceType": "water", "category": "residential",
            "meterReading": { "previousReading": "50", "currentReading": "40" }
        }),
        // Agricultural gas does not exist
        json!({ "serviceType": "gas", "category": "agricultural", "unitsConsumed": "10" }),
        // Larger than any bill can be
        json!({
            "serviceType": "electricity", "category": "residential",
            "unitsConsumed": "79228162514264337593543950335"
        }),
        // Sanctioned load above the connection limit
        json!({
            "serviceType": "electricity", "category": "commercial",
            "unitsConsumed": "10", "sanctionedLoadKw": "79228162514264337593543950335"
        }),
        // No tariff in force that early
        json!({
            "serviceType": "electricity", "category": "residential",
            "unitsConsumed": "10", "serviceYear": 1999
        }),
    ];

    for case in cases {
        let (status, body) = send(&app, "POST", "/api/v1/bills/compute", Some(case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", case, body);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn bill_persistence_and_payment() {
    let app = app().await;

    let (status, bill) = send(
        &app,
        "POST",
        "/api/v1/bills",
        Some(json!({
            "consumerNumber": "EL-100200",
            "serviceType": "electricity",
            "category": "residential",
            "unitsConsumed": "350",
            "serviceYear": 2025
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["billNumber"], "BL2025000001");
    assert_eq!(bill["status"], "unpaid");
    assert_eq!(bill["totalAmount"], 254625);

    let payment = "/api/v1/bills/BL2025000001/payment";
    let (status, paid) = send(&app, "POST", payment, Some(json!({ "paymentReference": "UPI-778812" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");

    let (status, again) = send(&app, "POST", payment, Some(json!({ "paymentReference": "UPI-778812" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["paidAt"], paid["paidAt"]);

    let (status, body) = send(&app, "POST", payment, Some(json!({ "paymentReference": "NEFT-1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_PAID");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/bills/BL2025000404/payment",
        Some(json!({ "paymentReference": "UPI-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bills are not part of public tracking
    let (status, _) = send(&app, "GET", "/api/v1/track/BL2025000001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tracking_rejects_malformed_references() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/v1/track/HELLO", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, "GET", "/api/v1/track/RC2025000003", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": true }));
}

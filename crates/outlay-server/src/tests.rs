//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use http_body_util::BodyExt;
use outlay_core::test_utils::{
    base_date, debit_credit_csv, monthly_charges, monthly_spending_ledger, signed_amount_csv,
};
use outlay_core::{Database, MemoryStore, SessionId};
use tower::ServiceExt;

const BOUNDARY: &str = "outlay-test-boundary";

fn setup_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = create_router(store.clone(), ServerConfig::default());
    (app, store)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_request(uri: &str, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {c}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = contents
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Upload a statement and return the new session id
async fn upload(app: &Router, csv: &str) -> String {
    let response = app
        .clone()
        .oneshot(multipart_request("/api/upload", "statement.csv", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["session_id"].as_str().unwrap().to_string()
}

fn netflix_statement() -> String {
    let mut ledger = monthly_charges("Netflix", -15.0, base_date(), 4);
    // Varying grocery totals so only Netflix is recurring
    ledger.extend(monthly_spending_ledger(&[100.0, 120.0, 90.0, 110.0, 500.0]));
    signed_amount_csv(&ledger)
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let (app, _) = setup_test_app();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

// ========== Upload ==========

#[tokio::test]
async fn test_upload_creates_session() {
    let (app, store) = setup_test_app();

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "statement.csv",
            &netflix_statement(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["transactions_loaded"], 9);
    assert_eq!(json["mapping_info"]["date_column"], "Date");
    assert_eq!(json["mapping_info"]["description_column"], "Description");
    assert_eq!(json["mapping_info"]["rows_skipped"], 0);
    assert!(json["mapping_info"]["amount_pattern"]
        .as_str()
        .unwrap()
        .starts_with("Signed amount"));

    let session = SessionId::from(json["session_id"].as_str().unwrap());
    assert_eq!(store.get_ledger(&session).unwrap().unwrap().len(), 9);
}

#[tokio::test]
async fn test_upload_debit_credit_with_banner() {
    let (app, _) = setup_test_app();
    let ledger = monthly_charges("Gym", -30.0, base_date(), 3);

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "hdfc.CSV",
            &debit_credit_csv(&ledger),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["mapping_info"]["header_row"], 2);
    assert_eq!(json["mapping_info"]["date_column"], "Txn Date");
}

#[tokio::test]
async fn test_upload_rejects_non_csv() {
    let (app, store) = setup_test_app();

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "statement.xlsx",
            &netflix_statement(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Only CSV files are allowed");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_without_date_column_is_descriptive() {
    let (app, store) = setup_test_app();

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "bad.csv",
            "When,Description,Amount\nyesterday,Coffee,-3\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("No date column"));
    assert!(error.contains("When"));
    // A failed load leaves nothing behind
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_all_rows_rejected() {
    let (app, store) = setup_test_app();

    let response = app
        .oneshot(multipart_request(
            "/api/upload",
            "bad.csv",
            "Date,Description,Amount\nsoon,A,1\nlater,B,2\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("No valid transactions"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_missing_file_field() {
    let (app, _) = setup_test_app();

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_json() {
    let (app, _) = setup_test_app();

    let encoded = base64::engine::general_purpose::STANDARD.encode(netflix_statement());
    let body = serde_json::json!({ "filename": "statement.csv", "csv_data": encoded });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload/json")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["transactions_loaded"], 9);
}

#[tokio::test]
async fn test_upload_json_rejects_bad_base64() {
    let (app, _) = setup_test_app();
    let body = serde_json::json!({ "filename": "statement.csv", "csv_data": "***" });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload/json")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Preview ==========

#[tokio::test]
async fn test_preview_does_not_create_session() {
    let (app, store) = setup_test_app();
    let csv = "Bank of Example\nDate,Description,Amount\n01/01/2024,A,-1\n02/01/2024,B,-2\n";

    let response = app
        .oneshot(multipart_request("/api/preview", "statement.csv", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["header_row"], 1);
    assert_eq!(json["total_columns"], 3);
    assert_eq!(json["sample_rows"][1]["Description"], "B");
    assert!(store.is_empty());
}

// ========== Analysis ==========

#[tokio::test]
async fn test_subscriptions_endpoint() {
    let (app, store) = setup_test_app();
    let session_id = upload(&app, &netflix_statement()).await;

    let response = app
        .oneshot(get_request(&format!(
            "/api/subscriptions?session_id={}",
            session_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["count"], 1);
    let sub = &json["subscriptions"][0];
    assert_eq!(sub["description"], "Netflix");
    assert_eq!(sub["amount"], -15.0);
    assert_eq!(sub["frequency"], "MONTHLY");
    assert_eq!(sub["occurrences"], 4);

    // The detected set is persisted for the session
    let stored = store
        .get_subscriptions(&SessionId::from(session_id))
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_overspending_endpoint() {
    let (app, _) = setup_test_app();
    let csv = signed_amount_csv(&monthly_spending_ledger(&[100.0, 100.0, 100.0, 100.0, 500.0]));
    let session_id = upload(&app, &csv).await;

    let response = app
        .oneshot(get_request(&format!(
            "/api/overspending?session_id={}",
            session_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["summary"]["total_analyzed"], 2);
    assert_eq!(json["summary"]["overspending_count"], 1);
    assert_eq!(json["summary"]["normal_count"], 1);

    let months = json["months"].as_array().unwrap();
    assert_eq!(months[0]["month"], "2024-04");
    assert_eq!(months[0]["status"], "NORMAL");
    assert!(months[0].get("excess").is_none());
    assert_eq!(months[1]["month"], "2024-05");
    assert_eq!(months[1]["status"], "OVERSPENDING");
    assert_eq!(months[1]["excess"], 400.0);
}

#[tokio::test]
async fn test_analysis_requires_session_id() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(get_request("/api/subscriptions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "session_id query parameter is required");
}

#[tokio::test]
async fn test_analysis_unknown_session() {
    let (app, _) = setup_test_app();

    let response = app
        .oneshot(get_request("/api/overspending?session_id=missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
}

// ========== Sessions ==========

#[tokio::test]
async fn test_delete_session() {
    let (app, store) = setup_test_app();
    let session_id = upload(&app, &netflix_statement()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.is_empty());

    let response = app
        .oneshot(get_request(&format!(
            "/api/subscriptions?session_id={}",
            session_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sqlite_backed_router() {
    let db = Database::in_memory().unwrap();
    let app = create_router(Arc::new(db.clone()), ServerConfig::default());

    let session_id = upload(&app, &netflix_statement()).await;
    let response = app
        .oneshot(get_request(&format!(
            "/api/subscriptions?session_id={}",
            session_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = db
        .get_subscriptions(&SessionId::from(session_id))
        .unwrap()
        .unwrap();
    assert_eq!(stored[0].description, "Netflix");
}

// ========== Config and reaper ==========

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins(" https://a.example , ,https://b.example"),
        vec!["https://a.example", "https://b.example"]
    );
    assert!(parse_origins("").is_empty());
}

#[test]
fn test_parse_ttl_minutes() {
    assert_eq!(
        parse_ttl_minutes(" 90 ").unwrap(),
        chrono::Duration::minutes(90)
    );
    assert!(parse_ttl_minutes("0").is_err());
    assert!(parse_ttl_minutes("-5").is_err());
    assert!(parse_ttl_minutes("soon").is_err());
    // Parses as i64 but overflows a Duration
    assert!(parse_ttl_minutes(&i64::MAX.to_string()).is_err());
}

#[test]
fn test_reaper_sweep() {
    let store = MemoryStore::new();
    store.create_session().unwrap();

    assert_eq!(reaper::sweep(&store, chrono::Duration::hours(1)), 0);
    assert_eq!(reaper::sweep(&store, chrono::Duration::seconds(-1)), 1);
    assert!(store.is_empty());
}

#[test]
fn test_core_errors_map_to_status() {
    let err = AppError::from_core(outlay_core::Error::NotFound("session x".into()));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = AppError::from_core(outlay_core::Error::EmptyResult { rows_skipped: 3 });
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.message().contains('3'));

    let err = AppError::from_core(outlay_core::Error::Storage("lock".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "An internal error occurred");
}

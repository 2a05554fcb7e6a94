//! Integration tests for the notification entry points, driven through the
//! real router over the in-memory transaction store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use smobilpay_backend::api::{self, AppState};
use smobilpay_backend::config::{
    Config, DatabaseConfig, Environment, ServerConfig, SmobilpayConfig,
};
use smobilpay_backend::database::memory::InMemoryTransactionStore;
use smobilpay_backend::database::repository::TransactionStore;
use smobilpay_backend::database::transaction::{PaymentTransaction, TransactionState};
use smobilpay_backend::gateway::client::SmobilpayClient;
use smobilpay_backend::notification::reconcile::ReconciliationEngine;
use tower::ServiceExt;

const CONFIRMED_BODY: &str =
    r#"{"merchantReference":"abc-123","status":"CONFIRMED","paymentId":"pay_1"}"#;
const WEBHOOK_SECRET: &str = "whsec_test_1234";
// HMAC-SHA256 hex digest of CONFIRMED_BODY under WEBHOOK_SECRET
const CONFIRMED_SIGNATURE: &str =
    "0088975249089961ca92c62bdbb99c03037da8ffd31687bb36b90bccc7f19b47";

fn test_config(webhook_secret: Option<&str>) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "https://shop.example.com".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
        },
        smobilpay: SmobilpayConfig {
            consumer_key: "ck_test".to_string(),
            consumer_secret: "cs_test".to_string(),
            webhook_secret: webhook_secret.map(String::from),
            api_url: None,
            environment: Environment::Test,
        },
    }
}

fn build_app(webhook_secret: Option<&str>) -> (Router, Arc<InMemoryTransactionStore>) {
    let store = Arc::new(InMemoryTransactionStore::new());
    let store_dyn: Arc<dyn TransactionStore> = store.clone();
    let config = Arc::new(test_config(webhook_secret));
    let gateway = Arc::new(SmobilpayClient::new(config.smobilpay.clone()).unwrap());
    let engine = Arc::new(ReconciliationEngine::new(store_dyn.clone()));

    let app = api::router(AppState {
        config,
        store: store_dyn,
        engine,
        gateway,
    });
    (app, store)
}

async fn seed_pending(store: &InMemoryTransactionStore, reference: &str) {
    store
        .insert(&PaymentTransaction::new_pending(
            reference, "150000", "XAF", None, None,
        ))
        .await
        .unwrap();
}

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payment/smobilpay/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-Smobilpay-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_confirmed_webhook_marks_transaction_done() {
    let (app, store) = build_app(None);
    seed_pending(&store, "abc-123").await;

    let response = app.oneshot(webhook_request(CONFIRMED_BODY, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "success");

    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
    assert_eq!(tx.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn test_duplicate_webhook_is_idempotent() {
    let (app, store) = build_app(None);
    seed_pending(&store, "abc-123").await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(webhook_request(CONFIRMED_BODY, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["status"], "success");
    }

    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
}

#[tokio::test]
async fn test_late_in_progress_webhook_keeps_transaction_done() {
    let (app, store) = build_app(None);
    seed_pending(&store, "abc-123").await;

    app.clone()
        .oneshot(webhook_request(CONFIRMED_BODY, None))
        .await
        .unwrap();
    let late = r#"{"merchantReference":"abc-123","status":"IN_PROGRESS"}"#;
    let response = app.oneshot(webhook_request(late, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
}

#[tokio::test]
async fn test_webhook_missing_reference_touches_nothing() {
    let (app, store) = build_app(None);
    seed_pending(&store, "abc-123").await;

    let response = app
        .oneshot(webhook_request(r#"{"status":"CONFIRMED"}"#, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Missing merchant reference");

    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Pending);
    assert!(tx.payment_id.is_none());
}

#[tokio::test]
async fn test_webhook_unknown_reference_is_reported() {
    let (app, _store) = build_app(None);

    let response = app.oneshot(webhook_request(CONFIRMED_BODY, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Transaction not found");
}

#[tokio::test]
async fn test_webhook_malformed_json_is_reported() {
    let (app, _store) = build_app(None);

    let response = app
        .oneshot(webhook_request("this is not json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Malformed payload");
}

#[tokio::test]
async fn test_webhook_invalid_signature_is_rejected() {
    let (app, store) = build_app(Some(WEBHOOK_SECRET));
    seed_pending(&store, "abc-123").await;

    let response = app
        .oneshot(webhook_request(CONFIRMED_BODY, Some("deadbeef")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid signature");

    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Pending);
}

#[tokio::test]
async fn test_webhook_valid_signature_is_processed() {
    let (app, store) = build_app(Some(WEBHOOK_SECRET));
    seed_pending(&store, "abc-123").await;

    let response = app
        .oneshot(webhook_request(CONFIRMED_BODY, Some(CONFIRMED_SIGNATURE)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "success");

    let tx = store.find_by_reference("abc-123").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
}

#[tokio::test]
async fn test_callback_merges_query_and_form_fields() {
    let (app, store) = build_app(None);
    seed_pending(&store, "ref-1").await;

    // Form body wins over the conflicting query parameter
    let request = Request::builder()
        .method("POST")
        .uri("/payment/smobilpay/callback/ref-1?status=IN_PROGRESS")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("status=CONFIRMED&paymentId=pay_9"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/payment/status");

    let tx = store.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
    assert_eq!(tx.payment_id.as_deref(), Some("pay_9"));
}

#[tokio::test]
async fn test_callback_failed_status_redirects_to_error_page() {
    let (app, store) = build_app(None);
    seed_pending(&store, "ref-1").await;

    let request = Request::builder()
        .method("GET")
        .uri("/payment/smobilpay/callback/ref-1?status=FAILED")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shop/cart?payment_error=1");

    let tx = store.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Error);
    assert_eq!(tx.state_message.as_deref(), Some("Payment failed"));
}

#[tokio::test]
async fn test_callback_unknown_reference_redirects_to_cart() {
    let (app, _store) = build_app(None);

    let request = Request::builder()
        .method("GET")
        .uri("/payment/smobilpay/callback/no-such-ref?status=CONFIRMED")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shop/cart");
}

#[tokio::test]
async fn test_return_with_status_and_payment_id_reconciles() {
    let (app, store) = build_app(None);
    seed_pending(&store, "ref-1").await;

    let request = Request::builder()
        .method("GET")
        .uri("/payment/smobilpay/return/ref-1?status=CONFIRMED&paymentId=pay_1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/payment/status");

    let tx = store.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Done);
    assert_eq!(tx.payment_id.as_deref(), Some("pay_1"));
}

#[tokio::test]
async fn test_return_without_payment_id_is_informational() {
    let (app, store) = build_app(None);
    seed_pending(&store, "ref-1").await;
    store
        .update_state("ref-1", TransactionState::Cancel, Some("Payment cancelled"))
        .await
        .unwrap();

    // status alone is not a notification; the redirect reflects the
    // previously recorded state
    let request = Request::builder()
        .method("GET")
        .uri("/payment/smobilpay/return/ref-1?status=CONFIRMED")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shop/cart?payment_cancelled=1");

    let tx = store.find_by_reference("ref-1").await.unwrap().unwrap();
    assert_eq!(tx.state, TransactionState::Cancel);
}

#[tokio::test]
async fn test_return_unknown_reference_redirects_to_cart() {
    let (app, _store) = build_app(None);

    let request = Request::builder()
        .method("GET")
        .uri("/payment/smobilpay/return/no-such-ref")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shop/cart");
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let (app, _store) = build_app(Some(WEBHOOK_SECRET));

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["webhook_secret_configured"], true);
}

//! Donate/claim over HTTP, driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use solvanity_pool::web::{create_router, AppState};
use solvanity_pool::{Keypair, PoolService, SecretCipher, SqlitePoolStore};

async fn router() -> Router {
    let store = SqlitePoolStore::in_memory().await.unwrap();
    let cipher = SecretCipher::from_secret("http-test-secret-long-enough").unwrap();
    create_router(AppState {
        pool: PoolService::new(Arc::new(store), cipher),
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_donate_then_claim() {
    let router = router().await;
    let keypair = Keypair::generate();
    let secret = keypair.secret_material().to_vec();

    let (status, body) = send(
        &router,
        post_json(
            "/api/vanity-pool/donate",
            json!({
                "publicIdentifier": keypair.public_identifier(),
                "secretMaterial": secret,
                "suffix": "XYZ",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, stats) = send(&router, get("/api/vanity-pool/stats?suffix=xyz")).await;
    assert_eq!(stats, json!({"suffix": "xyz", "available": 1}));

    let (status, body) = send(&router, get("/api/vanity-pool/claim?suffix=xyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimed"], true);
    assert_eq!(body["publicIdentifier"], keypair.public_identifier());
    assert_eq!(body["secretMaterial"], json!(secret));

    let (_, body) = send(&router, get("/api/vanity-pool/claim?suffix=xyz")).await;
    assert_eq!(body, json!({"claimed": false}));
}

#[tokio::test]
async fn test_legacy_field_names_and_default_suffix() {
    let router = router().await;
    let keypair = Keypair::generate();

    let (status, _) = send(
        &router,
        post_json(
            "/api/vanity-pool/donate",
            json!({
                "publicKey": keypair.public_identifier(),
                "secretKey": keypair.secret_material().to_vec(),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, get("/api/vanity-pool/claim")).await;
    assert_eq!(body["claimed"], true);
    assert_eq!(body["publicIdentifier"], keypair.public_identifier());
}

#[tokio::test]
async fn test_short_secret_is_bad_request() {
    let router = router().await;
    let keypair = Keypair::generate();

    let (status, body) = send(
        &router,
        post_json(
            "/api/vanity-pool/donate",
            json!({
                "publicIdentifier": keypair.public_identifier(),
                "secretMaterial": keypair.secret_material()[..63].to_vec(),
                "suffix": "xyz",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (_, stats) = send(&router, get("/api/vanity-pool/stats?suffix=xyz")).await;
    assert_eq!(stats["available"], 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let router = router().await;
    let (status, body) = send(
        &router,
        post_json("/api/vanity-pool/donate", json!({"secretMaterial": [999]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unconfigured_pool_is_unavailable() {
    let router = create_router(AppState {
        pool: PoolService::unconfigured("encryption key not set"),
    });

    let (status, body) = send(&router, get("/api/vanity-pool/claim?suffix=xyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);

    let (status, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["poolConfigured"], false);
}

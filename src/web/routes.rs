//! HTTP endpoints for the vanity pool.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use zeroize::Zeroizing;

use crate::error::{AppError, AppResult};
use crate::pool::{ClaimOutcome, PoolService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PoolService,
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pool_configured: bool,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool_configured: state.pool.is_configured(),
    })
}

/// Donate request; accepts the legacy `publicKey`/`secretKey` names too.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateRequest {
    #[serde(alias = "publicKey")]
    pub public_identifier: String,
    #[serde(alias = "secretKey")]
    pub secret_material: Vec<u8>,
    #[serde(default)]
    pub suffix: Option<String>,
}

#[derive(Serialize)]
pub struct DonateResponse {
    pub ok: bool,
}

/// Add an unused keypair to the pool
pub async fn donate(
    State(state): State<AppState>,
    body: Result<Json<DonateRequest>, JsonRejection>,
) -> AppResult<Json<DonateResponse>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let secret = Zeroizing::new(request.secret_material);

    state
        .pool
        .donate(
            request.suffix.as_deref(),
            &request.public_identifier,
            secret.as_slice(),
        )
        .await?;

    Ok(Json(DonateResponse { ok: true }))
}

#[derive(Deserialize)]
pub struct SuffixQuery {
    pub suffix: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_material: Option<Vec<u8>>,
}

/// Take the oldest pooled keypair for a suffix
pub async fn claim(
    State(state): State<AppState>,
    Query(query): Query<SuffixQuery>,
) -> AppResult<Json<ClaimResponse>> {
    let response = match state.pool.claim(query.suffix.as_deref()).await? {
        ClaimOutcome::Claimed(keypair) => ClaimResponse {
            claimed: true,
            public_identifier: Some(keypair.public_identifier().to_string()),
            secret_material: Some(keypair.secret_material().to_vec()),
        },
        ClaimOutcome::NotAvailable => ClaimResponse {
            claimed: false,
            public_identifier: None,
            secret_material: None,
        },
    };
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub suffix: String,
    pub available: u64,
}

/// Pool depth for a suffix
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<SuffixQuery>,
) -> AppResult<Json<StatsResponse>> {
    let suffix = state.pool.normalize_suffix(query.suffix.as_deref());
    let available = state.pool.available(Some(suffix.as_str())).await?;
    Ok(Json(StatsResponse {
        suffix: suffix.to_string(),
        available,
    }))
}

/// Create the router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/vanity-pool/donate", post(donate))
        .route("/api/vanity-pool/claim", get(claim))
        .route("/api/vanity-pool/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::orchestrator::Orchestrator;

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register_asset", post(register_asset))
        .route("/transfer_asset", post(transfer_asset))
        .route("/stake_asset", post(stake_asset))
        .route("/user_balance/:user_id", get(user_balance))
        .route("/user_assets/:user_id", get(user_assets))
        .route("/asset_staking_status/:asset_id", get(asset_staking_status))
        .route("/asset_data/:asset_id", get(asset_data))
        .route("/asset_history/:asset_id", get(asset_history))
        .route("/verify_ownership", get(verify_ownership))
        .with_state(orchestrator)
}

async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "Fabric Orchestrator",
        "active_blockchains": orchestrator.active_count().await,
        "min_consensus": orchestrator.min_consensus,
    }))
}

#[derive(Deserialize)]
struct RegisterAssetRequest {
    asset_id: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    asset_data: Value,
}

async fn register_asset(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<RegisterAssetRequest>,
) -> impl IntoResponse {
    let (asset_id, user_id) = match (req.asset_id, req.user_id) {
        (Some(a), Some(u)) if !a.is_empty() && !u.is_empty() => (a, u),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": "Missing required fields"})),
            )
        }
    };

    let result = orchestrator
        .register_asset(&asset_id, &user_id, req.asset_data)
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "success": result.success,
            "message": result.message,
            "node_ids": result.node_ids,
        })),
    )
}

#[derive(Deserialize)]
struct TransferAssetRequest {
    asset_id: Option<String>,
    from_user_id: Option<String>,
    to_user_id: Option<String>,
}

async fn transfer_asset(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<TransferAssetRequest>,
) -> impl IntoResponse {
    let (asset_id, from_user_id, to_user_id) =
        match (req.asset_id, req.from_user_id, req.to_user_id) {
            (Some(a), Some(f), Some(t)) if !a.is_empty() && !f.is_empty() && !t.is_empty() => {
                (a, f, t)
            }
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"success": false, "message": "Missing required fields"})),
                )
            }
        };

    tracing::info!(%asset_id, %from_user_id, %to_user_id, "orchestrator transfer request");

    let result = orchestrator
        .transfer_asset(&asset_id, &from_user_id, &to_user_id)
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "success": result.success,
            "message": result.message,
            "node_ids": result.node_ids,
        })),
    )
}

async fn stake_asset() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "message": "Staking functionality has been removed",
            "node_ids": Vec::<String>::new(),
        })),
    )
}

async fn user_balance(Path(user_id): Path<String>) -> Json<Value> {
    Json(json!({
        "user_id": user_id,
        "balance": 0,
        "message": "Staking functionality has been removed",
    }))
}

async fn user_assets(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let assets = orchestrator.get_user_assets(&user_id).await;
    Json(json!({"user_id": user_id, "assets": assets}))
}

async fn asset_staking_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(asset_id): Path<String>,
) -> impl IntoResponse {
    match orchestrator.get_asset_staking_status(&asset_id).await {
        Some(status) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "asset_id": asset_id,
                "staking_status": {
                    "is_staked": false,
                    "owner_id": status.get("owner_id").cloned().unwrap_or(Value::Null),
                },
            })),
        ),
        None => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "asset_id": asset_id,
                "message": "Asset not found",
            })),
        ),
    }
}

async fn asset_data(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(asset_id): Path<String>,
) -> Json<Value> {
    let data = orchestrator.get_asset_data(&asset_id).await;
    Json(json!({"asset_id": asset_id, "data": data}))
}

async fn asset_history(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(asset_id): Path<String>,
) -> Json<Value> {
    let history = orchestrator.get_asset_history(&asset_id).await;
    Json(json!({"asset_id": asset_id, "history": history}))
}

#[derive(Deserialize)]
struct VerifyOwnershipQuery {
    asset_id: Option<String>,
    user_id: Option<String>,
}

async fn verify_ownership(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(q): Query<VerifyOwnershipQuery>,
) -> impl IntoResponse {
    let (asset_id, user_id) = match (q.asset_id, q.user_id) {
        (Some(a), Some(u)) if !a.is_empty() && !u.is_empty() => (a, u),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": "Missing required parameters"})),
            )
        }
    };

    let summary = orchestrator.verify_ownership(&asset_id, &user_id).await;

    if summary.not_found {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "asset_id": asset_id,
                "user_id": user_id,
                "is_owner": false,
                "message": "Asset not found on any blockchain",
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "asset_id": asset_id,
            "user_id": user_id,
            "is_owner": summary.is_owner,
            "verified_count": summary.verified_count,
            "total_blockchains": summary.total_blockchains,
            "min_consensus": orchestrator.min_consensus,
        })),
    )
}

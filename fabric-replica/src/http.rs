use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::service::ReplicaService;

pub fn router(service: Arc<ReplicaService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process_nfc_tag", post(process_nfc_tag))
        .route("/register_asset", post(register_asset))
        .route("/transfer_asset", post(transfer_asset))
        .route("/stake_asset", post(stake_asset))
        .route("/asset_staking_status/:asset_id", get(asset_staking_status))
        .route("/user_balance/:user_id", get(user_balance))
        .route("/user_assets/:user_id", get(user_assets))
        .route("/verify_ownership", get(verify_ownership))
        .route("/asset_history/:asset_id", get(asset_history))
        .route("/asset_data/:asset_id", get(asset_data))
        .route("/verify_integrity", get(verify_integrity))
        .route("/blockchain_stats", get(blockchain_stats))
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "Fabric Ledger API"}))
}

#[derive(Deserialize)]
struct NfcTagRequest {
    tag_id: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    tag_type: Option<String>,
    #[serde(default)]
    tag_technologies: Option<Value>,
    #[serde(default)]
    ndef_message: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
}

async fn process_nfc_tag(
    State(service): State<Arc<ReplicaService>>,
    Json(req): Json<NfcTagRequest>,
) -> impl IntoResponse {
    let (tag_id, user_id) = match (req.tag_id, req.user_id) {
        (Some(tag_id), Some(user_id)) if !tag_id.is_empty() && !user_id.is_empty() => {
            (tag_id, user_id)
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": "Missing tag_id or user_id"})),
            )
        }
    };

    if service.asset_already_registered(&tag_id).await {
        return (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "message": "Asset already exists. Staking functionality has been removed.",
                "action": "none",
                "asset_id": tag_id,
            })),
        );
    }

    let mut asset_data = Map::new();
    asset_data.insert(
        "tag_type".into(),
        Value::from(req.tag_type.unwrap_or_else(|| "NFC".into())),
    );
    asset_data.insert(
        "tag_technologies".into(),
        req.tag_technologies.unwrap_or_else(|| Value::Array(vec![])),
    );
    asset_data.insert(
        "ndef_message".into(),
        Value::from(req.ndef_message.unwrap_or_default()),
    );
    asset_data.insert(
        "scanned_timestamp".into(),
        req.timestamp.unwrap_or(Value::from(0)),
    );

    match service.register_asset(&tag_id, &user_id, asset_data).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "result": id.to_string(),
                "action": "register",
                "asset_id": tag_id,
            })),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "result": e.to_string(),
                "action": "register",
                "asset_id": tag_id,
            })),
        ),
    }
}

#[derive(Deserialize)]
struct RegisterAssetRequest {
    asset_id: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    asset_data: Option<Map<String, Value>>,
}

async fn register_asset(
    State(service): State<Arc<ReplicaService>>,
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

    match service
        .register_asset(&asset_id, &user_id, req.asset_data.unwrap_or_default())
        .await
    {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({"success": true, "result": id.to_string()})),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(json!({"success": false, "result": e.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct TransferAssetRequest {
    asset_id: Option<String>,
    from_user_id: Option<String>,
    to_user_id: Option<String>,
}

async fn transfer_asset(
    State(service): State<Arc<ReplicaService>>,
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

    tracing::info!(%asset_id, %from_user_id, %to_user_id, "transfer asset request");

    match service.transfer_asset(&asset_id, &from_user_id, &to_user_id).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({"success": true, "result": id.to_string()})),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(json!({"success": false, "result": e.to_string()})),
        ),
    }
}

async fn stake_asset() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": "Staking functionality has been removed"})),
    )
}

async fn asset_staking_status(Path(_asset_id): Path<String>) -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": "Staking functionality has been removed"})),
    )
}

async fn user_balance(Path(user_id): Path<String>) -> Json<Value> {
    Json(json!({"user_id": user_id, "balance": 0}))
}

async fn user_assets(
    State(service): State<Arc<ReplicaService>>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let assets = service.get_user_assets(&user_id).await;
    Json(json!({"user_id": user_id, "assets": assets}))
}

#[derive(Deserialize)]
struct VerifyOwnershipQuery {
    asset_id: Option<String>,
    user_id: Option<String>,
}

async fn verify_ownership(
    State(service): State<Arc<ReplicaService>>,
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

    let (is_owner, current_owner) = service.verify_ownership(&asset_id, &user_id).await;
    if is_owner {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "asset_id": asset_id,
                "user_id": user_id,
                "is_owner": true,
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "asset_id": asset_id,
                "user_id": user_id,
                "is_owner": false,
                "current_owner": current_owner.unwrap_or_else(|| "unknown".into()),
            })),
        )
    }
}

async fn asset_history(
    State(service): State<Arc<ReplicaService>>,
    Path(asset_id): Path<String>,
) -> Json<Value> {
    let history = service.get_asset_ownership_history(&asset_id).await;
    Json(json!({"asset_id": asset_id, "history": history}))
}

async fn asset_data(
    State(service): State<Arc<ReplicaService>>,
    Path(asset_id): Path<String>,
) -> Json<Value> {
    let data = service.get_asset_data(&asset_id).await;
    Json(json!({"asset_id": asset_id, "data": data}))
}

async fn verify_integrity(State(service): State<Arc<ReplicaService>>) -> Json<Value> {
    let (integrity_ok, message) = service.verify_integrity().await;
    Json(json!({"integrity_ok": integrity_ok, "message": message}))
}

async fn blockchain_stats(State(service): State<Arc<ReplicaService>>) -> Json<Value> {
    let stats = service.stats().await;
    Json(json!({"success": true, "stats": stats}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fabric_ledger::Ledger;
    use http_body_util::BodyExt;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn test_router() -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("ledger.json")).unwrap();
        let service = Arc::new(ReplicaService::new(ledger));
        (router(service), dir)
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn json_post(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _dir) = test_router();
        let (status, body) = send(router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_then_transfer_then_verify_ownership() {
        let (router, _dir) = test_router();

        let (status, body) = send(
            router.clone(),
            json_post(
                "/register_asset",
                json!({"asset_id": "A1", "user_id": "alice", "asset_data": {}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(
            router.clone(),
            json_post(
                "/transfer_asset",
                json!({"asset_id": "A1", "from_user_id": "alice", "to_user_id": "bob"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = send(
            router.clone(),
            get("/verify_ownership?asset_id=A1&user_id=bob"),
        )
        .await;
        assert_eq!(body["is_owner"], true);

        let (_, body) = send(router.clone(), get("/user_assets/bob")).await;
        assert_eq!(body["assets"], json!(["A1"]));

        let (_, body) = send(router, get("/verify_integrity")).await;
        assert_eq!(body["integrity_ok"], true);
    }

    #[tokio::test]
    async fn self_transfer_is_rejected_over_http() {
        let (router, _dir) = test_router();
        send(
            router.clone(),
            json_post(
                "/register_asset",
                json!({"asset_id": "A1", "user_id": "alice"}),
            ),
        )
        .await;

        let (status, body) = send(
            router,
            json_post(
                "/transfer_asset",
                json!({"asset_id": "A1", "from_user_id": "alice", "to_user_id": "alice"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["result"].as_str().unwrap().contains("already owned by"));
    }

    #[tokio::test]
    async fn missing_fields_yield_400() {
        let (router, _dir) = test_router();
        let (status, _) = send(router, json_post("/register_asset", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn staking_endpoints_remain_stubs() {
        let (router, _dir) = test_router();
        let (status, body) = send(router.clone(), json_post("/stake_asset", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(router, get("/asset_staking_status/A1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn process_nfc_tag_registers_a_new_asset_then_no_ops_on_replay() {
        let (router, _dir) = test_router();

        let (status, body) = send(
            router.clone(),
            json_post(
                "/process_nfc_tag",
                json!({"tag_id": "T1", "user_id": "alice", "tag_type": "NFC"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["action"], "register");

        let (_, body) = send(
            router,
            json_post("/process_nfc_tag", json!({"tag_id": "T1", "user_id": "bob"})),
        )
        .await;
        assert_eq!(body["success"], false);
        assert_eq!(body["action"], "none");
    }

    #[tokio::test]
    async fn blockchain_stats_counts_actions() {
        let (router, _dir) = test_router();
        send(
            router.clone(),
            json_post(
                "/register_asset",
                json!({"asset_id": "A1", "user_id": "alice"}),
            ),
        )
        .await;
        send(
            router.clone(),
            json_post(
                "/transfer_asset",
                json!({"asset_id": "A1", "from_user_id": "alice", "to_user_id": "bob"}),
            ),
        )
        .await;

        let (_, body) = send(router, get("/blockchain_stats")).await;
        assert_eq!(body["stats"]["total_nodes"], 2);
        assert_eq!(body["stats"]["action_counts"]["register"], 1);
        assert_eq!(body["stats"]["action_counts"]["transfer"], 1);
    }
}

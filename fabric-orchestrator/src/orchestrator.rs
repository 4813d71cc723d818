use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a quorum write: whether it met `min_consensus`, a
/// human-readable message, and the per-replica event ids that succeeded.
pub struct QuorumResult {
    pub success: bool,
    pub message: String,
    pub node_ids: Vec<String>,
}

/// Fans register/transfer writes and read-repair queries out to a fixed set
/// of replica URLs, accepting an operation only once `min_consensus` of them
/// agree. Replicas never talk to each other; all coordination lives here.
pub struct Orchestrator {
    http: reqwest::Client,
    base_urls: Vec<String>,
    pub min_consensus: usize,
    active_urls: RwLock<Vec<String>>,
}

impl Orchestrator {
    pub async fn new(base_urls: Vec<String>, min_consensus: usize) -> Self {
        let orchestrator = Orchestrator {
            http: reqwest::Client::new(),
            base_urls,
            min_consensus,
            active_urls: RwLock::new(Vec::new()),
        };
        let active = orchestrator.refresh_active().await;
        if active.len() < orchestrator.min_consensus {
            tracing::warn!(
                active = active.len(),
                required = orchestrator.min_consensus,
                "not enough active replicas"
            );
        } else {
            tracing::info!(active = active.len(), "found active replica instances");
        }
        *orchestrator.active_urls.write().await = active;
        orchestrator
    }

    pub async fn active_count(&self) -> usize {
        self.active_urls.read().await.len()
    }

    /// Probe every configured replica's `/health` in parallel; the active
    /// set is whichever subset answers within the health timeout.
    async fn refresh_active(&self) -> Vec<String> {
        let checks = self.base_urls.iter().map(|url| {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let result = http
                    .get(format!("{url}/health"))
                    .timeout(HEALTH_TIMEOUT)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => Some(url),
                    Ok(response) => {
                        tracing::debug!(%url, status = %response.status(), "health check non-2xx");
                        None
                    }
                    Err(e) => {
                        tracing::debug!(%url, error = %e, "replica not responding");
                        None
                    }
                }
            }
        });

        futures::future::join_all(checks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn refresh(&self) -> Vec<String> {
        let active = self.refresh_active().await;
        *self.active_urls.write().await = active.clone();
        active
    }

    pub async fn register_asset(
        &self,
        asset_id: &str,
        user_id: &str,
        asset_data: Value,
    ) -> QuorumResult {
        let active = self.refresh().await;
        if active.len() < self.min_consensus {
            return QuorumResult {
                success: false,
                message: format!(
                    "Not enough active blockchain instances ({}/{})",
                    active.len(),
                    self.min_consensus
                ),
                node_ids: vec![],
            };
        }

        let target_count = active.len().min(self.min_consensus.max(3));
        let mut rng = rand::thread_rng();
        let selected: Vec<String> = active
            .choose_multiple(&mut rng, target_count)
            .cloned()
            .collect();

        tracing::info!(
            %asset_id, %user_id, target_count, "registering asset across replicas"
        );

        let body = json!({
            "asset_id": asset_id,
            "user_id": user_id,
            "asset_data": asset_data,
        });

        let outcomes = self.fan_out_write("register_asset", &selected, &body).await;
        let node_ids: Vec<String> = outcomes.into_iter().flatten().collect();
        let success_count = node_ids.len();

        if success_count >= self.min_consensus {
            tracing::info!(%asset_id, success_count, target_count, "asset registered with consensus");
            QuorumResult {
                success: true,
                message: format!("Asset registered with consensus ({success_count}/{target_count})"),
                node_ids,
            }
        } else {
            tracing::warn!(%asset_id, success_count, required = self.min_consensus, "failed to reach register consensus");
            self.cleanup_registrations(asset_id, success_count);
            QuorumResult {
                success: false,
                message: format!(
                    "Failed to reach consensus ({success_count}/{})",
                    self.min_consensus
                ),
                node_ids: vec![],
            }
        }
    }

    /// Partial successes during a failed quorum write are not rolled back;
    /// intent is logged only, matching the upstream replica's own choice not
    /// to undo its half of a failed write.
    fn cleanup_registrations(&self, asset_id: &str, successes: usize) {
        tracing::info!(%asset_id, successes, "cleanup needed after quorum shortfall");
    }

    pub async fn transfer_asset(
        &self,
        asset_id: &str,
        from_user_id: &str,
        to_user_id: &str,
    ) -> QuorumResult {
        let active = self.refresh().await;
        if active.len() < self.min_consensus {
            return QuorumResult {
                success: false,
                message: format!(
                    "Not enough active blockchain instances ({}/{})",
                    active.len(),
                    self.min_consensus
                ),
                node_ids: vec![],
            };
        }

        let mut blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;

        if blockchains_with_asset.len() < self.min_consensus {
            let mut valid = Vec::new();
            for url in &blockchains_with_asset {
                if self.verify_ownership_at(url, asset_id, from_user_id).await {
                    valid.push(url.clone());
                }
            }

            if valid.is_empty() {
                return QuorumResult {
                    success: false,
                    message: format!("Asset {asset_id} not owned by {from_user_id} on any replica"),
                    node_ids: vec![],
                };
            }

            tracing::info!(
                %asset_id, found = valid.len(), required = self.min_consensus,
                "asset below consensus threshold, self-healing"
            );
            self.replicate_asset(asset_id, from_user_id, &valid, &active).await;
            blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;
        }

        let mut valid = Vec::new();
        for url in &blockchains_with_asset {
            if self.verify_ownership_at(url, asset_id, from_user_id).await {
                valid.push(url.clone());
            }
        }

        if valid.len() < self.min_consensus {
            return QuorumResult {
                success: false,
                message: format!(
                    "Ownership verification failed: Asset {asset_id} is not owned by {from_user_id} on enough replicas ({}/{})",
                    valid.len(),
                    self.min_consensus
                ),
                node_ids: vec![],
            };
        }

        let body = json!({
            "asset_id": asset_id,
            "from_user_id": from_user_id,
            "to_user_id": to_user_id,
        });

        let outcomes = self.fan_out_write("transfer_asset", &valid, &body).await;
        let node_ids: Vec<String> = outcomes.into_iter().flatten().collect();
        let success_count = node_ids.len();

        if success_count >= self.min_consensus {
            tracing::info!(%asset_id, success_count, valid = valid.len(), "asset transferred with consensus");
            QuorumResult {
                success: true,
                message: format!("Asset transferred with consensus ({success_count}/{})", valid.len()),
                node_ids,
            }
        } else {
            tracing::warn!(%asset_id, success_count, required = self.min_consensus, "failed to reach transfer consensus");
            QuorumResult {
                success: false,
                message: format!(
                    "Transfer failed to reach consensus ({success_count}/{})",
                    self.min_consensus
                ),
                node_ids: vec![],
            }
        }
    }

    /// Sends `json_body` to `{url}/{path}` on every url in `targets` in
    /// parallel; `Some(result_string)` for each replica that reported
    /// `success: true`, `None` otherwise (failure, timeout, or non-2xx).
    async fn fan_out_write(
        &self,
        path: &str,
        targets: &[String],
        json_body: &Value,
    ) -> Vec<Option<String>> {
        let calls = targets.iter().map(|url| {
            let http = self.http.clone();
            let url = url.clone();
            let body = json_body.clone();
            let path = path.to_string();
            async move {
                let result = http
                    .post(format!("{url}/{path}"))
                    .json(&body)
                    .timeout(WRITE_TIMEOUT)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => {
                        match response.json::<Value>().await {
                            Ok(parsed) if parsed.get("success").and_then(Value::as_bool) == Some(true) => {
                                let result_field = parsed
                                    .get("result")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string();
                                tracing::info!(%url, %path, result = %result_field, "replica write succeeded");
                                Some(result_field)
                            }
                            Ok(parsed) => {
                                tracing::warn!(%url, %path, response = %parsed, "replica write failed");
                                None
                            }
                            Err(e) => {
                                tracing::warn!(%url, %path, error = %e, "unparseable replica response");
                                None
                            }
                        }
                    }
                    Ok(response) => {
                        tracing::warn!(%url, %path, status = %response.status(), "replica write non-2xx");
                        None
                    }
                    Err(e) => {
                        tracing::error!(%url, %path, error = %e, "error reaching replica");
                        None
                    }
                }
            }
        });

        futures::future::join_all(calls).await
    }

    async fn find_replicas_with_asset(&self, active: &[String], asset_id: &str) -> Vec<String> {
        let checks = active.iter().map(|url| {
            let http = self.http.clone();
            let url = url.clone();
            let asset_id = asset_id.to_string();
            async move {
                let result = http
                    .get(format!("{url}/asset_history/{asset_id}"))
                    .timeout(READ_TIMEOUT)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => {
                        let body: Result<AssetHistoryResponse, _> = response.json().await;
                        match body {
                            Ok(body) if !body.history.is_empty() => Some(url),
                            _ => None,
                        }
                    }
                    _ => None,
                }
            }
        });

        futures::future::join_all(checks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn verify_ownership_at(&self, url: &str, asset_id: &str, user_id: &str) -> bool {
        let result = self
            .http
            .get(format!("{url}/verify_ownership"))
            .query(&[("asset_id", asset_id), ("user_id", user_id)])
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => response
                .json::<VerifyOwnershipResponse>()
                .await
                .map(|body| body.is_owner)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Re-registers `asset_id` under `user_id` on enough additional replicas
    /// (drawn from `active` minus `source`) to reach `min_consensus`. This
    /// cannot repair a replica that already committed a conflicting state;
    /// it only grows the replica set for an under-replicated asset.
    async fn replicate_asset(
        &self,
        asset_id: &str,
        user_id: &str,
        source: &[String],
        active: &[String],
    ) {
        if source.is_empty() {
            tracing::warn!(%asset_id, "cannot replicate asset - no source replicas");
            return;
        }

        let asset_data = self.get_asset_data_at(&source[0], asset_id).await;
        if asset_data.as_object().map(|m| m.is_empty()).unwrap_or(true) {
            tracing::warn!(%asset_id, "failed to get asset data for replication");
            return;
        }

        let needed = self.min_consensus.saturating_sub(source.len());
        if needed == 0 {
            tracing::info!(%asset_id, "asset already exists on enough replicas");
            return;
        }

        let candidates: Vec<String> = active
            .iter()
            .filter(|url| !source.contains(url))
            .cloned()
            .collect();

        if candidates.len() < needed {
            tracing::warn!(%asset_id, needed, found = candidates.len(), "not enough available replicas for replication");
            return;
        }

        let mut rng = rand::thread_rng();
        let targets: Vec<String> = candidates.choose_multiple(&mut rng, needed).cloned().collect();

        tracing::info!(%asset_id, needed, "replicating asset to additional replicas");

        let body = json!({
            "asset_id": asset_id,
            "user_id": user_id,
            "asset_data": asset_data,
        });

        let outcomes = self.fan_out_write("register_asset", &targets, &body).await;
        let successes = outcomes.into_iter().flatten().count();
        tracing::info!(%asset_id, successes, needed, "replicated asset to additional replicas");
    }

    async fn get_asset_data_at(&self, url: &str, asset_id: &str) -> Value {
        let result = self
            .http
            .get(format!("{url}/asset_data/{asset_id}"))
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => response
                .json::<AssetDataResponse>()
                .await
                .map(|body| body.data)
                .unwrap_or_else(|_| json!({})),
            _ => json!({}),
        }
    }

    async fn get_asset_history_at(&self, url: &str, asset_id: &str) -> Vec<Value> {
        let result = self
            .http
            .get(format!("{url}/asset_history/{asset_id}"))
            .timeout(READ_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => response
                .json::<AssetHistoryResponse>()
                .await
                .map(|body| body.history)
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    /// Simple quorum read: requires the asset on at least `min_consensus`
    /// replicas, then returns the first collected response verbatim. No
    /// merge or majority vote on value; divergence is not reconciled here.
    pub async fn get_asset_data(&self, asset_id: &str) -> Value {
        let active = self.refresh().await;
        let blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;
        if blockchains_with_asset.len() < self.min_consensus {
            tracing::warn!(%asset_id, found = blockchains_with_asset.len(), "asset not found on enough replicas");
            return json!({});
        }

        let calls = blockchains_with_asset
            .iter()
            .map(|url| self.get_asset_data_at(url, asset_id));
        let results: Vec<Value> = futures::future::join_all(calls)
            .await
            .into_iter()
            .filter(|v| v.as_object().is_some_and(|m| !m.is_empty()))
            .collect();

        if results.len() < self.min_consensus {
            tracing::warn!(%asset_id, collected = results.len(), "could not get asset data with consensus");
            return json!({});
        }

        results.into_iter().next().unwrap_or_else(|| json!({}))
    }

    pub async fn get_asset_history(&self, asset_id: &str) -> Vec<Value> {
        let active = self.refresh().await;
        let blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;
        if blockchains_with_asset.len() < self.min_consensus {
            tracing::warn!(%asset_id, found = blockchains_with_asset.len(), "asset not found on enough replicas");
            return vec![];
        }

        let calls = blockchains_with_asset
            .iter()
            .map(|url| self.get_asset_history_at(url, asset_id));
        let results: Vec<Vec<Value>> = futures::future::join_all(calls)
            .await
            .into_iter()
            .filter(|h| !h.is_empty())
            .collect();

        if results.len() < self.min_consensus {
            tracing::warn!(%asset_id, collected = results.len(), "could not get asset history with consensus");
            return vec![];
        }

        results.into_iter().next().unwrap_or_default()
    }

    /// Union across all active replicas; no consensus requirement.
    pub async fn get_user_assets(&self, user_id: &str) -> Vec<String> {
        let active = self.refresh().await;
        let calls = active.iter().map(|url| {
            let http = self.http.clone();
            let url = url.clone();
            let user_id = user_id.to_string();
            async move {
                let result = http
                    .get(format!("{url}/user_assets/{user_id}"))
                    .timeout(READ_TIMEOUT)
                    .send()
                    .await;
                match result {
                    Ok(response) if response.status().is_success() => response
                        .json::<UserAssetsResponse>()
                        .await
                        .map(|body| body.assets)
                        .unwrap_or_default(),
                    _ => vec![],
                }
            }
        });

        let mut all_assets: std::collections::HashSet<String> = std::collections::HashSet::new();
        for assets in futures::future::join_all(calls).await {
            all_assets.extend(assets);
        }

        tracing::info!(%user_id, count = all_assets.len(), "aggregated user assets across replicas");
        all_assets.into_iter().collect()
    }

    pub fn get_user_balance(&self, user_id: &str) -> u64 {
        tracing::info!(%user_id, "user balance request - returning 0 (staking functionality removed)");
        0
    }

    pub async fn get_asset_staking_status(&self, asset_id: &str) -> Option<Value> {
        let active = self.refresh().await;
        let blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;
        if blockchains_with_asset.is_empty() {
            tracing::warn!(%asset_id, "asset not found on any replica");
            return None;
        }

        let history = self
            .get_asset_history_at(&blockchains_with_asset[0], asset_id)
            .await;
        let owner_id = history
            .last()
            .and_then(|entry| entry.get("user_id"))
            .cloned();

        Some(json!({"is_staked": false, "owner_id": owner_id}))
    }

    /// Reports `is_owner = true` iff a quorum of the replicas that hold the
    /// asset agree `user_id` is the current owner.
    pub async fn verify_ownership(&self, asset_id: &str, user_id: &str) -> VerifyOwnershipSummary {
        let active = self.refresh().await;
        let blockchains_with_asset = self.find_replicas_with_asset(&active, asset_id).await;

        if blockchains_with_asset.is_empty() {
            return VerifyOwnershipSummary {
                is_owner: false,
                verified_count: 0,
                total_blockchains: 0,
                not_found: true,
            };
        }

        let mut verified_count = 0;
        for url in &blockchains_with_asset {
            if self.verify_ownership_at(url, asset_id, user_id).await {
                verified_count += 1;
            }
        }

        VerifyOwnershipSummary {
            is_owner: verified_count >= self.min_consensus,
            verified_count,
            total_blockchains: blockchains_with_asset.len(),
            not_found: false,
        }
    }
}

pub struct VerifyOwnershipSummary {
    pub is_owner: bool,
    pub verified_count: usize,
    pub total_blockchains: usize,
    pub not_found: bool,
}

#[derive(Deserialize)]
struct AssetHistoryResponse {
    #[serde(default)]
    history: Vec<Value>,
}

#[derive(Deserialize)]
struct AssetDataResponse {
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct UserAssetsResponse {
    #[serde(default)]
    assets: Vec<String>,
}

#[derive(Deserialize)]
struct VerifyOwnershipResponse {
    #[serde(default)]
    is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn healthy(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn register_fails_fast_when_active_below_min_consensus() {
        let orchestrator =
            Orchestrator::new(vec!["http://127.0.0.1:1".to_string()], 3).await;

        let result = orchestrator
            .register_asset("A1", "alice", json!({}))
            .await;

        assert!(!result.success);
        assert!(result.message.contains("Not enough active"));
        assert!(result.node_ids.is_empty());
    }

    #[tokio::test]
    async fn register_succeeds_with_quorum_across_replicas() {
        let servers = [
            MockServer::start().await,
            MockServer::start().await,
            MockServer::start().await,
        ];
        for server in &servers {
            healthy(server).await;
            Mock::given(method("POST"))
                .and(path("/register_asset"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "result": "11111111-1111-1111-1111-111111111111",
                })))
                .mount(server)
                .await;
        }
        let urls: Vec<String> = servers.iter().map(|s| s.uri()).collect();

        let orchestrator = Orchestrator::new(urls, 3).await;
        let result = orchestrator
            .register_asset("A1", "alice", json!({"color": "blue"}))
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.node_ids.len(), 3);
    }

    #[tokio::test]
    async fn self_healing_replicates_under_replicated_asset() {
        let source = MockServer::start().await;
        let candidates = [
            MockServer::start().await,
            MockServer::start().await,
            MockServer::start().await,
        ];

        healthy(&source).await;
        Mock::given(method("GET"))
            .and(path("/asset_history/A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "asset_id": "A1",
                "history": [{"user_id": "alice", "timestamp": 1.0, "node_id": "n1", "action": "register"}],
            })))
            .mount(&source)
            .await;
        Mock::given(method("GET"))
            .and(path("/verify_ownership"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "is_owner": true,
            })))
            .mount(&source)
            .await;
        Mock::given(method("GET"))
            .and(path("/asset_data/A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "asset_id": "A1",
                "data": {"owner": "alice"},
            })))
            .mount(&source)
            .await;

        for candidate in &candidates {
            healthy(candidate).await;
            Mock::given(method("GET"))
                .and(path_regex("^/asset_history/.*"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"asset_id": "A1", "history": []})),
                )
                .mount(candidate)
                .await;
            Mock::given(method("GET"))
                .and(path("/verify_ownership"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "is_owner": false,
                })))
                .mount(candidate)
                .await;
            Mock::given(method("POST"))
                .and(path("/register_asset"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "result": "22222222-2222-2222-2222-222222222222",
                })))
                .mount(candidate)
                .await;
        }

        let mut urls = vec![source.uri()];
        urls.extend(candidates.iter().map(|c| c.uri()));

        let orchestrator = Orchestrator::new(urls, 3).await;
        let result = orchestrator.transfer_asset("A1", "alice", "bob").await;

        // The asset is only confirmed on `source`, below min_consensus; the
        // self-heal should fire and re-register it on exactly `needed` (2)
        // of the three candidates before re-checking quorum.
        assert!(!result.success);

        let mut register_calls = 0;
        for candidate in &candidates {
            register_calls += candidate
                .received_requests()
                .await
                .unwrap()
                .iter()
                .filter(|r| r.url.path() == "/register_asset")
                .count();
        }
        assert_eq!(register_calls, 2, "self-heal should target exactly 2 candidates");

        let asset_data_calls = source
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/asset_data/A1")
            .count();
        assert_eq!(asset_data_calls, 1);
    }

    #[tokio::test]
    async fn verify_ownership_requires_quorum_agreement() {
        let servers = [
            MockServer::start().await,
            MockServer::start().await,
            MockServer::start().await,
        ];
        for (i, server) in servers.iter().enumerate() {
            healthy(server).await;
            Mock::given(method("GET"))
                .and(path("/asset_history/A1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "asset_id": "A1",
                    "history": [{"user_id": "bob", "timestamp": 1.0, "node_id": "n1", "action": "register"}],
                })))
                .mount(server)
                .await;
            // Two out of three agree bob owns it; one dissents.
            let is_owner = i < 2;
            Mock::given(method("GET"))
                .and(path("/verify_ownership"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "is_owner": is_owner,
                })))
                .mount(server)
                .await;
        }
        let urls: Vec<String> = servers.iter().map(|s| s.uri()).collect();

        let strict = Orchestrator::new(urls.clone(), 3).await;
        let summary = strict.verify_ownership("A1", "bob").await;
        assert_eq!(summary.verified_count, 2);
        assert_eq!(summary.total_blockchains, 3);
        assert!(!summary.is_owner, "2/3 should not satisfy min_consensus=3");

        let lenient = Orchestrator::new(urls, 2).await;
        let summary = lenient.verify_ownership("A1", "bob").await;
        assert!(summary.is_owner, "2/3 should satisfy min_consensus=2");
    }

    #[tokio::test]
    async fn get_user_assets_unions_across_all_active_replicas_without_quorum() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        healthy(&a).await;
        healthy(&b).await;
        Mock::given(method("GET"))
            .and(path("/user_assets/alice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user_id": "alice", "assets": ["A1"]})),
            )
            .mount(&a)
            .await;
        Mock::given(method("GET"))
            .and(path("/user_assets/alice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user_id": "alice", "assets": ["A2"]})),
            )
            .mount(&b)
            .await;

        let orchestrator = Orchestrator::new(vec![a.uri(), b.uri()], 3).await;
        let mut assets = orchestrator.get_user_assets("alice").await;
        assets.sort();
        assert_eq!(assets, vec!["A1".to_string(), "A2".to_string()]);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use fabric_base::{err, Result};
use fabric_ledger::Ledger;
use fabric_types::{now_secs, Action, Event, HistoryEntry, NewEvent};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Thin wrapper exposing ledger operations over the HTTP boundary, plus two
/// convenience operations (`register_asset`, `transfer_asset`) that pick
/// references and build the event for the caller.
#[derive(Clone)]
pub struct ReplicaService {
    ledger: Arc<Mutex<Ledger>>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct BlockchainStats {
    pub total_nodes: usize,
    pub total_tips: usize,
    pub unique_assets: usize,
    pub unique_users: usize,
    pub action_counts: ActionCounts,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ActionCounts {
    pub register: usize,
    pub transfer: usize,
}

impl ReplicaService {
    pub fn new(ledger: Ledger) -> Self {
        ReplicaService {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    pub async fn register_asset(
        &self,
        asset_id: &str,
        user_id: &str,
        asset_data: Map<String, Value>,
    ) -> Result<Uuid> {
        let mut ledger = self.ledger.lock().await;
        let references = ledger.choose_references();
        let event = Event::new(
            NewEvent::new(asset_id, Action::Register, user_id)
                .with_data(asset_data)
                .with_references(references),
        )?;
        ledger.add_event(event)
    }

    pub async fn transfer_asset(
        &self,
        asset_id: &str,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<Uuid> {
        let mut ledger = self.ledger.lock().await;

        let current_owner = ledger
            .get_asset_ownership_history(asset_id)
            .last()
            .map(|entry| entry.user_id.clone());

        match current_owner {
            None => return Err(err(format!("Asset {asset_id} is not owned by {from_user_id}"))),
            Some(owner) if owner != from_user_id => {
                return Err(err(format!("Asset {asset_id} is not owned by {from_user_id}")))
            }
            Some(owner) if owner == to_user_id => {
                return Err(err(format!("Asset {asset_id} is already owned by {to_user_id}")))
            }
            _ => {}
        }

        let references = ledger.choose_references();
        let mut data = Map::new();
        data.insert("recipient_id".into(), Value::from(to_user_id));
        data.insert("transfer_timestamp".into(), Value::from(now_secs()));
        data.insert("status".into(), Value::from("completed"));

        let event = Event::new(
            NewEvent::new(asset_id, Action::Transfer, from_user_id).with_data(data).with_references(references),
        )?;
        ledger.add_event(event)
    }

    pub async fn asset_already_registered(&self, asset_id: &str) -> bool {
        let ledger = self.ledger.lock().await;
        ledger
            .get_asset_events(asset_id)
            .iter()
            .any(|e| e.action == Action::Register)
    }

    pub async fn get_asset_ownership_history(&self, asset_id: &str) -> Vec<HistoryEntry> {
        self.ledger.lock().await.get_asset_ownership_history(asset_id)
    }

    pub async fn get_user_assets(&self, user_id: &str) -> Vec<String> {
        self.ledger.lock().await.get_user_assets(user_id)
    }

    pub async fn verify_ownership(&self, asset_id: &str, user_id: &str) -> (bool, Option<String>) {
        let ledger = self.ledger.lock().await;
        let history = ledger.get_asset_ownership_history(asset_id);
        match history.last() {
            Some(entry) if entry.user_id == user_id => (true, None),
            Some(entry) => (false, Some(entry.user_id.clone())),
            None => (false, None),
        }
    }

    /// The register event's opaque data, stringified field-by-field to
    /// match the historical wire format (every value rendered as text).
    pub async fn get_asset_data(&self, asset_id: &str) -> HashMap<String, String> {
        let ledger = self.ledger.lock().await;
        ledger
            .get_asset_events(asset_id)
            .into_iter()
            .find(|e| e.action == Action::Register)
            .map(|e| {
                e.data
                    .iter()
                    .map(|(k, v)| (k.clone(), stringify(v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn verify_integrity(&self) -> (bool, String) {
        self.ledger.lock().await.verify_integrity()
    }

    pub async fn stats(&self) -> BlockchainStats {
        let ledger = self.ledger.lock().await;
        let mut assets = std::collections::HashSet::new();
        let mut users = std::collections::HashSet::new();
        let mut registers = 0usize;
        let mut transfers = 0usize;

        for event in ledger.all_events() {
            assets.insert(event.asset_id.clone());
            users.insert(event.user_id.clone());
            match event.action {
                Action::Register => registers += 1,
                Action::Transfer => transfers += 1,
            }
        }

        BlockchainStats {
            total_nodes: ledger.node_count(),
            total_tips: ledger.tip_count(),
            unique_assets: assets.len(),
            unique_users: users.len(),
            action_counts: ActionCounts {
                register: registers,
                transfer: transfers,
            },
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

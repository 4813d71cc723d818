use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use fabric_base::{err, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::hash::{compute_hash, generate_signature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Register,
    Transfer,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Transfer => "transfer",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "register" => Ok(Action::Register),
            "transfer" => Ok(Action::Transfer),
            other => Err(err(format!("Invalid action: {other}. Must be one of {{register, transfer}}"))),
        }
    }
}

/// One append to the ledger: a registration or a transfer of one asset.
///
/// `event_id` serializes as `node_id` on the wire and on disk, matching the
/// historical schema this format must stay compatible with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "node_id")]
    pub event_id: Uuid,
    pub asset_id: String,
    pub action: Action,
    pub user_id: String,
    pub timestamp: f64,
    pub references: Vec<Uuid>,
    pub signature: String,
    pub hash: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Inputs accepted at construction; everything but `asset_id`/`action`/
/// `user_id`/`data` is optional and filled in with a sensible default.
pub struct NewEvent {
    pub asset_id: String,
    pub action: Action,
    pub user_id: String,
    pub data: Map<String, Value>,
    pub references: Vec<Uuid>,
    pub timestamp: Option<f64>,
    pub event_id: Option<Uuid>,
    pub signature: Option<String>,
}

impl NewEvent {
    pub fn new(asset_id: impl Into<String>, action: Action, user_id: impl Into<String>) -> Self {
        NewEvent {
            asset_id: asset_id.into(),
            action,
            user_id: user_id.into(),
            data: Map::new(),
            references: Vec::new(),
            timestamp: None,
            event_id: None,
            signature: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_references(mut self, references: Vec<Uuid>) -> Self {
        self.references = references;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs_f64()
}

impl Event {
    pub fn new(params: NewEvent) -> Result<Event> {
        if params.asset_id.is_empty() {
            return Err(err("Asset ID cannot be empty"));
        }
        if params.user_id.is_empty() {
            return Err(err("User ID cannot be empty"));
        }

        let timestamp = params.timestamp.unwrap_or_else(now_secs);
        let event_id = params.event_id.unwrap_or_else(Uuid::new_v4);
        let signature = params
            .signature
            .unwrap_or_else(|| generate_signature(&params.user_id, timestamp));
        let hash = compute_hash(
            &params.asset_id,
            params.action,
            &params.user_id,
            timestamp,
            &params.references,
            &signature,
            &params.data,
        );

        Ok(Event {
            event_id,
            asset_id: params.asset_id,
            action: params.action,
            user_id: params.user_id,
            timestamp,
            references: params.references,
            signature,
            hash,
            data: params.data,
        })
    }

    pub fn recompute_hash(&self) -> String {
        compute_hash(
            &self.asset_id,
            self.action,
            &self.user_id,
            self.timestamp,
            &self.references,
            &self.signature,
            &self.data,
        )
    }

    pub fn hash_is_valid(&self) -> bool {
        self.hash == self.recompute_hash()
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.data.get("recipient_id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_asset_id() {
        let err = Event::new(NewEvent::new("", Action::Register, "alice")).unwrap_err();
        assert!(err.to_string().contains("Asset ID"));
    }

    #[test]
    fn rejects_empty_user_id() {
        let err = Event::new(NewEvent::new("asset-1", Action::Register, "")).unwrap_err();
        assert!(err.to_string().contains("User ID"));
    }

    #[test]
    fn fills_in_defaults() {
        let event = Event::new(NewEvent::new("asset-1", Action::Register, "alice")).unwrap();
        assert_eq!(event.signature.len(), 64);
        assert!(event.hash_is_valid());
        assert!(event.references.is_empty());
    }

    #[test]
    fn action_round_trips_through_str() {
        assert_eq!(Action::from_str("register").unwrap(), Action::Register);
        assert_eq!(Action::from_str("transfer").unwrap(), Action::Transfer);
        assert!(Action::from_str("stake").is_err());
    }

    #[test]
    fn recipient_id_reads_from_opaque_data() {
        let mut data = Map::new();
        data.insert("recipient_id".into(), Value::from("bob"));
        let event = Event::new(
            NewEvent::new("asset-1", Action::Transfer, "alice").with_data(data),
        )
        .unwrap();
        assert_eq!(event.recipient_id(), Some("bob"));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Action;

/// One linearized step in an asset's ownership history: either the register
/// that created it, or a transfer that moved it to a new owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub timestamp: f64,
    #[serde(rename = "node_id")]
    pub event_id: Uuid,
    pub action: Action,
}

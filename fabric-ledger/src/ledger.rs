use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use fabric_base::{err, Result};
use fabric_types::{Action, Event, HistoryEntry};
use uuid::Uuid;

/// One replica's append-only event DAG: the set of events it has accepted,
/// the tip set derived from them, and the path it persists to.
///
/// Nothing here is thread-safe on its own; callers that share a `Ledger`
/// across concurrent handlers are expected to hold it behind a single mutex
/// for the full validate-mutate-persist span of [`Ledger::add_event`], so
/// that invariants 1-6 hold under concurrent writers.
pub struct Ledger {
    pub(crate) events: HashMap<Uuid, Event>,
    pub(crate) tips: HashSet<Uuid>,
    pub(crate) storage_path: PathBuf,
}

impl Ledger {
    /// Load from `storage_path` if it exists, otherwise start empty.
    pub fn open(storage_path: impl Into<PathBuf>) -> Result<Self> {
        let storage_path = storage_path.into();
        if storage_path.exists() {
            let on_disk = Self::load_from_path(&storage_path)?;
            let events = on_disk
                .nodes
                .into_values()
                .map(|event| (event.event_id, event))
                .collect();
            let tips = on_disk.tips.into_iter().collect();
            tracing::info!(path = %storage_path.display(), "ledger loaded");
            Ok(Ledger {
                events,
                tips,
                storage_path,
            })
        } else {
            Ok(Ledger {
                events: HashMap::new(),
                tips: HashSet::new(),
                storage_path,
            })
        }
    }

    pub fn storage_path(&self) -> &std::path::Path {
        &self.storage_path
    }

    /// Validate, insert, update the tip set, then persist. Persistence
    /// failures are logged but do not roll back the in-memory mutation or
    /// fail the call: the event has already been durably accepted into the
    /// in-memory ledger, matching the reference implementation's behavior.
    pub fn add_event(&mut self, event: Event) -> Result<Uuid> {
        self.validate(&event)?;

        let id = event.event_id;
        for reference in &event.references {
            self.tips.remove(reference);
        }
        self.tips.insert(id);
        self.events.insert(id, event);

        self.save();

        Ok(id)
    }

    fn validate(&self, event: &Event) -> Result<()> {
        if self.events.contains_key(&event.event_id) {
            return Err(err(format!(
                "Node with ID {} already exists",
                event.event_id
            )));
        }

        for reference in &event.references {
            if !self.events.contains_key(reference) {
                return Err(err(format!("Referenced node {reference} does not exist")));
            }
        }

        if event.references.len() > 2 {
            return Err(err("A node cannot have more than 2 references"));
        }

        match event.action {
            Action::Register => {
                let already_registered = self
                    .events
                    .values()
                    .any(|e| e.asset_id == event.asset_id && e.action == Action::Register);
                if already_registered {
                    return Err(err(format!("Asset {} is already registered", event.asset_id)));
                }
            }
            Action::Transfer => {
                let history = self.get_asset_ownership_history(&event.asset_id);
                let current = history
                    .last()
                    .ok_or_else(|| err(format!("Asset {} is not registered", event.asset_id)))?;

                if current.user_id != event.user_id {
                    return Err(err(format!(
                        "Transfer requested by {}, but asset is owned by {}",
                        event.user_id, current.user_id
                    )));
                }

                let recipient = event
                    .recipient_id()
                    .ok_or_else(|| err("Transfer must include a recipient_id in the data"))?;

                if recipient == event.user_id {
                    return Err(err("Cannot transfer asset to yourself"));
                }
                if recipient.is_empty() {
                    return Err(err("Recipient ID cannot be empty"));
                }
            }
        }

        Ok(())
    }

    pub fn get_event(&self, id: Uuid) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn all_events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn node_count(&self) -> usize {
        self.events.len()
    }

    pub fn tip_count(&self) -> usize {
        self.tips.len()
    }

    pub fn get_asset_events(&self, asset_id: &str) -> Vec<&Event> {
        self.events
            .values()
            .filter(|e| e.asset_id == asset_id)
            .collect()
    }

    pub fn get_user_events(&self, user_id: &str) -> Vec<&Event> {
        self.events
            .values()
            .filter(|e| e.user_id == user_id)
            .collect()
    }

    /// Linearize one asset's events by timestamp. Ties (equal timestamps)
    /// are broken by ascending event_id, the implementation's chosen
    /// tie-breaker for an otherwise-unspecified ordering.
    pub fn get_asset_ownership_history(&self, asset_id: &str) -> Vec<HistoryEntry> {
        let mut events = self.get_asset_events(asset_id);
        events.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });

        events
            .into_iter()
            .filter_map(|event| match event.action {
                Action::Register => Some(HistoryEntry {
                    user_id: event.user_id.clone(),
                    timestamp: event.timestamp,
                    event_id: event.event_id,
                    action: Action::Register,
                }),
                Action::Transfer => event.recipient_id().map(|recipient| HistoryEntry {
                    user_id: recipient.to_string(),
                    timestamp: event.timestamp,
                    event_id: event.event_id,
                    action: Action::Transfer,
                }),
            })
            .collect()
    }

    pub fn get_user_assets(&self, user_id: &str) -> Vec<String> {
        let mut asset_ids: HashSet<&str> = HashSet::new();
        for event in self.events.values() {
            asset_ids.insert(event.asset_id.as_str());
        }

        asset_ids
            .into_iter()
            .filter(|asset_id| {
                self.get_asset_ownership_history(asset_id)
                    .last()
                    .is_some_and(|entry| entry.user_id == user_id)
            })
            .map(String::from)
            .collect()
    }

    /// A uniformly random 2-sample of the current tips without replacement,
    /// or the whole tip set (possibly empty) if fewer than two exist.
    pub fn choose_references(&self) -> Vec<Uuid> {
        use rand::seq::SliceRandom;

        let tips: Vec<Uuid> = self.tips.iter().copied().collect();
        if tips.len() >= 2 {
            let mut rng = rand::thread_rng();
            tips.choose_multiple(&mut rng, 2).copied().collect()
        } else {
            tips
        }
    }

    /// Reference closure, hash closure, ownership chain, then tip
    /// reconciliation (the only self-healing step: a tip mismatch is
    /// repaired and persisted before returning).
    pub fn verify_integrity(&mut self) -> (bool, String) {
        for event in self.events.values() {
            for reference in &event.references {
                if !self.events.contains_key(reference) {
                    return (
                        false,
                        format!(
                            "Node {} references non-existent node {reference}",
                            event.event_id
                        ),
                    );
                }
            }
        }

        for event in self.events.values() {
            if !event.hash_is_valid() {
                return (false, format!("Hash mismatch for node {}", event.event_id));
            }
        }

        let asset_ids: HashSet<String> = self
            .events
            .values()
            .map(|e| e.asset_id.clone())
            .collect();
        for asset_id in &asset_ids {
            let history = self.get_asset_ownership_history(asset_id);
            for window in history.windows(2) {
                let (prev, curr) = (&window[0], &window[1]);
                if curr.action == Action::Transfer {
                    match self.events.get(&curr.event_id) {
                        None => {
                            return (false, format!("Missing transfer node {}", curr.event_id))
                        }
                        Some(transfer_event) => {
                            if transfer_event.user_id != prev.user_id {
                                return (
                                    false,
                                    format!(
                                        "Transfer node {} has invalid initiator",
                                        curr.event_id
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }

        let mut referenced: HashSet<Uuid> = HashSet::new();
        for event in self.events.values() {
            referenced.extend(event.references.iter().copied());
        }
        let computed_tips: HashSet<Uuid> = self
            .events
            .keys()
            .copied()
            .filter(|id| !referenced.contains(id))
            .collect();

        if computed_tips != self.tips {
            tracing::warn!(
                extra = self.tips.difference(&computed_tips).count(),
                missing = computed_tips.difference(&self.tips).count(),
                "tip inconsistency detected, auto-fixing"
            );
            self.tips = computed_tips;
            self.save();
        }

        (true, "ok".to_string())
    }
}

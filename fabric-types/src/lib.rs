mod event;
mod hash;
mod history;

pub use event::{now_secs, Action, Event, NewEvent};
pub use hash::{canonical_hash_input, compute_hash, generate_signature, sha256_hex};
pub use history::HistoryEntry;

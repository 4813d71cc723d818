mod http;
mod service;

pub use http::router;
pub use service::{ActionCounts, BlockchainStats, ReplicaService};

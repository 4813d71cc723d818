mod http;
mod orchestrator;

pub use http::router;
pub use orchestrator::{Orchestrator, QuorumResult, VerifyOwnershipSummary};

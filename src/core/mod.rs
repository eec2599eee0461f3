//! Core sampling functionality
//!
//! Topology discovery, the snapshot record, per-node sampling and the
//! session loop that ties them to a renderer.

pub mod constants;
pub mod sampler;
pub mod session;
pub mod snapshot;
pub mod topology;

// Re-export main types
pub use sampler::{Freshness, NodeContext};
pub use session::{Session, StopFlag, TickOutcome, Wake};
pub use snapshot::{NodeReading, TelemetrySnapshot};
pub use topology::SocTopology;

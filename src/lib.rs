//! tx2mon: sample ThunderX2 SoC telemetry and show it live or log it as CSV.
//!
//! The platform driver exports one fixed-layout binary record per node
//! under `/sys/bus/platform/devices/tx2mon`. A [`Session`] reads those
//! records at a fixed interval and hands the decoded values to one of two
//! renderers.

pub mod config;
pub mod core;
pub mod error;
pub mod render;
pub mod terminal;

// Re-export the types needed by the binary and integration tests
pub use config::{DevicePaths, SessionConfig};
pub use crate::core::{NodeContext, NodeReading, Session, SocTopology, StopFlag, TelemetrySnapshot};
pub use error::{Result, Tx2monError};
pub use render::{CsvRenderer, InteractiveRenderer, Render, RenderMode};

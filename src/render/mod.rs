//! Output strategies for decoded telemetry
//!
//! A session renders through exactly one [`Render`] implementation: the
//! live terminal panel or the CSV log. Both read the same
//! [`NodeReading`](crate::core::snapshot::NodeReading), so the numbers they
//! print for one snapshot are identical.

pub mod csv;
pub mod interactive;

pub use self::csv::CsvRenderer;
pub use self::interactive::InteractiveRenderer;

use crate::core::sampler::NodeContext;
use crate::error::Result;

/// Which renderer a session uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// Live panel on the terminal.
    Interactive,
    /// Append one CSV row per tick to the given file.
    Batch(std::path::PathBuf),
}

/// A sink for rendered ticks.
pub trait Render {
    /// Called once per rendered tick before any node is written.
    fn begin_tick(&mut self) -> Result<()>;

    /// Append the panel or row segment for one node.
    fn render(&mut self, node: &NodeContext, first_of_pair: bool) -> Result<()>;

    /// Called once per rendered tick after the last node.
    fn end_tick(&mut self) -> Result<()>;

    /// Called instead of a render when some node was stale.
    fn stale_tick(&mut self) -> Result<()> {
        Ok(())
    }

    /// Flush the sink and release whatever it holds (file, raw mode).
    fn finish(&mut self) -> Result<()>;
}

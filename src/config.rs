//! Session configuration
//!
//! Values come from the command line; the builder validates them once so
//! the session itself can assume a sane interval and grid width.

use crate::core::constants::{self, interval, CORES_PER_ROW, DEVICE_ROOT, SOCINFO_FILE};
use crate::error::{Result, Tx2monError};
use crate::render::RenderMode;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Convert fractional seconds into an interval of whole seconds plus microseconds.
///
/// Rejects values outside `[0.0001, 9999]`, and NaN.
pub fn interval_from_secs(secs: f64) -> Result<Duration> {
    if !(interval::MIN_SECS..=interval::MAX_SECS).contains(&secs) {
        return Err(Tx2monError::InvalidInterval(secs));
    }
    let whole = secs.trunc();
    let micros = (1_000_000.0 * (secs - whole)) as u32;
    Ok(Duration::new(whole as u64, micros * 1_000))
}

/// Location of the files exported by the platform driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePaths {
    root: PathBuf,
}

impl DevicePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `"<nodes> <cores> <threads>"` status file.
    pub fn socinfo(&self) -> PathBuf {
        self.root.join(SOCINFO_FILE)
    }

    /// The raw snapshot file for `node`.
    pub fn node_raw(&self, node: usize) -> PathBuf {
        self.root.join(constants::node_raw_file(node))
    }
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self::new(DEVICE_ROOT)
    }
}

/// Everything a [`Session`](crate::core::session::Session) needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub interval: Duration,
    /// Show the mem/net and SOC clock domains.
    pub extra: bool,
    pub mode: RenderMode,
    pub cores_per_row: usize,
    pub device: DevicePaths,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: interval::DEFAULT,
            extra: false,
            mode: RenderMode::Interactive,
            cores_per_row: CORES_PER_ROW,
            device: DevicePaths::default(),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Check ranges that the builder cannot enforce by construction.
    pub fn validate(&self) -> Result<()> {
        let secs = self.interval.as_secs_f64();
        if !(interval::MIN_SECS..=interval::MAX_SECS).contains(&secs) {
            return Err(Tx2monError::InvalidInterval(secs));
        }
        if self.cores_per_row == 0 {
            return Err(Tx2monError::InvalidConfiguration(
                "cores per row must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_interactive(&self) -> bool {
        self.mode == RenderMode::Interactive
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    interval_secs: Option<f64>,
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sampling interval in (fractional) seconds.
    pub fn interval_secs(mut self, secs: f64) -> Self {
        self.interval_secs = Some(secs);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval_secs = None;
        self.config.interval = interval;
        self
    }

    pub fn extra(mut self, extra: bool) -> Self {
        self.config.extra = extra;
        self
    }

    /// Log to `path` as CSV instead of drawing the live panel.
    pub fn csv_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.mode = RenderMode::Batch(path.into());
        self
    }

    pub fn cores_per_row(mut self, n: usize) -> Self {
        self.config.cores_per_row = n;
        self
    }

    pub fn device_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.device = DevicePaths::new(root);
        self
    }

    pub fn build(mut self) -> Result<SessionConfig> {
        if let Some(secs) = self.interval_secs {
            self.config.interval = interval_from_secs(secs)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

//! Fixed values shared by the sampler, renderers and CLI.

use std::time::Duration;

/// Platform device directory exposed by the tx2mon kernel module.
pub const DEVICE_ROOT: &str = "/sys/bus/platform/devices/tx2mon";

/// Name of the `"<nodes> <cores> <threads>"` status file under [`DEVICE_ROOT`].
pub const SOCINFO_FILE: &str = "socinfo";

/// Upper bound on cores reported per node.
pub const MAX_CPUS_PER_SOC: usize = 32;

/// Upper bound on nodes (sockets) per system.
pub const MAX_NODES: usize = 2;

/// Default number of core cells per row in the interactive grid.
pub const CORES_PER_ROW: usize = 4;

/// Bit in `cmd_status` set once the firmware has finished an update cycle.
pub const STATUS_READY: u32 = 1 << 1;

/// Size in bytes of one operating-region record.
pub const SNAPSHOT_SIZE: usize = 428;

/// Sampling interval limits
pub mod interval {
    use super::Duration;

    /// Smallest accepted interval in seconds
    pub const MIN_SECS: f64 = 0.0001;
    /// Largest accepted interval in seconds
    pub const MAX_SECS: f64 = 9999.0;
    /// Interval used when none is given
    pub const DEFAULT: Duration = Duration::from_secs(1);
}

/// Granularity at which a tick wait re-checks the stop flag.
pub const POLL_SLICE: Duration = Duration::from_millis(50);

/// File name of the raw snapshot source for `node`.
pub fn node_raw_file(node: usize) -> String {
    format!("node{node}_raw")
}

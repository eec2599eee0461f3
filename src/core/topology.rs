//! SoC topology discovery from the module's `socinfo` status file.

use crate::core::constants::{MAX_CPUS_PER_SOC, MAX_NODES};
use crate::error::{Result, Tx2monError};
use log::info;
use std::path::Path;

/// Node, core and thread counts reported by the platform driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocTopology {
    pub nodes: usize,
    pub cores_per_node: usize,
    pub threads_per_core: usize,
}

impl SocTopology {
    /// Resolve, open and parse the status file at `path`.
    pub fn from_status_file(path: &Path) -> Result<Self> {
        let config_err = |reason: String| Tx2monError::Config {
            path: path.to_path_buf(),
            reason,
        };

        let resolved = std::fs::canonicalize(path).map_err(|e| config_err(e.to_string()))?;
        let text = std::fs::read_to_string(&resolved).map_err(|e| config_err(e.to_string()))?;
        let topology = Self::parse(&text).map_err(config_err)?;

        info!(
            "Read nodes = {} cores = {} threads = {} from {}",
            topology.nodes,
            topology.cores_per_node,
            topology.threads_per_core,
            resolved.display()
        );
        Ok(topology)
    }

    /// Parse `"<nodes> <cores> <threads>"`; trailing content is ignored.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let values = text
            .split_whitespace()
            .take(3)
            .map(|field| {
                field
                    .parse::<usize>()
                    .map_err(|_| format!("invalid integer {field:?}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let [nodes, cores_per_node, threads_per_core] = values[..] else {
            return Err(format!("expected 3 integers, found {}", values.len()));
        };

        if nodes == 0 || nodes > MAX_NODES {
            return Err(format!("node count {nodes} outside 1..={MAX_NODES}"));
        }
        if cores_per_node == 0 || cores_per_node > MAX_CPUS_PER_SOC {
            return Err(format!(
                "core count {cores_per_node} outside 1..={MAX_CPUS_PER_SOC}"
            ));
        }
        if threads_per_core == 0 {
            return Err("thread count must be at least 1".to_string());
        }

        Ok(Self {
            nodes,
            cores_per_node,
            threads_per_core,
        })
    }
}

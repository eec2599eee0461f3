//! Per-node snapshot sampling

use crate::core::constants::SNAPSHOT_SIZE;
use crate::core::snapshot::{NodeReading, TelemetrySnapshot};
use crate::error::{Result, Tx2monError};
use log::debug;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Whether the last full read carried a completed firmware update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Ready bit clear; the writer has not finished a cycle yet.
    Stale,
}

/// One node's snapshot source and its most recent record.
pub struct NodeContext {
    node: usize,
    cores: usize,
    source: File,
    snapshot: TelemetrySnapshot,
}

impl NodeContext {
    /// Open the snapshot source for `node`.
    pub fn open(node: usize, cores: usize, path: &Path) -> Result<Self> {
        let source = File::open(path).map_err(|source| Tx2monError::SourceOpen {
            node,
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened node{} source {}", node, path.display());

        Ok(Self {
            node,
            cores,
            source,
            snapshot: TelemetrySnapshot::default(),
        })
    }

    /// Read one complete record from offset 0 and replace the held snapshot.
    ///
    /// The record is fetched with a single `read` call so that fields from
    /// different update cycles are never combined. A short read is reported
    /// as [`Tx2monError::TruncatedRead`] and is not retried.
    pub fn sample(&mut self) -> Result<Freshness> {
        let mut buf = [0u8; SNAPSHOT_SIZE];

        self.source.seek(SeekFrom::Start(0))?;
        let read = self.source.read(&mut buf)?;
        if read < SNAPSHOT_SIZE {
            return Err(Tx2monError::TruncatedRead {
                node: self.node,
                read,
                expected: SNAPSHOT_SIZE,
            });
        }

        self.snapshot = TelemetrySnapshot::parse(&buf)?;
        if self.snapshot.is_ready() {
            Ok(Freshness::Fresh)
        } else {
            Ok(Freshness::Stale)
        }
    }

    /// Decoded view of the held snapshot.
    pub fn reading(&self) -> NodeReading {
        self.snapshot.decode(self.node, self.cores)
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn cores(&self) -> usize {
        self.cores
    }
}

//! Error types for tx2mon operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Tx2monError`].
pub type Result<T> = std::result::Result<T, Tx2monError>;

/// Errors that can occur while sampling or rendering telemetry.
#[derive(Error, Debug)]
pub enum Tx2monError {
    /// The status source is missing, unreadable or malformed.
    #[error("cannot read SoC topology from {}: {reason} (is the tx2mon module loaded?)", path.display())]
    Config { path: PathBuf, reason: String },

    /// A per-node snapshot source could not be opened.
    #[error("cannot open node{node} telemetry source {}: {source}", path.display())]
    SourceOpen {
        node: usize,
        path: PathBuf,
        source: io::Error,
    },

    /// The CSV output file could not be created.
    #[error("cannot open csv file {}: {source}", path.display())]
    OutputOpen { path: PathBuf, source: io::Error },

    /// A snapshot read returned fewer bytes than the fixed record size.
    #[error("short read from node{node}: got {read} of {expected} bytes")]
    TruncatedRead {
        node: usize,
        read: usize,
        expected: usize,
    },

    /// Raw terminal mode could not be acquired or released.
    #[error("setting up terminal failed: {0}")]
    Terminal(#[source] io::Error),

    /// Sampling interval outside the accepted range.
    #[error("bad delay {0} - allowed range [0.0001..9999]")]
    InvalidInterval(f64),

    /// Any other rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The stop-signal handler could not be installed.
    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// I/O error while reading a source or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Tx2monError {
    /// True when a snapshot read came back shorter than the record size.
    pub fn is_truncated_read(&self) -> bool {
        matches!(self, Tx2monError::TruncatedRead { .. })
    }
}

//! CSV log output
//!
//! The header is written once when the renderer is created. Each rendered
//! tick then appends one row: one segment per node, joined by a single
//! comma, terminated by one newline. Column sets are derived from the same
//! inputs on both sides so header and rows always have the same width.

use crate::core::sampler::NodeContext;
use crate::core::snapshot::NodeReading;
use crate::core::topology::SocTopology;
use crate::error::{Result, Tx2monError};
use crate::render::Render;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const RAILS: [&str; 4] = ["core", "sram", "mem", "soc"];

/// Column names for node `node` with `cores` cores.
pub fn header_columns(node: usize, cores: usize, extra: bool) -> Vec<String> {
    let n = node;
    let mut cols = Vec::with_capacity(cores * 2 + 12);
    for c in 0..cores {
        cols.push(format!("cpu_temp{n}c{c}"));
        cols.push(format!("cpu_freq{n}c{c}"));
    }
    cols.push(format!("tmon_soc_avg{n}"));
    if extra {
        cols.push(format!("freq_mem_net{n}"));
        cols.push(format!("freq_socs{n}"));
        cols.push(format!("freq_socn{n}"));
    }
    cols.extend(RAILS.iter().map(|rail| format!("v_{rail}{n}")));
    cols.extend(RAILS.iter().map(|rail| format!("pwr_{rail}{n}")));
    cols
}

/// Values for one node, in [`header_columns`] order.
pub fn row_values(r: &NodeReading, extra: bool) -> Vec<String> {
    let mut vals = Vec::with_capacity(r.cores.len() * 2 + 12);
    for core in &r.cores {
        vals.push(format!("{:.2}", core.temp_c));
        vals.push(core.freq_mhz.to_string());
    }
    vals.push(format!("{:.2}", r.soc_temp_c));
    if extra {
        vals.push(r.freq_mem_net.to_string());
        vals.push(r.freq_socs.to_string());
        vals.push(r.freq_socn.to_string());
    }
    vals.extend(r.volts.as_array().iter().map(|v| format!("{v:.2}")));
    vals.extend(r.watts.as_array().iter().map(|w| format!("{w:.2}")));
    vals
}

/// Appends one row per rendered tick to a CSV sink.
pub struct CsvRenderer<W: Write> {
    out: W,
    extra: bool,
    rows: u64,
}

impl CsvRenderer<BufWriter<File>> {
    /// Create (truncating) `path` and write the header for `topology`.
    pub fn create(path: &Path, topology: &SocTopology, extra: bool) -> Result<Self> {
        let file = File::create(path).map_err(|source| Tx2monError::OutputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufWriter::new(file), topology, extra)
    }
}

impl<W: Write> CsvRenderer<W> {
    /// Wrap `out` and emit the header row.
    pub fn new(mut out: W, topology: &SocTopology, extra: bool) -> Result<Self> {
        let header = (0..topology.nodes)
            .map(|n| header_columns(n, topology.cores_per_node, extra).join(","))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{header}")?;
        out.flush()?;

        Ok(Self {
            out,
            extra,
            rows: 0,
        })
    }

    /// Append one node's row segment, preceded by the node separator unless first.
    pub fn write_reading(&mut self, r: &NodeReading, first_of_pair: bool) -> Result<()> {
        if !first_of_pair {
            self.out.write_all(b",")?;
        }
        self.out.write_all(row_values(r, self.extra).join(",").as_bytes())?;
        Ok(())
    }

    /// Completed data rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Render for CsvRenderer<W> {
    fn begin_tick(&mut self) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, node: &NodeContext, first_of_pair: bool) -> Result<()> {
        self.write_reading(&node.reading(), first_of_pair)
    }

    fn end_tick(&mut self) -> Result<()> {
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

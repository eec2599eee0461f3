//! Live terminal panel

use crate::core::sampler::NodeContext;
use crate::core::snapshot::NodeReading;
use crate::error::{Result, Tx2monError};
use crate::render::Render;
use crate::terminal::{TermSeq, TerminalGuard};
use std::io::{self, Stdout, Write};

const CELL_HEADING: &str = "|Core  Temp   Freq ";
const CELL_RULE: &str = "+------------------";
const PROMPT: &str = "['q' to quit, any other key for refresh.]";

/// Redraws one panel per node on every rendered tick.
pub struct InteractiveRenderer<W: Write> {
    out: W,
    seq: TermSeq,
    cores_per_row: usize,
    extra: bool,
    prompted: bool,
    guard: Option<TerminalGuard>,
}

impl InteractiveRenderer<Stdout> {
    /// Take over the terminal and render to stdout.
    pub fn stdout(cores_per_row: usize, extra: bool) -> Result<Self> {
        let (guard, seq) = TerminalGuard::acquire()?;
        Ok(Self::new(io::stdout(), seq, cores_per_row, extra).holding(guard))
    }
}

impl<W: Write> InteractiveRenderer<W> {
    pub fn new(out: W, seq: TermSeq, cores_per_row: usize, extra: bool) -> Self {
        Self {
            out,
            seq,
            cores_per_row: cores_per_row.max(1),
            extra,
            prompted: false,
            guard: None,
        }
    }

    /// Keep `guard` alive for as long as this renderer; released in `finish`.
    pub fn holding(mut self, guard: TerminalGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Write the panel for one decoded node.
    pub fn write_reading(&mut self, r: &NodeReading) -> io::Result<()> {
        let nl = self.seq.newline;
        let out = &mut self.out;

        write!(out, "Node: {}  Snapshot: {}{nl}", r.node, r.counter)?;
        write!(
            out,
            "Freq (Min/Max): {}/{} MHz     Temp Thresh (Soft/Hard/Max): {:6.2}/{:6.2}/{:6.2} C{nl}",
            r.freq_min, r.freq_max, r.temp_soft_c, r.temp_hard_c, r.temp_abs_max_c
        )?;
        write!(out, "{nl}")?;

        let width = r.cores.len().min(self.cores_per_row);
        if width > 0 {
            write!(out, "{}|{nl}", CELL_HEADING.repeat(width))?;
            write!(out, "{}+{nl}", CELL_RULE.repeat(width))?;
            for row in r.cores.chunks(self.cores_per_row) {
                for core in row {
                    write!(
                        out,
                        "|{:3}: {:6.2} {:5} ",
                        core.index, core.temp_c, core.freq_mhz
                    )?;
                }
                write!(out, "|{nl}")?;
            }
        }
        write!(out, "{nl}")?;

        let v = &r.volts;
        let w = &r.watts;
        write!(out, "SOC Center Temp: {:6.2} C{nl}", r.soc_temp_c)?;
        write!(
            out,
            "Voltage    Core: {:6.2} V, SRAM: {:5.2} V,  Mem: {:5.2} V, SOC: {:5.2} V{nl}",
            v.core, v.sram, v.mem, v.soc
        )?;
        write!(
            out,
            "Power      Core: {:6.2} W, SRAM: {:5.2} W,  Mem: {:5.2} W, SOC: {:5.2} W{nl}",
            w.core, w.sram, w.mem, w.soc
        )?;
        if self.extra {
            write!(
                out,
                "Frequency  Memnet: {:4} MHz, SOCS: {:4} MHz, SOCN: {:4} MHz{nl}",
                r.freq_mem_net, r.freq_socs, r.freq_socn
            )?;
        }
        write!(out, "{nl}")
    }

    fn write_prompt(&mut self) -> io::Result<()> {
        let nl = self.seq.newline;
        write!(self.out, "{nl}{PROMPT}{nl}")?;
        self.out.flush()?;
        self.prompted = true;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Render for InteractiveRenderer<W> {
    fn begin_tick(&mut self) -> Result<()> {
        self.out.write_all(self.seq.clear.as_bytes())?;
        self.prompted = false;
        Ok(())
    }

    fn render(&mut self, node: &NodeContext, _first_of_pair: bool) -> Result<()> {
        self.write_reading(&node.reading())?;
        Ok(())
    }

    fn end_tick(&mut self) -> Result<()> {
        self.write_prompt()?;
        Ok(())
    }

    // Keeps the quit hint visible while no snapshot is ready yet
    fn stale_tick(&mut self) -> Result<()> {
        if !self.prompted {
            self.write_prompt()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let flushed = self.out.flush().map_err(Tx2monError::from);
        let restored = match self.guard.as_mut() {
            Some(guard) => guard.restore(),
            None => Ok(()),
        };
        self.guard = None;
        flushed.and(restored)
    }
}

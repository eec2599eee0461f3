//! Operating-region record layout and decoding
//!
//! The firmware publishes one fixed-size, little-endian record per node.
//! Decoding happens in two steps: [`TelemetrySnapshot::parse`] copies the
//! raw fields out of the byte buffer, and [`TelemetrySnapshot::decode`]
//! converts them into engineering units. Both renderers consume the
//! decoded [`NodeReading`], so they cannot drift apart numerically.

use crate::core::constants::{MAX_CPUS_PER_SOC, SNAPSHOT_SIZE, STATUS_READY};
use crate::error::{Result, Tx2monError};

mod offset {
    pub const CMD_STATUS: usize = 0;
    pub const COUNTER: usize = 4;
    pub const TEMP_ABS_MAX: usize = 12;
    pub const TEMP_SOFT_THRESH: usize = 16;
    pub const TEMP_HARD_THRESH: usize = 20;
    pub const FREQ_CPU: usize = 32;
    pub const TMON_CPU: usize = 288;
    pub const TMON_SOC_AVG: usize = 352;
    pub const FREQ_MEM_NET: usize = 356;
    pub const FREQ_SOCS: usize = 360;
    pub const FREQ_SOCN: usize = 364;
    pub const FREQ_MAX: usize = 368;
    pub const FREQ_MIN: usize = 372;
    pub const PWR: usize = 376;
    pub const VOLT: usize = 392;
}

/// Convert a raw thermal-monitor reading to degrees Celsius.
pub fn to_celsius(raw: u32) -> f64 {
    (446.18 + 7.92) - f64::from(raw) * 0.5582
}

/// Convert millivolts to volts.
pub fn to_volts(mv: u32) -> f64 {
    f64::from(mv) / 1000.0
}

/// Convert milliwatts to watts.
pub fn to_watts(mw: u32) -> f64 {
    f64::from(mw) / 1000.0
}

/// Raw values for the four rails, in firmware order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRails {
    pub core: u32,
    pub sram: u32,
    pub mem: u32,
    pub soc: u32,
}

/// Native copy of one operating-region record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub cmd_status: u32,
    pub counter: u32,
    pub temp_abs_max: u32,
    pub temp_soft_thresh: u32,
    pub temp_hard_thresh: u32,
    pub freq_cpu: [u32; MAX_CPUS_PER_SOC],
    pub tmon_cpu: [u16; MAX_CPUS_PER_SOC],
    pub tmon_soc_avg: u32,
    pub freq_mem_net: u32,
    pub freq_socs: u32,
    pub freq_socn: u32,
    pub freq_max: u32,
    pub freq_min: u32,
    /// Power rails in milliwatts
    pub pwr: RawRails,
    /// Voltage rails in millivolts
    pub volt: RawRails,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            cmd_status: 0,
            counter: 0,
            temp_abs_max: 0,
            temp_soft_thresh: 0,
            temp_hard_thresh: 0,
            freq_cpu: [0; MAX_CPUS_PER_SOC],
            tmon_cpu: [0; MAX_CPUS_PER_SOC],
            tmon_soc_avg: 0,
            freq_mem_net: 0,
            freq_socs: 0,
            freq_socn: 0,
            freq_max: 0,
            freq_min: 0,
            pwr: RawRails::default(),
            volt: RawRails::default(),
        }
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_rails(buf: &[u8], at: usize) -> RawRails {
    RawRails {
        core: read_u32(buf, at),
        sram: read_u32(buf, at + 4),
        mem: read_u32(buf, at + 8),
        soc: read_u32(buf, at + 12),
    }
}

fn write_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_rails(buf: &mut [u8], at: usize, rails: &RawRails) {
    write_u32(buf, at, rails.core);
    write_u32(buf, at + 4, rails.sram);
    write_u32(buf, at + 8, rails.mem);
    write_u32(buf, at + 12, rails.soc);
}

impl TelemetrySnapshot {
    /// Parse a complete record. The buffer must be exactly [`SNAPSHOT_SIZE`] bytes.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != SNAPSHOT_SIZE {
            return Err(Tx2monError::InvalidConfiguration(format!(
                "snapshot buffer is {} bytes, expected {SNAPSHOT_SIZE}",
                buf.len()
            )));
        }

        let mut freq_cpu = [0u32; MAX_CPUS_PER_SOC];
        let mut tmon_cpu = [0u16; MAX_CPUS_PER_SOC];
        for c in 0..MAX_CPUS_PER_SOC {
            freq_cpu[c] = read_u32(buf, offset::FREQ_CPU + c * 4);
            tmon_cpu[c] = read_u16(buf, offset::TMON_CPU + c * 2);
        }

        Ok(Self {
            cmd_status: read_u32(buf, offset::CMD_STATUS),
            counter: read_u32(buf, offset::COUNTER),
            temp_abs_max: read_u32(buf, offset::TEMP_ABS_MAX),
            temp_soft_thresh: read_u32(buf, offset::TEMP_SOFT_THRESH),
            temp_hard_thresh: read_u32(buf, offset::TEMP_HARD_THRESH),
            freq_cpu,
            tmon_cpu,
            tmon_soc_avg: read_u32(buf, offset::TMON_SOC_AVG),
            freq_mem_net: read_u32(buf, offset::FREQ_MEM_NET),
            freq_socs: read_u32(buf, offset::FREQ_SOCS),
            freq_socn: read_u32(buf, offset::FREQ_SOCN),
            freq_max: read_u32(buf, offset::FREQ_MAX),
            freq_min: read_u32(buf, offset::FREQ_MIN),
            pwr: read_rails(buf, offset::PWR),
            volt: read_rails(buf, offset::VOLT),
        })
    }

    /// Serialize back into the firmware layout. Reserved words are zero.
    ///
    /// Used to build fixture files; the monitor itself only reads.
    pub fn to_bytes(&self) -> [u8; SNAPSHOT_SIZE] {
        let mut buf = [0u8; SNAPSHOT_SIZE];
        write_u32(&mut buf, offset::CMD_STATUS, self.cmd_status);
        write_u32(&mut buf, offset::COUNTER, self.counter);
        write_u32(&mut buf, offset::TEMP_ABS_MAX, self.temp_abs_max);
        write_u32(&mut buf, offset::TEMP_SOFT_THRESH, self.temp_soft_thresh);
        write_u32(&mut buf, offset::TEMP_HARD_THRESH, self.temp_hard_thresh);
        for c in 0..MAX_CPUS_PER_SOC {
            write_u32(&mut buf, offset::FREQ_CPU + c * 4, self.freq_cpu[c]);
            let at = offset::TMON_CPU + c * 2;
            buf[at..at + 2].copy_from_slice(&self.tmon_cpu[c].to_le_bytes());
        }
        write_u32(&mut buf, offset::TMON_SOC_AVG, self.tmon_soc_avg);
        write_u32(&mut buf, offset::FREQ_MEM_NET, self.freq_mem_net);
        write_u32(&mut buf, offset::FREQ_SOCS, self.freq_socs);
        write_u32(&mut buf, offset::FREQ_SOCN, self.freq_socn);
        write_u32(&mut buf, offset::FREQ_MAX, self.freq_max);
        write_u32(&mut buf, offset::FREQ_MIN, self.freq_min);
        write_rails(&mut buf, offset::PWR, &self.pwr);
        write_rails(&mut buf, offset::VOLT, &self.volt);
        buf
    }

    /// Whether the firmware finished populating this record.
    pub fn is_ready(&self) -> bool {
        self.cmd_status & STATUS_READY != 0
    }

    /// Decode the first `cores` cores plus the node-wide fields.
    pub fn decode(&self, node: usize, cores: usize) -> NodeReading {
        let cores = cores.min(MAX_CPUS_PER_SOC);
        NodeReading {
            node,
            counter: self.counter,
            freq_min: self.freq_min,
            freq_max: self.freq_max,
            temp_soft_c: to_celsius(self.temp_soft_thresh),
            temp_hard_c: to_celsius(self.temp_hard_thresh),
            temp_abs_max_c: to_celsius(self.temp_abs_max),
            cores: (0..cores)
                .map(|c| CoreReading {
                    index: c,
                    temp_c: to_celsius(u32::from(self.tmon_cpu[c])),
                    freq_mhz: self.freq_cpu[c],
                })
                .collect(),
            soc_temp_c: to_celsius(self.tmon_soc_avg),
            freq_mem_net: self.freq_mem_net,
            freq_socs: self.freq_socs,
            freq_socn: self.freq_socn,
            volts: Rails::from_raw(&self.volt, to_volts),
            watts: Rails::from_raw(&self.pwr, to_watts),
        }
    }
}

/// One decoded core cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreReading {
    pub index: usize,
    pub temp_c: f64,
    pub freq_mhz: u32,
}

/// Decoded rail values (volts or watts).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rails {
    pub core: f64,
    pub sram: f64,
    pub mem: f64,
    pub soc: f64,
}

impl Rails {
    fn from_raw(raw: &RawRails, convert: fn(u32) -> f64) -> Self {
        Self {
            core: convert(raw.core),
            sram: convert(raw.sram),
            mem: convert(raw.mem),
            soc: convert(raw.soc),
        }
    }

    /// Values in core, SRAM, mem, SOC order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.core, self.sram, self.mem, self.soc]
    }
}

/// Decoded view of one node's snapshot, shared by every renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReading {
    pub node: usize,
    pub counter: u32,
    pub freq_min: u32,
    pub freq_max: u32,
    pub temp_soft_c: f64,
    pub temp_hard_c: f64,
    pub temp_abs_max_c: f64,
    pub cores: Vec<CoreReading>,
    pub soc_temp_c: f64,
    pub freq_mem_net: u32,
    pub freq_socs: u32,
    pub freq_socn: u32,
    pub volts: Rails,
    pub watts: Rails,
}

//! Sampling session and main loop
//!
//! A [`Session`] owns everything a run needs: the topology, one
//! [`NodeContext`] per node, the renderer and the key source. The loop has
//! a single suspension point, [`Session::wait_for_tick`]; the stop flag is
//! only consulted there, so a stop request never interrupts a tick that is
//! already reading or rendering.

use crate::config::SessionConfig;
use crate::core::constants::POLL_SLICE;
use crate::core::sampler::{Freshness, NodeContext};
use crate::core::topology::SocTopology;
use crate::error::Result;
use crate::render::{CsvRenderer, InteractiveRenderer, Render, RenderMode};
use crate::terminal::{self, KeySource, NoKeys};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Asynchronous stop request shared with signal handlers.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route SIGINT, SIGTERM and SIGHUP to this flag.
    ///
    /// Can only be installed once per process.
    pub fn install_signal_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.request())?;
        Ok(())
    }
}

/// What a single pass through ReadingNodes produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every node was fresh and was rendered.
    Rendered,
    /// At least one node was stale; nothing was rendered.
    Stale,
}

/// Why a tick wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Interval elapsed, or a non-quit key asked for a refresh.
    Sample,
    /// The stop flag is set.
    Stop,
}

/// One monitoring run.
pub struct Session {
    topology: SocTopology,
    nodes: Vec<NodeContext>,
    renderer: Box<dyn Render>,
    keys: Box<dyn KeySource>,
    interval: Duration,
    samples: u64,
    stop: StopFlag,
    closed: bool,
}

impl Session {
    /// Resolve topology, open every node source and prepare the output sink.
    pub fn open(config: &SessionConfig, stop: StopFlag) -> Result<Self> {
        config.validate()?;

        let topology = SocTopology::from_status_file(&config.device.socinfo())?;
        let nodes = (0..topology.nodes)
            .map(|n| NodeContext::open(n, topology.cores_per_node, &config.device.node_raw(n)))
            .collect::<Result<Vec<_>>>()?;

        let (renderer, keys): (Box<dyn Render>, Box<dyn KeySource>) = match &config.mode {
            RenderMode::Interactive => (
                Box::new(InteractiveRenderer::stdout(config.cores_per_row, config.extra)?),
                terminal::interactive_keys(),
            ),
            RenderMode::Batch(path) => (
                Box::new(CsvRenderer::create(path, &topology, config.extra)?),
                Box::new(NoKeys),
            ),
        };

        Ok(Self::from_parts(
            topology,
            nodes,
            renderer,
            keys,
            config.interval,
            stop,
        ))
    }

    /// Assemble a session from already-prepared parts.
    pub fn from_parts(
        topology: SocTopology,
        nodes: Vec<NodeContext>,
        renderer: Box<dyn Render>,
        keys: Box<dyn KeySource>,
        interval: Duration,
        stop: StopFlag,
    ) -> Self {
        Self {
            topology,
            nodes,
            renderer,
            keys,
            interval,
            samples: 0,
            stop,
            closed: false,
        }
    }

    /// Block until the interval elapses, a key arrives or a stop is requested.
    ///
    /// Waits in slices of at most [`POLL_SLICE`] so that a signal arriving
    /// during a long interval is noticed promptly.
    pub fn wait_for_tick(&mut self) -> Result<Wake> {
        let deadline = Instant::now() + self.interval;
        loop {
            if self.stop.is_requested() {
                return Ok(Wake::Stop);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Wake::Sample);
            }

            if let Some(key) = self.keys.poll_key(remaining.min(POLL_SLICE))? {
                if key.stops() {
                    self.stop.request();
                    return Ok(Wake::Stop);
                }
                return Ok(Wake::Sample);
            }
        }
    }

    /// Sample every node in order and render if all of them are fresh.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let mut all_fresh = true;
        for node in &mut self.nodes {
            if node.sample()? == Freshness::Stale {
                all_fresh = false;
            }
        }
        if !all_fresh {
            debug!("Skipping render: stale snapshot");
            self.renderer.stale_tick()?;
            return Ok(TickOutcome::Stale);
        }

        self.samples += 1;
        self.renderer.begin_tick()?;
        for (i, node) in self.nodes.iter().enumerate() {
            self.renderer.render(node, i == 0)?;
        }
        self.renderer.end_tick()?;
        Ok(TickOutcome::Rendered)
    }

    /// Run until stopped. Returns the number of rendered samples.
    ///
    /// Does not release resources; call [`Session::close`] afterwards on
    /// every path, including when this returns an error.
    pub fn run(&mut self) -> Result<u64> {
        info!(
            "Sampling {} node(s) every {:?}",
            self.topology.nodes, self.interval
        );
        while self.wait_for_tick()? == Wake::Sample {
            self.tick()?;
        }
        info!("Stopped after {} samples", self.samples);
        Ok(self.samples)
    }

    /// Flush and close the output sink, restore the terminal and drop the
    /// node handles. Only the first call does any work.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let finished = self.renderer.finish();
        self.nodes.clear();
        finished
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn topology(&self) -> &SocTopology {
        &self.topology
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Session cleanup failed: {err}");
        }
    }
}

//! Playback service core logic.
//!
//! Initialises one Linsn output and drives it at a fixed tick rate
//! with a test pattern. The driver is synchronous, so the tick loop
//! runs on a blocking thread and the async side only waits for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use linsn_core::{FrameLog, LinsnError, LinsnOutput, MemoryRegistry, MemoryTransport, Transport};

use crate::config::DaemonConfig;
use crate::pattern::PatternGenerator;

/// Boxed transport so dry runs and real sockets share one output type.
pub type DynTransport = Box<dyn Transport + Send>;

pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Counters reported when playback stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub ticks: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub frames_recorded: u64,
}

// ── PlaybackService ──────────────────────────────────────────────

/// The top-level playback daemon.
pub struct PlaybackService {
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    dry_run: bool,
    max_ticks: Option<u64>,
}

impl PlaybackService {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            dry_run: false,
            max_ticks: None,
        }
    }

    /// Record frames in memory instead of opening a raw socket.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Stop after `ticks` ticks.
    pub fn max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until stopped or the tick limit is reached.
    ///
    /// 1. Binds the transport and initialises the output (discovery
    ///    included).
    /// 2. Registers the preview model when enabled.
    /// 3. Renders and sends one frame per tick.
    /// 4. Closes the output when `running` becomes `false`.
    pub async fn run(&self) -> Result<PlaybackStats, ServiceError> {
        self.running.store(true, Ordering::SeqCst);

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let dry_run = self.dry_run;
        let max_ticks = self.max_ticks;

        let stats = tokio::task::spawn_blocking(move || {
            playback(&config, &running, dry_run, max_ticks)
        })
        .await??;

        self.running.store(false, Ordering::SeqCst);
        info!(
            "playback stopped after {} ticks ({} delivered, {} dropped)",
            stats.ticks, stats.delivered, stats.dropped
        );
        Ok(stats)
    }
}

// ── Internal ─────────────────────────────────────────────────────

fn bind_transport(
    interface: &str,
    dry_run: bool,
) -> Result<(DynTransport, Option<FrameLog>), LinsnError> {
    if dry_run {
        info!("dry run: frames for {interface} are recorded, not sent");
        let memory = MemoryTransport::new();
        let log = memory.log();
        let transport: DynTransport = Box::new(memory);
        return Ok((transport, Some(log)));
    }
    let transport: DynTransport = Box::new(linsn_core::transport::bind(interface)?);
    Ok((transport, None))
}

fn playback(
    config: &DaemonConfig,
    running: &AtomicBool,
    dry_run: bool,
    max_ticks: Option<u64>,
) -> Result<PlaybackStats, ServiceError> {
    let start = config.playback.start_channel;
    let mut log = None;
    let mut output = LinsnOutput::init(start, &config.output, |interface| {
        let (transport, frames) = bind_transport(interface, dry_run)?;
        log = frames;
        Ok(transport)
    })?;
    output.dump_config();

    if config.preview.auto_model {
        let mut registry = MemoryRegistry::new();
        match output.register_preview(&mut registry) {
            Ok(name) => info!("preview model {name:?} covers {:?}", output.required_channel_ranges()),
            Err(e) => warn!("preview registration failed: {e}"),
        }
    }

    let count = output.channel_count();
    let mut channels = vec![0u8; config.buffer_len(count)];
    let mut generator = PatternGenerator::new(
        config.playback.pattern,
        output.plan().matrix(),
        config.hold_ticks(),
    );
    info!(
        "playing {} pattern at {} fps into channels {}..{}",
        generator.pattern(),
        config.fps(),
        start,
        start + count
    );

    let interval = Duration::from_secs_f64(1.0 / f64::from(config.fps()));
    let mut stats = PlaybackStats::default();
    let mut next = Instant::now();

    while running.load(Ordering::SeqCst) && max_ticks.is_none_or(|n| stats.ticks < n) {
        generator.render(&mut channels[start..start + count]);

        match output.send_data(&mut channels) {
            Ok(0) => stats.dropped += 1,
            Ok(_) => stats.delivered += 1,
            Err(e) => {
                error!("tick {} failed: {e}", stats.ticks);
                output.close();
                return Err(e.into());
            }
        }
        stats.ticks += 1;

        if let Some(log) = &log {
            stats.frames_recorded += log.drain().len() as u64;
        }

        next += interval;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else {
            next = now;
        }
    }

    output.close();
    Ok(stats)
}

// ── Tests ────────────────────────────────────────────────────────

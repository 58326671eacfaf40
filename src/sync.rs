//! Background loop that keeps the console fed with backend state.
//!
//! The floorplan is fetched first and retried until it arrives; only then does the loop start
//! polling snapshots on a fixed cadence. Every result, good or bad, is forwarded to the UI thread
//! as a [`SyncEvent`] in the order it was produced. The loop never gives up on its own: transport
//! failures are reported and retried on the next tick.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::FLOORPLAN_ENDPOINT;
use crate::backend::SNAPSHOT_ENDPOINT;
use crate::backend::SimulationBackend;
use crate::error::ConsoleError;
use crate::model::Decoded;
use crate::model::Snapshot;
use crate::model::World;

#[derive(Debug)]
pub enum SyncEvent {
    WorldLoaded(World),
    Snapshot(Decoded<Snapshot>),
    FetchFailed {
        endpoint: &'static str,
        error: ConsoleError,
        /// Consecutive failures, this one included.
        streak: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncControl {
    /// Fetch now instead of waiting for the next tick.
    RefreshNow,
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub poll_interval: Duration,
}

/// UI-side handle to a running sync loop. Dropping it stops the loop.
pub struct SyncHandle {
    control_tx: mpsc::Sender<SyncControl>,
    events_rx: mpsc::Receiver<SyncEvent>,
    open: Arc<AtomicBool>,
}

impl SyncHandle {
    pub fn refresh_now(&self) {
        let _ = self.control_tx.send(SyncControl::RefreshNow);
    }

    /// Ask the loop to exit. An in-flight request still runs to completion; its result is discarded.
    pub fn stop(&self) {
        self.open.store(false, Ordering::Relaxed);
        let _ = self.control_tx.send(SyncControl::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Everything produced since the last call, oldest first.
    pub fn drain_events(&self) -> Vec<SyncEvent> {
        self.events_rx.try_iter().collect()
    }

    /// Block for the next event. `Err(SyncStopped)` once the loop has exited and nothing is queued.
    pub fn next_event(&self, timeout: Duration) -> Result<Option<SyncEvent>, ConsoleError> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ConsoleError::SyncStopped),
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Launch ──────────────────────────────────────────────────────────────────

/// Start the sync loop on its own thread.
///
/// `repaint` is poked after every event so an idle UI wakes up to apply it.
pub fn launch_sync_loop<B>(backend: B, config: SyncConfig, repaint: Option<egui::Context>) -> SyncHandle
where
    B: SimulationBackend + 'static,
{
    let (control_tx, control_rx) = mpsc::channel();
    let (events_tx, events_rx) = mpsc::channel();
    let open = Arc::new(AtomicBool::new(true));

    let thread_open = Arc::clone(&open);
    let _join_handle = std::thread::spawn(move || {
        let outbox = Outbox { events_tx, repaint };
        sync_thread(backend, config, control_rx, outbox, thread_open);
    });

    SyncHandle { control_tx, events_rx, open }
}

// ─── Background Thread ──────────────────────────────────────────────────────

struct Outbox {
    events_tx: mpsc::Sender<SyncEvent>,
    repaint: Option<egui::Context>,
}

impl Outbox {
    /// Returns false once the UI side is gone.
    fn send(&self, event: SyncEvent) -> bool {
        if self.events_tx.send(event).is_err() {
            return false;
        }
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
        true
    }
}

enum Wake {
    Tick,
    Refresh,
    Stop,
}

fn wait_until(control_rx: &mpsc::Receiver<SyncControl>, deadline: Instant) -> Wake {
    let timeout = deadline.saturating_duration_since(Instant::now());
    match control_rx.recv_timeout(timeout) {
        Ok(SyncControl::RefreshNow) => Wake::Refresh,
        Ok(SyncControl::Stop) | Err(mpsc::RecvTimeoutError::Disconnected) => Wake::Stop,
        Err(mpsc::RecvTimeoutError::Timeout) => Wake::Tick,
    }
}

/// Tracks consecutive failures so a dead backend is reported once, not every tick.
#[derive(Default)]
struct FailureStreak {
    count: u32,
}

impl FailureStreak {
    fn fail(&mut self, endpoint: &'static str, error: &ConsoleError) -> u32 {
        self.count += 1;
        if self.count == 1 {
            warn!(endpoint, error = %error, "backend fetch failed, will keep retrying");
        } else {
            debug!(endpoint, error = %error, streak = self.count, "backend fetch still failing");
        }
        self.count
    }

    fn succeed(&mut self, endpoint: &'static str) {
        if self.count > 0 {
            info!(endpoint, failures = self.count, "backend reachable again");
        }
        self.count = 0;
    }
}

fn sync_thread<B: SimulationBackend>(
    backend: B,
    config: SyncConfig,
    control_rx: mpsc::Receiver<SyncControl>,
    outbox: Outbox,
    open: Arc<AtomicBool>,
) {
    debug!(interval_ms = config.poll_interval.as_millis() as u64, "starting sync thread");
    let mut failures = FailureStreak::default();

    // The floorplan defines the projection, so nothing else is fetched until it is in.
    loop {
        if !open.load(Ordering::Relaxed) {
            return;
        }
        let started = Instant::now();
        let delivered = match backend.fetch_world() {
            Ok(world) => {
                failures.succeed(FLOORPLAN_ENDPOINT);
                info!(width = world.width, height = world.height, obstacles = world.obstacles.len(), "floorplan loaded");
                if !outbox.send(SyncEvent::WorldLoaded(world)) {
                    return;
                }
                break;
            }
            Err(error) => {
                let streak = failures.fail(FLOORPLAN_ENDPOINT, &error);
                outbox.send(SyncEvent::FetchFailed { endpoint: FLOORPLAN_ENDPOINT, error, streak })
            }
        };
        if !delivered {
            return;
        }
        if let Wake::Stop = wait_until(&control_rx, started + config.poll_interval) {
            return;
        }
    }

    loop {
        if !open.load(Ordering::Relaxed) {
            break;
        }
        let started = Instant::now();
        let event = match backend.fetch_snapshot() {
            Ok(decoded) => {
                failures.succeed(SNAPSHOT_ENDPOINT);
                SyncEvent::Snapshot(decoded)
            }
            Err(error) => {
                let streak = failures.fail(SNAPSHOT_ENDPOINT, &error);
                SyncEvent::FetchFailed { endpoint: SNAPSHOT_ENDPOINT, error, streak }
            }
        };
        if !open.load(Ordering::Relaxed) || !outbox.send(event) {
            break;
        }
        match wait_until(&control_rx, started + config.poll_interval) {
            Wake::Tick | Wake::Refresh => {}
            Wake::Stop => break,
        }
    }
    debug!("sync thread exiting");
}

//! Capture session: explicit owner of the pipeline's shared state.
//!
//! [`CaptureSession`] ties the transport, the slot ring, the scheduler
//! thread and the shutdown flag into one object with clear creation and
//! teardown boundaries. The command channel lives here too, because a
//! command write must be sequenced against capture: control and bulk
//! traffic cannot overlap on this transport, so every command is a
//! blocking stop-the-world operation — stop the scheduler, drain its
//! descriptors, write the packet, reset the ring, restart with fresh
//! descriptors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::command::DeviceCommand;
use crate::error::CaptureError;
use crate::reader::{ByteStreamReader, ReaderConfig};
use crate::ring::{RingConfig, SlotRing};
use crate::sched::{SchedulerConfig, TransferScheduler};
use crate::transport::CaptureTransport;

// ── ShutdownFlag ─────────────────────────────────────────────────

/// Cooperative cancellation token shared across the pipeline.
///
/// Checked at loop boundaries by the scheduler's owner, per byte by the
/// decoder, and before every wait by the reader; setting it is
/// irreversible for the life of the session.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── SessionConfig ────────────────────────────────────────────────

/// All pipeline tuning in one place.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub ring: RingConfig,
    pub scheduler: SchedulerConfig,
    pub reader: ReaderConfig,
}

impl SessionConfig {
    /// Deadline for one command write on the bulk-OUT endpoint.
    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);
}

// ── CaptureSession ───────────────────────────────────────────────

/// Handle to a running scheduler thread.
struct SchedulerHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), CaptureError>>,
}

/// One capture device's acquisition pipeline, start to teardown.
pub struct CaptureSession<T: CaptureTransport> {
    transport: Arc<T>,
    ring: Arc<SlotRing>,
    shutdown: ShutdownFlag,
    config: SessionConfig,
    scheduler: Option<SchedulerHandle>,
}

impl<T: CaptureTransport> CaptureSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            ring: Arc::new(SlotRing::new(config.ring)),
            shutdown: ShutdownFlag::new(),
            config,
            scheduler: None,
        }
    }

    /// Shared slot ring.
    pub fn ring(&self) -> Arc<SlotRing> {
        Arc::clone(&self.ring)
    }

    /// Shared transport handle.
    pub fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// The session-wide cancellation token.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Whether a scheduler thread is currently alive.
    pub fn is_capturing(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Construct the single consumer of this session's ring.
    pub fn reader(&self) -> ByteStreamReader {
        ByteStreamReader::new(self.ring(), self.shutdown.clone(), self.config.reader)
    }

    /// Spawn the transfer scheduler. No-op if already running.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let mut scheduler = TransferScheduler::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.ring),
            self.config.scheduler,
        );
        let running = scheduler.stop_handle();
        let thread = std::thread::Builder::new()
            .name("usb-capture".into())
            .spawn(move || scheduler.run())
            .map_err(|e| CaptureError::Scheduler(e.to_string()))?;
        self.scheduler = Some(SchedulerHandle { running, thread });
        debug!("transfer scheduler started");
        Ok(())
    }

    /// Send a control packet to the device.
    ///
    /// Stops the scheduler and waits for every in-flight transfer to
    /// drain, writes the payload synchronously, then restarts capture
    /// from a clean, empty ring. Blocking and rare by design.
    pub fn send_command(&mut self, command: DeviceCommand) -> Result<(), CaptureError> {
        info!(?command, "sending device command");
        self.stop_scheduler()?;
        self.transport
            .write_command(&command.encode(), SessionConfig::COMMAND_TIMEOUT)?;
        self.ring.reset();
        self.start()
    }

    /// Tear the session down: request shutdown, unblock the reader,
    /// stop and join the scheduler.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        self.shutdown.set();
        self.ring.wake_all();
        self.stop_scheduler()
    }

    fn stop_scheduler(&mut self) -> Result<(), CaptureError> {
        let Some(handle) = self.scheduler.take() else {
            return Ok(());
        };
        handle.running.store(false, Ordering::SeqCst);
        match handle.thread.join() {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Scheduler(
                "scheduler thread panicked".to_string(),
            )),
        }
    }
}

impl<T: CaptureTransport> Drop for CaptureSession<T> {
    fn drop(&mut self) {
        // Idempotent; a session dropped without an explicit shutdown
        // still joins its scheduler thread.
        let _ = self.shutdown();
    }
}

// ── Tests ────────────────────────────────────────────────────────

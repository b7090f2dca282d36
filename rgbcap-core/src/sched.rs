//! Transfer scheduler: keeps bulk reads perpetually in flight.
//!
//! One descriptor per ring slot. On start all descriptors are
//! submitted; in steady state the scheduler waits (bounded) for the
//! round-robin next descriptor to complete, commits the data to the
//! slot ring, publishes the new write position, and resubmits into the
//! same slot.
//!
//! A timed-out or short completion publishes nothing and the descriptor
//! is retried in place — the slot index does not advance, so the ring
//! never exposes a slot that was not fully written. A transport error
//! that is not a timeout means the device is gone: the scheduler drains
//! the outstanding descriptors with a shorter timeout and returns the
//! error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::error::CaptureError;
use crate::ring::SlotRing;
use crate::stats::ThroughputMeter;
use crate::transport::CaptureTransport;

// ── SchedulerConfig ──────────────────────────────────────────────

/// Timeouts and reporting cadence for [`TransferScheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Steady-state completion wait per descriptor.
    pub completion_timeout: Duration,
    /// Per-descriptor wait while draining during stop.
    pub drain_timeout: Duration,
    /// Throughput report cadence.
    pub report_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            completion_timeout: Duration::from_millis(500),
            drain_timeout: Duration::from_millis(100),
            report_interval: Duration::from_secs(1),
        }
    }
}

// ── Descriptors ──────────────────────────────────────────────────

/// Lifecycle of one in-flight read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorState {
    /// Handed to the transport, completion pending.
    Submitted,
    /// Completion collected; safe to retire or resubmit.
    Completed,
}

/// One asynchronous read, bound to one ring slot.
struct TransferDescriptor {
    slot: usize,
    state: DescriptorState,
    scratch: Vec<u8>,
}

// ── TransferScheduler ────────────────────────────────────────────

/// Producer half of the capture pipeline.
///
/// # Lifetime
///
/// [`run`](Self::run) is intended to occupy a dedicated thread; it
/// loops until [`stop`](Self::stop) is called through a
/// [`stop_handle`](Self::stop_handle) or the transport fails fatally,
/// then drains every outstanding descriptor before returning so no
/// transfer handle outlives the scheduler.
pub struct TransferScheduler<T: CaptureTransport> {
    transport: Arc<T>,
    ring: Arc<SlotRing>,
    running: Arc<AtomicBool>,
    config: SchedulerConfig,
    meter: ThroughputMeter,
}

impl<T: CaptureTransport> TransferScheduler<T> {
    pub fn new(transport: Arc<T>, ring: Arc<SlotRing>, config: SchedulerConfig) -> Self {
        let meter = ThroughputMeter::with_interval(config.report_interval);
        Self {
            transport,
            ring,
            // Armed at construction; the only transition is true → false.
            running: Arc::new(AtomicBool::new(true)),
            config,
            meter,
        }
    }

    /// A cloneable handle that can stop the scheduler from another
    /// thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the run loop to cease resubmission and drain.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the run loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the transfer loop until stopped or the transport fails.
    pub fn run(&mut self) -> Result<(), CaptureError> {
        let slot_size = self.ring.slot_size();
        let mut descriptors: Vec<TransferDescriptor> = (0..self.ring.slot_count())
            .map(|slot| TransferDescriptor {
                slot,
                state: DescriptorState::Submitted,
                scratch: vec![0u8; slot_size],
            })
            .collect();
        let count = descriptors.len();
        debug!(count, slot_size, "transfers submitted");

        let mut index = 0;
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(());
            }

            let descriptor = &mut descriptors[index];
            match self
                .transport
                .read_bulk(&mut descriptor.scratch, self.config.completion_timeout)
            {
                Ok(n) if n == slot_size => {
                    descriptor.state = DescriptorState::Completed;
                    self.ring.commit_slot(descriptor.slot, &descriptor.scratch);
                    // Resubmit into the same slot and move on.
                    descriptor.state = DescriptorState::Submitted;
                    index = (index + 1) % count;
                }
                Ok(n) => {
                    // Short completion: publish nothing, retry in place
                    // so the ring never exposes a partial slot.
                    trace!(slot = descriptor.slot, transferred = n, "short completion");
                }
                Err(CaptureError::TransferTimeout) => {
                    trace!(slot = descriptor.slot, "completion wait timed out");
                }
                Err(e) => {
                    error!(slot = descriptor.slot, error = %e, "transport failed");
                    break Err(e);
                }
            }

            // The shared counter is drained once per reporting interval.
            if self.meter.interval_elapsed() {
                self.meter.record(self.ring.take_received());
                if let Some(report) = self.meter.tick() {
                    debug!(
                        mib_per_sec = report.mib_per_sec,
                        avg = report.average_mib_per_sec,
                        "receiving"
                    );
                }
            }
        };

        self.drain(&mut descriptors, index);
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Collect every outstanding descriptor with a short timeout.
    ///
    /// Drained data is discarded; the point is that no completion
    /// handle is left dangling when `run` returns.
    fn drain(&self, descriptors: &mut [TransferDescriptor], start: usize) {
        let len = descriptors.len();
        for offset in 0..len {
            let descriptor = &mut descriptors[(start + offset) % len];
            if descriptor.state == DescriptorState::Submitted {
                let _ = self
                    .transport
                    .read_bulk(&mut descriptor.scratch, self.config.drain_timeout);
                descriptor.state = DescriptorState::Completed;
            }
        }
        debug!("all in-flight transfers drained");
    }
}

// ── Tests ────────────────────────────────────────────────────────

//! Bounded slot ring between the transfer scheduler and the byte
//! stream reader.
//!
//! The ring is a fixed array of `slot_count` slots of `slot_size` bytes.
//! The scheduler is the only writer: it copies each completed bulk
//! transfer into its slot and publishes the slot's *start* offset as the
//! new write position, so a slot becomes readable one completion after
//! it was filled. The reader is the only consumer and owns its cursor;
//! it may never observe a byte the scheduler has not published.
//!
//! # Overwrite policy
//!
//! There is no back-pressure. If the reader falls behind by a full ring,
//! the scheduler wraps and overwrites unread data. This is deliberate
//! "always show latest" behavior for live video: the sync decoder
//! recovers from the resulting discontinuity exactly as it recovers from
//! signal loss. Lapping can tear at most the chunk currently being
//! copied out; torn bytes fail the active-video check and drop a frame,
//! never corrupt memory.
//!
//! # Epochs
//!
//! [`reset`](SlotRing::reset) bumps a generation counter. A reader whose
//! epoch is stale snaps its cursor back to zero on its next wait, which
//! is how a Command Channel restart guarantees no pre-pause data
//! survives in the pipeline.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Geometry of the slot ring.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Number of slots (one per in-flight transfer descriptor).
    pub slot_count: usize,
    /// Slot size in bytes (one bulk transfer's worth).
    pub slot_size: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        // 8 transfers of 64 KiB, matching the device's quad-buffered
        // 512-byte endpoint running flat out.
        Self {
            slot_count: 8,
            slot_size: 64 * 1024,
        }
    }
}

/// Outcome of a reader-side wait on the ring.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FillResult {
    /// `n` bytes were copied out and the cursor advanced.
    Filled(usize),
    /// No new data was published within the wait.
    TimedOut,
}

struct RingInner {
    buf: Box<[u8]>,
    /// Start offset of the last-completed slot. Readable region is
    /// `[cursor, write_pos)` modulo capacity.
    write_pos: usize,
    /// Bytes received since the last [`SlotRing::take_received`] drain.
    received: u64,
    /// Generation counter, bumped by [`SlotRing::reset`].
    epoch: u64,
}

/// Shared slot ring. One writer (the scheduler), one reader.
pub struct SlotRing {
    slot_count: usize,
    slot_size: usize,
    inner: Mutex<RingInner>,
    data_ready: Condvar,
}

impl SlotRing {
    pub fn new(config: RingConfig) -> Self {
        assert!(config.slot_count > 1, "ring needs at least two slots");
        assert!(config.slot_size > 0, "slots must be non-empty");
        let capacity = config.slot_count * config.slot_size;
        Self {
            slot_count: config.slot_count,
            slot_size: config.slot_size,
            inner: Mutex::new(RingInner {
                buf: vec![0u8; capacity].into_boxed_slice(),
                write_pos: 0,
                received: 0,
                epoch: 0,
            }),
            data_ready: Condvar::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Total capacity in bytes; all cursor arithmetic is modulo this.
    pub fn capacity(&self) -> usize {
        self.slot_count * self.slot_size
    }

    // ── Writer side ──────────────────────────────────────────────

    /// Copy a completed transfer into slot `index`, account for it, and
    /// publish the slot's start offset as the new write position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or `data` exceeds the slot size.
    pub fn commit_slot(&self, index: usize, data: &[u8]) {
        assert!(index < self.slot_count, "slot index out of range");
        assert!(data.len() <= self.slot_size, "transfer larger than slot");

        let start = index * self.slot_size;
        {
            let mut inner = self.lock();
            inner.buf[start..start + data.len()].copy_from_slice(data);
            inner.received += data.len() as u64;
            inner.write_pos = start;
        }
        self.data_ready.notify_all();
    }

    /// Drain the cumulative received-byte counter.
    pub fn take_received(&self) -> u64 {
        let mut inner = self.lock();
        std::mem::take(&mut inner.received)
    }

    /// Return the ring to a clean, empty state: contents zeroed,
    /// write position and counters cleared, epoch bumped so any reader
    /// snaps back to offset zero.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.buf.fill(0);
            inner.write_pos = 0;
            inner.received = 0;
            inner.epoch += 1;
        }
        self.data_ready.notify_all();
    }

    /// Wake any blocked reader without publishing data (shutdown path).
    pub fn wake_all(&self) {
        self.data_ready.notify_all();
    }

    /// Currently published write position (start of last completed slot).
    pub fn write_position(&self) -> usize {
        self.lock().write_pos
    }

    /// Current ring generation.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    // ── Reader side ──────────────────────────────────────────────

    /// Copy up to one slot's worth of published bytes starting at
    /// `*cursor` into `dst`, waiting up to `timeout` for data.
    ///
    /// `dst` is cleared first. On success the cursor advances past the
    /// copied bytes; it never advances past the published write
    /// position. A stale `*epoch` (ring was reset) snaps the cursor to
    /// zero before waiting.
    pub(crate) fn fill(
        &self,
        cursor: &mut usize,
        epoch: &mut u64,
        dst: &mut Vec<u8>,
        timeout: Duration,
    ) -> FillResult {
        dst.clear();
        let capacity = self.capacity();

        let mut inner = self.lock();
        if inner.epoch != *epoch {
            *epoch = inner.epoch;
            *cursor = 0;
        }

        if inner.write_pos == *cursor {
            let snapshot = (*cursor, *epoch);
            let (guard, _timed_out) = self
                .data_ready
                .wait_timeout_while(inner, timeout, |s| {
                    s.write_pos == snapshot.0 && s.epoch == snapshot.1
                })
                .unwrap_or_else(PoisonError::into_inner);
            inner = guard;
            if inner.epoch != *epoch {
                *epoch = inner.epoch;
                *cursor = 0;
            }
            if inner.write_pos == *cursor {
                return FillResult::TimedOut;
            }
        }

        let available = (inner.write_pos + capacity - *cursor) % capacity;
        // Cap at the slot size and at the wrap point; the remainder is
        // picked up by the next call.
        let contiguous = capacity - *cursor;
        let n = available.min(self.slot_size).min(contiguous);
        dst.extend_from_slice(&inner.buf[*cursor..*cursor + n]);
        *cursor = (*cursor + n) % capacity;
        FillResult::Filled(n)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ────────────────────────────────────────────────────────

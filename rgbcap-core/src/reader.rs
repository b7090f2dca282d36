//! Blocking pull-one-byte interface over the slot ring.
//!
//! [`ByteStreamReader`] hides all pipeline concurrency from the sync
//! decoder: the decoder calls [`read_byte`](ByteStreamReader::read_byte)
//! and either gets the next published stream byte or, after the
//! configured patience expires with no data, the sentinel value `0`.
//! The sentinel keeps the consumer able to make progress (and observe
//! shutdown) under total signal loss; a `0` byte has both sync bits low,
//! so at worst it trips the decoder's sync-loss abort.
//!
//! The per-byte hot path is kept cheap by staging up to one slot of
//! published bytes in a local chunk per lock acquisition. Bytes already
//! staged when the ring is reset are served before the reset is
//! noticed; the sync decoder treats them like any other misaligned
//! data.

use std::sync::Arc;
use std::time::Duration;

use crate::ring::{FillResult, SlotRing};
use crate::session::ShutdownFlag;

/// Returned in place of data once the reader's patience is exhausted.
pub const SENTINEL: u8 = 0;

/// Tuning for the reader's bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    /// One condvar wait slice.
    pub wait_slice: Duration,
    /// Wait slices to spend before giving up and returning the sentinel.
    pub patience: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            wait_slice: Duration::from_millis(100),
            patience: 5,
        }
    }
}

/// Anything the sync decoder can pull bytes from.
///
/// Implemented by [`ByteStreamReader`] for live capture and by any
/// `Iterator<Item = u8>` for synthetic streams in tests (an exhausted
/// iterator yields the same sentinel a starved reader does).
pub trait ByteSource {
    fn read_byte(&mut self) -> u8;
}

impl<I: Iterator<Item = u8>> ByteSource for I {
    fn read_byte(&mut self) -> u8 {
        self.next().unwrap_or(SENTINEL)
    }
}

/// Single consumer of the slot ring; owns the read cursor.
pub struct ByteStreamReader {
    ring: Arc<SlotRing>,
    shutdown: ShutdownFlag,
    config: ReaderConfig,
    cursor: usize,
    epoch: u64,
    chunk: Vec<u8>,
    chunk_pos: usize,
}

impl ByteStreamReader {
    pub fn new(ring: Arc<SlotRing>, shutdown: ShutdownFlag, config: ReaderConfig) -> Self {
        let chunk = Vec::with_capacity(ring.slot_size());
        Self {
            ring,
            shutdown,
            config,
            cursor: 0,
            epoch: 0,
            chunk,
            chunk_pos: 0,
        }
    }

    /// Current read cursor (modulo ring capacity).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn refill(&mut self) -> bool {
        self.chunk_pos = 0;
        for _ in 0..self.config.patience {
            if self.shutdown.is_set() {
                return false;
            }
            match self.ring.fill(
                &mut self.cursor,
                &mut self.epoch,
                &mut self.chunk,
                self.config.wait_slice,
            ) {
                FillResult::Filled(_) => return true,
                FillResult::TimedOut => continue,
            }
        }
        false
    }
}

impl ByteSource for ByteStreamReader {
    /// Pull the next published byte, blocking briefly for data.
    ///
    /// Returns [`SENTINEL`] when shutdown has been requested or no data
    /// arrived within `wait_slice * patience`. Callers must tolerate
    /// sentinels without corrupting state.
    fn read_byte(&mut self) -> u8 {
        if self.chunk_pos >= self.chunk.len() && !self.refill() {
            return SENTINEL;
        }
        let byte = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        byte
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingConfig;
    use std::time::Instant;

    fn test_setup() -> (Arc<SlotRing>, ShutdownFlag, ByteStreamReader) {
        let ring = Arc::new(SlotRing::new(RingConfig {
            slot_count: 4,
            slot_size: 8,
        }));
        let shutdown = ShutdownFlag::new();
        let reader = ByteStreamReader::new(
            Arc::clone(&ring),
            shutdown.clone(),
            ReaderConfig {
                wait_slice: Duration::from_millis(5),
                patience: 2,
            },
        );
        (ring, shutdown, reader)
    }

    #[test]
    fn reads_published_bytes_in_order() {
        let (ring, _shutdown, mut reader) = test_setup();
        ring.commit_slot(0, &[10, 11, 12, 13, 14, 15, 16, 17]);
        ring.commit_slot(1, &[20; 8]);

        for expected in 10..=17 {
            assert_eq!(reader.read_byte(), expected);
        }
        // Slot 1 not yet published readable; starved → sentinel.
        assert_eq!(reader.read_byte(), SENTINEL);
    }

    #[test]
    fn sentinel_on_empty_ring() {
        let (_ring, _shutdown, mut reader) = test_setup();
        let started = Instant::now();
        assert_eq!(reader.read_byte(), SENTINEL);
        // Bounded by wait_slice * patience, not forever.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shutdown_short_circuits() {
        let (_ring, shutdown, mut reader) = test_setup();
        shutdown.set();
        let started = Instant::now();
        assert_eq!(reader.read_byte(), SENTINEL);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn resumes_after_sentinel() {
        let (ring, _shutdown, mut reader) = test_setup();
        assert_eq!(reader.read_byte(), SENTINEL);

        ring.commit_slot(0, &[0x1F; 8]);
        ring.commit_slot(1, &[0x2F; 8]);
        assert_eq!(reader.read_byte(), 0x1F);
    }

    #[test]
    fn iterator_source_yields_sentinel_when_exhausted() {
        let mut source = vec![1u8, 2].into_iter();
        assert_eq!(source.read_byte(), 1);
        assert_eq!(source.read_byte(), 2);
        assert_eq!(source.read_byte(), SENTINEL);
    }
}

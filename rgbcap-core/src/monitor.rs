//! Decode-loop runner: turns the byte stream into published frames.
//!
//! [`FrameMonitor`] owns the session's [`ByteStreamReader`] and a
//! [`SyncDecoder`], drives one decode cycle after another on a
//! dedicated thread, and publishes each completed frame through a
//! `tokio::sync::watch` channel. The renderer only ever sees the
//! latest frame; dropped frames (sync loss) surface in the stats
//! channel, not as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use crate::decode::{FrameBuffer, SyncDecoder};
use crate::error::CaptureError;
use crate::reader::ByteStreamReader;
use crate::session::ShutdownFlag;
use crate::timing::TimingTuning;

// ── CaptureStats ─────────────────────────────────────────────────

/// Per-cycle statistics exposed to the UI.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    /// Smoothed frames per second.
    pub fps: f64,
    /// Frames decoded since start.
    pub total_frames: u64,
    /// Frames dropped to sync loss since start.
    pub sync_losses: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in scanlines.
    pub height: u32,
}

// ── FrameMonitor ─────────────────────────────────────────────────

/// Consumer half of the capture pipeline.
///
/// Intended to occupy its own thread:
///
/// ```no_run
/// # use rgbcap_core::monitor::FrameMonitor;
/// # fn example(mut monitor: FrameMonitor) {
/// let frames = monitor.frame_receiver();
/// std::thread::spawn(move || monitor.run());
/// // … render from `frames` …
/// # }
/// ```
pub struct FrameMonitor {
    reader: ByteStreamReader,
    decoder: SyncDecoder,
    tuning: Arc<TimingTuning>,
    shutdown: ShutdownFlag,
    frame_tx: watch::Sender<FrameBuffer>,
    frame_rx: watch::Receiver<FrameBuffer>,
    stats_tx: watch::Sender<CaptureStats>,
    stats_rx: watch::Receiver<CaptureStats>,
}

impl FrameMonitor {
    pub fn new(
        reader: ByteStreamReader,
        tuning: Arc<TimingTuning>,
        shutdown: ShutdownFlag,
        width: usize,
        height: usize,
    ) -> Self {
        let (frame_tx, frame_rx) = watch::channel(FrameBuffer::new(width, height));
        let (stats_tx, stats_rx) = watch::channel(CaptureStats {
            width: width as u32,
            height: height as u32,
            ..CaptureStats::default()
        });
        Self {
            reader,
            decoder: SyncDecoder::new(width, height),
            tuning,
            shutdown,
            frame_tx,
            frame_rx,
            stats_tx,
            stats_rx,
        }
    }

    /// Latest-frame channel for the renderer.
    pub fn frame_receiver(&self) -> watch::Receiver<FrameBuffer> {
        self.frame_rx.clone()
    }

    /// Statistics channel.
    pub fn stats_receiver(&self) -> watch::Receiver<CaptureStats> {
        self.stats_rx.clone()
    }

    /// Run decode cycles until shutdown.
    ///
    /// The control flow per cycle is ACQUIRING (hunt vertical sync)
    /// then STREAMING (assemble scanlines); nothing persists across
    /// cycles except the published frame.
    pub fn run(&mut self) {
        let mut stats = self.stats_rx.borrow().clone();
        let mut fps_samples: Vec<Duration> = Vec::with_capacity(120);
        let mut last_frame_time = Instant::now();

        while !self.shutdown.is_set() {
            let timing = self.tuning.snapshot();
            match self
                .decoder
                .decode_frame(&mut self.reader, timing, &self.shutdown)
            {
                Ok(()) => {
                    let _ = self.frame_tx.send(self.decoder.frame().clone());
                    stats.total_frames += 1;

                    let now = Instant::now();
                    fps_samples.push(now.duration_since(last_frame_time));
                    last_frame_time = now;
                    if fps_samples.len() > 60 {
                        fps_samples.remove(0);
                    }
                    let avg_secs: f64 = fps_samples.iter().map(|d| d.as_secs_f64()).sum::<f64>()
                        / fps_samples.len() as f64;
                    stats.fps = if avg_secs > 0.0 { 1.0 / avg_secs } else { 0.0 };
                    let _ = self.stats_tx.send(stats.clone());
                }
                Err(CaptureError::SyncLost { row }) => {
                    debug!(row, "frame dropped: sync lost");
                    stats.sync_losses += 1;
                    let _ = self.stats_tx.send(stats.clone());
                }
                Err(CaptureError::Cancelled) => break,
                // The decoder only surfaces the two variants above.
                Err(_) => break,
            }
        }
        debug!("frame monitor stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderConfig;
    use crate::ring::{RingConfig, SlotRing};

    /// Minimal well-formed single-frame stream (no porches).
    fn frame_stream(width: usize, height: usize, fill: u8) -> Vec<u8> {
        const ACTIVE: u8 = 0b0001_1000;
        const VSYNC_LOW: u8 = 0b0000_1000;
        const HSYNC_LOW: u8 = 0b0001_0000;

        let mut stream = vec![VSYNC_LOW, VSYNC_LOW, ACTIVE];
        for _ in 0..height {
            stream.extend([HSYNC_LOW, ACTIVE]);
            stream.extend(std::iter::repeat(ACTIVE | fill).take(width));
        }
        stream
    }

    #[test]
    fn publishes_decoded_frames_until_shutdown() {
        let ring = Arc::new(SlotRing::new(RingConfig {
            slot_count: 4,
            slot_size: 64,
        }));
        let shutdown = ShutdownFlag::new();
        let tuning = Arc::new(TimingTuning::new(0, 0, 896));

        let reader = ByteStreamReader::new(
            Arc::clone(&ring),
            shutdown.clone(),
            ReaderConfig {
                wait_slice: Duration::from_millis(5),
                patience: 2,
            },
        );
        let mut monitor = FrameMonitor::new(reader, tuning, shutdown.clone(), 8, 4);
        let mut frames = monitor.frame_receiver();
        let thread = std::thread::spawn(move || monitor.run());

        // Pack one frame into the ring, slot by slot, then pad so the
        // frame's own slot becomes readable.
        let mut stream = frame_stream(8, 4, 0b110);
        stream.resize(128, 0);
        for (slot, chunk) in stream.chunks(64).enumerate() {
            ring.commit_slot(slot, chunk);
        }
        ring.commit_slot(2, &[0u8; 64]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !frames.has_changed().unwrap_or(false) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        let frame = frames.borrow_and_update().clone();
        assert_eq!(frame.pixel(0, 0), 0b110);
        assert_eq!(frame.pixel(7, 3), 0b110);

        shutdown.set();
        ring.wake_all();
        thread.join().unwrap();
    }
}

//! # rgbcap-core
//!
//! Acquisition and frame-recovery pipeline for a digital RGB capture
//! device streaming one connector sample per byte over USB bulk.
//!
//! ## Architecture
//!
//! ```text
//! DEVICE (EZ-USB FX2)                       HOST
//! ┌──────────────────┐       ┌─────────────────────────────────┐
//! │ sampler → FIFO   │ bulk  │ TransferScheduler               │
//! │                  │ ───►  │   ↓ (slot ring + condvar)       │
//! │ PLL / FIFO ctrl  │ ◄───  │ ByteStreamReader                │
//! └──────────────────┘ cmds  │   ↓                             │
//!                            │ SyncDecoder → FrameMonitor      │
//!                            │   ↓ (watch channel)             │
//!                            │ viewer render loop              │
//!                            └─────────────────────────────────┘
//! ```
//!
//! | Module     | Purpose                                            |
//! |----------- |----------------------------------------------------|
//! | `signal`   | `000V_HRGB` sample byte layout                     |
//! | `ring`     | Slot ring between scheduler and reader             |
//! | `reader`   | Blocking pull-one-byte view of the ring            |
//! | `transport`| USB seam (`CaptureTransport`)                      |
//! | `device`   | EZ-USB discovery, RAM writes, endpoints            |
//! | `firmware` | ASCII-hex record parsing                           |
//! | `sched`    | Keeps bulk reads perpetually in flight             |
//! | `decode`   | Sync-recovery state machine / frame assembly       |
//! | `timing`   | Live-tunable porch / pixel-clock parameters        |
//! | `command`  | Control packet encoding                            |
//! | `session`  | Pipeline owner; stop-the-world command channel     |
//! | `monitor`  | Decode loop publishing frames to the viewer        |
//! | `stats`    | Throughput accounting                              |

pub mod command;
pub mod decode;
pub mod device;
pub mod error;
pub mod firmware;
pub mod monitor;
pub mod reader;
pub mod ring;
pub mod sched;
pub mod session;
pub mod signal;
pub mod stats;
pub mod timing;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::DeviceCommand;
pub use decode::{DecodeState, FrameBuffer, StepOutcome, SyncDecoder, FRAME_HEIGHT, FRAME_WIDTH};
pub use device::UsbVideoDevice;
pub use error::CaptureError;
pub use firmware::{FirmwareImage, FirmwareRecord};
pub use monitor::{CaptureStats, FrameMonitor};
pub use reader::{ByteSource, ByteStreamReader, ReaderConfig};
pub use ring::{RingConfig, SlotRing};
pub use sched::{SchedulerConfig, TransferScheduler};
pub use session::{CaptureSession, SessionConfig, ShutdownFlag};
pub use signal::SignalBits;
pub use stats::{ThroughputMeter, ThroughputReport};
pub use timing::{TimingSnapshot, TimingTuning};
pub use transport::CaptureTransport;

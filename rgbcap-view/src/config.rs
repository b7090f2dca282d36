//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rgbcap_core::{ReaderConfig, RingConfig, SchedulerConfig, SessionConfig};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Capture device settings.
    pub device: DeviceConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Signal timing defaults.
    pub timing: TimingConfig,
    /// Acquisition pipeline tuning.
    pub capture: CaptureConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Capture device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Path to the firmware hex image; empty skips the upload.
    pub firmware: String,
    /// Whether the board carries a programmable clock generator; when
    /// false the pixel-clock keys are inert.
    pub pixel_clock_control: bool,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in scanlines.
    pub height: u32,
    /// Double every scanline vertically (the source's pixels are
    /// half-height on a modern square-pixel display).
    pub line_double: bool,
}

/// Signal timing defaults; all three are adjustable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Lines skipped after the vertical sync pulse.
    pub v_back_porch: u32,
    /// Bytes skipped after each horizontal sync pulse.
    pub h_back_porch: u32,
    /// Total pixel clocks per line (PLL ratio base).
    /// 896 for X1/turbo-class sources, 912 for Pasopia7.
    pub h_total: u16,
}

/// Acquisition pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// In-flight transfers (= ring slots).
    pub slot_count: usize,
    /// Bytes per transfer (= ring slot size).
    pub slot_size: usize,
    /// Completion wait per transfer, in milliseconds.
    pub completion_timeout_ms: u64,
    /// Per-transfer wait while draining on stop, in milliseconds.
    pub drain_timeout_ms: u64,
    /// One reader wait slice, in milliseconds.
    pub read_wait_ms: u64,
    /// Wait slices before the reader returns its sentinel.
    pub read_patience: u32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            display: DisplayConfig::default(),
            timing: TimingConfig::default(),
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            firmware: "slave.hex".into(),
            pixel_clock_control: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: rgbcap_core::FRAME_WIDTH as u32,
            height: rgbcap_core::FRAME_HEIGHT as u32,
            line_double: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            v_back_porch: rgbcap_core::timing::DEFAULT_V_BACK_PORCH,
            h_back_porch: rgbcap_core::timing::DEFAULT_H_BACK_PORCH,
            h_total: rgbcap_core::timing::DEFAULT_H_TOTAL,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let ring = RingConfig::default();
        Self {
            slot_count: ring.slot_count,
            slot_size: ring.slot_size,
            completion_timeout_ms: 500,
            drain_timeout_ms: 100,
            read_wait_ms: 100,
            read_patience: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Pipeline configuration for `rgbcap-core`.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ring: RingConfig {
                slot_count: self.capture.slot_count,
                slot_size: self.capture.slot_size,
            },
            scheduler: SchedulerConfig {
                completion_timeout: Duration::from_millis(self.capture.completion_timeout_ms),
                drain_timeout: Duration::from_millis(self.capture.drain_timeout_ms),
                report_interval: Duration::from_secs(1),
            },
            reader: ReaderConfig {
                wait_slice: Duration::from_millis(self.capture.read_wait_ms),
                patience: self.capture.read_patience,
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

//! User-tunable signal timing parameters.
//!
//! The porch counts and the total-pixels-per-line value are nudged from
//! the viewer while the decoder is running. Each field is a relaxed
//! atomic: a concurrent update is observed at the next cycle snapshot
//! at the latest, and a stale value affects at most one frame.

use std::sync::atomic::{AtomicU32, Ordering};

/// Vertical back porch lines skipped after the vertical sync pulse.
pub const DEFAULT_V_BACK_PORCH: u32 = 36;
/// Bytes skipped after each horizontal sync pulse before active video.
pub const DEFAULT_H_BACK_PORCH: u32 = 127;
/// Total pixel clocks per line; feeds the PLL ratio command.
/// 896 suits X1/turbo-class sources, 912 the Pasopia7.
pub const DEFAULT_H_TOTAL: u16 = 896;

/// Immutable view of the parameters, taken once per decode cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSnapshot {
    pub v_back_porch: u32,
    pub h_back_porch: u32,
    pub h_total: u16,
}

/// Shared, live-tunable timing parameters.
pub struct TimingTuning {
    v_back_porch: AtomicU32,
    h_back_porch: AtomicU32,
    h_total: AtomicU32,
}

impl TimingTuning {
    pub fn new(v_back_porch: u32, h_back_porch: u32, h_total: u16) -> Self {
        Self {
            v_back_porch: AtomicU32::new(v_back_porch),
            h_back_porch: AtomicU32::new(h_back_porch),
            h_total: AtomicU32::new(u32::from(h_total)),
        }
    }

    /// Snapshot for one decode cycle.
    pub fn snapshot(&self) -> TimingSnapshot {
        TimingSnapshot {
            v_back_porch: self.v_back_porch.load(Ordering::Relaxed),
            h_back_porch: self.h_back_porch.load(Ordering::Relaxed),
            h_total: self.h_total.load(Ordering::Relaxed) as u16,
        }
    }

    /// Adjust the vertical back porch; saturates at zero.
    pub fn step_v_back_porch(&self, delta: i32) -> u32 {
        Self::step(&self.v_back_porch, delta)
    }

    /// Adjust the horizontal back porch; saturates at zero.
    pub fn step_h_back_porch(&self, delta: i32) -> u32 {
        Self::step(&self.h_back_porch, delta)
    }

    /// Adjust the per-line pixel total; clamped to `1..=u16::MAX`.
    pub fn step_h_total(&self, delta: i32) -> u16 {
        let next = self
            .h_total
            .load(Ordering::Relaxed)
            .saturating_add_signed(delta)
            .clamp(1, u32::from(u16::MAX));
        self.h_total.store(next, Ordering::Relaxed);
        next as u16
    }

    // Single writer (the viewer's input handler); racing readers see
    // old-or-new, never a torn value.
    fn step(field: &AtomicU32, delta: i32) -> u32 {
        let next = field
            .load(Ordering::Relaxed)
            .saturating_add_signed(delta);
        field.store(next, Ordering::Relaxed);
        next
    }
}

impl Default for TimingTuning {
    fn default() -> Self {
        Self::new(DEFAULT_V_BACK_PORCH, DEFAULT_H_BACK_PORCH, DEFAULT_H_TOTAL)
    }
}

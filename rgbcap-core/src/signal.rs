//! Bit layout of a captured signal byte.
//!
//! The device samples the monitor connector once per pixel clock and
//! packs the result into a single byte, `000V_HRGB`: bit 4 is the
//! vertical sync line, bit 3 the horizontal sync line, and bits 2..=0
//! carry the red, green and blue levels for that pixel. The top three
//! bits are unused and ignored on receive.

use bitflags::bitflags;

bitflags! {
    /// One sample of the monitor connector, as shipped over the bulk
    /// endpoint.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SignalBits: u8 {
        const BLUE = 1 << 0;
        const GREEN = 1 << 1;
        const RED = 1 << 2;
        const HSYNC = 1 << 3;
        const VSYNC = 1 << 4;

        /// The three color bits together.
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        /// Both sync lines together.
        const SYNC = Self::VSYNC.bits() | Self::HSYNC.bits();
    }
}

impl SignalBits {
    /// Interpret a raw stream byte, discarding the unused top bits.
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }

    /// Vertical sync line level.
    pub fn vsync(self) -> bool {
        self.contains(Self::VSYNC)
    }

    /// Horizontal sync line level.
    pub fn hsync(self) -> bool {
        self.contains(Self::HSYNC)
    }

    /// Both sync lines high — the state every byte must hold while a
    /// scanline's pixels are being transmitted.
    pub fn active_video(self) -> bool {
        self.contains(Self::SYNC)
    }

    /// The 3-bit palette index (`0bRGB`, red most significant).
    pub fn color_index(self) -> u8 {
        self.bits() & Self::COLOR.bits()
    }
}

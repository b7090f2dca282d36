//! Frame buffer → surface blitting.
//!
//! Expands the decoder's 3-bit palette indices into the RGBA pixel
//! buffer of the render surface, optionally doubling scanlines so the
//! half-height source fills a square-pixel display.

use rgbcap_core::FrameBuffer;

use crate::palette;

/// Height in surface rows that `frame` occupies.
pub fn surface_height(frame_height: u32, line_double: bool) -> u32 {
    if line_double {
        frame_height * 2
    } else {
        frame_height
    }
}

/// Expand `frame` into `out` (RGBA, row-major,
/// `frame.width() * surface_height(...)` pixels).
///
/// `out` larger than the frame is tolerated; the tail is left
/// untouched. A too-small `out` blits as many whole rows as fit.
pub fn blit_frame(frame: &FrameBuffer, line_double: bool, out: &mut [u8]) {
    let width = frame.width();
    let row_bytes = width * 4;
    let rows_out = out.len() / row_bytes;

    for (y, row) in frame.pixels().chunks(width).enumerate() {
        let dst_y = if line_double { y * 2 } else { y };
        if dst_y >= rows_out {
            break;
        }
        let start = dst_y * row_bytes;
        for (x, &code) in row.iter().enumerate() {
            let quad = palette::rgba(code);
            out[start + x * 4..start + x * 4 + 4].copy_from_slice(&quad);
        }
        if line_double && dst_y + 1 < rows_out {
            let (src, dst) = out.split_at_mut(start + row_bytes);
            dst[..row_bytes].copy_from_slice(&src[start..start + row_bytes]);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rgbcap_core::{ShutdownFlag, SyncDecoder, TimingSnapshot};

    /// Decode a tiny synthetic frame to get a populated buffer.
    fn test_frame() -> FrameBuffer {
        const ACTIVE: u8 = 0b0001_1000;
        let mut stream = vec![0b0000_1000, ACTIVE]; // vsync pulse
        for row in 0..2u8 {
            stream.extend([0b0001_0000, ACTIVE]); // hsync pulse
            stream.extend([ACTIVE | (row * 3), ACTIVE | (row * 3 + 1)]);
        }

        let mut decoder = SyncDecoder::new(2, 2);
        let mut source = stream.into_iter();
        decoder
            .decode_frame(
                &mut source,
                TimingSnapshot {
                    v_back_porch: 0,
                    h_back_porch: 0,
                    h_total: 896,
                },
                &ShutdownFlag::new(),
            )
            .unwrap();
        decoder.frame().clone()
    }

    #[test]
    fn blit_without_doubling() {
        let frame = test_frame();
        let mut out = vec![0u8; 2 * 2 * 4];
        blit_frame(&frame, false, &mut out);

        // (0,0) = code 0 → black, (1,0) = code 1 → blue.
        assert_eq!(&out[0..4], &[0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(&out[4..8], &[0x00, 0x00, 0xFF, 0xFF]);
        // (0,1) = code 3 → cyan, (1,1) = code 4 → red.
        assert_eq!(&out[8..12], &[0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&out[12..16], &[0xFF, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn blit_with_line_doubling_duplicates_rows() {
        let frame = test_frame();
        let mut out = vec![0u8; 2 * 4 * 4];
        blit_frame(&frame, true, &mut out);

        let row_bytes = 2 * 4;
        assert_eq!(out[0..row_bytes], out[row_bytes..2 * row_bytes]);
        assert_eq!(out[2 * row_bytes..3 * row_bytes], out[3 * row_bytes..]);
        // Doubled second row is red at x=1.
        assert_eq!(&out[3 * row_bytes + 4..3 * row_bytes + 8], &[0xFF, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn short_output_buffer_is_not_overrun() {
        let frame = test_frame();
        let mut out = vec![0u8; 2 * 4]; // one row only
        blit_frame(&frame, true, &mut out);
        assert_eq!(&out[0..4], &[0x00, 0x00, 0x00, 0xFF]);
    }
}

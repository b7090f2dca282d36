//! Keyboard → viewer action translation.
//!
//! The arrow keys nudge the back porches to walk the picture into
//! alignment with the (unknown) source timing; A/S nudge the sampling
//! clock on hardware with a programmable clock generator; X forces a
//! capture-FIFO reset when the stream has wedged.

use winit::keyboard::KeyCode;

/// An input the display loop acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    /// Vertical back porch +1.
    VPorchUp,
    /// Vertical back porch −1.
    VPorchDown,
    /// Horizontal back porch +1.
    HPorchUp,
    /// Horizontal back porch −1.
    HPorchDown,
    /// Pixel clock total +1 (sends a PLL command).
    ClockUp,
    /// Pixel clock total −1 (sends a PLL command).
    ClockDown,
    /// Reset the capture FIFO.
    ResetFifo,
    /// Close the viewer.
    Quit,
}

/// Map a pressed key to its action, if any.
pub fn translate_key(key: KeyCode) -> Option<ViewerAction> {
    match key {
        KeyCode::ArrowUp => Some(ViewerAction::VPorchUp),
        KeyCode::ArrowDown => Some(ViewerAction::VPorchDown),
        KeyCode::ArrowLeft => Some(ViewerAction::HPorchUp),
        KeyCode::ArrowRight => Some(ViewerAction::HPorchDown),
        KeyCode::KeyA => Some(ViewerAction::ClockUp),
        KeyCode::KeyS => Some(ViewerAction::ClockDown),
        KeyCode::KeyX => Some(ViewerAction::ResetFifo),
        KeyCode::Escape => Some(ViewerAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porch_keys_map_to_adjustments() {
        assert_eq!(translate_key(KeyCode::ArrowUp), Some(ViewerAction::VPorchUp));
        assert_eq!(
            translate_key(KeyCode::ArrowDown),
            Some(ViewerAction::VPorchDown)
        );
        assert_eq!(
            translate_key(KeyCode::ArrowLeft),
            Some(ViewerAction::HPorchUp)
        );
        assert_eq!(
            translate_key(KeyCode::ArrowRight),
            Some(ViewerAction::HPorchDown)
        );
    }

    #[test]
    fn command_keys_map_to_device_actions() {
        assert_eq!(translate_key(KeyCode::KeyA), Some(ViewerAction::ClockUp));
        assert_eq!(translate_key(KeyCode::KeyS), Some(ViewerAction::ClockDown));
        assert_eq!(translate_key(KeyCode::KeyX), Some(ViewerAction::ResetFifo));
        assert_eq!(translate_key(KeyCode::Escape), Some(ViewerAction::Quit));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(translate_key(KeyCode::Space), None);
        assert_eq!(translate_key(KeyCode::KeyQ), None);
    }
}

//! rgbcap-view library surface.
//!
//! The binary in `main.rs` wires these modules to `rgbcap-core`:
//! configuration loading, palette rendering, and keyboard translation.

pub mod config;
pub mod display;
pub mod input;
pub mod palette;

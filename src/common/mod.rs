//! Utilities shared by the OOXML layers.

pub mod unit;
pub mod xml;

pub use unit::{EMUS_PER_INCH, emu_to_inches, inches_to_emu};

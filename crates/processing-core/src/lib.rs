//! VidGrab Processing Core
//!
//! Frame-level computation for the grabber example:
//! - **Frame buffers:** fixed-size RGB buffers and row stride helpers
//! - **Inversion:** the per-byte `255 - v` effect
//!
//! This crate is pure computation. It does no I/O.
//! All inputs are data; all outputs are data.

pub mod frame;
pub mod invert;

pub use frame::{FrameBuffer, FrameSize, BYTES_PER_PIXEL};
pub use invert::{invert_into, invert_value, FrameInverter};

//! Negative-image effect.
//!
//! Every channel byte `v` becomes `255 - v`. The transform is its own
//! inverse and keeps no state between frames.

use vidgrab_common::error::{VidgrabError, VidgrabResult};

use crate::frame::{FrameBuffer, FrameSize};

/// Invert one 8-bit channel value.
#[inline]
pub fn invert_value(v: u8) -> u8 {
    255 - v
}

/// Write the inverse of every byte of `src` into `dst`.
///
/// Both slices must have the same length; on mismatch `dst` is untouched.
pub fn invert_into(src: &[u8], dst: &mut [u8]) -> VidgrabResult<()> {
    if src.len() != dst.len() {
        return Err(VidgrabError::FrameSize {
            expected: dst.len(),
            actual: src.len(),
        });
    }
    for (out, &v) in dst.iter_mut().zip(src) {
        *out = invert_value(v);
    }
    Ok(())
}

/// Owns the output buffer of the inversion effect.
#[derive(Debug, Clone)]
pub struct FrameInverter {
    output: FrameBuffer,
    frames_processed: u64,
}

impl FrameInverter {
    /// Allocate an output buffer for frames of `size`.
    pub fn new(size: FrameSize) -> Self {
        Self {
            output: FrameBuffer::new(size),
            frames_processed: 0,
        }
    }

    /// Invert a packed RGB frame into the owned buffer.
    ///
    /// A frame whose length differs from the configured size is rejected
    /// and the previous output is kept.
    pub fn process(&mut self, pixels: &[u8]) -> VidgrabResult<&FrameBuffer> {
        invert_into(pixels, self.output.as_mut_bytes())?;
        self.frames_processed += 1;
        Ok(&self.output)
    }

    /// The most recent inverted frame (black until the first frame arrives).
    pub fn output(&self) -> &FrameBuffer {
        &self.output
    }

    pub fn size(&self) -> FrameSize {
        self.output.size()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

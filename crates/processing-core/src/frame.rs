//! RGB frame buffers.
//!
//! Frames are tightly packed 8-bit RGB, rows top to bottom, so a frame of
//! `width × height` pixels is exactly `width * height * 3` bytes. GStreamer
//! aligns each RGB row to 4 bytes, which [`pack_rows`] and [`pad_rows`]
//! translate to and from.

use vidgrab_common::error::{VidgrabError, VidgrabResult};

/// Bytes per RGB pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// Dimensions of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of a tightly packed RGB frame.
    pub fn byte_len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    /// Bytes of pixel data in one row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Row stride with 4-byte alignment.
    pub fn padded_stride(&self) -> usize {
        (self.row_bytes() + 3) & !3
    }

    /// Length of a frame whose rows use [`FrameSize::padded_stride`].
    pub fn padded_len(&self) -> usize {
        self.padded_stride() * self.height as usize
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A fixed-size RGB frame.
///
/// The length is set at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    size: FrameSize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed (black) frame.
    pub fn new(size: FrameSize) -> Self {
        Self {
            size,
            data: vec![0; size.byte_len()],
        }
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overwrite the frame with `src`, which must be exactly [`FrameBuffer::len`] bytes.
    pub fn copy_from(&mut self, src: &[u8]) -> VidgrabResult<()> {
        if src.len() != self.data.len() {
            return Err(VidgrabError::FrameSize {
                expected: self.data.len(),
                actual: src.len(),
            });
        }
        self.data.copy_from_slice(src);
        Ok(())
    }
}

/// Copy a frame of `size` into `out` as packed rows.
///
/// `data` may be packed already or use the 4-byte aligned stride. Any other
/// length is rejected and `out` is left unchanged.
pub fn pack_rows(data: &[u8], size: FrameSize, out: &mut Vec<u8>) -> VidgrabResult<()> {
    let packed_len = size.byte_len();
    if data.len() == packed_len {
        out.clear();
        out.extend_from_slice(data);
        return Ok(());
    }

    if data.len() == size.padded_len() {
        let row = size.row_bytes();
        out.clear();
        out.reserve(packed_len);
        for chunk in data.chunks_exact(size.padded_stride()) {
            out.extend_from_slice(&chunk[..row]);
        }
        return Ok(());
    }

    Err(VidgrabError::FrameSize {
        expected: packed_len,
        actual: data.len(),
    })
}

/// Expand packed rows to the 4-byte aligned stride, zero filling the padding.
pub fn pad_rows(data: &[u8], size: FrameSize) -> VidgrabResult<Vec<u8>> {
    if data.len() != size.byte_len() {
        return Err(VidgrabError::FrameSize {
            expected: size.byte_len(),
            actual: data.len(),
        });
    }

    let row = size.row_bytes();
    let stride = size.padded_stride();
    if row == stride {
        return Ok(data.to_vec());
    }

    let mut padded = vec![0u8; size.padded_len()];
    for (dst, src) in padded.chunks_exact_mut(stride).zip(data.chunks_exact(row)) {
        dst[..row].copy_from_slice(src);
    }
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qvga_frame_is_230400_bytes() {
        let size = FrameSize::new(320, 240);
        assert_eq!(size.byte_len(), 230_400);
        assert_eq!(FrameBuffer::new(size).len(), 230_400);
    }

    #[test]
    fn stride_is_aligned_to_four() {
        assert_eq!(FrameSize::new(320, 1).padded_stride(), 960);
        assert_eq!(FrameSize::new(5, 1).padded_stride(), 16);
        assert_eq!(FrameSize::new(1, 1).padded_stride(), 4);
    }

    #[test]
    fn copy_from_rejects_wrong_length() {
        let mut frame = FrameBuffer::new(FrameSize::new(2, 2));
        let err = frame.copy_from(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            VidgrabError::FrameSize {
                expected: 12,
                actual: 3
            }
        ));
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn pack_strips_row_padding() {
        let size = FrameSize::new(1, 2);
        let padded = [1, 2, 3, 0, 4, 5, 6, 0];
        let mut out = Vec::new();
        pack_rows(&padded, size, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn pack_passes_through_packed_frames() {
        let size = FrameSize::new(4, 1);
        let packed: Vec<u8> = (0..12).collect();
        let mut out = vec![99; 3];
        pack_rows(&packed, size, &mut out).unwrap();
        assert_eq!(out, packed);
    }

    #[test]
    fn pack_rejects_unknown_layout() {
        let mut out = vec![7];
        let err = pack_rows(&[0; 5], FrameSize::new(1, 1), &mut out).unwrap_err();
        assert!(matches!(err, VidgrabError::FrameSize { .. }));
        assert_eq!(out, vec![7]);
    }

    #[test]
    fn pad_adds_zeroed_row_tail() {
        let size = FrameSize::new(1, 2);
        let padded = pad_rows(&[1, 2, 3, 4, 5, 6], size).unwrap();
        assert_eq!(padded, vec![1, 2, 3, 0, 4, 5, 6, 0]);

        let mut back = Vec::new();
        pack_rows(&padded, size, &mut back).unwrap();
        assert_eq!(back, vec![1, 2, 3, 4, 5, 6]);
    }
}

//! CPU pixel images and the GPU-native to ARGB conversion.
//!
//! Readback delivers one `u32` per texel holding the texel's bytes in memory
//! order `[r, g, b, a]`, so its numeric value depends on platform endianness
//! (`0xAABBGGRR` on little-endian). Host images store `0xAARRGGBB` regardless
//! of platform.

use crate::error::FrameError;
use crate::lifecycle::Dimensions;

/// Reorders one natively laid out texel into `0xAARRGGBB`.
#[inline]
pub fn native_to_argb(native: u32) -> u32 {
    let [r, g, b, a] = native.to_ne_bytes();
    u32::from_be_bytes([a, r, g, b])
}

/// Inverse of [`native_to_argb`].
#[inline]
pub fn argb_to_native(argb: u32) -> u32 {
    let [a, r, g, b] = argb.to_be_bytes();
    u32::from_ne_bytes([r, g, b, a])
}

/// Packs channel values into `0xAARRGGBB`.
#[inline]
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    u32::from_be_bytes([a, r, g, b])
}

/// Converts a bottom-up native buffer into a top-down ARGB buffer.
///
/// Source row `height - 1 - r` lands in destination row `r`.
pub fn convert_flipped(
    src: &[u32],
    width: u32,
    height: u32,
    dst: &mut [u32],
) -> Result<(), FrameError> {
    let expected = width as usize * height as usize;
    if src.len() != expected || dst.len() != expected {
        return Err(FrameError::SizeMismatchInternal {
            expected,
            actual: if src.len() != expected {
                src.len()
            } else {
                dst.len()
            },
        });
    }
    if expected == 0 {
        return Ok(());
    }

    let row = width as usize;
    for (dst_row, src_row) in dst
        .chunks_exact_mut(row)
        .zip(src.chunks_exact(row).rev())
    {
        for (out, native) in dst_row.iter_mut().zip(src_row) {
            *out = native_to_argb(*native);
        }
    }
    Ok(())
}

/// CPU-accessible image in host ARGB layout, rows top-down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    revision: u64,
    dirty: bool,
}

impl PixelImage {
    /// Allocates a fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            revision: 0,
            dirty: false,
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable view of the pixel store. Marks the image dirty until
    /// [`update_pixels`](Self::update_pixels) commits the change.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.dirty = true;
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn row(&self, y: u32) -> Option<&[u32]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        self.pixels.get(start..start + self.width as usize)
    }

    /// Commits pending pixel writes so consumers treat the content as fresh.
    pub fn update_pixels(&mut self) {
        self.dirty = false;
        self.revision += 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of committed updates since allocation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Expands the image into straight RGBA bytes, top row first.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            let [a, r, g, b] = pixel.to_be_bytes();
            bytes.extend_from_slice(&[r, g, b, a]);
        }
        bytes
    }
}

impl Dimensions for PixelImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

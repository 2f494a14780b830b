//! CPU-backed render context.
//!
//! `SoftwareHost` stands in for a GPU context on machines without one and in
//! tests. Textures keep the transport's bottom-up row order; surfaces are
//! top-down like any render target read through the host.

use std::collections::HashMap;

use transport::{ContextId, NativeTexture};

use crate::error::HostError;
use crate::host::{Quad, RenderHost, SurfaceReadback, TextureStore};
use crate::lifecycle::Dimensions;
use crate::pixels::{native_to_argb, PixelImage};

const BYTES_PER_PIXEL: usize = 4;

fn checked_len(width: u32, height: u32) -> Result<usize, HostError> {
    if width == 0 || height == 0 {
        return Err(HostError::InvalidDimensions { width, height });
    }
    Ok(width as usize * height as usize)
}

struct SoftTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Render target of a [`SoftwareHost`].
#[derive(Debug)]
pub struct SoftwareSurface {
    id: u64,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SoftwareSurface {
    /// Allocation serial, unique per host.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA of the pixel at `(x, y)`, counted from the top-left corner.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let texel = self.rgba.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }
}

impl Dimensions for SoftwareSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Render context that keeps every texture and surface in system memory.
pub struct SoftwareHost {
    context: ContextId,
    textures: HashMap<NativeTexture, SoftTexture>,
    next_texture: u64,
    surfaces_created: u64,
    draws: u64,
    readbacks: u64,
}

impl Default for SoftwareHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareHost {
    pub fn new() -> Self {
        Self {
            context: ContextId::allocate(),
            textures: HashMap::new(),
            next_texture: 0,
            surfaces_created: 0,
            draws: 0,
            readbacks: 0,
        }
    }

    /// Number of surfaces allocated through [`RenderHost::create_surface`].
    pub fn surfaces_created(&self) -> u64 {
        self.surfaces_created
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn readbacks(&self) -> u64 {
        self.readbacks
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn texture(&self, texture: NativeTexture) -> Result<&SoftTexture, HostError> {
        self.textures
            .get(&texture)
            .ok_or(HostError::UnknownTexture(texture))
    }
}

impl RenderHost for SoftwareHost {
    type Surface = SoftwareSurface;

    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_surface(&mut self, width: u32, height: u32) -> Result<SoftwareSurface, HostError> {
        let len = checked_len(width, height)?;
        self.surfaces_created += 1;
        tracing::debug!(width, height, "software surface allocated");
        Ok(SoftwareSurface {
            id: self.surfaces_created,
            width,
            height,
            rgba: vec![0; len * BYTES_PER_PIXEL],
        })
    }

    fn draw_textured_quad(
        &mut self,
        target: &mut SoftwareSurface,
        texture: NativeTexture,
        quad: &Quad,
    ) -> Result<(), HostError> {
        let source = self.texture(texture)?;
        let (x0, y0, x1, y1) = quad.bounds();
        let clamp_span = |lo: f32, hi: f32, limit: u32| {
            let start = lo.max(0.0).round() as u32;
            let end = (hi.max(0.0).round() as u32).min(limit);
            start.min(end)..end
        };
        let rows = clamp_span(y0, y1, target.height);
        let columns = clamp_span(x0, x1, target.width);

        let max_u = source.width.saturating_sub(1) as f32;
        let max_v = source.height.saturating_sub(1) as f32;
        for y in rows {
            for x in columns.clone() {
                let [u, v] = quad.tex_coord_at(x as f32 + 0.5, y as f32 + 0.5);
                let tu = u.floor().clamp(0.0, max_u) as usize;
                let tv = v.floor().clamp(0.0, max_v) as usize;
                let src = (tv * source.width as usize + tu) * BYTES_PER_PIXEL;
                let dst = (y as usize * target.width as usize + x as usize) * BYTES_PER_PIXEL;
                target.rgba[dst..dst + BYTES_PER_PIXEL]
                    .copy_from_slice(&source.rgba[src..src + BYTES_PER_PIXEL]);
            }
        }
        self.draws += 1;
        Ok(())
    }

    fn read_texture(
        &mut self,
        texture: NativeTexture,
        width: u32,
        height: u32,
        out: &mut [u32],
    ) -> Result<(), HostError> {
        let source = self.texture(texture)?;
        if (source.width, source.height) != (width, height) {
            return Err(HostError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if out.len() != expected {
            return Err(HostError::BufferSize {
                expected,
                actual: out.len(),
            });
        }
        for (texel, bytes) in out
            .iter_mut()
            .zip(source.rgba.chunks_exact(BYTES_PER_PIXEL))
        {
            *texel = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        self.readbacks += 1;
        Ok(())
    }
}

impl SurfaceReadback for SoftwareHost {
    fn read_surface(&mut self, surface: &SoftwareSurface) -> Result<PixelImage, HostError> {
        let mut image = PixelImage::new(surface.width, surface.height);
        for (pixel, bytes) in image
            .pixels_mut()
            .iter_mut()
            .zip(surface.rgba.chunks_exact(BYTES_PER_PIXEL))
        {
            *pixel = native_to_argb(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        }
        image.update_pixels();
        Ok(image)
    }
}

impl TextureStore for SoftwareHost {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<NativeTexture, HostError> {
        let len = checked_len(width, height)?;
        self.next_texture += 1;
        let handle = NativeTexture(self.next_texture);
        self.textures.insert(
            handle,
            SoftTexture {
                width,
                height,
                rgba: vec![0; len * BYTES_PER_PIXEL],
            },
        );
        Ok(handle)
    }

    fn write_texture(&mut self, texture: NativeTexture, rgba: &[u8]) -> Result<(), HostError> {
        let target = self
            .textures
            .get_mut(&texture)
            .ok_or(HostError::UnknownTexture(texture))?;
        if rgba.len() != target.rgba.len() {
            return Err(HostError::BufferSize {
                expected: target.rgba.len(),
                actual: rgba.len(),
            });
        }
        target.rgba.copy_from_slice(rgba);
        Ok(())
    }

    fn release_texture(&mut self, texture: NativeTexture) {
        self.textures.remove(&texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rows(width: u32, rows: &[[u8; 4]]) -> Vec<u8> {
        rows.iter()
            .flat_map(|rgba| std::iter::repeat(*rgba).take(width as usize))
            .flatten()
            .collect()
    }

    #[test]
    fn contexts_are_distinct() {
        assert_ne!(SoftwareHost::new().context_id(), SoftwareHost::new().context_id());
    }

    #[test]
    fn zero_sized_allocations_fail() {
        let mut host = SoftwareHost::new();
        assert!(matches!(
            host.create_surface(0, 4),
            Err(HostError::InvalidDimensions { .. })
        ));
        assert!(host.create_texture(4, 0).is_err());
    }

    #[test]
    fn flipped_draw_puts_bottom_row_on_top() {
        let mut host = SoftwareHost::new();
        let texture = host.create_texture(3, 2).unwrap();
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        host.write_texture(texture, &solid_rows(3, &[red, blue]))
            .unwrap();

        let mut surface = host.create_surface(3, 2).unwrap();
        host.draw_textured_quad(&mut surface, texture, &Quad::flipped(3, 2))
            .unwrap();

        for x in 0..3 {
            assert_eq!(surface.pixel(x, 0), Some(blue));
            assert_eq!(surface.pixel(x, 1), Some(red));
        }
        assert_eq!(host.draws(), 1);
    }

    #[test]
    fn read_texture_validates_buffer() {
        let mut host = SoftwareHost::new();
        let texture = host.create_texture(2, 2).unwrap();
        let mut short = vec![0; 3];
        assert_eq!(
            host.read_texture(texture, 2, 2, &mut short),
            Err(HostError::BufferSize {
                expected: 4,
                actual: 3
            })
        );
        let mut wrong = vec![0; 4];
        assert!(host.read_texture(NativeTexture(99), 2, 2, &mut wrong).is_err());
    }

    #[test]
    fn released_textures_are_unknown() {
        let mut host = SoftwareHost::new();
        let texture = host.create_texture(1, 1).unwrap();
        host.release_texture(texture);
        assert_eq!(host.texture_count(), 0);
        assert_eq!(
            host.write_texture(texture, &[0; 4]),
            Err(HostError::UnknownTexture(texture))
        );
    }
}

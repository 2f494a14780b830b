//! Capabilities the host rendering application lends to the copy paths.

use transport::{ContextId, NativeTexture};

use crate::error::HostError;
use crate::lifecycle::Dimensions;
use crate::pixels::PixelImage;

/// Where row 0 of a shared texture sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureOrigin {
    BottomLeft,
    TopLeft,
}

/// Row order of textures handed out by the transport. This is a fixed
/// property of the transport and is never queried at runtime.
pub const TEXTURE_ORIGIN: TextureOrigin = TextureOrigin::BottomLeft;

/// Corner of a textured quad. Both coordinates are in pixels: `position`
/// relative to the top-left of the render target, `tex_coord` relative to
/// texel (0, 0) of the source texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Four corners in drawing order: top-left, top-right, bottom-right,
/// bottom-left of the target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub vertices: [QuadVertex; 4],
}

impl Quad {
    /// Full-target quad sampling the texture with its Y axis mirrored, so the
    /// top vertices read texture row `height` and the bottom ones row `0`.
    pub fn flipped(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            vertices: [
                QuadVertex {
                    position: [0.0, 0.0],
                    tex_coord: [0.0, h],
                },
                QuadVertex {
                    position: [w, 0.0],
                    tex_coord: [w, h],
                },
                QuadVertex {
                    position: [w, h],
                    tex_coord: [w, 0.0],
                },
                QuadVertex {
                    position: [0.0, h],
                    tex_coord: [0.0, 0.0],
                },
            ],
        }
    }

    /// Axis-aligned bounds of the quad in target pixels: `(x0, y0, x1, y1)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let xs = self.vertices.map(|v| v.position[0]);
        let ys = self.vertices.map(|v| v.position[1]);
        let min = |values: [f32; 4]| values.into_iter().fold(f32::INFINITY, f32::min);
        let max = |values: [f32; 4]| values.into_iter().fold(f32::NEG_INFINITY, f32::max);
        (min(xs), min(ys), max(xs), max(ys))
    }

    /// Texture coordinate at target position `(x, y)`, interpolated
    /// bilinearly across the quad's corners.
    pub fn tex_coord_at(&self, x: f32, y: f32) -> [f32; 2] {
        let (x0, y0, x1, y1) = self.bounds();
        let s = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
        let t = if y1 > y0 { (y - y0) / (y1 - y0) } else { 0.0 };
        let [tl, tr, br, bl] = self.vertices.map(|v| v.tex_coord);
        let lerp = |a: f32, b: f32, f: f32| a + (b - a) * f;
        let top = [lerp(tl[0], tr[0], s), lerp(tl[1], tr[1], s)];
        let bottom = [lerp(bl[0], br[0], s), lerp(bl[1], br[1], s)];
        [lerp(top[0], bottom[0], t), lerp(top[1], bottom[1], t)]
    }
}

/// Render-side services of the host application.
///
/// All calls happen on the thread that owns the host's GPU context.
pub trait RenderHost {
    /// Render target type returned by the GPU copy path.
    type Surface: Dimensions;

    /// The GPU context that is current for this host.
    fn context_id(&self) -> ContextId;

    /// Allocates a render target of exactly `width` x `height`.
    fn create_surface(&mut self, width: u32, height: u32) -> Result<Self::Surface, HostError>;

    /// Binds `target`, samples `texture` with pixel-unit (rectangle)
    /// coordinates, draws `quad` and unbinds both again.
    fn draw_textured_quad(
        &mut self,
        target: &mut Self::Surface,
        texture: NativeTexture,
        quad: &Quad,
    ) -> Result<(), HostError>;

    /// Reads every texel of `texture` into `out`, rows in storage order and
    /// texels as `u32::from_ne_bytes([r, g, b, a])`.
    fn read_texture(
        &mut self,
        texture: NativeTexture,
        width: u32,
        height: u32,
        out: &mut [u32],
    ) -> Result<(), HostError>;

    /// Allocates a CPU image of exactly `width` x `height`.
    fn create_image(&mut self, width: u32, height: u32) -> PixelImage {
        PixelImage::new(width, height)
    }
}

/// Hosts that can copy a render target back to the CPU, e.g. for snapshots.
pub trait SurfaceReadback: RenderHost {
    /// Returns the surface contents as a top-down ARGB image.
    fn read_surface(&mut self, surface: &Self::Surface) -> Result<PixelImage, HostError>;
}

/// Texture allocation inside a host context, used by in-process producers.
pub trait TextureStore {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<NativeTexture, HostError>;

    /// Replaces the texture's contents with tightly packed RGBA rows in
    /// storage order (bottom row first for transport textures).
    fn write_texture(&mut self, texture: NativeTexture, rgba: &[u8]) -> Result<(), HostError>;

    fn release_texture(&mut self, texture: NativeTexture);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_quad_mirrors_texture_y() {
        let quad = Quad::flipped(64, 32);
        let [tl, tr, br, bl] = quad.vertices;
        assert_eq!((tl.position, tl.tex_coord), ([0.0, 0.0], [0.0, 32.0]));
        assert_eq!((tr.position, tr.tex_coord), ([64.0, 0.0], [64.0, 32.0]));
        assert_eq!((br.position, br.tex_coord), ([64.0, 32.0], [64.0, 0.0]));
        assert_eq!((bl.position, bl.tex_coord), ([0.0, 32.0], [0.0, 0.0]));
        assert_eq!(quad.bounds(), (0.0, 0.0, 64.0, 32.0));
    }

    #[test]
    fn tex_coord_interpolates_across_quad() {
        let quad = Quad::flipped(4, 4);
        assert_eq!(quad.tex_coord_at(0.5, 0.5), [0.5, 3.5]);
        assert_eq!(quad.tex_coord_at(3.5, 3.5), [3.5, 0.5]);
    }
}

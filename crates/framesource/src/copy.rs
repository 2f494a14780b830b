//! The two ways of getting a fetched frame to the host.
//!
//! `copy_to_surface` is a pure GPU blit: the frame never leaves the GPU and no
//! CPU pixel access happens. `copy_to_image` reads the texture back into
//! system memory and converts every texel on the CPU, which costs a GPU→CPU
//! transfer plus a pass over `width * height` pixels per call. It is always
//! the slower path and exists for hosts that need pixel access; it cannot be
//! rewritten in terms of the surface path without giving up that access.
//!
//! Both paths flip the image vertically because transport textures have a
//! bottom-left origin ([`TEXTURE_ORIGIN`](crate::host::TEXTURE_ORIGIN)) while
//! host destinations are addressed from the top-left.

use crate::error::FrameError;
use crate::frame::TextureFrame;
use crate::host::{Quad, RenderHost};
use crate::lifecycle::{plan_for_len, reuse_or_allocate, Allocation, Dimensions};
use crate::pixels::{convert_flipped, PixelImage};
use crate::source::FrameSource;

impl FrameSource {
    /// Blits `frame` into the surface held in `dest`, replacing it with a new
    /// surface from the host when it is missing or differently sized.
    ///
    /// `frame` must come from the latest successful
    /// [`fetch_current_frame`](Self::fetch_current_frame) on this source, made
    /// for the host's current context. Stale or foreign frames are refused.
    /// On error `dest` keeps whatever it held before the call.
    pub fn copy_to_surface<'d, H: RenderHost>(
        &mut self,
        host: &mut H,
        frame: &TextureFrame,
        dest: &'d mut Option<H::Surface>,
    ) -> Result<&'d mut H::Surface, FrameError> {
        self.validate(frame, host.context_id())?;

        let fresh = reuse_or_allocate(dest, frame.width, frame.height, |w, h| {
            host.create_surface(w, h)
        })?;
        if fresh {
            tracing::debug!(
                width = frame.width,
                height = frame.height,
                "allocated destination surface"
            );
        }
        let surface = sized_destination(dest, frame)?;

        let quad = Quad::flipped(frame.width, frame.height);
        host.draw_textured_quad(surface, frame.texture, &quad)?;
        Ok(surface)
    }

    /// Reads `frame` back to the CPU and writes it into the image held in
    /// `dest` as top-down ARGB, replacing it when it is missing or
    /// differently sized. The readback buffer is kept between calls and
    /// reallocated only when the texel count changes.
    ///
    /// Same frame preconditions as [`copy_to_surface`](Self::copy_to_surface).
    pub fn copy_to_image<'d, H: RenderHost>(
        &mut self,
        host: &mut H,
        frame: &TextureFrame,
        dest: &'d mut Option<PixelImage>,
    ) -> Result<&'d mut PixelImage, FrameError> {
        self.validate(frame, host.context_id())?;

        let fresh = reuse_or_allocate(dest, frame.width, frame.height, |w, h| {
            Ok::<_, FrameError>(host.create_image(w, h))
        })?;
        if fresh {
            tracing::debug!(
                width = frame.width,
                height = frame.height,
                "allocated destination image"
            );
        }
        let image = sized_destination(dest, frame)?;

        let texels = frame.texel_count();
        if let Allocation::Allocate(len) = plan_for_len(Some(self.scratch.len()), texels) {
            tracing::debug!(len, "allocated readback buffer");
            self.scratch = vec![0; len];
        }

        host.read_texture(frame.texture, frame.width, frame.height, &mut self.scratch)?;
        convert_flipped(&self.scratch, frame.width, frame.height, image.pixels_mut())?;
        image.update_pixels();
        Ok(image)
    }

    /// Fetches the current frame and blits it, like calling
    /// [`fetch_current_frame`](Self::fetch_current_frame) followed by
    /// [`copy_to_surface`](Self::copy_to_surface). A failed fetch leaves
    /// `dest` untouched.
    pub fn next_surface<'d, H: RenderHost>(
        &mut self,
        host: &mut H,
        dest: &'d mut Option<H::Surface>,
    ) -> Result<&'d mut H::Surface, FrameError> {
        let frame = self.fetch_current_frame(host.context_id())?;
        self.copy_to_surface(host, &frame, dest)
    }

    /// Fetches the current frame and reads it back, like calling
    /// [`fetch_current_frame`](Self::fetch_current_frame) followed by
    /// [`copy_to_image`](Self::copy_to_image).
    pub fn next_image<'d, H: RenderHost>(
        &mut self,
        host: &mut H,
        dest: &'d mut Option<PixelImage>,
    ) -> Result<&'d mut PixelImage, FrameError> {
        let frame = self.fetch_current_frame(host.context_id())?;
        self.copy_to_image(host, &frame, dest)
    }

    /// Element count of the readback buffer kept for [`copy_to_image`](Self::copy_to_image).
    pub fn readback_capacity(&self) -> usize {
        self.scratch.len()
    }
}

fn sized_destination<'d, D: Dimensions>(
    dest: &'d mut Option<D>,
    frame: &TextureFrame,
) -> Result<&'d mut D, FrameError> {
    let actual = dest
        .as_ref()
        .map_or(0, |d| d.width() as usize * d.height() as usize);
    match dest.as_mut() {
        Some(d) if d.dimensions() == (frame.width, frame.height) => Ok(d),
        _ => {
            debug_assert!(false, "destination lifecycle produced a mis-sized buffer");
            Err(FrameError::SizeMismatchInternal {
                expected: frame.texel_count(),
                actual,
            })
        }
    }
}

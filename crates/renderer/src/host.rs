use std::collections::HashMap;

use anyhow::Result;
use framesource::{
    Dimensions, HostError, PixelImage, Quad, RenderHost, SurfaceReadback, TextureStore,
};
use transport::{ContextId, NativeTexture};

use crate::error::RendererError;
use crate::gpu::{read_rows, BlitPipeline, GpuContext, TEXTURE_FORMAT};
use crate::types::{AdapterProfile, GpuOptions};

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Offscreen render target owned by a [`WgpuHost`].
pub struct WgpuSurface {
    id: u64,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl WgpuSurface {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl Dimensions for WgpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl std::fmt::Debug for WgpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSurface")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Render host backed by a headless wgpu device.
///
/// Shared textures live in the host's own registry; the handles it returns
/// are what an in-process producer publishes through the transport.
pub struct WgpuHost {
    gpu: GpuContext,
    pipeline: BlitPipeline,
    context: ContextId,
    textures: HashMap<NativeTexture, GpuTexture>,
    next_texture: u64,
    surfaces_created: u64,
}

impl WgpuHost {
    pub fn new(options: GpuOptions) -> Result<Self> {
        let gpu = GpuContext::headless(&options)?;
        let pipeline = BlitPipeline::new(&gpu.device);
        tracing::info!(
            adapter = %gpu.adapter_profile.name,
            backend = ?gpu.adapter_profile.backend,
            "wgpu host ready"
        );
        Ok(Self {
            gpu,
            pipeline,
            context: ContextId::allocate(),
            textures: HashMap::new(),
            next_texture: 0,
            surfaces_created: 0,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.gpu.adapter_profile
    }

    pub fn surfaces_created(&self) -> u64 {
        self.surfaces_created
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), HostError> {
        if width == 0 || height == 0 {
            return Err(HostError::InvalidDimensions { width, height });
        }
        if !self.gpu.check_dimensions(width, height) {
            return Err(RendererError::TextureTooLarge {
                width,
                height,
                max: self.gpu.adapter_profile.max_texture_dimension,
            }
            .into());
        }
        Ok(())
    }

    fn allocate(
        &self,
        label: &str,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage,
            view_formats: &[],
        })
    }

    fn texture(&self, texture: NativeTexture) -> Result<&GpuTexture, HostError> {
        self.textures
            .get(&texture)
            .ok_or(HostError::UnknownTexture(texture))
    }
}

impl RenderHost for WgpuHost {
    type Surface = WgpuSurface;

    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_surface(&mut self, width: u32, height: u32) -> Result<WgpuSurface, HostError> {
        self.check_size(width, height)?;
        let texture = self.allocate(
            "framelink surface",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.surfaces_created += 1;
        tracing::debug!(width, height, "wgpu surface allocated");
        Ok(WgpuSurface {
            id: self.surfaces_created,
            texture,
            view,
            width,
            height,
        })
    }

    fn draw_textured_quad(
        &mut self,
        target: &mut WgpuSurface,
        texture: NativeTexture,
        quad: &Quad,
    ) -> Result<(), HostError> {
        let source = self.texture(texture)?;
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blit encoder"),
            });
        self.pipeline.encode(
            &self.gpu.device,
            &mut encoder,
            &target.view,
            (target.width, target.height),
            &source.view,
            quad,
        );
        self.gpu.queue.submit(Some(encoder.finish()));
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
        let row_texels = width as usize;
        read_rows(
            &self.gpu.device,
            &self.gpu.queue,
            &source.texture,
            width,
            height,
            |index, row| {
                let start = index * row_texels;
                for (texel, bytes) in out[start..start + row_texels]
                    .iter_mut()
                    .zip(row.chunks_exact(4))
                {
                    *texel = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                }
            },
        )?;
        Ok(())
    }
}

impl SurfaceReadback for WgpuHost {
    fn read_surface(&mut self, surface: &WgpuSurface) -> Result<PixelImage, HostError> {
        let mut image = PixelImage::new(surface.width, surface.height);
        let row_texels = surface.width as usize;
        let pixels = image.pixels_mut();
        read_rows(
            &self.gpu.device,
            &self.gpu.queue,
            &surface.texture,
            surface.width,
            surface.height,
            |index, row| {
                let start = index * row_texels;
                for (pixel, bytes) in pixels[start..start + row_texels]
                    .iter_mut()
                    .zip(row.chunks_exact(4))
                {
                    *pixel = framesource::pixels::native_to_argb(u32::from_ne_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3],
                    ]));
                }
            },
        )?;
        image.update_pixels();
        Ok(image)
    }
}

impl TextureStore for WgpuHost {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<NativeTexture, HostError> {
        self.check_size(width, height)?;
        let texture = self.allocate(
            "shared texture",
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.next_texture += 1;
        let handle = NativeTexture(self.next_texture);
        self.textures.insert(
            handle,
            GpuTexture {
                texture,
                view,
                width,
                height,
            },
        );
        Ok(handle)
    }

    fn write_texture(&mut self, texture: NativeTexture, rgba: &[u8]) -> Result<(), HostError> {
        let target = self.texture(texture)?;
        let expected = target.width as usize * target.height as usize * 4;
        if rgba.len() != expected {
            return Err(HostError::BufferSize {
                expected,
                actual: rgba.len(),
            });
        }
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(target.width * 4),
                rows_per_image: Some(target.height),
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn release_texture(&mut self, texture: NativeTexture) {
        if let Some(entry) = self.textures.remove(&texture) {
            entry.texture.destroy();
        }
    }
}

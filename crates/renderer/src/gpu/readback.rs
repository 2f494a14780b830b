use crate::error::RendererError;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a `width` texel row once padded for a texture-to-buffer copy.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copies `texture` into a mappable buffer, waits for the GPU and hands every
/// row, in storage order and without padding, to `visit_row`.
pub(crate) fn read_rows(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    mut visit_row: impl FnMut(usize, &[u8]),
) -> Result<(), RendererError> {
    let padded = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| RendererError::Readback(err.to_string()))?;
    rx.recv()
        .map_err(|_| RendererError::Readback("map callback dropped".into()))?
        .map_err(|err| RendererError::Readback(err.to_string()))?;

    {
        let mapped = slice.get_mapped_range();
        let row_len = (width * BYTES_PER_PIXEL) as usize;
        for (index, row) in mapped.chunks_exact(padded as usize).enumerate() {
            visit_row(index, &row[..row_len]);
        }
    }
    buffer.unmap();
    Ok(())
}

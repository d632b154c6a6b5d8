//! Moving pixel data between the CPU and blur-compatible textures.

use crate::error::BlurError;
use crate::filter::BLUR_INPUT_USAGES;

fn bytes_per_texel(format: wgpu::TextureFormat) -> Result<u32, BlurError> {
    format
        .block_copy_size(None)
        .ok_or(BlurError::UnsupportedFormat(format))
}

/// Row sizes for a texture-to-buffer copy: `(unpadded, padded)` bytes per row.
pub(crate) fn compute_padded_bytes_per_row(width: u32, bytes_per_texel: u32) -> (u32, u32) {
    let unpadded_bytes_per_row = width * bytes_per_texel;
    let padded_bytes_per_row =
        unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unpadded_bytes_per_row, padded_bytes_per_row)
}

fn copy_padded_readback_rows(
    data: &[u8],
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    output: &mut Vec<u8>,
) {
    let output_size = (unpadded_bytes_per_row * height) as usize;
    output.resize(output_size, 0);

    if padded_bytes_per_row == unpadded_bytes_per_row {
        output.copy_from_slice(&data[..output_size]);
        return;
    }

    for row in 0..height {
        let padded_offset = (row * padded_bytes_per_row) as usize;
        let unpadded_offset = (row * unpadded_bytes_per_row) as usize;
        let row_data = &data[padded_offset..padded_offset + unpadded_bytes_per_row as usize];
        output[unpadded_offset..unpadded_offset + unpadded_bytes_per_row as usize]
            .copy_from_slice(row_data);
    }
}

/// Create a texture that [`BlurFilter::blur_in_place`](crate::BlurFilter::blur_in_place)
/// accepts and fill it with tightly packed `pixels`.
pub fn create_input_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    pixels: &[u8],
) -> Result<wgpu::Texture, BlurError> {
    if width == 0 || height == 0 {
        return Err(BlurError::ZeroSize { width, height });
    }

    let bytes_per_row = width * bytes_per_texel(format)?;
    let expected = bytes_per_row as usize * height as usize;
    if pixels.len() != expected {
        return Err(BlurError::PixelDataSize {
            expected,
            actual: pixels.len(),
        });
    }

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("blur_input"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: BLUR_INPUT_USAGES | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        size,
    );

    Ok(texture)
}

/// Copy the first mip level of `texture` to the CPU as tightly packed rows.
///
/// Blocks until the GPU has finished all submitted work. The texture needs
/// `COPY_SRC` usage.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, BlurError> {
    let (width, height) = (texture.width(), texture.height());
    let (unpadded_bytes_per_row, padded_bytes_per_row) =
        compute_padded_bytes_per_row(width, bytes_per_texel(texture.format())?);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("blur_readback_buffer"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("blur_readback_encoder"),
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
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        if sender.send(result).is_err() {
            tracing::warn!("Failed to send map_async result from callback");
        }
    });

    device
        .poll(wgpu::PollType::Wait)
        .map_err(|error| BlurError::Readback(error.to_string()))?;

    receiver
        .recv()
        .map_err(|error| BlurError::Readback(error.to_string()))?
        .map_err(|error| BlurError::Readback(error.to_string()))?;

    let mut pixels = Vec::new();
    {
        let mapped_range = buffer_slice.get_mapped_range();
        copy_padded_readback_rows(
            &mapped_range,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
            &mut pixels,
        );
    }
    buffer.unmap();

    Ok(pixels)
}

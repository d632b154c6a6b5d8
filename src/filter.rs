//! The separable blur filter.
//!
//! [`BlurFilter`] owns an intermediate texture the size of the texture it blurs.
//! Each blur iteration runs a horizontal pass from the input into the
//! intermediate texture and a vertical pass from the intermediate texture back
//! into the input, so the result ends up in the caller's texture.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::BlurError;
use crate::shader::{validate_format, BlurShader, WORKGROUP_SIZE};
use crate::weights::{BlurWeights, SamplingMode, KERNEL_TAPS, MAX_RADIUS};

/// Sigma used by [`BlurFilter::new`] and [`BlurConfig::default`].
pub const DEFAULT_SIGMA: f32 = 2.5;

/// Usages a texture needs to be blurred in place.
pub const BLUR_INPUT_USAGES: wgpu::TextureUsages =
    wgpu::TextureUsages::TEXTURE_BINDING.union(wgpu::TextureUsages::STORAGE_BINDING);

/// Uniform layout shared with the `BlurParams` struct in the shader preamble.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct BlurParams {
    texel_size: [f32; 2],
    tap_count: u32,
    _pad: u32,
    taps: [[f32; 4]; KERNEL_TAPS],
}

impl BlurParams {
    fn new(weights: &BlurWeights, radius: u32, sampling: SamplingMode, size: (u32, u32)) -> Self {
        let taps = weights.taps(radius, sampling);
        let mut packed = [[0.0f32; 4]; KERNEL_TAPS];
        for (slot, tap) in packed.iter_mut().zip(taps.iter()) {
            *slot = [tap.offset, tap.weight, 0.0, 0.0];
        }

        Self {
            texel_size: [1.0 / size.0 as f32, 1.0 / size.1 as f32],
            tap_count: taps.len() as u32,
            _pad: 0,
            taps: packed,
        }
    }
}

/// Initial settings for a [`BlurFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurConfig {
    /// Standard deviation of the Gaussian kernel.
    pub sigma: f32,
    /// Taps on each side of the centre, at most [`MAX_RADIUS`].
    pub radius: u32,
    pub sampling: SamplingMode,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            radius: MAX_RADIUS,
            sampling: SamplingMode::default(),
        }
    }
}

/// The intermediate texture a blur writes its horizontal pass into.
///
/// The texture is created with sampled, storage and render attachment usages, so
/// [`BlurTarget::view`] can be bound in any of those roles.
pub struct BlurTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl BlurTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("blur_intermediate"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

/// Separable Gaussian blur over a texture, run in place with compute passes.
///
/// Typical use:
/// 1. [`init`](Self::init) with the size and format of the texture to blur.
/// 2. [`set_shader`](Self::set_shader) with a [`BlurShader`] compiled for that format.
/// 3. [`blur_in_place`](Self::blur_in_place) as often as needed.
///
/// Weights and radius can be changed at any time; they are uploaded on each blur.
pub struct BlurFilter {
    weights: BlurWeights,
    radius: u32,
    sampling: SamplingMode,
    target: Option<BlurTarget>,
    params_buffer: Option<wgpu::Buffer>,
    shader: Option<Arc<BlurShader>>,
}

impl Default for BlurFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlurFilter {
    pub fn new() -> Self {
        Self {
            weights: BlurWeights::default(),
            radius: MAX_RADIUS,
            sampling: SamplingMode::default(),
            target: None,
            params_buffer: None,
            shader: None,
        }
    }

    pub fn from_config(config: BlurConfig) -> Result<Self, BlurError> {
        let mut filter = Self::new();
        filter.set_gaussian_weights(config.sigma)?;
        filter.build_weight(config.radius);
        filter.set_sampling(config.sampling);
        Ok(filter)
    }

    /// Replace the kernel with a normalized Gaussian of standard deviation `sigma`.
    ///
    /// The current weights are kept when `sigma` is rejected.
    pub fn set_gaussian_weights(&mut self, sigma: f32) -> Result<(), BlurError> {
        self.weights = BlurWeights::gaussian(sigma)?;
        Ok(())
    }

    /// Replace the kernel with explicit weights, stored as given.
    pub fn set_weights(&mut self, weights: [f32; KERNEL_TAPS]) {
        self.weights = BlurWeights::new(weights);
    }

    /// Set how many taps on each side of the centre are used during dispatch.
    ///
    /// If every weight within the radius is zero the blur writes zeros.
    pub fn build_weight(&mut self, radius: u32) {
        if radius > MAX_RADIUS {
            tracing::warn!(radius, max = MAX_RADIUS, "blur radius clamped");
        }
        self.radius = radius.min(MAX_RADIUS);
    }

    pub fn set_sampling(&mut self, sampling: SamplingMode) {
        self.sampling = sampling;
    }

    /// Install the shader used for both passes.
    pub fn set_shader(&mut self, shader: impl Into<Arc<BlurShader>>) {
        self.shader = Some(shader.into());
    }

    /// (Re)allocate the intermediate texture for inputs of the given size and format.
    ///
    /// Calling this again with a different size or format replaces the
    /// intermediate texture; calling it with the current ones does nothing.
    pub fn init(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<(), BlurError> {
        if width == 0 || height == 0 {
            return Err(BlurError::ZeroSize { width, height });
        }
        validate_format(format)?;

        if let Some(target) = &self.target {
            if target.size() == (width, height) && target.format == format {
                return Ok(());
            }
        }

        tracing::debug!(width, height, ?format, "allocating blur intermediate texture");
        self.target = Some(BlurTarget::new(device, width, height, format));

        if self.params_buffer.is_none() {
            self.params_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("blur_params"),
                size: std::mem::size_of::<BlurParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        Ok(())
    }

    /// Record `blur_count` horizontal + vertical pass pairs that blur `input` in place.
    ///
    /// Only the first mip level of `input` is read and written. The weights are
    /// uploaded through `queue` and take effect at the next submit, so every blur
    /// recorded before that submit uses the weights of the last call.
    pub fn blur_in_place(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        blur_count: u32,
    ) -> Result<(), BlurError> {
        let (target, params_buffer) = match (&self.target, &self.params_buffer) {
            (Some(target), Some(params_buffer)) => (target, params_buffer),
            _ => return Err(BlurError::NotInitialized),
        };
        let shader = self.shader.as_ref().ok_or(BlurError::ShaderNotSet)?;
        if shader.format() != target.format {
            return Err(BlurError::ShaderFormatMismatch {
                shader: shader.format(),
                filter: target.format,
            });
        }
        validate_input(target, input)?;

        if blur_count == 0 {
            return Ok(());
        }

        let params = BlurParams::new(&self.weights, self.radius, self.sampling, target.size());
        queue.write_buffer(params_buffer, 0, bytemuck::bytes_of(&params));

        let input_view = input.create_view(&wgpu::TextureViewDescriptor {
            label: Some("blur_input_view"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });

        let horizontal_bind_group = shader.create_pass_bind_group(
            device,
            &input_view,
            &target.view,
            params_buffer,
            "blur_horizontal_bg",
        );
        let vertical_bind_group = shader.create_pass_bind_group(
            device,
            &target.view,
            &input_view,
            params_buffer,
            "blur_vertical_bg",
        );

        let workgroups = (
            target.width.div_ceil(WORKGROUP_SIZE),
            target.height.div_ceil(WORKGROUP_SIZE),
        );

        for iteration in 0..blur_count {
            tracing::trace!(iteration, blur_count, "recording blur passes");
            encode_pass(
                encoder,
                shader.horizontal(),
                &horizontal_bind_group,
                workgroups,
                "blur_horizontal_pass",
            );
            encode_pass(
                encoder,
                shader.vertical(),
                &vertical_bind_group,
                workgroups,
                "blur_vertical_pass",
            );
        }

        Ok(())
    }

    /// Blur `input` in place and submit the work to `queue` right away.
    pub fn blur_texture(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        input: &wgpu::Texture,
        blur_count: u32,
    ) -> Result<(), BlurError> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blur_encoder"),
        });
        self.blur_in_place(device, queue, &mut encoder, input, blur_count)?;
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// The intermediate texture, holding the horizontal result of the last pass.
    pub fn blurred_output(&self) -> Option<&BlurTarget> {
        self.target.as_ref()
    }

    pub fn weights(&self) -> &BlurWeights {
        &self.weights
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn sampling(&self) -> SamplingMode {
        self.sampling
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(BlurTarget::size)
    }

    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.target.as_ref().map(BlurTarget::format)
    }

    pub fn shader(&self) -> Option<&Arc<BlurShader>> {
        self.shader.as_ref()
    }
}

fn validate_input(target: &BlurTarget, input: &wgpu::Texture) -> Result<(), BlurError> {
    if input.dimension() != wgpu::TextureDimension::D2 || input.depth_or_array_layers() != 1 {
        return Err(BlurError::NotSingleLayer2d {
            dimension: input.dimension(),
            layers: input.depth_or_array_layers(),
        });
    }

    let actual = (input.width(), input.height());
    if actual != target.size() {
        return Err(BlurError::DimensionMismatch {
            expected: target.size(),
            actual,
        });
    }

    if input.format() != target.format {
        return Err(BlurError::FormatMismatch {
            expected: target.format,
            actual: input.format(),
        });
    }

    let missing = BLUR_INPUT_USAGES - input.usage();
    if !missing.is_empty() {
        return Err(BlurError::MissingUsage(missing));
    }

    Ok(())
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    (workgroups_x, workgroups_y): (u32, u32),
    label: &str,
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some(label),
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
}

//! Compute shaders for the horizontal and vertical blur passes.
//!
//! Every blur kernel is a WGSL compute module made of a preamble provided by the
//! crate, which declares the bindings, and a body declaring two entry points:
//! - `blur_horizontal` reads `t_input` and writes `t_output` along x.
//! - `blur_vertical` does the same along y.
//!
//! The storage format of `t_output` is baked into the preamble, so a compiled
//! [`BlurShader`] only works for the format it was built for.

use std::sync::Arc;

use ahash::{HashMap, HashMapExt};

use crate::error::BlurError;

/// Entry point of the horizontal pass.
pub const HORIZONTAL_ENTRY_POINT: &str = "blur_horizontal";
/// Entry point of the vertical pass.
pub const VERTICAL_ENTRY_POINT: &str = "blur_vertical";

/// Side of the square workgroup both passes are compiled with.
pub const WORKGROUP_SIZE: u32 = 16;

/// Bindings shared by every blur kernel. `{format}` is replaced with the storage format.
const BLUR_PREAMBLE: &str = r#"
// -- Provided by blurfx (group 0) --
struct BlurParams {
    texel_size: vec2<f32>,
    tap_count: u32,
    _pad: u32,
    // x: offset in texels, y: weight
    taps: array<vec4<f32>, 9>,
};

@group(0) @binding(0) var t_input: texture_2d<f32>;
@group(0) @binding(1) var s_input: sampler;
@group(0) @binding(2) var t_output: texture_storage_2d<{format}, write>;
@group(0) @binding(3) var<uniform> params: BlurParams;
"#;

/// The built-in kernel: a weighted sum of `params.tap_count` filtered fetches.
pub const DEFAULT_BLUR_WGSL: &str = r#"
fn blur_along(pixel: vec2<u32>, direction: vec2<f32>) {
    let size = textureDimensions(t_output);
    if (pixel.x >= size.x || pixel.y >= size.y) {
        return;
    }

    let uv = (vec2<f32>(pixel) + vec2<f32>(0.5)) * params.texel_size;
    let texel_step = direction * params.texel_size;
    var color = vec4<f32>(0.0);
    for (var i = 0u; i < params.tap_count; i++) {
        let tap = params.taps[i];
        color += textureSampleLevel(t_input, s_input, uv + texel_step * tap.x, 0.0) * tap.y;
    }
    textureStore(t_output, vec2<i32>(pixel), color);
}

@compute @workgroup_size(16, 16, 1)
fn blur_horizontal(@builtin(global_invocation_id) gid: vec3<u32>) {
    blur_along(gid.xy, vec2<f32>(1.0, 0.0));
}

@compute @workgroup_size(16, 16, 1)
fn blur_vertical(@builtin(global_invocation_id) gid: vec3<u32>) {
    blur_along(gid.xy, vec2<f32>(0.0, 1.0));
}
"#;

/// The WGSL name of a storage format, or `None` when the format can't be used
/// as both a filterable sampled texture and a write-only storage texture.
pub fn storage_format_name(format: wgpu::TextureFormat) -> Option<&'static str> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some("rgba8unorm"),
        wgpu::TextureFormat::Rgba8Snorm => Some("rgba8snorm"),
        wgpu::TextureFormat::Rgba16Float => Some("rgba16float"),
        _ => None,
    }
}

pub(crate) fn validate_format(format: wgpu::TextureFormat) -> Result<&'static str, BlurError> {
    storage_format_name(format).ok_or(BlurError::UnsupportedFormat(format))
}

/// Concatenate the preamble for `format` with a kernel body into a single WGSL module.
pub(crate) fn build_blur_wgsl(format_name: &str, body: &str) -> String {
    let preamble = BLUR_PREAMBLE.replace("{format}", format_name);
    format!("{preamble}\n{body}")
}

/// Checks that the kernel body declares `fn <entry_point>`.
///
/// Comments are stripped first so that commented-out entry points don't count.
pub(crate) fn declares_entry_point(source: &str, entry_point: &str) -> bool {
    let no_block = regex::Regex::new(r"(?s)/\*.*?\*/")
        .expect("valid block comment regex")
        .replace_all(source, "");
    let stripped = regex::Regex::new(r"//[^\n]*")
        .expect("valid line comment regex")
        .replace_all(&no_block, "");

    let pattern = format!(r"\bfn\s+{}\s*\(", regex::escape(entry_point));
    regex::Regex::new(&pattern)
        .expect("valid entry point regex")
        .is_match(&stripped)
}

fn create_blur_bind_group_layout(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("blur_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

fn create_blur_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("blur_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let label = format!("{entry_point}_pipeline");
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Compute pipelines for both blur passes, compiled for one storage format.
pub struct BlurShader {
    horizontal: wgpu::ComputePipeline,
    vertical: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
}

impl BlurShader {
    /// Compile the built-in blur kernel for `format`.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, BlurError> {
        let format_name = validate_format(format)?;
        Ok(Self::compile(device, format, format_name, DEFAULT_BLUR_WGSL))
    }

    /// Compile a custom kernel body for `format`.
    ///
    /// The body is appended to the binding preamble and must declare the
    /// `blur_horizontal` and `blur_vertical` compute entry points. Validation
    /// errors raised by wgpu are returned instead of going to the device's
    /// uncaptured error handler.
    pub async fn from_wgsl(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source: &str,
    ) -> Result<Self, BlurError> {
        let format_name = validate_format(format)?;
        for entry_point in [HORIZONTAL_ENTRY_POINT, VERTICAL_ENTRY_POINT] {
            if !declares_entry_point(source, entry_point) {
                return Err(BlurError::MissingEntryPoint(entry_point));
            }
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = Self::compile(device, format, format_name, source);
        if let Some(error) = device.pop_error_scope().await {
            return Err(BlurError::ShaderCompilation(error.to_string()));
        }

        Ok(shader)
    }

    fn compile(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        format_name: &str,
        body: &str,
    ) -> Self {
        tracing::debug!(?format, "compiling blur shader");

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blur_shader"),
            source: wgpu::ShaderSource::Wgsl(build_blur_wgsl(format_name, body).into()),
        });

        let bind_group_layout = create_blur_bind_group_layout(device, format);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blur_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let horizontal =
            create_pass_pipeline(device, &pipeline_layout, &module, HORIZONTAL_ENTRY_POINT);
        let vertical =
            create_pass_pipeline(device, &pipeline_layout, &module, VERTICAL_ENTRY_POINT);

        Self {
            horizontal,
            vertical,
            bind_group_layout,
            sampler: create_blur_sampler(device),
            format,
        }
    }

    /// The storage format this shader writes.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub(crate) fn horizontal(&self) -> &wgpu::ComputePipeline {
        &self.horizontal
    }

    pub(crate) fn vertical(&self) -> &wgpu::ComputePipeline {
        &self.vertical
    }

    /// Bind the input texture, output storage texture and params for one pass.
    pub(crate) fn create_pass_bind_group(
        &self,
        device: &wgpu::Device,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
        params: &wgpu::Buffer,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(output),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}

/// Built-in blur shaders, compiled once per storage format.
#[derive(Default)]
pub struct BlurShaderCache {
    shaders: HashMap<wgpu::TextureFormat, Arc<BlurShader>>,
}

impl BlurShaderCache {
    pub fn new() -> Self {
        Self {
            shaders: HashMap::new(),
        }
    }

    /// Returns the cached shader for `format`, compiling it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Arc<BlurShader>, BlurError> {
        if let Some(shader) = self.shaders.get(&format) {
            return Ok(shader.clone());
        }

        let shader = Arc::new(BlurShader::new(device, format)?);
        self.shaders.insert(format, shader.clone());
        Ok(shader)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}
